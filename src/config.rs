use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::{PipelineError, PipelineResult};

/// Header names of the non-date columns every source table must carry.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(default)]
pub struct KeyColumns {
    pub region: String,
    pub admin_id: String,
    pub lat: String,
    pub long: String,
}

impl Default for KeyColumns {
    fn default() -> Self {
        KeyColumns {
            region: "Admin2".into(),
            admin_id: "Province_State".into(),
            lat: "Lat".into(),
            long: "Long_".into(),
        }
    }
}

/// What the merge does when one side of a join holds the same key twice.
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq, Default)]
#[serde(rename_all = "snake_case")]
pub enum DuplicateKeyPolicy {
    /// The row read last replaces earlier ones.
    #[default]
    LastWins,
    /// Abort the build with `PipelineError::DuplicateKey`.
    Reject,
    /// Add the duplicate rows together.
    Sum,
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(default)]
pub struct Config {
    pub confirmed_path: PathBuf,
    pub deaths_path: PathBuf,
    pub recovered_path: PathBuf,
    pub columns: KeyColumns,
    pub duplicate_keys: DuplicateKeyPolicy,
    /// Number of trailing days in a region's recent series.
    pub recent_window: usize,
    /// Number of daily deltas averaged by the rolling mean.
    pub rolling_window: usize,
    pub default_region: Option<String>,
    pub output_dir: PathBuf,
}

impl Default for Config {
    fn default() -> Self {
        Config {
            confirmed_path: "time_series_covid19_confirmed_SD.csv".into(),
            deaths_path: "time_series_covid19_deaths_SD.csv".into(),
            recovered_path: "time_series_covid19_recovered_SD.csv".into(),
            columns: KeyColumns::default(),
            duplicate_keys: DuplicateKeyPolicy::default(),
            recent_window: 30,
            rolling_window: 7,
            default_region: Some("Aurora".into()),
            output_dir: ".".into(),
        }
    }
}

impl Config {
    /// Read a JSON config file. Missing fields fall back to the defaults.
    pub fn from_json_file(path: &Path) -> PipelineResult<Self> {
        let text = std::fs::read_to_string(path)?;
        let config: Config = serde_json::from_str(&text)?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> PipelineResult<()> {
        if self.recent_window == 0 {
            return Err(PipelineError::Config(
                "recent_window must be at least 1".into(),
            ));
        }
        if self.rolling_window == 0 {
            return Err(PipelineError::Config(
                "rolling_window must be at least 1".into(),
            ));
        }
        Ok(())
    }
}
