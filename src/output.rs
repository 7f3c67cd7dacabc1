use std::path::{Path, PathBuf};

use log::info;
use serde::Serialize;
use tabled::{settings::Style, Table, Tabled};

use crate::error::PipelineResult;
use crate::snapshot::Snapshot;

pub const DAILY_TOTALS_FILE: &str = "daily_totals.csv";
pub const REGION_DAILY_TOTALS_FILE: &str = "region_daily_totals.csv";

pub fn write_csv<T: Serialize>(path: &Path, rows: &[T]) -> PipelineResult<()> {
    let mut wtr = csv::Writer::from_path(path)?;
    for r in rows {
        wtr.serialize(r)?;
    }
    wtr.flush()?;
    Ok(())
}

pub fn write_json<T: Serialize>(path: &Path, value: &T) -> PipelineResult<()> {
    let s = serde_json::to_string_pretty(value)?;
    std::fs::write(path, s)?;
    Ok(())
}

/// Write both aggregated views into `dir` and return the written paths.
pub fn export_views(snapshot: &Snapshot, dir: &Path) -> PipelineResult<Vec<PathBuf>> {
    std::fs::create_dir_all(dir)?;
    let daily = dir.join(DAILY_TOTALS_FILE);
    write_csv(&daily, snapshot.daily_totals())?;
    let region = dir.join(REGION_DAILY_TOTALS_FILE);
    write_csv(&region, snapshot.region_daily_totals())?;
    info!("Exported views to {}", dir.display());
    Ok(vec![daily, region])
}

/// Render the first `max_rows` rows as a markdown table.
pub fn render_table<T>(rows: &[T], max_rows: usize) -> String
where
    T: Tabled + Clone,
{
    let slice: Vec<T> = rows.iter().take(max_rows).cloned().collect();
    if slice.is_empty() {
        return "(no rows)".to_string();
    }
    Table::new(slice).with(Style::markdown()).to_string()
}

pub fn preview_table_rows<T>(rows: &[T], max_rows: usize)
where
    T: Tabled + Clone,
{
    println!("{}\n", render_table(rows, max_rows));
}
