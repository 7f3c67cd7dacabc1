use std::collections::{BTreeMap, BTreeSet};

use log::{debug, info, warn};

use crate::aggregate::{aggregate_daily, aggregate_region_daily};
use crate::config::Config;
use crate::error::{PipelineResult, SelectionResult};
use crate::geo::{build_geo_index, build_geo_markers, GeoIndex};
use crate::loader;
use crate::merge::merge;
use crate::reshape::unpivot;
use crate::selection;
use crate::types::{
    DailyTotal, DerivedRecord, GeoMarker, Indicator, PerMetric, RawTables, RegionDailyTotal,
    SelectionReport,
};

/// The derived views of one input snapshot.
///
/// Built once at startup and read-only afterwards, so a shared reference can
/// be handed to any number of concurrent callers.
#[derive(Debug, Clone, PartialEq)]
pub struct Snapshot {
    daily_totals: Vec<DailyTotal>,
    region_daily_totals: Vec<RegionDailyTotal>,
    geo_index: GeoIndex,
    geo_markers: BTreeMap<String, Vec<GeoMarker>>,
    recent_window: usize,
    rolling_window: usize,
}

impl Snapshot {
    /// Load the three source files named in `config` and build every view.
    pub fn load(config: &Config) -> PipelineResult<Self> {
        config.validate()?;
        let tables = loader::load(config)?;
        Self::from_tables(&tables, config)
    }

    pub fn from_tables(tables: &RawTables, config: &Config) -> PipelineResult<Self> {
        for other in [&tables.death, &tables.recovered] {
            if other.date_columns != tables.confirmed.date_columns {
                warn!(
                    "{} table dates differ from the confirmed table ({} vs {} columns)",
                    other.metric,
                    other.date_columns.len(),
                    tables.confirmed.date_columns.len()
                );
            }
        }
        let records = merge(
            unpivot(&tables.confirmed)?,
            unpivot(&tables.death)?,
            unpivot(&tables.recovered)?,
            config.duplicate_keys,
        )?;
        Self::from_records(&records, config.recent_window, config.rolling_window)
    }

    pub fn from_records(
        records: &[DerivedRecord],
        recent_window: usize,
        rolling_window: usize,
    ) -> PipelineResult<Self> {
        let snapshot = Snapshot {
            daily_totals: aggregate_daily(records)?,
            region_daily_totals: aggregate_region_daily(records)?,
            geo_index: build_geo_index(records),
            geo_markers: build_geo_markers(records),
            recent_window,
            rolling_window,
        };
        info!(
            "Snapshot ready: {} dates, {} regions, {} region-date rows",
            snapshot.daily_totals.len(),
            snapshot.geo_index.len(),
            snapshot.region_daily_totals.len()
        );
        Ok(snapshot)
    }

    pub fn daily_totals(&self) -> &[DailyTotal] {
        &self.daily_totals
    }

    pub fn region_daily_totals(&self) -> &[RegionDailyTotal] {
        &self.region_daily_totals
    }

    /// Distinct region names, sorted.
    pub fn region_options(&self) -> BTreeSet<&str> {
        self.geo_index.keys().map(String::as_str).collect()
    }

    pub fn geo_index(&self) -> &GeoIndex {
        &self.geo_index
    }

    pub fn geo_markers(&self, region: &str) -> &[GeoMarker] {
        self.geo_markers.get(region).map(Vec::as_slice).unwrap_or(&[])
    }

    pub fn recent_window(&self) -> usize {
        self.recent_window
    }

    pub fn rolling_window(&self) -> usize {
        self.rolling_window
    }

    pub fn select_region(&self, region: &str) -> SelectionResult<SelectionReport> {
        debug!("select_region({region:?})");
        selection::select_region(self, region)
    }

    pub fn global_indicators(&self) -> PerMetric<SelectionResult<Indicator>> {
        selection::global_indicators(self)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{DuplicateKeyPolicy, KeyColumns};
    use crate::error::{PipelineError, SelectionError};
    use crate::types::Metric;

    const CONFIRMED: &str = "\
Province_State,Admin2,Lat,Long_,1/1/21,1/2/21,1/3/21
Colorado,Adams,39.87,-104.33,10,12,15
Colorado,Baca,37.31,-102.54,0,0,0
";
    const DEATHS: &str = "\
Province_State,Admin2,Lat,Long_,1/1/21,1/2/21,1/3/21
Colorado,Adams,39.87,-104.33,1,1,2
Colorado,Baca,37.31,-102.54,0,0,0
";
    const RECOVERED: &str = "\
Province_State,Admin2,Lat,Long_,1/1/21,1/2/21,1/3/21
Colorado,Adams,39.87,-104.33,0,3,4
";

    fn tables(confirmed: &str) -> RawTables {
        let columns = KeyColumns::default();
        RawTables {
            confirmed: loader::load_table(confirmed.as_bytes(), "c", Metric::Confirmed, &columns).unwrap(),
            death: loader::load_table(DEATHS.as_bytes(), "d", Metric::Death, &columns).unwrap(),
            recovered: loader::load_table(RECOVERED.as_bytes(), "r", Metric::Recovered, &columns)
                .unwrap(),
        }
    }

    fn snapshot() -> Snapshot {
        Snapshot::from_tables(&tables(CONFIRMED), &Config::default()).unwrap()
    }

    #[test]
    fn test_views() {
        let s = snapshot();
        assert_eq!(s.daily_totals().len(), 3);
        assert_eq!(s.region_daily_totals().len(), 6);
        assert_eq!(s.region_options().into_iter().collect::<Vec<_>>(), vec!["Adams", "Baca"]);

        let last = s.daily_totals().last().unwrap();
        assert_eq!(last.confirmed, Some(15));
        assert_eq!(last.death, Some(2));
        assert_eq!(last.recovered, Some(4));
        assert_eq!(last.active, Some(9));
    }

    #[test]
    fn test_select_region_reports_per_metric() {
        let s = snapshot();
        let report = s.select_region("Adams").unwrap();
        assert_eq!(report.as_of.to_string(), "2021-01-03");
        assert_eq!(report.indicators.confirmed.as_ref().unwrap().delta, 3);
        assert_eq!(report.indicators.death.as_ref().unwrap().reference_delta, 0);
        assert_eq!(report.geo_center.lat, 39.87);
        assert_eq!(report.geo_markers.len(), 1);
        assert_eq!(report.geo_markers[0].peak.confirmed, Some(15));

        // Baca never recorded anything: every percent is undefined, but the
        // selection itself still succeeds.
        let baca = s.select_region("Baca").unwrap();
        for metric in Metric::ALL {
            assert!(matches!(
                baca.indicators.get(metric),
                Err(SelectionError::UndefinedPercent { .. })
            ));
        }
        assert_eq!(baca.recent_series.points.len(), 3);
    }

    #[test]
    fn test_unknown_region() {
        assert_eq!(
            snapshot().select_region("Nowhere"),
            Err(SelectionError::UnknownRegion("Nowhere".into()))
        );
    }

    #[test]
    fn test_global_indicators() {
        let g = snapshot().global_indicators();
        let confirmed = g.confirmed.unwrap();
        assert_eq!((confirmed.latest, confirmed.previous, confirmed.delta), (15, 12, 3));
        assert_eq!(confirmed.percent, 20.0);
    }

    #[test]
    fn test_bad_date_header_is_fatal() {
        let confirmed = CONFIRMED.replace("1/3/21", "1/3/21 total");
        let err = Snapshot::from_tables(&tables(&confirmed), &Config::default()).unwrap_err();
        assert!(matches!(err, PipelineError::DateParse { metric: Metric::Confirmed, .. }));
    }

    #[test]
    fn test_count_overflow_is_fatal() {
        let confirmed = "\
Province_State,Admin2,Lat,Long_,1/1/21,1/2/21,1/3/21
X,A,1.0,1.0,9223372036854775807,9223372036854775807,9223372036854775807
X,B,2.0,2.0,1,1,1
";
        let err = Snapshot::from_tables(&tables(confirmed), &Config::default()).unwrap_err();
        assert!(matches!(err, PipelineError::Overflow(ref what) if what.contains("confirmed")), "{err}");
    }

    #[test]
    fn test_reject_policy_from_config() {
        let confirmed = format!("{CONFIRMED}Colorado,Adams,39.87,-104.33,11,13,16\n");
        let config = Config {
            duplicate_keys: DuplicateKeyPolicy::Reject,
            ..Config::default()
        };
        let err = Snapshot::from_tables(&tables(&confirmed), &config).unwrap_err();
        assert!(matches!(
            err,
            PipelineError::DuplicateKey {
                metric: Metric::Confirmed,
                ..
            }
        ));

        // The default policy keeps both rows and sums them per region.
        let s = Snapshot::from_tables(&tables(&confirmed), &Config::default()).unwrap();
        assert_eq!(s.daily_totals().last().unwrap().confirmed, Some(31));
    }
}
