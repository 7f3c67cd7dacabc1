use std::fmt;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use tabled::Tabled;

use crate::error::SelectionResult;

/// The four case metrics. `Active` is never read from a source table, it is
/// derived during the merge.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Metric {
    Confirmed,
    Death,
    Recovered,
    Active,
}

impl Metric {
    pub const ALL: [Metric; 4] = [
        Metric::Confirmed,
        Metric::Death,
        Metric::Recovered,
        Metric::Active,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            Metric::Confirmed => "confirmed",
            Metric::Death => "death",
            Metric::Recovered => "recovered",
            Metric::Active => "active",
        }
    }

    /// Human-facing label used by the breakdown and the console tables.
    pub fn label(self) -> &'static str {
        match self {
            Metric::Confirmed => "Confirmed",
            Metric::Death => "Death",
            Metric::Recovered => "Recovered",
            Metric::Active => "Active",
        }
    }
}

impl fmt::Display for Metric {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A case count that upstream may have left blank.
pub type Count = Option<i64>;

/// One value per metric, addressable by `Metric`.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PerMetric<T> {
    pub confirmed: T,
    pub death: T,
    pub recovered: T,
    pub active: T,
}

impl<T> PerMetric<T> {
    pub fn from_fn(mut f: impl FnMut(Metric) -> T) -> Self {
        PerMetric {
            confirmed: f(Metric::Confirmed),
            death: f(Metric::Death),
            recovered: f(Metric::Recovered),
            active: f(Metric::Active),
        }
    }

    pub fn get(&self, metric: Metric) -> &T {
        match metric {
            Metric::Confirmed => &self.confirmed,
            Metric::Death => &self.death,
            Metric::Recovered => &self.recovered,
            Metric::Active => &self.active,
        }
    }
}

/// One row of a wide source table: the key columns plus one cell per date
/// column, in header order.
#[derive(Debug, Clone, PartialEq)]
pub struct RawRow {
    pub region: String,
    pub admin_id: String,
    pub lat: f64,
    pub long: f64,
    pub values: Vec<Count>,
}

/// A wide table as read from disk. Date headers stay unparsed until the
/// table is unpivoted.
#[derive(Debug, Clone, PartialEq)]
pub struct RawSeriesTable {
    pub metric: Metric,
    pub date_columns: Vec<String>,
    pub rows: Vec<RawRow>,
}

/// The three source tables of a snapshot.
#[derive(Debug, Clone)]
pub struct RawTables {
    pub confirmed: RawSeriesTable,
    pub death: RawSeriesTable,
    pub recovered: RawSeriesTable,
}

/// A single (row, date) cell of a source table after unpivoting.
#[derive(Debug, Clone, PartialEq)]
pub struct LongEntry {
    pub region: String,
    pub admin_id: String,
    pub lat: f64,
    pub long: f64,
    pub date: NaiveDate,
    pub value: Count,
}

/// A merged region-date record with the derived active count.
///
/// `recovered` is always present (blanks are filled with zero during the
/// merge) while `confirmed` and `death` keep whatever nullability upstream
/// had. `active` is null whenever one of its inputs is.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DerivedRecord {
    pub region: String,
    pub admin_id: String,
    pub lat: f64,
    pub long: f64,
    pub date: NaiveDate,
    pub confirmed: Count,
    pub death: Count,
    pub recovered: i64,
    pub active: Count,
}

impl DerivedRecord {
    pub fn value(&self, metric: Metric) -> Count {
        match metric {
            Metric::Confirmed => self.confirmed,
            Metric::Death => self.death,
            Metric::Recovered => Some(self.recovered),
            Metric::Active => self.active,
        }
    }
}

/// All regions summed for one date.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DailyTotal {
    pub date: NaiveDate,
    pub confirmed: Count,
    pub death: Count,
    pub recovered: Count,
    pub active: Count,
}

impl DailyTotal {
    pub fn value(&self, metric: Metric) -> Count {
        match metric {
            Metric::Confirmed => self.confirmed,
            Metric::Death => self.death,
            Metric::Recovered => self.recovered,
            Metric::Active => self.active,
        }
    }
}

/// One region summed for one date.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RegionDailyTotal {
    pub date: NaiveDate,
    pub region: String,
    pub confirmed: Count,
    pub death: Count,
    pub recovered: Count,
    pub active: Count,
}

impl RegionDailyTotal {
    pub fn value(&self, metric: Metric) -> Count {
        match metric {
            Metric::Confirmed => self.confirmed,
            Metric::Death => self.death,
            Metric::Recovered => self.recovered,
            Metric::Active => self.active,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct GeoPoint {
    pub lat: f64,
    pub long: f64,
}

/// Latest value of a metric compared with the day before.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Indicator {
    pub metric: Metric,
    pub latest: i64,
    pub previous: i64,
    pub delta: i64,
    /// `delta / latest * 100`, rounded to two decimals.
    pub percent: f64,
}

/// An `Indicator` extended with the previous day's delta, so "new today"
/// can be compared with "new the day before".
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct IndicatorDelta {
    pub metric: Metric,
    pub latest: i64,
    pub previous: i64,
    pub before_previous: i64,
    pub delta: i64,
    pub reference_delta: i64,
    pub change: i64,
    pub percent: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BreakdownSlice {
    pub metric: Metric,
    pub label: String,
    pub value: Count,
}

/// Latest raw counts of the four metrics, for proportional display.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CategoricalBreakdown {
    pub region: String,
    pub slices: Vec<BreakdownSlice>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RecentPoint {
    pub date: NaiveDate,
    pub confirmed: Count,
    pub daily_delta: Count,
    pub rolling_average: Option<f64>,
}

/// The trailing window of a region's confirmed series with its daily
/// differences and their rolling mean.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RecentSeries {
    pub region: String,
    pub window: usize,
    pub rolling_window: usize,
    pub points: Vec<RecentPoint>,
}

impl RecentSeries {
    pub fn daily_deltas(&self) -> Vec<Count> {
        self.points.iter().map(|p| p.daily_delta).collect()
    }

    pub fn rolling_averages(&self) -> Vec<Option<f64>> {
        self.points.iter().map(|p| p.rolling_average).collect()
    }
}

/// Highest value of each metric ever observed at one coordinate point of a
/// region.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct GeoMarker {
    pub region: String,
    pub lat: f64,
    pub long: f64,
    pub peak: PerMetric<Count>,
}

/// Everything the presentation layer needs after a region is selected.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SelectionReport {
    pub region: String,
    pub as_of: NaiveDate,
    pub indicators: PerMetric<SelectionResult<IndicatorDelta>>,
    pub breakdown: CategoricalBreakdown,
    pub recent_series: RecentSeries,
    pub geo_markers: Vec<GeoMarker>,
    pub geo_center: GeoPoint,
}

// Console rows. Values are pre-formatted strings so the tables line up the
// same way the CSV exports read.

#[derive(Debug, Tabled, Clone)]
pub struct DailyTotalRow {
    #[tabled(rename = "Date")]
    pub date: String,
    #[tabled(rename = "Confirmed")]
    pub confirmed: String,
    #[tabled(rename = "Death")]
    pub death: String,
    #[tabled(rename = "Recovered")]
    pub recovered: String,
    #[tabled(rename = "Active")]
    pub active: String,
}

#[derive(Debug, Tabled, Clone)]
pub struct HeadlineRow {
    #[tabled(rename = "Metric")]
    pub metric: String,
    #[tabled(rename = "Global")]
    pub latest: String,
    #[tabled(rename = "New")]
    pub delta: String,
    #[tabled(rename = "Pct")]
    pub percent: String,
}

#[derive(Debug, Tabled, Clone)]
pub struct IndicatorRow {
    #[tabled(rename = "Metric")]
    pub metric: String,
    #[tabled(rename = "New")]
    pub delta: String,
    #[tabled(rename = "NewDayBefore")]
    pub reference_delta: String,
    #[tabled(rename = "Change")]
    pub change: String,
}

#[derive(Debug, Tabled, Clone)]
pub struct BreakdownRow {
    #[tabled(rename = "Category")]
    pub category: String,
    #[tabled(rename = "Total")]
    pub total: String,
    #[tabled(rename = "Share")]
    pub share: String,
}

#[derive(Debug, Tabled, Clone)]
pub struct RecentSeriesRow {
    #[tabled(rename = "Date")]
    pub date: String,
    #[tabled(rename = "DailyConfirmed")]
    pub daily_confirmed: String,
    #[tabled(rename = "RollingAve")]
    pub rolling_average: String,
}

#[derive(Debug, Tabled, Clone)]
pub struct GeoMarkerRow {
    #[tabled(rename = "County")]
    pub region: String,
    #[tabled(rename = "Latitude")]
    pub lat: String,
    #[tabled(rename = "Longitude")]
    pub long: String,
    #[tabled(rename = "Confirmed")]
    pub confirmed: String,
    #[tabled(rename = "Death")]
    pub death: String,
    #[tabled(rename = "Recovered")]
    pub recovered: String,
    #[tabled(rename = "Active")]
    pub active: String,
}
