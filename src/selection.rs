//! Per-region indicators, recomputed from the immutable snapshot on every
//! selection. Nothing here caches or mutates.

use chrono::NaiveDate;

use crate::error::{SelectionError, SelectionResult};
use crate::snapshot::Snapshot;
use crate::types::{
    BreakdownSlice, CategoricalBreakdown, Count, Indicator, IndicatorDelta, Metric, PerMetric,
    RecentPoint, RecentSeries, RegionDailyTotal, SelectionReport,
};
use crate::util::{average, round_to};

/// Label used in errors raised for the all-regions headline.
pub const ALL_REGIONS: &str = "All regions";

/// A metric's values in date order.
pub type Series = Vec<(NaiveDate, Count)>;

/// The rows of one region, in date order.
pub fn region_rows<'a>(totals: &'a [RegionDailyTotal], region: &str) -> Vec<&'a RegionDailyTotal> {
    totals.iter().filter(|r| r.region == region).collect()
}

pub fn metric_series(rows: &[&RegionDailyTotal], metric: Metric) -> Series {
    rows.iter().map(|r| (r.date, r.value(metric))).collect()
}

fn value_at(series: &Series, idx: usize, region: &str, metric: Metric) -> SelectionResult<i64> {
    let (date, value) = series[idx];
    value.ok_or_else(|| SelectionError::MissingValue {
        region: region.to_string(),
        metric,
        date,
    })
}

/// `a - b`, or `Overflow` when the difference does not fit in a count.
fn difference(a: i64, b: i64, region: &str, metric: Metric) -> SelectionResult<i64> {
    a.checked_sub(b).ok_or_else(|| SelectionError::Overflow {
        region: region.to_string(),
        metric,
    })
}

fn require(series: &Series, required: usize, region: &str, metric: Metric) -> SelectionResult<()> {
    if series.len() < required {
        return Err(SelectionError::InsufficientHistory {
            region: region.to_string(),
            metric,
            required,
            available: series.len(),
        });
    }
    Ok(())
}

/// Latest value against the one before it.
///
/// Needs two points. A zero latest value makes the percent change
/// undefined and is reported as `UndefinedPercent`.
pub fn indicator(region: &str, metric: Metric, series: &Series) -> SelectionResult<Indicator> {
    require(series, 2, region, metric)?;
    let n = series.len();
    let latest = value_at(series, n - 1, region, metric)?;
    let previous = value_at(series, n - 2, region, metric)?;
    let delta = difference(latest, previous, region, metric)?;
    if latest == 0 {
        return Err(SelectionError::UndefinedPercent {
            region: region.to_string(),
            metric,
        });
    }
    Ok(Indicator {
        metric,
        latest,
        previous,
        delta,
        percent: round_to(delta as f64 / latest as f64 * 100.0, 2),
    })
}

/// `indicator` plus the delta of the day before, which needs a third point.
pub fn indicator_delta(region: &str, metric: Metric, series: &Series) -> SelectionResult<IndicatorDelta> {
    require(series, 3, region, metric)?;
    let base = indicator(region, metric, series)?;
    let before_previous = value_at(series, series.len() - 3, region, metric)?;
    let reference_delta = difference(base.previous, before_previous, region, metric)?;
    let change = difference(base.delta, reference_delta, region, metric)?;
    Ok(IndicatorDelta {
        metric,
        latest: base.latest,
        previous: base.previous,
        before_previous,
        delta: base.delta,
        reference_delta,
        change,
        percent: base.percent,
    })
}

/// Latest raw count of each metric, unnormalised.
pub fn breakdown(region: &str, rows: &[&RegionDailyTotal]) -> CategoricalBreakdown {
    let latest = rows.last();
    CategoricalBreakdown {
        region: region.to_string(),
        slices: Metric::ALL
            .iter()
            .map(|&metric| BreakdownSlice {
                metric,
                label: metric.label().to_string(),
                value: latest.and_then(|r| r.value(metric)),
            })
            .collect(),
    }
}

/// Daily differences of `values`; the first element has no predecessor.
pub fn daily_deltas(values: &[Count]) -> Vec<Count> {
    let mut out = Vec::with_capacity(values.len());
    for (i, value) in values.iter().enumerate() {
        let delta = match (i.checked_sub(1).and_then(|p| values[p]), value) {
            // Counts are non-negative, so this only fails on aggregated active.
            (Some(prev), Some(cur)) => cur.checked_sub(prev),
            _ => None,
        };
        out.push(delta);
    }
    out
}

/// Trailing mean over `k` points, blank until `k` non-blank points fill the
/// window (any blank inside the window blanks the mean).
pub fn rolling_average(values: &[Count], k: usize) -> Vec<Option<f64>> {
    (0..values.len())
        .map(|i| {
            if k == 0 || i + 1 < k {
                return None;
            }
            // Collecting into Option yields None as soon as one delta is blank.
            let window: Option<Vec<i64>> = values[i + 1 - k..=i].iter().copied().collect();
            window.map(|w| average(&w))
        })
        .collect()
}

/// The last `window` days of the confirmed series. Differencing and the
/// rolling mean run over the full history before the window is cut.
pub fn recent_series(
    region: &str,
    rows: &[&RegionDailyTotal],
    window: usize,
    rolling_window: usize,
) -> RecentSeries {
    let confirmed: Vec<Count> = rows.iter().map(|r| r.confirmed).collect();
    let deltas = daily_deltas(&confirmed);
    let rolling = rolling_average(&deltas, rolling_window);
    let skip = rows.len().saturating_sub(window);
    let points = rows
        .iter()
        .zip(deltas)
        .zip(rolling)
        .skip(skip)
        .map(|((row, daily_delta), rolling_average)| RecentPoint {
            date: row.date,
            confirmed: row.confirmed,
            daily_delta,
            rolling_average,
        })
        .collect();
    RecentSeries {
        region: region.to_string(),
        window,
        rolling_window,
        points,
    }
}

/// Compute every indicator for `region`.
///
/// Only an unknown region fails the whole call; indicator problems are
/// reported per metric inside the result.
pub fn select_region(snapshot: &Snapshot, region: &str) -> SelectionResult<SelectionReport> {
    let rows = region_rows(snapshot.region_daily_totals(), region);
    let (Some(last), Some(center)) = (rows.last(), snapshot.geo_index().get(region)) else {
        return Err(SelectionError::UnknownRegion(region.to_string()));
    };

    let indicators = PerMetric::from_fn(|metric| {
        indicator_delta(region, metric, &metric_series(&rows, metric))
    });

    Ok(SelectionReport {
        region: region.to_string(),
        as_of: last.date,
        indicators,
        breakdown: breakdown(region, &rows),
        recent_series: recent_series(
            region,
            &rows,
            snapshot.recent_window(),
            snapshot.rolling_window(),
        ),
        geo_markers: snapshot.geo_markers(region).to_vec(),
        geo_center: *center,
    })
}

/// Headline indicators over the all-regions daily totals.
pub fn global_indicators(snapshot: &Snapshot) -> PerMetric<SelectionResult<Indicator>> {
    PerMetric::from_fn(|metric| {
        let series: Series = snapshot
            .daily_totals()
            .iter()
            .map(|d| (d.date, d.value(metric)))
            .collect();
        indicator(ALL_REGIONS, metric, &series)
    })
}
