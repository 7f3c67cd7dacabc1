//! Console rows for the tables the binary prints.

use crate::error::SelectionResult;
use crate::types::{
    BreakdownRow, CategoricalBreakdown, DailyTotal, DailyTotalRow, GeoMarker, GeoMarkerRow,
    HeadlineRow, Indicator, IndicatorDelta, IndicatorRow, Metric, PerMetric, RecentSeries,
    RecentSeriesRow,
};
use crate::util::{format_count, format_int, format_number};

pub fn daily_total_rows(totals: &[DailyTotal]) -> Vec<DailyTotalRow> {
    totals
        .iter()
        .map(|d| DailyTotalRow {
            date: d.date.to_string(),
            confirmed: format_count(d.confirmed),
            death: format_count(d.death),
            recovered: format_count(d.recovered),
            active: format_count(d.active),
        })
        .collect()
}

pub fn headline_rows(indicators: &PerMetric<SelectionResult<Indicator>>) -> Vec<HeadlineRow> {
    Metric::ALL
        .iter()
        .map(|&metric| match indicators.get(metric) {
            Ok(ind) => HeadlineRow {
                metric: metric.label().to_string(),
                latest: format_int(ind.latest),
                delta: format!("{}{}", if ind.delta >= 0 { "+" } else { "" }, format_int(ind.delta)),
                percent: format!("{}%", format_number(ind.percent, 2)),
            },
            Err(e) => HeadlineRow {
                metric: metric.label().to_string(),
                latest: "-".to_string(),
                delta: "-".to_string(),
                percent: e.to_string(),
            },
        })
        .collect()
}

pub fn indicator_rows(indicators: &PerMetric<SelectionResult<IndicatorDelta>>) -> Vec<IndicatorRow> {
    Metric::ALL
        .iter()
        .map(|&metric| match indicators.get(metric) {
            Ok(ind) => IndicatorRow {
                metric: metric.label().to_string(),
                delta: format_int(ind.delta),
                reference_delta: format_int(ind.reference_delta),
                change: format_int(ind.change),
            },
            Err(e) => IndicatorRow {
                metric: metric.label().to_string(),
                delta: "no data".to_string(),
                reference_delta: "-".to_string(),
                change: e.to_string(),
            },
        })
        .collect()
}

/// Breakdown slices with each slice's share of the four-way sum, the way a
/// pie chart would show it. Blank slices count as zero.
pub fn breakdown_rows(breakdown: &CategoricalBreakdown) -> Vec<BreakdownRow> {
    let total: f64 = breakdown.slices.iter().filter_map(|s| s.value).map(|v| v as f64).sum();
    breakdown
        .slices
        .iter()
        .map(|s| {
            let share = match (s.value, total) {
                (Some(v), t) if t != 0.0 => format!("{}%", format_number(v as f64 / t * 100.0, 1)),
                _ => "-".to_string(),
            };
            BreakdownRow {
                category: s.label.clone(),
                total: format_count(s.value),
                share,
            }
        })
        .collect()
}

pub fn recent_series_rows(series: &RecentSeries) -> Vec<RecentSeriesRow> {
    series
        .points
        .iter()
        .map(|p| RecentSeriesRow {
            date: p.date.to_string(),
            daily_confirmed: format_count(p.daily_delta),
            rolling_average: p
                .rolling_average
                .map(|v| format_number(v, 0))
                .unwrap_or_else(|| "-".to_string()),
        })
        .collect()
}

pub fn geo_marker_rows(markers: &[GeoMarker]) -> Vec<GeoMarkerRow> {
    markers
        .iter()
        .map(|m| GeoMarkerRow {
            region: m.region.clone(),
            lat: m.lat.to_string(),
            long: m.long.to_string(),
            confirmed: format_count(m.peak.confirmed),
            death: format_count(m.peak.death),
            recovered: format_count(m.peak.recovered),
            active: format_count(m.peak.active),
        })
        .collect()
}
