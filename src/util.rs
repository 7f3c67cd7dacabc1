// Utility helpers for parsing and basic statistics.
//
// This module centralizes the "dirty" CSV/number/date handling so the rest of
// the pipeline can assume clean, typed values.
use chrono::NaiveDate;
use num_format::{Locale, ToFormattedString};

use crate::error::CountOverflow;
use crate::types::Count;

/// Header formats seen in the upstream snapshots, tried in order.
const DATE_HEADER_FORMATS: [&str; 3] = ["%m/%d/%y", "%m/%d/%Y", "%Y-%m-%d"];

/// Parse a count cell.
///
/// - Blank cells are `None` (not reported).
/// - Thousands separators are stripped.
/// - Integral floats such as `"12.0"` are accepted, since some exports
///   write every numeric column as float.
/// - Negative values and values outside the `i64` range are rejected.
/// - Anything else is `Err` with the trimmed cell text.
pub fn parse_count(s: Option<&str>) -> Result<Count, String> {
    let Some(s) = s.map(str::trim) else {
        return Ok(None);
    };
    if s.is_empty() || s.eq_ignore_ascii_case("nan") {
        return Ok(None);
    }
    let s = s.replace(',', "");
    if let Ok(v) = s.parse::<i64>() {
        return if v < 0 { Err(s) } else { Ok(Some(v)) };
    }
    // `i64::MAX as f64` rounds up to 2^63, so the upper bound is exclusive.
    match s.parse::<f64>() {
        Ok(v) if v.fract() == 0.0 && v >= 0.0 && v < i64::MAX as f64 => Ok(Some(v as i64)),
        _ => Err(s),
    }
}

/// Parse a latitude/longitude cell. Blank coordinates read as `0.0`, which
/// is what the upstream snapshots use for unassigned rows.
pub fn parse_coord(s: Option<&str>) -> Result<f64, String> {
    let s = s.map(str::trim).unwrap_or("");
    if s.is_empty() {
        return Ok(0.0);
    }
    match s.parse::<f64>() {
        Ok(v) if v.is_finite() => Ok(v),
        _ => Err(s.to_string()),
    }
}

pub fn parse_date_header(s: &str) -> Option<NaiveDate> {
    let s = s.trim();
    DATE_HEADER_FORMATS
        .iter()
        .find_map(|fmt| NaiveDate::parse_from_str(s, fmt).ok())
}

/// Add two nullable counts. A blank only survives when both sides are blank.
pub fn add_counts(a: Count, b: Count) -> Result<Count, CountOverflow> {
    match (a, b) {
        (Some(x), Some(y)) => x.checked_add(y).map(Some).ok_or(CountOverflow),
        (Some(x), None) | (None, Some(x)) => Ok(Some(x)),
        (None, None) => Ok(None),
    }
}

/// Round to a fixed number of decimals, half away from zero.
pub fn round_to(x: f64, decimals: i32) -> f64 {
    let factor = 10f64.powi(decimals);
    (x * factor).round() / factor
}

pub fn average(v: &[i64]) -> f64 {
    // Arithmetic mean; returns 0 for an empty slice to avoid NaNs.
    if v.is_empty() {
        return 0.0;
    }
    // Summed as f64 so long windows of large deltas cannot overflow.
    let sum: f64 = v.iter().map(|&x| x as f64).sum();
    sum / v.len() as f64
}

pub fn format_number(n: f64, decimals: usize) -> String {
    // Fixed decimals plus locale thousands separators (`1,234,567.89`).
    let neg = n.is_sign_negative() && n != 0.0;
    let s = format!("{:.*}", decimals, n.abs());
    let mut parts = s.split('.');
    let int_part = parts.next().unwrap_or("0");
    let frac_part = parts.next();
    let int_val: i64 = int_part.parse().unwrap_or(0);
    let mut res = int_val.to_formatted_string(&Locale::en);
    if let Some(frac) = frac_part {
        if decimals > 0 {
            res.push('.');
            res.push_str(frac);
        }
    }
    if neg {
        format!("-{}", res)
    } else {
        res
    }
}

pub fn format_int<T>(n: T) -> String
where
    T: ToFormattedString,
{
    n.to_formatted_string(&Locale::en)
}

/// `format_int` for a nullable count; blanks render as `-`.
pub fn format_count(n: Count) -> String {
    n.map(format_int).unwrap_or_else(|| "-".to_string())
}
