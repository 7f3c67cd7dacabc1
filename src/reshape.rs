//! Wide-to-long reshaping of the source tables.

use chrono::NaiveDate;

use crate::error::{PipelineError, PipelineResult};
use crate::types::{LongEntry, RawSeriesTable};
use crate::util::parse_date_header;

/// Parse every date header of `table`, failing on the first one that is not
/// a calendar date.
pub fn parse_dates(table: &RawSeriesTable) -> PipelineResult<Vec<NaiveDate>> {
    table
        .date_columns
        .iter()
        .map(|column| {
            parse_date_header(column).ok_or_else(|| PipelineError::DateParse {
                metric: table.metric,
                column: column.clone(),
            })
        })
        .collect()
}

/// Unpivot a wide table into one entry per (row, date column).
///
/// Headers are validated up front; the entries themselves are produced
/// lazily in row order, then date-column order.
pub fn unpivot(table: &RawSeriesTable) -> PipelineResult<impl Iterator<Item = LongEntry> + '_> {
    let dates = parse_dates(table)?;
    Ok(table.rows.iter().flat_map(move |row| {
        dates
            .clone()
            .into_iter()
            .zip(row.values.iter().copied())
            .map(move |(date, value)| LongEntry {
                region: row.region.clone(),
                admin_id: row.admin_id.clone(),
                lat: row.lat,
                long: row.long,
                date,
                value,
            })
    }))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{Metric, RawRow};

    fn table(date_columns: &[&str]) -> RawSeriesTable {
        RawSeriesTable {
            metric: Metric::Death,
            date_columns: date_columns.iter().map(|c| c.to_string()).collect(),
            rows: vec![
                RawRow {
                    region: "A".into(),
                    admin_id: "X".into(),
                    lat: 1.0,
                    long: 2.0,
                    values: vec![Some(1), Some(2)],
                },
                RawRow {
                    region: "B".into(),
                    admin_id: "X".into(),
                    lat: 3.0,
                    long: 4.0,
                    values: vec![None, Some(7)],
                },
            ],
        }
    }

    #[test]
    fn test_unpivot_order_and_values() {
        let t = table(&["1/1/21", "1/2/21"]);
        let entries: Vec<LongEntry> = unpivot(&t).unwrap().collect();
        assert_eq!(entries.len(), 4);

        let d1 = NaiveDate::from_ymd_opt(2021, 1, 1).unwrap();
        let d2 = NaiveDate::from_ymd_opt(2021, 1, 2).unwrap();
        let summary: Vec<(&str, NaiveDate, Option<i64>)> = entries
            .iter()
            .map(|e| (e.region.as_str(), e.date, e.value))
            .collect();
        assert_eq!(
            summary,
            vec![
                ("A", d1, Some(1)),
                ("A", d2, Some(2)),
                ("B", d1, None),
                ("B", d2, Some(7)),
            ]
        );
        assert_eq!(entries[3].lat, 3.0);
        assert_eq!(entries[3].long, 4.0);
        assert_eq!(entries[3].admin_id, "X");
    }

    #[test]
    fn test_bad_header_names_the_column() {
        let t = table(&["1/1/21", "Combined_Key"]);
        match unpivot(&t) {
            Err(PipelineError::DateParse { metric, column }) => {
                assert_eq!(metric, Metric::Death);
                assert_eq!(column, "Combined_Key");
            }
            Err(other) => panic!("unexpected error: {other:?}"),
            Ok(_) => panic!("expected a date parse error"),
        };
    }
}
