//! Group-and-sum views over the merged records.
//!
//! Blank counts contribute nothing to a sum. A group total is only blank
//! when every record in the group was blank for that metric, so a single
//! unreported county never wipes out a whole day. A sum that leaves the
//! `i64` range fails the whole aggregation.

use std::collections::BTreeMap;

use chrono::NaiveDate;

use crate::error::{PipelineError, PipelineResult};
use crate::types::{Count, DailyTotal, DerivedRecord, Metric, RegionDailyTotal};
use crate::util::add_counts;

#[derive(Debug, Default, Clone, Copy)]
struct Acc {
    confirmed: Count,
    death: Count,
    recovered: Count,
    active: Count,
}

impl Acc {
    /// Fold one record in. On overflow, returns the metric that overflowed.
    fn add(&mut self, r: &DerivedRecord) -> Result<(), Metric> {
        // add_counts keeps a blank only while both sides are blank.
        self.confirmed = add_counts(self.confirmed, r.confirmed).map_err(|_| Metric::Confirmed)?;
        self.death = add_counts(self.death, r.death).map_err(|_| Metric::Death)?;
        self.recovered = add_counts(self.recovered, Some(r.recovered)).map_err(|_| Metric::Recovered)?;
        self.active = add_counts(self.active, r.active).map_err(|_| Metric::Active)?;
        Ok(())
    }
}

fn overflow(metric: Metric, group: impl std::fmt::Display) -> PipelineError {
    PipelineError::Overflow(format!("summing {metric} for {group}"))
}

/// Totals across all regions, one row per date, ascending.
pub fn aggregate_daily(records: &[DerivedRecord]) -> PipelineResult<Vec<DailyTotal>> {
    let mut map: BTreeMap<NaiveDate, Acc> = BTreeMap::new();
    for r in records {
        map.entry(r.date)
            .or_default()
            .add(r)
            .map_err(|metric| overflow(metric, r.date))?;
    }
    Ok(map
        .into_iter()
        .map(|(date, acc)| DailyTotal {
            date,
            confirmed: acc.confirmed,
            death: acc.death,
            recovered: acc.recovered,
            active: acc.active,
        })
        .collect())
}

/// Totals per (date, region), ordered by date then region name.
pub fn aggregate_region_daily(records: &[DerivedRecord]) -> PipelineResult<Vec<RegionDailyTotal>> {
    let mut map: BTreeMap<(NaiveDate, &str), Acc> = BTreeMap::new();
    for r in records {
        map.entry((r.date, r.region.as_str()))
            .or_default()
            .add(r)
            .map_err(|metric| overflow(metric, format_args!("{} on {}", r.region, r.date)))?;
    }
    Ok(map
        .into_iter()
        .map(|((date, region), acc)| RegionDailyTotal {
            date,
            region: region.to_string(),
            confirmed: acc.confirmed,
            death: acc.death,
            recovered: acc.recovered,
            active: acc.active,
        })
        .collect())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record(region: &str, lat: f64, day: u32, confirmed: Count, death: Count) -> DerivedRecord {
        let recovered = 1;
        DerivedRecord {
            region: region.into(),
            admin_id: "Colorado".into(),
            lat,
            long: -104.0,
            date: NaiveDate::from_ymd_opt(2021, 1, day).unwrap(),
            confirmed,
            death,
            recovered,
            active: match (confirmed, death) {
                (Some(c), Some(d)) => Some(c - d - recovered),
                _ => None,
            },
        }
    }

    fn sample() -> Vec<DerivedRecord> {
        vec![
            record("B", 1.0, 2, Some(7), Some(1)),
            record("A", 1.0, 1, Some(10), Some(2)),
            record("A", 2.0, 1, Some(4), None),
            record("B", 1.0, 1, Some(5), None),
            record("A", 1.0, 2, Some(12), Some(2)),
        ]
    }

    #[test]
    fn test_daily_totals_sorted_and_summed() {
        let daily = aggregate_daily(&sample()).unwrap();
        assert_eq!(daily.len(), 2);
        assert_eq!(daily[0].date, NaiveDate::from_ymd_opt(2021, 1, 1).unwrap());
        assert_eq!(daily[0].confirmed, Some(19));
        // Two blank deaths on day 1 count as zero.
        assert_eq!(daily[0].death, Some(2));
        assert_eq!(daily[0].recovered, Some(3));
        assert_eq!(daily[0].active, Some(7));
        assert_eq!(daily[1].confirmed, Some(19));
    }

    #[test]
    fn test_all_blank_group_stays_blank() {
        let records = vec![record("A", 1.0, 1, Some(3), None), record("B", 1.0, 1, Some(4), None)];
        let daily = aggregate_daily(&records).unwrap();
        assert_eq!(daily[0].death, None);
        assert_eq!(daily[0].active, None);
        assert_eq!(daily[0].confirmed, Some(7));
    }

    #[test]
    fn test_region_totals_merge_coordinate_points() {
        let region = aggregate_region_daily(&sample()).unwrap();
        let keys: Vec<(u32, &str)> = region
            .iter()
            .map(|r| (chrono::Datelike::day(&r.date), r.region.as_str()))
            .collect();
        assert_eq!(keys, vec![(1, "A"), (1, "B"), (2, "A"), (2, "B")]);
        assert_eq!(region[0].confirmed, Some(14));
        assert_eq!(region[0].death, Some(2));
        assert_eq!(region[1].death, None);
    }

    #[test]
    fn test_region_totals_conserve_daily_totals() {
        let records = sample();
        let daily = aggregate_daily(&records).unwrap();
        let region = aggregate_region_daily(&records).unwrap();
        for day in &daily {
            for metric in Metric::ALL {
                let summed = region
                    .iter()
                    .filter(|r| r.date == day.date)
                    .try_fold(None, |acc, r| add_counts(acc, r.value(metric)))
                    .unwrap();
                assert_eq!(summed, day.value(metric), "{metric} on {}", day.date);
            }
        }
    }

    #[test]
    fn test_overflowing_group_is_an_error() {
        let records = vec![
            record("A", 1.0, 1, Some(i64::MAX), None),
            record("A", 2.0, 1, Some(1), None),
        ];
        let err = aggregate_region_daily(&records).unwrap_err();
        assert!(matches!(err, PipelineError::Overflow(ref what) if what.contains("confirmed")), "{err}");
        assert!(aggregate_daily(&records).is_err());

        // Separate regions never share a sum, but the all-regions view does.
        let records = vec![
            record("A", 1.0, 1, Some(i64::MAX), None),
            record("B", 1.0, 1, Some(1), None),
        ];
        assert!(aggregate_region_daily(&records).is_ok());
        assert!(aggregate_daily(&records).is_err());
    }
}
