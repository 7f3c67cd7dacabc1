//! Left outer join of the three long tables.
//!
//! The death and recovered streams are indexed by `JoinKey` first; the
//! confirmed stream is then walked once and every entry looks up its
//! counterparts. Every confirmed entry yields exactly one record.

use std::collections::hash_map::Entry;
use std::collections::{HashMap, HashSet};
use std::fmt;

use chrono::NaiveDate;
use log::{info, warn};

use crate::config::DuplicateKeyPolicy;
use crate::error::{PipelineError, PipelineResult};
use crate::types::{Count, DerivedRecord, LongEntry, Metric};
use crate::util::add_counts;

/// Composite `(region, admin_id, date, lat, long)` key. Coordinates are
/// compared bit for bit, with `-0.0` folded into `0.0`.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct JoinKey {
    region: String,
    admin_id: String,
    date: NaiveDate,
    lat_bits: u64,
    long_bits: u64,
}

impl JoinKey {
    pub fn of(entry: &LongEntry) -> Self {
        // Adding 0.0 turns -0.0 into 0.0, so both hash to the same bits.
        JoinKey {
            region: entry.region.clone(),
            admin_id: entry.admin_id.clone(),
            date: entry.date,
            lat_bits: (entry.lat + 0.0).to_bits(),
            long_bits: (entry.long + 0.0).to_bits(),
        }
    }
}

impl fmt::Display for JoinKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "({}, {}, {}, {}, {})",
            self.region,
            self.admin_id,
            self.date,
            f64::from_bits(self.lat_bits),
            f64::from_bits(self.long_bits)
        )
    }
}

fn index_side(
    entries: impl IntoIterator<Item = LongEntry>,
    metric: Metric,
    policy: DuplicateKeyPolicy,
) -> PipelineResult<HashMap<JoinKey, Count>> {
    let mut index = HashMap::new();
    let mut duplicates = 0usize;
    for entry in entries {
        match index.entry(JoinKey::of(&entry)) {
            Entry::Vacant(slot) => {
                slot.insert(entry.value);
            }
            Entry::Occupied(mut slot) => {
                duplicates += 1;
                match policy {
                    DuplicateKeyPolicy::LastWins => {
                        slot.insert(entry.value);
                    }
                    DuplicateKeyPolicy::Sum => {
                        let summed = add_counts(*slot.get(), entry.value).map_err(|_| {
                            PipelineError::Overflow(format!("summing duplicate {metric} rows for {}", slot.key()))
                        })?;
                        slot.insert(summed);
                    }
                    DuplicateKeyPolicy::Reject => {
                        return Err(PipelineError::DuplicateKey {
                            metric,
                            key: slot.key().to_string(),
                        });
                    }
                }
            }
        }
    }
    if duplicates > 0 {
        warn!("{metric} table: {duplicates} duplicate join keys resolved as {policy:?}");
    }
    Ok(index)
}

/// Join confirmed with death, then with recovered, fill missing recovered
/// counts with zero and derive `active = confirmed - death - recovered`.
///
/// Duplicate keys in the death and recovered streams are resolved with
/// `policy`. Duplicates in the confirmed stream are kept as separate
/// records unless `policy` is `Reject`.
pub fn merge(
    confirmed: impl IntoIterator<Item = LongEntry>,
    death: impl IntoIterator<Item = LongEntry>,
    recovered: impl IntoIterator<Item = LongEntry>,
    policy: DuplicateKeyPolicy,
) -> PipelineResult<Vec<DerivedRecord>> {
    let death = index_side(death, Metric::Death, policy)?;
    let recovered = index_side(recovered, Metric::Recovered, policy)?;

    let mut seen = HashSet::new();
    let mut records = Vec::new();
    for entry in confirmed {
        let key = JoinKey::of(&entry);
        let death_value = death.get(&key).copied().flatten();
        let recovered_value = recovered.get(&key).copied().flatten().unwrap_or(0);
        if policy == DuplicateKeyPolicy::Reject && !seen.insert(key.clone()) {
            return Err(PipelineError::DuplicateKey {
                metric: Metric::Confirmed,
                key: key.to_string(),
            });
        }

        let active = match (entry.value, death_value) {
            (Some(c), Some(d)) => Some(
                c.checked_sub(d)
                    .and_then(|v| v.checked_sub(recovered_value))
                    .ok_or_else(|| PipelineError::Overflow(format!("deriving active for {key}")))?,
            ),
            _ => None,
        };
        records.push(DerivedRecord {
            region: entry.region,
            admin_id: entry.admin_id,
            lat: entry.lat,
            long: entry.long,
            date: entry.date,
            confirmed: entry.value,
            death: death_value,
            recovered: recovered_value,
            active,
        });
    }

    let negative = records.iter().filter(|r| r.active.is_some_and(|a| a < 0)).count();
    if negative > 0 {
        warn!("{negative} merged records have a negative active count");
    }
    info!("Merged {} region-date records", records.len());
    Ok(records)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn empty() -> Vec<LongEntry> {
        Vec::new()
    }

    fn entry(region: &str, day: u32, value: Count) -> LongEntry {
        LongEntry {
            region: region.into(),
            admin_id: "Colorado".into(),
            lat: 39.5,
            long: -104.5,
            date: NaiveDate::from_ymd_opt(2021, 1, day).unwrap(),
            value,
        }
    }

    #[test]
    fn test_left_join_keeps_every_confirmed_entry() {
        let confirmed = vec![entry("A", 1, Some(10)), entry("A", 2, Some(12)), entry("B", 1, Some(5))];
        let death = vec![entry("A", 1, Some(1))];
        let records = merge(confirmed.clone(), death, empty(), DuplicateKeyPolicy::LastWins).unwrap();

        assert_eq!(records.len(), confirmed.len());
        for (record, source) in records.iter().zip(&confirmed) {
            assert_eq!(record.region, source.region);
            assert_eq!(record.date, source.date);
            assert_eq!(record.confirmed, source.value);
        }
        assert_eq!(records[0].death, Some(1));
        // No death row for A on day 2: death stays null and so does active.
        assert_eq!(records[1].death, None);
        assert_eq!(records[1].active, None);
    }

    #[test]
    fn test_recovered_filled_with_zero() {
        let confirmed = vec![entry("A", 1, Some(10)), entry("A", 2, Some(12))];
        let death = vec![entry("A", 1, Some(0)), entry("A", 2, Some(0))];
        let recovered = vec![entry("A", 1, None)];
        let records = merge(confirmed, death, recovered, DuplicateKeyPolicy::LastWins).unwrap();
        assert!(records.iter().all(|r| r.recovered == 0));
        assert_eq!(records[0].active, Some(10));
        assert_eq!(records[1].active, Some(12));
    }

    #[test]
    fn test_active_identity_allows_negative() {
        let confirmed = vec![entry("A", 1, Some(10))];
        let death = vec![entry("A", 1, Some(4))];
        let recovered = vec![entry("A", 1, Some(9))];
        let records = merge(confirmed, death, recovered, DuplicateKeyPolicy::LastWins).unwrap();
        let r = &records[0];
        assert_eq!(r.active, Some(10 - 4 - 9));
        assert_eq!(r.active, Some(-3));
    }

    #[test]
    fn test_null_confirmed_propagates() {
        let records = merge(
            vec![entry("A", 1, None)],
            vec![entry("A", 1, Some(1))],
            empty(),
            DuplicateKeyPolicy::LastWins,
        )
        .unwrap();
        assert_eq!(records[0].confirmed, None);
        assert_eq!(records[0].active, None);
    }

    #[test]
    fn test_coordinates_are_part_of_the_key() {
        let mut moved = entry("A", 1, Some(3));
        moved.lat = 40.0;
        let records = merge(
            vec![entry("A", 1, Some(10))],
            vec![moved],
            empty(),
            DuplicateKeyPolicy::LastWins,
        )
        .unwrap();
        assert_eq!(records[0].death, None);
    }

    #[test]
    fn test_duplicate_policies() {
        let confirmed = || vec![entry("A", 1, Some(10))];
        let deaths = || vec![entry("A", 1, Some(1)), entry("A", 1, Some(2))];

        let last = merge(confirmed(), deaths(), empty(), DuplicateKeyPolicy::LastWins).unwrap();
        assert_eq!(last[0].death, Some(2));

        let sum = merge(confirmed(), deaths(), empty(), DuplicateKeyPolicy::Sum).unwrap();
        assert_eq!(sum[0].death, Some(3));

        let err = merge(confirmed(), deaths(), empty(), DuplicateKeyPolicy::Reject).unwrap_err();
        assert!(matches!(
            err,
            PipelineError::DuplicateKey {
                metric: Metric::Death,
                ..
            }
        ));
    }

    #[test]
    fn test_summed_duplicates_overflow() {
        let deaths = vec![entry("A", 1, Some(i64::MAX)), entry("A", 1, Some(1))];
        let err = merge(vec![entry("A", 1, Some(10))], deaths, empty(), DuplicateKeyPolicy::Sum).unwrap_err();
        assert!(matches!(err, PipelineError::Overflow(_)), "{err}");
    }

    #[test]
    fn test_active_overflow_is_an_error() {
        let err = merge(
            vec![entry("A", 1, Some(0))],
            vec![entry("A", 1, Some(i64::MAX))],
            vec![entry("A", 1, Some(i64::MAX))],
            DuplicateKeyPolicy::LastWins,
        )
        .unwrap_err();
        assert!(matches!(err, PipelineError::Overflow(ref what) if what.contains("active")), "{err}");
    }

    #[test]
    fn test_duplicate_confirmed_rows() {
        let confirmed = || vec![entry("A", 1, Some(10)), entry("A", 1, Some(11))];
        let kept = merge(confirmed(), empty(), empty(), DuplicateKeyPolicy::LastWins).unwrap();
        assert_eq!(kept.len(), 2);

        let err = merge(confirmed(), empty(), empty(), DuplicateKeyPolicy::Reject).unwrap_err();
        assert!(matches!(
            err,
            PipelineError::DuplicateKey {
                metric: Metric::Confirmed,
                ..
            }
        ));
    }

    #[test]
    fn test_negative_zero_coordinates_match() {
        let mut a = entry("A", 1, Some(1));
        a.long = 0.0;
        let mut b = entry("A", 1, Some(1));
        b.long = -0.0;
        assert_eq!(JoinKey::of(&a), JoinKey::of(&b));
    }
}
