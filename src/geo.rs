//! Region coordinates: the lookup used to centre the map and the per-point
//! peak markers.

use std::collections::BTreeMap;

use crate::types::{Count, DerivedRecord, GeoMarker, GeoPoint, Metric, PerMetric};

pub type GeoIndex = BTreeMap<String, GeoPoint>;

/// Region name to coordinates. A region spread over several points keeps
/// whichever point was seen last.
pub fn build_geo_index(records: &[DerivedRecord]) -> GeoIndex {
    let mut index = GeoIndex::new();
    for r in records {
        index.insert(
            r.region.clone(),
            GeoPoint {
                lat: r.lat,
                long: r.long,
            },
        );
    }
    index
}

fn max_count(a: Count, b: Count) -> Count {
    match (a, b) {
        (Some(x), Some(y)) => Some(x.max(y)),
        (x, None) => x,
        (None, y) => y,
    }
}

/// Peak value of every metric per exact `(lat, long, region)` triple,
/// grouped by region. Markers of a region are ordered by coordinates.
pub fn build_geo_markers(records: &[DerivedRecord]) -> BTreeMap<String, Vec<GeoMarker>> {
    // f64 is not Ord; the bit patterns keep distinct points distinct.
    // Adding 0.0 folds -0.0 into 0.0 so they land on the same marker.
    let mut peaks: BTreeMap<(&str, u64, u64), (f64, f64, PerMetric<Count>)> = BTreeMap::new();
    for r in records {
        let key = (r.region.as_str(), (r.lat + 0.0).to_bits(), (r.long + 0.0).to_bits());
        let slot = peaks
            .entry(key)
            .or_insert_with(|| (r.lat, r.long, PerMetric::from_fn(|_| None)));
        let peak = PerMetric::from_fn(|m: Metric| max_count(*slot.2.get(m), r.value(m)));
        slot.2 = peak;
    }

    let mut markers: BTreeMap<String, Vec<GeoMarker>> = BTreeMap::new();
    for ((region, _, _), (lat, long, peak)) in peaks {
        markers.entry(region.to_string()).or_default().push(GeoMarker {
            region: region.to_string(),
            lat,
            long,
            peak,
        });
    }
    for list in markers.values_mut() {
        list.sort_by(|a, b| a.lat.total_cmp(&b.lat).then(a.long.total_cmp(&b.long)));
    }
    markers
}
