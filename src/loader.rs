use std::io::Read;
use std::path::Path;

use csv::{ReaderBuilder, StringRecord};
use log::{debug, info};

use crate::config::{Config, KeyColumns};
use crate::error::{PipelineError, PipelineResult};
use crate::types::{Metric, RawRow, RawSeriesTable, RawTables};
use crate::util::{parse_coord, parse_count};

/// Positions of the key columns within a header row.
#[derive(Debug, Clone, Copy)]
struct KeyIndices {
    region: usize,
    admin_id: usize,
    lat: usize,
    long: usize,
}

impl KeyIndices {
    fn last(&self) -> usize {
        self.region.max(self.admin_id).max(self.lat).max(self.long)
    }

    fn contains(&self, idx: usize) -> bool {
        idx == self.region || idx == self.admin_id || idx == self.lat || idx == self.long
    }
}

/// Load the confirmed, deaths and recovered tables named in `config`.
pub fn load(config: &Config) -> PipelineResult<RawTables> {
    Ok(RawTables {
        confirmed: load_path(&config.confirmed_path, Metric::Confirmed, &config.columns)?,
        death: load_path(&config.deaths_path, Metric::Death, &config.columns)?,
        recovered: load_path(&config.recovered_path, Metric::Recovered, &config.columns)?,
    })
}

pub fn load_path(path: &Path, metric: Metric, columns: &KeyColumns) -> PipelineResult<RawSeriesTable> {
    let file = std::fs::File::open(path).map_err(|e| {
        PipelineError::ingest(path.display().to_string(), format!("cannot open file: {e}"))
    })?;
    load_table(file, &path.display().to_string(), metric, columns)
}

/// Read one wide table from any CSV stream.
///
/// Columns after the last key column are date columns; columns before it
/// that are not key columns are ignored. Short rows read as blank cells.
pub fn load_table<R: Read>(
    reader: R,
    source_name: &str,
    metric: Metric,
    columns: &KeyColumns,
) -> PipelineResult<RawSeriesTable> {
    let mut rdr = ReaderBuilder::new().flexible(true).from_reader(reader);
    let headers: Vec<String> = rdr
        .headers()?
        .iter()
        .map(|h| h.trim_start_matches('\u{feff}').trim().to_string())
        .collect();

    let find = |name: &str| {
        headers
            .iter()
            .position(|h| h == name)
            .ok_or_else(|| PipelineError::ingest(source_name, format!("missing key column {name:?}")))
    };
    let keys = KeyIndices {
        region: find(&columns.region)?,
        admin_id: find(&columns.admin_id)?,
        lat: find(&columns.lat)?,
        long: find(&columns.long)?,
    };

    let date_indices: Vec<usize> = (keys.last() + 1..headers.len())
        .filter(|i| !keys.contains(*i))
        .collect();
    if date_indices.is_empty() {
        return Err(PipelineError::ingest(source_name, "table has no date columns"));
    }
    let date_columns = date_indices.iter().map(|i| headers[*i].clone()).collect();

    let mut rows = Vec::new();
    for (n, result) in rdr.records().enumerate() {
        let record = result?;
        // Header is line 1.
        rows.push(parse_row(&record, &keys, &date_indices, &headers, source_name, n + 2)?);
    }

    info!(
        "Loaded {} table from {}: {} rows, {} date columns",
        metric,
        source_name,
        rows.len(),
        date_indices.len()
    );
    Ok(RawSeriesTable {
        metric,
        date_columns,
        rows,
    })
}

fn parse_row(
    record: &StringRecord,
    keys: &KeyIndices,
    date_indices: &[usize],
    headers: &[String],
    source_name: &str,
    line: usize,
) -> PipelineResult<RawRow> {
    let text = |idx: usize| record.get(idx).map(str::trim).unwrap_or("").to_string();

    let lat = parse_coord(record.get(keys.lat)).map_err(|v| {
        PipelineError::ingest(source_name, format!("line {line}: invalid latitude {v:?}"))
    })?;
    let long = parse_coord(record.get(keys.long)).map_err(|v| {
        PipelineError::ingest(source_name, format!("line {line}: invalid longitude {v:?}"))
    })?;

    let values = date_indices
        .iter()
        .map(|idx| {
            parse_count(record.get(*idx)).map_err(|v| {
                PipelineError::ingest(
                    source_name,
                    format!("line {line}, column {:?}: invalid count {v:?}", headers[*idx]),
                )
            })
        })
        .collect::<PipelineResult<Vec<_>>>()?;

    if record.len() < headers.len() {
        debug!("{source_name} line {line}: short row, missing cells read as blank");
    }

    Ok(RawRow {
        region: text(keys.region),
        admin_id: text(keys.admin_id),
        lat,
        long,
        values,
    })
}
