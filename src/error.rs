//! Error types.
//!
//! `PipelineError` covers everything that can go wrong while the snapshot is
//! being built and is fatal at startup. `SelectionError` is returned per
//! request by the selection queries and never takes the process down.

use chrono::NaiveDate;
use serde::Serialize;

use crate::types::Metric;

#[derive(thiserror::Error, Debug)]
pub enum PipelineError {
    #[error("Malformed {source_name} table: {reason}")]
    Ingest { source_name: String, reason: String },
    #[error("Cannot parse date column header {column:?} in {metric} table")]
    DateParse { metric: Metric, column: String },
    #[error("Duplicate join key in {metric} table: {key}")]
    DuplicateKey { metric: Metric, key: String },
    #[error("Count overflow while {0}")]
    Overflow(String),
    #[error("Invalid configuration: {0}")]
    Config(String),
    #[error("Wrapped csv error: {0}")]
    Csv(#[from] csv::Error),
    #[error("std IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("serde JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl PipelineError {
    pub fn ingest(source_name: impl Into<String>, reason: impl Into<String>) -> Self {
        PipelineError::Ingest {
            source_name: source_name.into(),
            reason: reason.into(),
        }
    }
}

pub type PipelineResult<T> = Result<T, PipelineError>;

/// A count sum or difference left the `i64` range. Callers attach the
/// context (metric, date, key) when they turn it into a `PipelineError`.
#[derive(thiserror::Error, Debug, Clone, Copy, PartialEq, Eq)]
#[error("count overflow")]
pub struct CountOverflow;

#[derive(thiserror::Error, Debug, Clone, PartialEq, Serialize)]
pub enum SelectionError {
    #[error("Unknown region: {0}")]
    UnknownRegion(String),
    #[error("{region}: {metric} needs {required} data points, only {available} available")]
    InsufficientHistory {
        region: String,
        metric: Metric,
        required: usize,
        available: usize,
    },
    #[error("{region}: percent change of {metric} is undefined, latest value is zero")]
    UndefinedPercent { region: String, metric: Metric },
    #[error("{region}: {metric} change does not fit in a count")]
    Overflow { region: String, metric: Metric },
    #[error("{region}: {metric} has no reported value on {date}")]
    MissingValue {
        region: String,
        metric: Metric,
        date: NaiveDate,
    },
}

pub type SelectionResult<T> = Result<T, SelectionError>;
