//! Case-count dashboard pipeline.
//!
//! Three wide time-series tables (confirmed, deaths, recovered) are
//! unpivoted, joined on `(region, admin_id, date, lat, long)` and summed into
//! an all-regions daily view and a per-region daily view. A `Snapshot` holds
//! those views for the life of the process; `Snapshot::select_region`
//! recomputes the region indicators on demand.

pub mod aggregate;
pub mod config;
pub mod error;
pub mod geo;
pub mod loader;
pub mod merge;
pub mod output;
pub mod reports;
pub mod reshape;
pub mod selection;
pub mod snapshot;
pub mod types;
pub mod util;

pub use config::{Config, DuplicateKeyPolicy, KeyColumns};
pub use error::{PipelineError, PipelineResult, SelectionError, SelectionResult};
pub use snapshot::Snapshot;
pub use types::Metric;
