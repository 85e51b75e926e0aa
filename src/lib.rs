//! Filtering and card aggregation for water-supply monitoring dashboards.
//!
//! Records (schemes, villages, ESRs) are loaded once, then narrowed by a
//! cascading geographic filter plus status filters, classified into range
//! buckets from their latest daily reading, counted into cards, and paged
//! for display or exported as reports.

pub mod aggregate;
pub mod classify;
pub mod config;
pub mod error;
pub mod filter;
pub mod loader;
pub mod output;
pub mod paginate;
pub mod reports;
pub mod series;
pub mod types;
pub mod util;

pub use crate::aggregate::{aggregate, in_bucket, BucketTable, Card, Cards};
pub use crate::classify::{classify, classify_consistency, Classification, Predicate, Threshold, ThresholdTable};
pub use crate::config::{load_config, DashboardConfig};
pub use crate::error::{DashboardError, Result};
pub use crate::filter::{Constraint, FilterState, Hierarchy, ALL};
pub use crate::paginate::{paginate, Page, Pager};
pub use crate::series::{latest, latest_raw, Series, SERIES_LEN};
pub use crate::types::{Filterable, GeoScope, Metric, Record, RecordKind};
