//! Core types for binlog-index-sync.
//!
//! This crate provides the foundational types shared by the stream source,
//! the index sinks and the event router:
//!
//! - [`RowValue`] - A single column value as delivered by the source
//! - [`TableSchema`] - Ordered column names that row tuples align to
//! - [`RowChangeEvent`] - One row-level change (insert, update, delete)
//! - [`Document`] - A search-index document derived from a row
//! - [`SyncRule`] / [`SyncRules`] - Which tables feed which indexes
//! - [`SyncError`] - Event-level errors raised while mapping rows
//!
//! # Architecture
//!
//! ```text
//! sync-core (this crate)
//!    │
//!    ├─── checkpoint            (position persistence)
//!    ├─── index-sink            (IndexSink trait over Document)
//!    │      └─── meilisearch-sink
//!    └─── mysql-binlog-source   (produces RowChangeEvent)
//! ```

pub mod error;
pub mod rules;
pub mod schema;
pub mod types;
pub mod values;

pub use error::SyncError;
pub use rules::{SyncRule, SyncRules};
pub use schema::TableSchema;
pub use types::{Document, RowAction, RowChangeEvent};
pub use values::RowValue;
