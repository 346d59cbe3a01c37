//! binlog-index-sync library
//!
//! Mirrors MySQL tables into Meilisearch indexes by following the MySQL
//! row-based binlog.
//!
//! # Features
//!
//! - Full synchronization: tables without a stored checkpoint are backfilled
//!   page by page before streaming starts
//! - Incremental synchronization: inserts, updates and deletes are applied to
//!   the configured index as they are read from the binlog
//! - Reliable checkpointing: the last committed binlog position is persisted
//!   and a restart resumes from it
//!
//! # Crates
//!
//! - `sync_core` - row values, row change events, documents and sync rules
//! - `checkpoint` - checkpoint file and background writer
//! - `index_sink` - the `IndexSink` trait
//! - `meilisearch_sink` - `IndexSink` over the Meilisearch HTTP API
//! - `mysql_binlog_source` - binlog stream, table reader and positions
//!
//! This crate ties them together: [`router::EventRouter`] handles stream
//! events, [`row_mapper`] turns rows into index operations,
//! [`full_sync::FullSyncer`] runs the backfill and [`sync::SyncSession`]
//! sequences startup.

pub mod config;
pub mod full_sync;
pub mod router;
pub mod row_mapper;
pub mod sync;
pub mod testing;

pub use config::{Config, ConfigError};
pub use full_sync::{FullSyncStats, FullSyncer};
pub use router::EventRouter;
pub use row_mapper::{map_row, row_to_document, IndexOperation};
pub use sync::{configure_indexes, StartPoint, SyncSession};
