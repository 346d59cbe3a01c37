//! Search index sink trait abstraction.
//!
//! This crate defines the `IndexSink` trait that abstracts over the document
//! index the rows are mirrored into. `meilisearch-sink` implements it over
//! HTTP; tests implement it in memory.
//!
//! The trait uses sync-core types (`Document`) to avoid coupling callers to
//! a particular index client.

mod traits;

pub use traits::IndexSink;
