//! Meilisearch implementation of the `IndexSink` trait.
//!
//! Talks to the Meilisearch HTTP API with `reqwest`. Every write returns a
//! task summary as soon as Meilisearch has enqueued it; the summary is
//! logged and the task is never awaited.

mod connect;
mod sink_impl;
mod task;

pub use connect::{meilisearch_connect, meilisearch_connect_with_retries, MeilisearchOpts};
pub use sink_impl::MeilisearchSink;
pub use task::{MeilisearchError, TaskInfo};
