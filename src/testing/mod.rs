//! In-memory stand-ins for the external systems
//!
//! Used by unit and integration tests to drive the router, the backfill and
//! the startup sequence without a MySQL server or a search engine.

mod sink;
mod stream;
mod tables;

pub use sink::{RecordingSink, SinkCall};
pub use stream::{ScriptedEvent, ScriptedSource};
pub use tables::{InMemoryTableReader, PageRead};
