//! Error types raised while routing and mapping row events.

use thiserror::Error;

/// Errors surfaced through the event handler.
///
/// None of these are retried; the stream stops and a restart resumes from
/// the last persisted checkpoint.
#[derive(Error, Debug)]
pub enum SyncError {
    /// A delete could not resolve its primary key value as text.
    #[error("no identifier for delete in {db}.{table}: column '{column}' is missing or not representable as text")]
    MissingIdentifier {
        db: String,
        table: String,
        column: String,
    },

    /// Row arity differs from the schema; a DDL statement likely raced the event.
    #[error("schema mismatch in {db}.{table}: schema has {expected} columns, row has {actual}")]
    SchemaMismatch {
        db: String,
        table: String,
        expected: usize,
        actual: usize,
    },

    /// The row image required by the action was absent.
    #[error("{action} event for {db}.{table} carries no {image} row image")]
    MissingRowImage {
        db: String,
        table: String,
        action: String,
        image: &'static str,
    },

    /// The index sink rejected an operation.
    #[error("index sink rejected {operation} on index '{index}': {message}")]
    TransientSink {
        index: String,
        operation: &'static str,
        message: String,
    },
}
