//! Checkpoint management for binlog-index-sync
//!
//! Persists the latest durable stream position so that a restarted process
//! resumes where the previous one stopped.
//!
//! # Architecture
//!
//! This crate provides a generic checkpoint system that:
//! - Defines the `Checkpoint` trait for source-specific position types
//! - Provides `CheckpointFile`, a single-line file that is rewritten in full
//!   on every save
//! - Runs a single background writer via `CheckpointManager`, fed through a
//!   bounded `CheckpointQueue`
//!
//! Delivery is at-least-once: a position is only persisted after the events
//! before it were handed to the sink, and replaying from it is safe because
//! index writes are idempotent upserts.

mod error;
mod file;
mod manager;


pub use error::CheckpointError;
pub use file::{CheckpointFile, CHECKPOINT_FILE_NAME};
pub use manager::{CheckpointManager, CheckpointQueue, DEFAULT_QUEUE_CAPACITY};

/// Trait that source-specific checkpoints must implement.
///
/// # Example
///
/// ```rust
/// use checkpoint::{Checkpoint, CheckpointError};
///
/// #[derive(Debug, Clone)]
/// pub struct SequenceCheckpoint {
///     pub sequence_id: u64,
/// }
///
/// impl Checkpoint for SequenceCheckpoint {
///     fn to_cli_string(&self) -> String {
///         self.sequence_id.to_string()
///     }
///
///     fn from_cli_string(s: &str) -> Result<Self, CheckpointError> {
///         let sequence_id = s
///             .parse()
///             .map_err(|e| CheckpointError::invalid_format(s, format!("{e}")))?;
///         Ok(Self { sequence_id })
///     }
/// }
/// ```
pub trait Checkpoint: Clone + Send + Sync + 'static {
    /// Convert to the persisted string format.
    ///
    /// The returned string must be parseable by `from_cli_string()`. It is
    /// used for the checkpoint file, command-line output and logging.
    fn to_cli_string(&self) -> String;

    /// Parse from the format produced by `to_cli_string()`.
    fn from_cli_string(s: &str) -> Result<Self, CheckpointError>
    where
        Self: Sized;
}
