//! Error types for the checkpoint crate.

use thiserror::Error;

/// Errors that can occur while loading or persisting checkpoints.
#[derive(Error, Debug)]
pub enum CheckpointError {
    /// The stored checkpoint could not be parsed. Never defaulted.
    #[error("invalid checkpoint format '{content}': {reason}")]
    InvalidCheckpointFormat { content: String, reason: String },

    #[error("checkpoint I/O error on {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    /// The writer task is gone, so positions can no longer be queued.
    #[error("checkpoint writer has stopped")]
    WriterStopped,
}

impl CheckpointError {
    pub fn invalid_format(content: &str, reason: impl Into<String>) -> Self {
        Self::InvalidCheckpointFormat {
            content: content.to_string(),
            reason: reason.into(),
        }
    }

    pub(crate) fn io(path: &std::path::Path, source: std::io::Error) -> Self {
        Self::Io {
            path: path.display().to_string(),
            source,
        }
    }

    pub fn is_invalid_format(&self) -> bool {
        matches!(self, Self::InvalidCheckpointFormat { .. })
    }
}
