//! Binlog replication position
//!
//! A position is the binlog file name plus the byte offset of the next event
//! to read. It is the checkpoint type persisted by the checkpoint manager.

use std::cmp::Ordering;
use std::fmt;

use checkpoint::{Checkpoint, CheckpointError};

/// Binlog file name plus byte offset.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ReplicationPosition {
    pub log_file: String,
    pub offset: u64,
}

impl ReplicationPosition {
    pub fn new(log_file: impl Into<String>, offset: u64) -> Self {
        Self {
            log_file: log_file.into(),
            offset,
        }
    }

    /// Numeric extension of the file name, e.g. `29` for `binlog.000029`.
    fn file_sequence(&self) -> Option<u64> {
        self.log_file
            .rsplit_once('.')
            .and_then(|(_, ext)| ext.parse().ok())
    }
}

impl Ord for ReplicationPosition {
    fn cmp(&self, other: &Self) -> Ordering {
        let files = match (self.file_sequence(), other.file_sequence()) {
            (Some(a), Some(b)) => a.cmp(&b).then_with(|| self.log_file.cmp(&other.log_file)),
            _ => self.log_file.cmp(&other.log_file),
        };
        files.then_with(|| self.offset.cmp(&other.offset))
    }
}

impl PartialOrd for ReplicationPosition {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl fmt::Display for ReplicationPosition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({}, {})", self.log_file, self.offset)
    }
}

impl Checkpoint for ReplicationPosition {
    fn to_cli_string(&self) -> String {
        format!("{} {}", self.log_file, self.offset)
    }

    fn from_cli_string(s: &str) -> Result<Self, CheckpointError> {
        let parts: Vec<&str> = s.split(' ').collect();
        if parts.len() != 2 {
            return Err(CheckpointError::invalid_format(
                s,
                format!("expected '<logFile> <offset>', got {} fields", parts.len()),
            ));
        }
        if parts[0].is_empty() {
            return Err(CheckpointError::invalid_format(s, "empty binlog file name"));
        }
        let offset = parts[1].parse::<u64>().map_err(|e| {
            CheckpointError::invalid_format(s, format!("invalid offset '{}': {e}", parts[1]))
        })?;

        Ok(Self::new(parts[0], offset))
    }
}
