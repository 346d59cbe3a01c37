//! Single-line checkpoint file.

use std::io::Write;
use std::marker::PhantomData;
use std::path::{Path, PathBuf};

use tokio::sync::Mutex;

use crate::{Checkpoint, CheckpointError};

/// Name of the checkpoint file inside the checkpoint directory.
pub const CHECKPOINT_FILE_NAME: &str = "checkpoint";

/// Checkpoint file holding exactly one serialized position.
///
/// Every write truncates the file and rewrites it in full; nothing is ever
/// merged with the previous content. Writes are serialized by a lock owned
/// by this struct. The lock only guards against writers inside this
/// process.
///
/// # File Format
///
/// ```text
/// binlog.000029 35992381
/// ```
pub struct CheckpointFile<C> {
    path: PathBuf,
    lock: Mutex<()>,
    _checkpoint: PhantomData<fn() -> C>,
}

impl<C: Checkpoint> CheckpointFile<C> {
    /// Checkpoint file named [`CHECKPOINT_FILE_NAME`] inside `dir`.
    pub fn in_dir(dir: impl AsRef<Path>) -> Self {
        Self::at_path(dir.as_ref().join(CHECKPOINT_FILE_NAME))
    }

    pub fn at_path(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            lock: Mutex::new(()),
            _checkpoint: PhantomData,
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn exists(&self) -> bool {
        self.path.exists()
    }

    /// Create the parent directory if missing (mode 0750 on Unix).
    pub fn ensure_dir(&self) -> Result<(), CheckpointError> {
        let Some(dir) = self.path.parent() else {
            return Ok(());
        };
        if dir.as_os_str().is_empty() || dir.exists() {
            return Ok(());
        }

        let mut builder = std::fs::DirBuilder::new();
        builder.recursive(true);
        #[cfg(unix)]
        {
            use std::os::unix::fs::DirBuilderExt;
            builder.mode(0o750);
        }
        builder
            .create(dir)
            .map_err(|e| CheckpointError::io(dir, e))?;

        tracing::info!("Created checkpoint directory {}", dir.display());
        Ok(())
    }

    /// Read the stored checkpoint.
    ///
    /// Returns `Ok(None)` when the file does not exist. Malformed content is
    /// an error; it never falls back to a default position.
    pub async fn read(&self) -> Result<Option<C>, CheckpointError> {
        let content = match tokio::fs::read_to_string(&self.path).await {
            Ok(content) => content,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(CheckpointError::io(&self.path, e)),
        };

        // Tolerate one trailing newline from hand-edited files.
        let line = content
            .strip_suffix("\r\n")
            .or_else(|| content.strip_suffix('\n'))
            .unwrap_or(&content);

        C::from_cli_string(line).map(Some)
    }

    /// Overwrite the file with `checkpoint`.
    pub async fn write(&self, checkpoint: &C) -> Result<(), CheckpointError> {
        let _guard = self.lock.lock().await;

        let mut options = std::fs::OpenOptions::new();
        options.write(true).create(true).truncate(true);
        #[cfg(unix)]
        {
            use std::os::unix::fs::OpenOptionsExt;
            options.mode(0o640);
        }

        let mut file = options
            .open(&self.path)
            .map_err(|e| CheckpointError::io(&self.path, e))?;
        file.write_all(checkpoint.to_cli_string().as_bytes())
            .map_err(|e| CheckpointError::io(&self.path, e))?;

        Ok(())
    }
}
