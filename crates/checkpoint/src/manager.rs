//! Background checkpoint writer.

use std::sync::Arc;

use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info};

use crate::{Checkpoint, CheckpointError, CheckpointFile};

/// Default capacity of the position queue.
pub const DEFAULT_QUEUE_CAPACITY: usize = 4096;

/// Sending side of the position queue.
///
/// `enqueue` waits while the queue is full. That wait is the only
/// backpressure between event delivery and the disk: a slow writer stalls
/// the stream instead of dropping or reordering positions.
pub struct CheckpointQueue<C> {
    tx: mpsc::Sender<C>,
}

impl<C> Clone for CheckpointQueue<C> {
    fn clone(&self) -> Self {
        Self {
            tx: self.tx.clone(),
        }
    }
}

impl<C: Checkpoint> CheckpointQueue<C> {
    pub async fn enqueue(&self, checkpoint: C) -> Result<(), CheckpointError> {
        self.tx
            .send(checkpoint)
            .await
            .map_err(|_| CheckpointError::WriterStopped)
    }
}

/// Single consumer that drains the position queue into a [`CheckpointFile`].
///
/// Positions are written in arrival order, each one replacing the previous
/// file content. Write failures are logged and not retried.
///
/// # Example
///
/// ```rust,ignore
/// let file = Arc::new(CheckpointFile::in_dir("/var/lib/sync"));
/// let cancel = CancellationToken::new();
/// let (manager, queue) = CheckpointManager::new(file, DEFAULT_QUEUE_CAPACITY, cancel.clone());
/// let writer = manager.spawn();
///
/// queue.enqueue(position).await?;
///
/// cancel.cancel();
/// writer.await?;
/// ```
pub struct CheckpointManager<C> {
    file: Arc<CheckpointFile<C>>,
    rx: mpsc::Receiver<C>,
    cancel: CancellationToken,
}

impl<C: Checkpoint> CheckpointManager<C> {
    pub fn new(
        file: Arc<CheckpointFile<C>>,
        capacity: usize,
        cancel: CancellationToken,
    ) -> (Self, CheckpointQueue<C>) {
        let (tx, rx) = mpsc::channel(capacity);
        (Self { file, rx, cancel }, CheckpointQueue { tx })
    }

    pub fn spawn(self) -> JoinHandle<()> {
        tokio::spawn(self.run())
    }

    /// Run until cancelled or until every queue handle is dropped.
    ///
    /// Cancellation stops immediately. When the queue closes instead, the
    /// positions already queued are written first.
    pub async fn run(mut self) {
        info!("Checkpoint writer started for {}", self.file.path().display());

        loop {
            tokio::select! {
                biased;
                _ = self.cancel.cancelled() => {
                    debug!("Checkpoint writer cancelled");
                    break;
                }
                next = self.rx.recv() => match next {
                    Some(checkpoint) => self.save(&checkpoint).await,
                    None => {
                        debug!("Checkpoint queue closed");
                        break;
                    }
                },
            }
        }

        info!("Checkpoint writer stopped");
    }

    async fn save(&self, checkpoint: &C) {
        match self.file.write(checkpoint).await {
            Ok(()) => debug!(
                "Saved checkpoint {} to {}",
                checkpoint.to_cli_string(),
                self.file.path().display()
            ),
            Err(e) => error!(
                "Failed to save checkpoint {}: {}",
                checkpoint.to_cli_string(),
                e
            ),
        }
    }
}
