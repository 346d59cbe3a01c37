//! Startup sequence and the streaming session.
//!
//! ```text
//! configure_indexes ─> checkpoint writer ─> stored position?
//!                                              ├─ yes: resume from it
//!                                              └─ no:  head position, backfill, start from head
//!                                           ─> subscribe(start, EventRouter)
//! ```
//!
//! A backfill stores no checkpoint of its own. The first position event
//! streamed after it becomes the first checkpoint, so a restart before that
//! backfills again.

use std::sync::Arc;

use anyhow::{Context, Result};
use checkpoint::{Checkpoint, CheckpointFile, CheckpointManager, DEFAULT_QUEUE_CAPACITY};
use index_sink::IndexSink;
use mysql_binlog_source::{ReplicationPosition, StreamSource, TableReader};
use sync_core::SyncRules;
use tokio_util::sync::CancellationToken;
use tracing::{error, info};

use crate::full_sync::{FullSyncStats, FullSyncer, DEFAULT_PAGE_SIZE};
use crate::router::EventRouter;

/// Create every configured index and set its filterable attributes.
///
/// Runs on every start, before recovery. Existing indexes are left in
/// place; attribute settings are overwritten.
pub async fn configure_indexes<S: IndexSink>(sink: &S, rules: &SyncRules) -> Result<()> {
    for rule in rules.iter() {
        sink.create_index(&rule.target_index, &rule.primary_key_column)
            .await
            .with_context(|| format!("Failed to create index '{}'", rule.target_index))?;
        sink.configure_filterable_attributes(&rule.target_index, &rule.filterable_columns)
            .await
            .with_context(|| {
                format!(
                    "Failed to configure filterable attributes of index '{}'",
                    rule.target_index
                )
            })?;
        info!(
            "Configured index '{}' (primary key '{}', filterable {:?})",
            rule.target_index, rule.primary_key_column, rule.filterable_columns
        );
    }
    Ok(())
}

/// Where streaming starts and how that was decided.
#[derive(Debug, Clone, PartialEq)]
pub enum StartPoint {
    /// A stored checkpoint was found.
    Resumed(ReplicationPosition),
    /// No checkpoint: the tables were backfilled and streaming starts at
    /// the head position taken before the backfill.
    Backfilled {
        head: ReplicationPosition,
        stats: FullSyncStats,
    },
}

impl StartPoint {
    pub fn position(&self) -> &ReplicationPosition {
        match self {
            Self::Resumed(position) => position,
            Self::Backfilled { head, .. } => head,
        }
    }
}

/// One run of the sync: startup followed by streaming until the source
/// ends, a handler call fails, or the session is cancelled.
pub struct SyncSession<Src, R, S> {
    source: Src,
    reader: R,
    sink: S,
    rules: SyncRules,
    checkpoint_file: Arc<CheckpointFile<ReplicationPosition>>,
    page_size: u64,
    queue_capacity: usize,
}

impl<Src, R, S> SyncSession<Src, R, S>
where
    Src: StreamSource,
    R: TableReader,
    S: IndexSink + Clone,
{
    pub fn new(
        source: Src,
        reader: R,
        sink: S,
        rules: SyncRules,
        checkpoint_file: CheckpointFile<ReplicationPosition>,
    ) -> Self {
        Self {
            source,
            reader,
            sink,
            rules,
            checkpoint_file: Arc::new(checkpoint_file),
            page_size: DEFAULT_PAGE_SIZE,
            queue_capacity: DEFAULT_QUEUE_CAPACITY,
        }
    }

    pub fn with_page_size(mut self, page_size: u64) -> Self {
        self.page_size = page_size;
        self
    }

    pub fn with_queue_capacity(mut self, capacity: usize) -> Self {
        self.queue_capacity = capacity;
        self
    }

    pub async fn run(self, cancel: CancellationToken) -> Result<()> {
        self.checkpoint_file.ensure_dir()?;

        configure_indexes(&self.sink, &self.rules).await?;

        let (manager, queue) = CheckpointManager::new(
            self.checkpoint_file.clone(),
            self.queue_capacity,
            cancel.clone(),
        );
        let writer = manager.spawn();

        let start = match self.resolve_start().await {
            Ok(start) => start,
            Err(e) => {
                cancel.cancel();
                let _ = writer.await;
                return Err(e);
            }
        };

        if let StartPoint::Backfilled { stats, .. } = &start {
            info!(
                "Backfilled {} rows from {} tables",
                stats.total_rows(),
                stats.tables.len()
            );
        }

        let from = start.position().clone();
        info!("Streaming binlog from {}", from);

        let router = EventRouter::new(self.rules, self.sink, queue);
        // Cancelling drops the subscription future and stops the writer;
        // positions still queued at that point are not written.
        let result = tokio::select! {
            result = self.source.subscribe(from, &router) => result,
            _ = cancel.cancelled() => {
                info!("Sync cancelled");
                Ok(())
            }
        };

        // Dropping the last queue sender lets the writer drain and exit.
        drop(router);
        if let Err(e) = writer.await {
            error!("Checkpoint writer task failed: {}", e);
        }

        result
    }

    async fn resolve_start(&self) -> Result<StartPoint> {
        if let Some(position) = self.checkpoint_file.read().await? {
            info!(
                "Resuming from checkpoint {} ({})",
                position,
                position.to_cli_string()
            );
            return Ok(StartPoint::Resumed(position));
        }

        let head = self.source.current_position().await?;
        info!(
            "No checkpoint at {}; backfilling before streaming from {}",
            self.checkpoint_file.path().display(),
            head
        );

        let syncer = FullSyncer::new(&self.reader, self.sink.clone(), self.page_size);
        let stats = syncer.sync_all(&self.rules).await?;

        Ok(StartPoint::Backfilled { head, stats })
    }
}
