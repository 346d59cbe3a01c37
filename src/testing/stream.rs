use std::sync::Mutex;

use anyhow::Result;
use async_trait::async_trait;
use mysql_binlog_source::{EventHandler, ReplicationPosition, StreamSource};
use sync_core::RowChangeEvent;
use tokio::sync::Notify;

/// An event replayed by [`ScriptedSource`].
#[derive(Debug, Clone)]
pub enum ScriptedEvent {
    Rotate(ReplicationPosition),
    Ddl {
        next: ReplicationPosition,
        schema: String,
        query: String,
    },
    Xid(ReplicationPosition),
    TableChanged {
        db: String,
        table: String,
    },
    PosSynced(ReplicationPosition),
    Row(RowChangeEvent),
}

/// [`StreamSource`] that replays a fixed script into the handler and
/// remembers where it was asked to start.
///
/// By default the stream ends after the script. With [`Self::keep_open`]
/// it stays idle afterwards, like a live binlog with no new writes.
#[derive(Debug)]
pub struct ScriptedSource {
    head: ReplicationPosition,
    script: Vec<ScriptedEvent>,
    keep_open: bool,
    replayed: Notify,
    subscribed_from: Mutex<Vec<ReplicationPosition>>,
}

impl ScriptedSource {
    pub fn new(head: ReplicationPosition, script: Vec<ScriptedEvent>) -> Self {
        Self {
            head,
            script,
            keep_open: false,
            replayed: Notify::new(),
            subscribed_from: Mutex::new(Vec::new()),
        }
    }

    pub fn keep_open(mut self) -> Self {
        self.keep_open = true;
        self
    }

    /// Resolves once the whole script has been delivered.
    pub async fn replayed(&self) {
        self.replayed.notified().await
    }

    /// Start positions of every `subscribe` call so far.
    pub fn subscribed_from(&self) -> Vec<ReplicationPosition> {
        self.subscribed_from
            .lock()
            .map(|positions| positions.clone())
            .unwrap_or_default()
    }
}

#[async_trait]
impl StreamSource for ScriptedSource {
    async fn current_position(&self) -> Result<ReplicationPosition> {
        Ok(self.head.clone())
    }

    async fn subscribe(
        &self,
        from: ReplicationPosition,
        handler: &dyn EventHandler,
    ) -> Result<()> {
        if let Ok(mut positions) = self.subscribed_from.lock() {
            positions.push(from);
        }

        for event in self.script.iter().cloned() {
            match event {
                ScriptedEvent::Rotate(next) => handler.on_rotate(next).await?,
                ScriptedEvent::Ddl {
                    next,
                    schema,
                    query,
                } => handler.on_ddl(next, &schema, &query).await?,
                ScriptedEvent::Xid(next) => handler.on_xid(next).await?,
                ScriptedEvent::TableChanged { db, table } => {
                    handler.on_table_changed(&db, &table).await?
                }
                ScriptedEvent::PosSynced(position) => handler.on_pos_synced(position, false).await?,
                ScriptedEvent::Row(event) => {
                    if handler.wants_rows(event.db(), event.table()) {
                        handler.on_row(event).await?
                    }
                }
            }
        }

        self.replayed.notify_one();
        if self.keep_open {
            std::future::pending::<()>().await;
        }
        Ok(())
    }
}
