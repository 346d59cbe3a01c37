//! Event routing from the binlog stream to the index.

use anyhow::Result;
use async_trait::async_trait;
use checkpoint::CheckpointQueue;
use index_sink::IndexSink;
use mysql_binlog_source::{EventHandler, ReplicationPosition};
use sync_core::{RowChangeEvent, SyncError, SyncRules};
use tracing::{debug, info, trace, warn};

use crate::row_mapper::{map_row, IndexOperation};

/// The [`EventHandler`] driving a sync session.
///
/// Row events of configured tables are mapped and written to the sink;
/// position-bearing events are queued for the checkpoint writer. Callbacks
/// return only after their work is done, so a position is never queued
/// before the rows that precede it were accepted by the sink.
pub struct EventRouter<S> {
    rules: SyncRules,
    sink: S,
    checkpoints: CheckpointQueue<ReplicationPosition>,
}

impl<S: IndexSink> EventRouter<S> {
    pub fn new(
        rules: SyncRules,
        sink: S,
        checkpoints: CheckpointQueue<ReplicationPosition>,
    ) -> Self {
        Self {
            rules,
            sink,
            checkpoints,
        }
    }

    async fn save_position(&self, position: ReplicationPosition) -> Result<()> {
        debug!("Queueing checkpoint {}", position);
        self.checkpoints.enqueue(position).await?;
        Ok(())
    }

    async fn apply(&self, operation: IndexOperation) -> Result<(), SyncError> {
        let result = match &operation {
            IndexOperation::Create {
                index,
                documents,
                primary_key,
            } => {
                self.sink
                    .create_documents(index, documents, primary_key)
                    .await
            }
            IndexOperation::Upsert {
                index,
                primary_key,
                document,
            } => self.sink.update_document(index, primary_key, document).await,
            IndexOperation::Delete { index, identifier } => {
                self.sink.delete_document(index, identifier).await
            }
        };

        result.map_err(|e| SyncError::TransientSink {
            index: operation.index().to_string(),
            operation: operation.name(),
            message: format!("{e:#}"),
        })
    }
}

#[async_trait]
impl<S: IndexSink> EventHandler for EventRouter<S> {
    async fn on_rotate(&self, next: ReplicationPosition) -> Result<()> {
        info!("Binlog rotated to {}", next);
        self.save_position(next).await
    }

    async fn on_ddl(&self, next: ReplicationPosition, schema: &str, query: &str) -> Result<()> {
        debug!("DDL in schema '{}' at {}: {}", schema, next, query);
        self.save_position(next).await
    }

    async fn on_xid(&self, next: ReplicationPosition) -> Result<()> {
        self.save_position(next).await
    }

    async fn on_table_changed(&self, db: &str, table: &str) -> Result<()> {
        warn!("Table structure changed: {}.{}", db, table);
        Ok(())
    }

    async fn on_row(&self, event: RowChangeEvent) -> Result<()> {
        info!(
            "Row event: database={} table={} action={}",
            event.db(),
            event.table(),
            event.action
        );

        let Some(rule) = self.rules.find(event.db(), event.table()) else {
            trace!("No sync rule for {}.{}", event.db(), event.table());
            return Ok(());
        };

        if let Some(operation) = map_row(rule, &event)? {
            self.apply(operation).await?;
        }
        Ok(())
    }

    async fn on_pos_synced(&self, _position: ReplicationPosition, _force: bool) -> Result<()> {
        Ok(())
    }

    fn wants_rows(&self, db: &str, table: &str) -> bool {
        self.rules.find(db, table).is_some()
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use checkpoint::{CheckpointFile, CheckpointManager};
    use sync_core::{RowValue, SyncRule, TableSchema};
    use tempfile::TempDir;
    use tokio_util::sync::CancellationToken;

    use super::*;
    use crate::testing::{RecordingSink, SinkCall};

    struct Harness {
        router: EventRouter<Arc<RecordingSink>>,
        sink: Arc<RecordingSink>,
        file: Arc<CheckpointFile<ReplicationPosition>>,
        writer: tokio::task::JoinHandle<()>,
        _dir: TempDir,
    }

    impl Harness {
        fn new(sink: RecordingSink) -> Self {
            let dir = TempDir::new().unwrap();
            let file = Arc::new(CheckpointFile::in_dir(dir.path()));
            let (manager, queue) =
                CheckpointManager::new(file.clone(), 16, CancellationToken::new());
            let writer = manager.spawn();

            let sink = Arc::new(sink);
            let rules = SyncRules::new(vec![SyncRule::new(
                "shop",
                "users",
                "users_idx",
                "id",
                ["name"],
            )]);

            Self {
                router: EventRouter::new(rules, sink.clone(), queue),
                sink,
                file,
                writer,
                _dir: dir,
            }
        }

        /// Drop the router so the writer drains and exits, then read the file.
        async fn stored_position(self) -> Option<ReplicationPosition> {
            drop(self.router);
            self.writer.await.unwrap();
            self.file.read().await.unwrap()
        }
    }

    fn users_schema() -> TableSchema {
        TableSchema::new("shop", "users", ["id", "name"])
    }

    #[tokio::test]
    async fn test_insert_is_sent_as_create() {
        let harness = Harness::new(RecordingSink::new());
        harness
            .router
            .on_row(RowChangeEvent::insert(
                users_schema(),
                vec![RowValue::Int(1), RowValue::from("alice")],
            ))
            .await
            .unwrap();

        let calls = harness.sink.calls();
        assert_eq!(calls.len(), 1);
        let SinkCall::CreateDocuments {
            index,
            documents,
            primary_key,
        } = &calls[0]
        else {
            panic!("expected create_documents");
        };
        assert_eq!(index, "users_idx");
        assert_eq!(primary_key, "id");
        assert_eq!(documents.len(), 1);
    }

    #[tokio::test]
    async fn test_delete_uses_primary_key_value() {
        let harness = Harness::new(RecordingSink::new());
        harness
            .router
            .on_row(RowChangeEvent::delete(
                users_schema(),
                vec![RowValue::from("42"), RowValue::from("bob")],
            ))
            .await
            .unwrap();

        assert_eq!(
            harness.sink.calls(),
            vec![SinkCall::DeleteDocument {
                index: "users_idx".to_string(),
                identifier: "42".to_string(),
            }]
        );
    }

    #[tokio::test]
    async fn test_unmatched_table_is_dropped() {
        let harness = Harness::new(RecordingSink::new());
        let schema = TableSchema::new("shop", "orders", ["id"]);
        harness
            .router
            .on_row(RowChangeEvent::insert(schema, vec![RowValue::Int(1)]))
            .await
            .unwrap();

        assert!(harness.sink.calls().is_empty());
        assert!(!harness.router.wants_rows("shop", "orders"));
        assert!(harness.router.wants_rows("shop", "users"));
    }

    #[tokio::test]
    async fn test_schema_mismatch_makes_no_sink_call() {
        let harness = Harness::new(RecordingSink::new());
        let err = harness
            .router
            .on_row(RowChangeEvent::insert(users_schema(), vec![RowValue::Int(1)]))
            .await
            .unwrap_err();

        assert!(matches!(
            err.downcast_ref::<SyncError>(),
            Some(SyncError::SchemaMismatch { .. })
        ));
        assert!(harness.sink.calls().is_empty());
    }

    #[tokio::test]
    async fn test_sink_failure_is_transient_sink_error() {
        let harness = Harness::new(RecordingSink::failing("index is read-only"));
        let err = harness
            .router
            .on_row(RowChangeEvent::update(
                users_schema(),
                vec![RowValue::Int(1), RowValue::from("alice")],
                vec![RowValue::Int(1), RowValue::from("alicia")],
            ))
            .await
            .unwrap_err();

        match err.downcast_ref::<SyncError>() {
            Some(SyncError::TransientSink {
                index,
                operation,
                message,
            }) => {
                assert_eq!(index, "users_idx");
                assert_eq!(*operation, "update document");
                assert!(message.contains("index is read-only"));
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_position_events_are_checkpointed_in_order() {
        let harness = Harness::new(RecordingSink::new());
        harness
            .router
            .on_xid(ReplicationPosition::new("binlog.000001", 400))
            .await
            .unwrap();
        harness
            .router
            .on_ddl(
                ReplicationPosition::new("binlog.000001", 900),
                "shop",
                "ALTER TABLE users ADD COLUMN age INT",
            )
            .await
            .unwrap();
        harness
            .router
            .on_rotate(ReplicationPosition::new("binlog.000002", 4))
            .await
            .unwrap();

        assert_eq!(
            harness.stored_position().await,
            Some(ReplicationPosition::new("binlog.000002", 4))
        );
    }

    #[tokio::test]
    async fn test_table_changed_and_pos_synced_touch_nothing() {
        let harness = Harness::new(RecordingSink::new());
        harness
            .router
            .on_table_changed("shop", "users")
            .await
            .unwrap();
        harness
            .router
            .on_pos_synced(ReplicationPosition::new("binlog.000003", 4), true)
            .await
            .unwrap();

        assert!(harness.sink.calls().is_empty());
        assert_eq!(harness.stored_position().await, None);
    }
}
