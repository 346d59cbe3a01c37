use anyhow::Result;
use async_trait::async_trait;
use sync_core::RowChangeEvent;

use crate::ReplicationPosition;

/// Callbacks invoked by a [`StreamSource`](crate::StreamSource), one event
/// at a time and in binlog order.
///
/// An error returned from any callback stops the stream. Every method has a
/// no-op default so handlers only override what they use.
#[async_trait]
pub trait EventHandler: Send + Sync {
    /// The stream moved to a new binlog file; `next` is the first position
    /// in that file.
    async fn on_rotate(&self, _next: ReplicationPosition) -> Result<()> {
        Ok(())
    }

    /// A table-level DDL statement was committed at `next`.
    async fn on_ddl(&self, _next: ReplicationPosition, _schema: &str, _query: &str) -> Result<()> {
        Ok(())
    }

    /// A transaction committed; `next` is the position after its XID event.
    async fn on_xid(&self, _next: ReplicationPosition) -> Result<()> {
        Ok(())
    }

    /// The structure of `db.table` changed. Called before the matching
    /// [`on_ddl`](EventHandler::on_ddl).
    async fn on_table_changed(&self, _db: &str, _table: &str) -> Result<()> {
        Ok(())
    }

    /// A row was inserted, updated or deleted.
    async fn on_row(&self, _event: RowChangeEvent) -> Result<()> {
        Ok(())
    }

    /// The source reports that everything up to `position` was delivered.
    async fn on_pos_synced(&self, _position: ReplicationPosition, _force: bool) -> Result<()> {
        Ok(())
    }

    /// Whether row events of `db.table` should be decoded at all.
    ///
    /// Sources may skip tables the handler would drop anyway, saving the
    /// column lookup. Returning `true` is always correct.
    fn wants_rows(&self, _db: &str, _table: &str) -> bool {
        true
    }
}
