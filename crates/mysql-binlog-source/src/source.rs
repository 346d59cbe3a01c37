//! Row-based binlog streaming.
//!
//! The source opens a replication connection at a [`ReplicationPosition`]
//! and turns binlog events into [`EventHandler`] callbacks:
//!
//! ```text
//! ROTATE_EVENT         -> on_rotate(first position of the new file)
//! QUERY_EVENT (DDL)    -> on_table_changed(db, table)... then on_ddl(next position)
//! XID_EVENT            -> on_xid(next position)
//! WRITE/UPDATE/DELETE  -> on_row(RowChangeEvent) per row image
//! ```
//!
//! Row images do not carry column names, so they are looked up in
//! `INFORMATION_SCHEMA.COLUMNS` on first use of a table and cached until a
//! DDL statement touches that table. Table DDL that cannot be parsed clears
//! the whole cache.

use std::collections::HashMap;

use anyhow::{anyhow, Result};
use async_trait::async_trait;
use futures::StreamExt;
use mysql_async::binlog::events::{Event, EventData, RowsEventData};
use mysql_async::binlog::row::BinlogRow;
use mysql_async::binlog::value::BinlogValue;
use mysql_async::prelude::Queryable;
use mysql_async::{BinlogStream, BinlogStreamRequest, Pool, Row};
use sync_core::{RowAction, RowChangeEvent, RowValue, TableSchema};
use tracing::{debug, info};

use crate::ddl::{parse_table_ddl, DdlTarget};
use crate::value::from_mysql;
use crate::{EventHandler, ReplicationPosition};

/// A change stream that can report its head and replay from a position.
#[async_trait]
pub trait StreamSource: Send + Sync {
    /// The position the next committed event will be written at.
    async fn current_position(&self) -> Result<ReplicationPosition>;

    /// Stream events from `from` into `handler` until the stream ends or a
    /// callback fails.
    async fn subscribe(&self, from: ReplicationPosition, handler: &dyn EventHandler)
        -> Result<()>;
}

#[async_trait]
impl<T: StreamSource + ?Sized> StreamSource for std::sync::Arc<T> {
    async fn current_position(&self) -> Result<ReplicationPosition> {
        (**self).current_position().await
    }

    async fn subscribe(
        &self,
        from: ReplicationPosition,
        handler: &dyn EventHandler,
    ) -> Result<()> {
        (**self).subscribe(from, handler).await
    }
}

/// [`StreamSource`] reading the binlog of a MySQL server as a replica.
pub struct MySQLBinlogSource {
    pool: Pool,
    server_id: u32,
}

impl MySQLBinlogSource {
    /// `server_id` must be unique among the replicas of the server.
    pub fn new(pool: Pool, server_id: u32) -> Self {
        Self { pool, server_id }
    }

    async fn table_columns(&self, db: &str, table: &str) -> Result<Vec<String>> {
        let mut conn = self.pool.get_conn().await?;
        let query = "
            SELECT COLUMN_NAME
            FROM INFORMATION_SCHEMA.COLUMNS
            WHERE TABLE_SCHEMA = ? AND TABLE_NAME = ?
            ORDER BY ORDINAL_POSITION";
        let columns: Vec<String> = conn.exec(query, (db, table)).await?;
        if columns.is_empty() {
            anyhow::bail!("No columns found for table {db}.{table}");
        }
        Ok(columns)
    }
}

#[async_trait]
impl StreamSource for MySQLBinlogSource {
    async fn current_position(&self) -> Result<ReplicationPosition> {
        let mut conn = self.pool.get_conn().await?;

        // MySQL 8.2+ renamed the statement; older servers only know the old name.
        let row: Option<Row> = match conn.query_first("SHOW BINARY LOG STATUS").await {
            Ok(row) => row,
            Err(_) => conn.query_first("SHOW MASTER STATUS").await?,
        };
        let row = row.ok_or_else(|| {
            anyhow!("SHOW MASTER STATUS returned no rows, binary logging may be disabled")
        })?;

        let log_file: String = row
            .get(0)
            .ok_or_else(|| anyhow!("Missing binlog file in SHOW MASTER STATUS"))?;
        let offset: u64 = row
            .get(1)
            .ok_or_else(|| anyhow!("Missing binlog position in SHOW MASTER STATUS"))?;
        if log_file.is_empty() {
            anyhow::bail!("SHOW MASTER STATUS returned an empty file name");
        }

        Ok(ReplicationPosition::new(log_file, offset))
    }

    async fn subscribe(
        &self,
        from: ReplicationPosition,
        handler: &dyn EventHandler,
    ) -> Result<()> {
        info!(
            "Starting binlog stream at {} as server_id {}",
            from, self.server_id
        );

        let conn = self.pool.get_conn().await?;
        let request = BinlogStreamRequest::new(self.server_id)
            .with_filename(from.log_file.as_bytes())
            .with_pos(from.offset);
        let mut stream = conn.get_binlog_stream(request).await?;

        let mut log_file = from.log_file.clone();
        let mut columns: HashMap<(String, String), Vec<String>> = HashMap::new();

        while let Some(event) = stream.next().await {
            let event = event?;
            match decode(&event, &stream, handler, &log_file)? {
                Step::Rotate(first) => {
                    log_file = first.log_file.clone();
                    handler.on_rotate(first).await?;
                }
                Step::Ddl {
                    next,
                    schema,
                    query,
                    targets,
                } => {
                    if targets.is_empty() {
                        debug!("Clearing column cache after DDL on unknown tables");
                        columns.clear();
                    }
                    for target in &targets {
                        columns.remove(&(target.db.clone(), target.table.clone()));
                        handler.on_table_changed(&target.db, &target.table).await?;
                    }
                    handler.on_ddl(next, &schema, &query).await?;
                }
                Step::Xid(next) => handler.on_xid(next).await?,
                Step::Rows(batch) => {
                    let key = (batch.db.clone(), batch.table.clone());
                    let names = match columns.get(&key) {
                        Some(names) => names.clone(),
                        None => {
                            let names = self.table_columns(&batch.db, &batch.table).await?;
                            debug!(
                                "Cached {} columns for {}.{}",
                                names.len(),
                                batch.db,
                                batch.table
                            );
                            columns.insert(key, names.clone());
                            names
                        }
                    };
                    let schema = TableSchema::new(batch.db.clone(), batch.table.clone(), names);
                    for event in batch.into_events(schema) {
                        handler.on_row(event).await?;
                    }
                }
                Step::Skip => {}
            }
        }

        info!("Binlog stream ended at file {}", log_file);
        Ok(())
    }
}

/// Owned summary of one binlog event, so nothing borrowed from the stream
/// is held across handler calls.
enum Step {
    Rotate(ReplicationPosition),
    Ddl {
        next: ReplicationPosition,
        schema: String,
        query: String,
        targets: Vec<DdlTarget>,
    },
    Xid(ReplicationPosition),
    Rows(RowBatch),
    Skip,
}

struct RowBatch {
    db: String,
    table: String,
    action: RowAction,
    images: Vec<(Option<Vec<RowValue>>, Option<Vec<RowValue>>)>,
}

impl RowBatch {
    fn into_events(self, schema: TableSchema) -> impl Iterator<Item = RowChangeEvent> {
        let action = self.action;
        self.images
            .into_iter()
            .map(move |(before, after)| RowChangeEvent {
                schema: schema.clone(),
                action: action.clone(),
                before,
                after,
            })
    }
}

fn decode(
    event: &Event,
    stream: &BinlogStream,
    handler: &dyn EventHandler,
    log_file: &str,
) -> Result<Step> {
    let next = ReplicationPosition::new(log_file, u64::from(event.header().log_pos()));

    let Some(data) = event.read_data()? else {
        return Ok(Step::Skip);
    };

    let step = match data {
        EventData::RotateEvent(rotate) => {
            Step::Rotate(ReplicationPosition::new(rotate.name(), rotate.position()))
        }
        EventData::QueryEvent(query_event) => {
            let schema = query_event.schema().into_owned();
            let query = query_event.query().into_owned();
            match parse_table_ddl(&query, &schema) {
                Some(targets) => Step::Ddl {
                    next,
                    schema,
                    query,
                    targets,
                },
                None => Step::Skip,
            }
        }
        EventData::XidEvent(_) => Step::Xid(next),
        EventData::RowsEvent(rows) => decode_rows(&rows, stream, handler)?,
        _ => Step::Skip,
    };

    Ok(step)
}

fn decode_rows(
    data: &RowsEventData<'_>,
    stream: &BinlogStream,
    handler: &dyn EventHandler,
) -> Result<Step> {
    let table_id = data.table_id();
    let tme = stream
        .get_tme(table_id)
        .ok_or_else(|| anyhow!("Rows event for unknown table id {table_id}"))?;

    let db = tme.database_name().into_owned();
    let table = tme.table_name().into_owned();
    if !handler.wants_rows(&db, &table) {
        return Ok(Step::Skip);
    }

    #[allow(unreachable_patterns)]
    let action = match data {
        RowsEventData::WriteRowsEvent(_) | RowsEventData::WriteRowsEventV1(_) => {
            RowAction::Insert
        }
        RowsEventData::UpdateRowsEvent(_)
        | RowsEventData::UpdateRowsEventV1(_)
        | RowsEventData::PartialUpdateRowsEvent(_) => RowAction::Update,
        RowsEventData::DeleteRowsEvent(_) | RowsEventData::DeleteRowsEventV1(_) => {
            RowAction::Delete
        }
        _ => RowAction::Other("unknown rows event".to_string()),
    };

    let mut images = Vec::new();
    for row in data.rows(tme) {
        let (before, after) = row?;
        images.push((before.map(row_values), after.map(row_values)));
    }

    Ok(Step::Rows(RowBatch {
        db,
        table,
        action,
        images,
    }))
}

fn row_values(row: BinlogRow) -> Vec<RowValue> {
    row.unwrap()
        .into_iter()
        .map(|value| match value {
            BinlogValue::Value(value) => from_mysql(value),
            // JSON column images are rendered as text.
            other => RowValue::Text(format!("{other:?}")),
        })
        .collect()
}
