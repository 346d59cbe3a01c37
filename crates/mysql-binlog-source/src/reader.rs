//! Paged table reads for the initial backfill.

use anyhow::Result;
use async_trait::async_trait;
use mysql_async::prelude::Queryable;
use mysql_async::{Pool, Row};
use sync_core::RowValue;

use crate::value::from_column;

/// One page of a table, rows in server order.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TablePage {
    /// Column names of the result set. Empty when `rows` is empty.
    pub columns: Vec<String>,
    pub rows: Vec<Vec<RowValue>>,
}

impl TablePage {
    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }
}

/// Reads a table page by page.
#[async_trait]
pub trait TableReader: Send + Sync {
    async fn read_page(&self, db: &str, table: &str, offset: u64, limit: u64)
        -> Result<TablePage>;
}

#[async_trait]
impl<T: TableReader + ?Sized> TableReader for &T {
    async fn read_page(
        &self,
        db: &str,
        table: &str,
        offset: u64,
        limit: u64,
    ) -> Result<TablePage> {
        (**self).read_page(db, table, offset, limit).await
    }
}

#[async_trait]
impl<T: TableReader + ?Sized> TableReader for std::sync::Arc<T> {
    async fn read_page(
        &self,
        db: &str,
        table: &str,
        offset: u64,
        limit: u64,
    ) -> Result<TablePage> {
        (**self).read_page(db, table, offset, limit).await
    }
}

/// [`TableReader`] issuing `SELECT * ... LIMIT offset, limit` against MySQL.
///
/// The page is read as a prepared statement so the server returns typed
/// values, matching what the binlog carries for the same row.
///
/// Pages are not taken from a consistent snapshot; rows inserted or deleted
/// while paging can shift later pages.
pub struct MySQLTableReader {
    pool: Pool,
}

impl MySQLTableReader {
    pub fn new(pool: Pool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl TableReader for MySQLTableReader {
    async fn read_page(
        &self,
        db: &str,
        table: &str,
        offset: u64,
        limit: u64,
    ) -> Result<TablePage> {
        let mut conn = self.pool.get_conn().await?;
        let query = format!(
            "SELECT * FROM {}.{} LIMIT {offset}, {limit}",
            quote_identifier(db),
            quote_identifier(table)
        );
        let rows: Vec<Row> = conn.exec(query, ()).await?;

        let columns = rows
            .first()
            .map(|row| {
                row.columns_ref()
                    .iter()
                    .map(|column| column.name_str().into_owned())
                    .collect()
            })
            .unwrap_or_default();

        let rows = rows
            .into_iter()
            .map(|row| {
                let columns = row.columns();
                row.unwrap()
                    .into_iter()
                    .zip(columns.iter())
                    .map(|(value, column)| {
                        from_column(value, column.column_type(), column.flags())
                    })
                    .collect()
            })
            .collect();

        Ok(TablePage { columns, rows })
    }
}

/// Backquote an identifier, doubling embedded backquotes.
pub(crate) fn quote_identifier(name: &str) -> String {
    format!("`{}`", name.replace('`', "``"))
}
