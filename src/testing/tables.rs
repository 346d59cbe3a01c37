use std::collections::HashMap;
use std::sync::Mutex;

use anyhow::Result;
use async_trait::async_trait;
use mysql_binlog_source::{TablePage, TableReader};
use sync_core::RowValue;

/// A `read_page` call made against an [`InMemoryTableReader`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PageRead {
    pub db: String,
    pub table: String,
    pub offset: u64,
    pub limit: u64,
    /// Rows returned
    pub returned: usize,
}

#[derive(Debug, Clone)]
struct Table {
    columns: Vec<String>,
    rows: Vec<Vec<RowValue>>,
}

/// [`TableReader`] over in-memory tables; records every page read.
///
/// Reading a table that was never added fails, like a missing table would.
#[derive(Debug, Default)]
pub struct InMemoryTableReader {
    tables: HashMap<(String, String), Table>,
    reads: Mutex<Vec<PageRead>>,
}

impl InMemoryTableReader {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_table(
        mut self,
        db: &str,
        table: &str,
        columns: &[&str],
        rows: Vec<Vec<RowValue>>,
    ) -> Self {
        self.tables.insert(
            (db.to_string(), table.to_string()),
            Table {
                columns: columns.iter().map(|c| c.to_string()).collect(),
                rows,
            },
        );
        self
    }

    pub fn reads(&self) -> Vec<PageRead> {
        self.reads
            .lock()
            .map(|reads| reads.clone())
            .unwrap_or_default()
    }
}

#[async_trait]
impl TableReader for InMemoryTableReader {
    async fn read_page(
        &self,
        db: &str,
        table: &str,
        offset: u64,
        limit: u64,
    ) -> Result<TablePage> {
        let data = self
            .tables
            .get(&(db.to_string(), table.to_string()))
            .ok_or_else(|| anyhow::anyhow!("Table '{db}.{table}' doesn't exist"))?;

        let rows: Vec<Vec<RowValue>> = data
            .rows
            .iter()
            .skip(offset as usize)
            .take(limit as usize)
            .cloned()
            .collect();

        if let Ok(mut reads) = self.reads.lock() {
            reads.push(PageRead {
                db: db.to_string(),
                table: table.to_string(),
                offset,
                limit,
                returned: rows.len(),
            });
        }

        let columns = if rows.is_empty() {
            Vec::new()
        } else {
            data.columns.clone()
        };
        Ok(TablePage { columns, rows })
    }
}
