//! One-time backfill of configured tables into their indexes.
//!
//! Tables are read with offset pagination and every page goes to the sink
//! as a single batch. Reads are not isolated from concurrent writes; rows
//! changed during the backfill are corrected by the binlog stream that
//! starts from the head position taken before it.

use anyhow::{Context, Result};
use index_sink::IndexSink;
use mysql_binlog_source::TableReader;
use sync_core::{Document, SyncRule, SyncRules};
use tracing::{debug, info};

use crate::row_mapper::row_to_document;

/// Rows per page when none is configured.
pub const DEFAULT_PAGE_SIZE: u64 = 1000;

/// Rows written per rule, in the order the rules ran.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FullSyncStats {
    pub tables: Vec<TableSyncStats>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TableSyncStats {
    pub db: String,
    pub table: String,
    pub index: String,
    pub rows: u64,
}

impl FullSyncStats {
    pub fn total_rows(&self) -> u64 {
        self.tables.iter().map(|t| t.rows).sum()
    }
}

pub struct FullSyncer<R, S> {
    reader: R,
    sink: S,
    page_size: u64,
}

impl<R: TableReader, S: IndexSink> FullSyncer<R, S> {
    /// A zero `page_size` falls back to [`DEFAULT_PAGE_SIZE`].
    pub fn new(reader: R, sink: S, page_size: u64) -> Self {
        let page_size = if page_size == 0 {
            DEFAULT_PAGE_SIZE
        } else {
            page_size
        };
        Self {
            reader,
            sink,
            page_size,
        }
    }

    /// Copy one table into its index. Returns the number of rows written.
    ///
    /// Paging stops at an empty page, or at a page shorter than the page
    /// size since nothing can follow it.
    pub async fn sync_rule(&self, rule: &SyncRule) -> Result<u64> {
        info!(
            "Starting full sync of {}.{} into index '{}'",
            rule.source_db, rule.source_table, rule.target_index
        );

        let mut offset = 0u64;
        loop {
            let page = self
                .reader
                .read_page(&rule.source_db, &rule.source_table, offset, self.page_size)
                .await
                .with_context(|| {
                    format!(
                        "Failed to read {}.{} at offset {}",
                        rule.source_db, rule.source_table, offset
                    )
                })?;

            if page.is_empty() {
                break;
            }

            let documents: Vec<Document> = page
                .rows
                .iter()
                .map(|row| {
                    row_to_document(
                        &rule.target_index,
                        &rule.primary_key_column,
                        &page.columns,
                        row,
                    )
                })
                .collect();

            self.sink
                .create_documents(&rule.target_index, &documents, &rule.primary_key_column)
                .await
                .with_context(|| {
                    format!(
                        "Failed to write {} documents to index '{}'",
                        documents.len(),
                        rule.target_index
                    )
                })?;

            let fetched = page.len() as u64;
            offset += fetched;
            debug!(
                "Copied {} rows of {}.{} ({} so far)",
                fetched, rule.source_db, rule.source_table, offset
            );

            if fetched < self.page_size {
                break;
            }
        }

        info!(
            "Migrated {} records from table {}.{}",
            offset, rule.source_db, rule.source_table
        );
        Ok(offset)
    }

    /// Backfill every rule in configuration order, stopping at the first
    /// failure.
    pub async fn sync_all(&self, rules: &SyncRules) -> Result<FullSyncStats> {
        let mut stats = FullSyncStats::default();
        for rule in rules.iter() {
            let rows = self.sync_rule(rule).await?;
            stats.tables.push(TableSyncStats {
                db: rule.source_db.clone(),
                table: rule.source_table.clone(),
                index: rule.target_index.clone(),
                rows,
            });
        }

        info!(
            "Full sync completed: {} total records across {} tables",
            stats.total_rows(),
            stats.tables.len()
        );
        Ok(stats)
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use sync_core::RowValue;

    use super::*;
    use crate::testing::{InMemoryTableReader, RecordingSink, SinkCall};

    fn rows(count: usize) -> Vec<Vec<RowValue>> {
        (0..count)
            .map(|i| vec![RowValue::Int(i as i64), RowValue::from(format!("item-{i}"))])
            .collect()
    }

    fn products_rule() -> SyncRule {
        SyncRule::new("shop", "products", "products", "id", Vec::<String>::new())
    }

    #[tokio::test]
    async fn test_2500_rows_take_three_pages() {
        let reader = InMemoryTableReader::new().with_table(
            "shop",
            "products",
            &["id", "name"],
            rows(2500),
        );
        let sink = Arc::new(RecordingSink::new());
        let syncer = FullSyncer::new(reader, sink.clone(), DEFAULT_PAGE_SIZE);

        let copied = syncer.sync_rule(&products_rule()).await.unwrap();
        assert_eq!(copied, 2500);

        let reads: Vec<(u64, usize)> = syncer
            .reader
            .reads()
            .iter()
            .map(|r| (r.offset, r.returned))
            .collect();
        assert_eq!(reads, vec![(0, 1000), (1000, 1000), (2000, 500)]);

        let batches: Vec<usize> = sink
            .calls()
            .iter()
            .map(|call| match call {
                SinkCall::CreateDocuments { documents, .. } => documents.len(),
                other => panic!("unexpected call {other:?}"),
            })
            .collect();
        assert_eq!(batches, vec![1000, 1000, 500]);
    }

    #[tokio::test]
    async fn test_exact_multiple_stops_at_empty_page() {
        let reader = InMemoryTableReader::new().with_table(
            "shop",
            "products",
            &["id", "name"],
            rows(4),
        );
        let sink = Arc::new(RecordingSink::new());
        let syncer = FullSyncer::new(reader, sink.clone(), 2);

        assert_eq!(syncer.sync_rule(&products_rule()).await.unwrap(), 4);
        assert_eq!(syncer.reader.reads().len(), 3);
        assert_eq!(sink.calls().len(), 2);
    }

    #[tokio::test]
    async fn test_empty_table_writes_nothing() {
        let reader =
            InMemoryTableReader::new().with_table("shop", "products", &["id", "name"], vec![]);
        let sink = Arc::new(RecordingSink::new());
        let syncer = FullSyncer::new(reader, sink.clone(), DEFAULT_PAGE_SIZE);

        assert_eq!(syncer.sync_rule(&products_rule()).await.unwrap(), 0);
        assert!(sink.calls().is_empty());
    }

    #[tokio::test]
    async fn test_documents_are_zipped_with_page_columns() {
        let reader = InMemoryTableReader::new().with_table(
            "shop",
            "products",
            &["id", "name"],
            rows(1),
        );
        let sink = Arc::new(RecordingSink::new());
        let syncer = FullSyncer::new(reader, sink.clone(), DEFAULT_PAGE_SIZE);
        syncer.sync_rule(&products_rule()).await.unwrap();

        let calls = sink.calls();
        let SinkCall::CreateDocuments {
            index,
            documents,
            primary_key,
        } = &calls[0]
        else {
            panic!("expected create_documents");
        };
        assert_eq!(index, "products");
        assert_eq!(primary_key, "id");
        assert_eq!(
            documents[0].body(),
            serde_json::json!({"id": 0, "name": "item-0"})
        );
    }

    #[tokio::test]
    async fn test_read_failure_aborts() {
        let sink = Arc::new(RecordingSink::new());
        let syncer = FullSyncer::new(InMemoryTableReader::new(), sink.clone(), DEFAULT_PAGE_SIZE);

        let err = syncer.sync_rule(&products_rule()).await.unwrap_err();
        assert!(format!("{err:#}").contains("shop.products"));
        assert!(sink.calls().is_empty());
    }

    #[tokio::test]
    async fn test_batch_failure_aborts_after_first_page() {
        let reader = InMemoryTableReader::new().with_table(
            "shop",
            "products",
            &["id", "name"],
            rows(2500),
        );
        let sink = Arc::new(RecordingSink::failing("disk full"));
        let syncer = FullSyncer::new(reader, sink.clone(), DEFAULT_PAGE_SIZE);

        let err = syncer.sync_rule(&products_rule()).await.unwrap_err();
        assert!(format!("{err:#}").contains("disk full"));
        assert_eq!(syncer.reader.reads().len(), 1);
    }

    #[tokio::test]
    async fn test_sync_all_runs_rules_in_order() {
        let reader = InMemoryTableReader::new()
            .with_table("shop", "products", &["id", "name"], rows(3))
            .with_table("shop", "users", &["id", "name"], rows(2));
        let sink = Arc::new(RecordingSink::new());
        let syncer = FullSyncer::new(reader, sink.clone(), DEFAULT_PAGE_SIZE);

        let rules = SyncRules::new(vec![
            SyncRule::new("shop", "users", "users", "id", Vec::<String>::new()),
            products_rule(),
        ]);
        let stats = syncer.sync_all(&rules).await.unwrap();

        let order: Vec<(&str, u64)> = stats
            .tables
            .iter()
            .map(|t| (t.table.as_str(), t.rows))
            .collect();
        assert_eq!(order, vec![("users", 2), ("products", 3)]);
        assert_eq!(stats.total_rows(), 5);
    }
}
