//! IndexSink trait definition.
//!
//! This trait abstracts over the document index, allowing the router and
//! the backfill to be written once against a single interface.

use anyhow::Result;
use sync_core::Document;

/// Trait for writing documents to a search index.
///
/// Every operation is asynchronous on the index side. `Ok(())` means the
/// index accepted the request, not that it has been applied; callers never
/// poll for completion, so a failure after acceptance is not visible here.
///
/// # Usage Pattern
///
/// Callers use generics for static dispatch:
///
/// ```ignore
/// pub async fn backfill<S: IndexSink>(sink: &S, docs: &[Document]) -> Result<()> {
///     sink.create_documents("products", docs, "id").await
/// }
/// ```
#[async_trait::async_trait]
pub trait IndexSink: Send + Sync {
    /// Create an index with the given primary key field.
    async fn create_index(&self, index: &str, primary_key: &str) -> Result<()>;

    /// Replace the set of filterable attributes of an index.
    async fn configure_filterable_attributes(
        &self,
        index: &str,
        fields: &[String],
    ) -> Result<()>;

    /// Add documents (one or a batch), replacing any with the same key.
    async fn create_documents(
        &self,
        index: &str,
        documents: &[Document],
        primary_key: &str,
    ) -> Result<()>;

    /// Insert or update a single document keyed by `primary_key`.
    async fn update_document(
        &self,
        index: &str,
        primary_key: &str,
        document: &Document,
    ) -> Result<()>;

    /// Delete the document with the given identifier.
    async fn delete_document(&self, index: &str, identifier: &str) -> Result<()>;
}

#[async_trait::async_trait]
impl<S: IndexSink + ?Sized> IndexSink for std::sync::Arc<S> {
    async fn create_index(&self, index: &str, primary_key: &str) -> Result<()> {
        (**self).create_index(index, primary_key).await
    }

    async fn configure_filterable_attributes(
        &self,
        index: &str,
        fields: &[String],
    ) -> Result<()> {
        (**self).configure_filterable_attributes(index, fields).await
    }

    async fn create_documents(
        &self,
        index: &str,
        documents: &[Document],
        primary_key: &str,
    ) -> Result<()> {
        (**self).create_documents(index, documents, primary_key).await
    }

    async fn update_document(
        &self,
        index: &str,
        primary_key: &str,
        document: &Document,
    ) -> Result<()> {
        (**self).update_document(index, primary_key, document).await
    }

    async fn delete_document(&self, index: &str, identifier: &str) -> Result<()> {
        (**self).delete_document(index, identifier).await
    }
}
