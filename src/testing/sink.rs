use std::sync::Mutex;

use anyhow::Result;
use async_trait::async_trait;
use index_sink::IndexSink;
use sync_core::Document;

/// One call received by a [`RecordingSink`].
#[derive(Debug, Clone, PartialEq)]
pub enum SinkCall {
    CreateIndex {
        index: String,
        primary_key: String,
    },
    ConfigureFilterableAttributes {
        index: String,
        fields: Vec<String>,
    },
    CreateDocuments {
        index: String,
        documents: Vec<Document>,
        primary_key: String,
    },
    UpdateDocument {
        index: String,
        primary_key: String,
        document: Document,
    },
    DeleteDocument {
        index: String,
        identifier: String,
    },
}

/// In-memory [`IndexSink`] that records every call in order.
///
/// A failing sink still records the call, then returns an error.
#[derive(Debug, Default)]
pub struct RecordingSink {
    calls: Mutex<Vec<SinkCall>>,
    failure: Option<String>,
}

impl RecordingSink {
    pub fn new() -> Self {
        Self::default()
    }

    /// A sink that rejects every call with `message`.
    pub fn failing(message: impl Into<String>) -> Self {
        Self {
            calls: Mutex::new(Vec::new()),
            failure: Some(message.into()),
        }
    }

    pub fn calls(&self) -> Vec<SinkCall> {
        self.calls
            .lock()
            .map(|calls| calls.clone())
            .unwrap_or_default()
    }

    fn record(&self, call: SinkCall) -> Result<()> {
        if let Ok(mut calls) = self.calls.lock() {
            calls.push(call);
        }
        match &self.failure {
            Some(message) => Err(anyhow::anyhow!("{message}")),
            None => Ok(()),
        }
    }
}

#[async_trait]
impl IndexSink for RecordingSink {
    async fn create_index(&self, index: &str, primary_key: &str) -> Result<()> {
        self.record(SinkCall::CreateIndex {
            index: index.to_string(),
            primary_key: primary_key.to_string(),
        })
    }

    async fn configure_filterable_attributes(&self, index: &str, fields: &[String]) -> Result<()> {
        self.record(SinkCall::ConfigureFilterableAttributes {
            index: index.to_string(),
            fields: fields.to_vec(),
        })
    }

    async fn create_documents(
        &self,
        index: &str,
        documents: &[Document],
        primary_key: &str,
    ) -> Result<()> {
        self.record(SinkCall::CreateDocuments {
            index: index.to_string(),
            documents: documents.to_vec(),
            primary_key: primary_key.to_string(),
        })
    }

    async fn update_document(
        &self,
        index: &str,
        primary_key: &str,
        document: &Document,
    ) -> Result<()> {
        self.record(SinkCall::UpdateDocument {
            index: index.to_string(),
            primary_key: primary_key.to_string(),
            document: document.clone(),
        })
    }

    async fn delete_document(&self, index: &str, identifier: &str) -> Result<()> {
        self.record(SinkCall::DeleteDocument {
            index: index.to_string(),
            identifier: identifier.to_string(),
        })
    }
}
