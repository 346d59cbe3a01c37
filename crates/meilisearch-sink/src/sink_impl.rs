//! Implementation of IndexSink trait for Meilisearch.

use std::time::Duration;

use anyhow::{anyhow, Result};
use index_sink::IndexSink;
use reqwest::{Client, Method, RequestBuilder, Response, Url};
use sync_core::Document;
use tracing::debug;

use crate::{MeilisearchError, MeilisearchOpts, TaskInfo};

/// HTTP client for one Meilisearch server that implements IndexSink.
#[derive(Clone)]
pub struct MeilisearchSink {
    client: Client,
    base: Url,
    api_key: Option<String>,
}

impl MeilisearchSink {
    /// Create a sink without contacting the server.
    pub fn new(opts: &MeilisearchOpts) -> Result<Self> {
        let base = Url::parse(&opts.host)
            .map_err(|e| anyhow!("Invalid Meilisearch host '{}': {e}", opts.host))?;
        if base.cannot_be_a_base() {
            anyhow::bail!("Invalid Meilisearch host '{}': not an HTTP URL", opts.host);
        }

        let client = Client::builder()
            .connect_timeout(Duration::from_secs(10))
            .build()?;

        Ok(Self {
            client,
            base,
            api_key: opts.api_key.clone().filter(|key| !key.is_empty()),
        })
    }

    /// Check that the server answers `GET /health`.
    pub async fn health(&self) -> Result<()> {
        let response = self
            .request(Method::GET, self.url(&["health"]))
            .send()
            .await?;
        if !response.status().is_success() {
            anyhow::bail!("Meilisearch health check returned {}", response.status());
        }
        Ok(())
    }

    fn url(&self, segments: &[&str]) -> Url {
        let mut url = self.base.clone();
        if let Ok(mut path) = url.path_segments_mut() {
            path.pop_if_empty().extend(segments);
        }
        url
    }

    fn documents_url(&self, index: &str, primary_key: &str) -> Url {
        let mut url = self.url(&["indexes", index, "documents"]);
        url.query_pairs_mut().append_pair("primaryKey", primary_key);
        url
    }

    fn request(&self, method: Method, url: Url) -> RequestBuilder {
        let builder = self.client.request(method, url);
        match &self.api_key {
            Some(key) => builder.bearer_auth(key),
            None => builder,
        }
    }

    async fn send(&self, operation: &str, index: &str, builder: RequestBuilder) -> Result<Response> {
        builder
            .send()
            .await
            .map_err(|e| anyhow!("Meilisearch {operation} request for index '{index}' failed: {e}"))
    }

    /// Turn a response into the accepted task, or an error carrying the
    /// status and the Meilisearch error body.
    async fn accept(&self, operation: &str, index: &str, response: Response) -> Result<TaskInfo> {
        let status = response.status();
        if !status.is_success() {
            let error = read_error(response).await;
            anyhow::bail!("Meilisearch rejected {operation} on index '{index}' with {status}: {error}");
        }

        let task: TaskInfo = response.json().await.map_err(|e| {
            anyhow!("Invalid Meilisearch response to {operation} on index '{index}': {e}")
        })?;

        debug!(
            "Meilisearch accepted {} on index '{}': task {} status={} type={} enqueued_at={}",
            operation,
            task.index_uid.as_deref().unwrap_or(index),
            task.task_uid,
            task.status,
            task.task_type,
            task.enqueued_at.as_deref().unwrap_or("-")
        );

        Ok(task)
    }
}

async fn read_error(response: Response) -> MeilisearchError {
    let body = response.text().await.unwrap_or_default();
    serde_json::from_str(&body).unwrap_or(MeilisearchError {
        message: body,
        ..Default::default()
    })
}

#[async_trait::async_trait]
impl IndexSink for MeilisearchSink {
    async fn create_index(&self, index: &str, primary_key: &str) -> Result<()> {
        let body = serde_json::json!({ "uid": index, "primaryKey": primary_key });
        let builder = self
            .request(Method::POST, self.url(&["indexes"]))
            .json(&body);
        let response = self.send("create index", index, builder).await?;

        // An existing index is still accepted (202); the conflict only shows
        // up in the task, which is never polled.
        self.accept("create index", index, response).await?;
        Ok(())
    }

    async fn configure_filterable_attributes(
        &self,
        index: &str,
        fields: &[String],
    ) -> Result<()> {
        let url = self.url(&["indexes", index, "settings", "filterable-attributes"]);
        let builder = self.request(Method::PUT, url).json(fields);
        let response = self
            .send("update filterable attributes", index, builder)
            .await?;
        self.accept("update filterable attributes", index, response)
            .await?;
        Ok(())
    }

    async fn create_documents(
        &self,
        index: &str,
        documents: &[Document],
        primary_key: &str,
    ) -> Result<()> {
        let body: Vec<serde_json::Value> = documents.iter().map(Document::body).collect();
        let builder = self
            .request(Method::POST, self.documents_url(index, primary_key))
            .json(&body);
        let response = self.send("add documents", index, builder).await?;
        self.accept("add documents", index, response).await?;
        Ok(())
    }

    async fn update_document(
        &self,
        index: &str,
        primary_key: &str,
        document: &Document,
    ) -> Result<()> {
        let body = vec![document.body()];
        let builder = self
            .request(Method::PUT, self.documents_url(index, primary_key))
            .json(&body);
        let response = self.send("update documents", index, builder).await?;
        self.accept("update documents", index, response).await?;
        Ok(())
    }

    async fn delete_document(&self, index: &str, identifier: &str) -> Result<()> {
        let url = self.url(&["indexes", index, "documents", identifier]);
        let builder = self.request(Method::DELETE, url);
        let response = self.send("delete document", index, builder).await?;
        self.accept("delete document", index, response).await?;
        Ok(())
    }
}
