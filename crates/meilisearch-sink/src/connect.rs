use std::time::Duration;

use crate::MeilisearchSink;

/// Meilisearch connection options
#[derive(Clone)]
pub struct MeilisearchOpts {
    pub host: String,
    pub api_key: Option<String>,
}

impl std::fmt::Debug for MeilisearchOpts {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MeilisearchOpts")
            .field("host", &self.host)
            .field("api_key", &self.api_key.as_ref().map(|_| "[REDACTED]"))
            .finish()
    }
}

/// Default number of connection retry attempts
const DEFAULT_RETRY_ATTEMPTS: u32 = 5;
/// Default delay between retry attempts in seconds
const DEFAULT_RETRY_DELAY_SECS: u64 = 2;

pub async fn meilisearch_connect(opts: &MeilisearchOpts) -> anyhow::Result<MeilisearchSink> {
    meilisearch_connect_with_retries(opts, DEFAULT_RETRY_ATTEMPTS, DEFAULT_RETRY_DELAY_SECS).await
}

/// Connect to Meilisearch with configurable retries.
///
/// Only the initial health check is retried, to ride out a server that is
/// still starting. Writes made through the returned sink are never retried.
pub async fn meilisearch_connect_with_retries(
    opts: &MeilisearchOpts,
    max_retries: u32,
    retry_delay_secs: u64,
) -> anyhow::Result<MeilisearchSink> {
    let sink = MeilisearchSink::new(opts)?;

    tracing::debug!("Connecting to Meilisearch at {}", opts.host);

    let mut last_error = None;

    for attempt in 1..=max_retries {
        match sink.health().await {
            Ok(()) => {
                if attempt > 1 {
                    tracing::info!(
                        "Successfully connected to Meilisearch after {} attempts",
                        attempt
                    );
                }
                return Ok(sink);
            }
            Err(e) => {
                if attempt < max_retries {
                    tracing::warn!(
                        "Failed to reach Meilisearch at '{}' (attempt {}/{}): {}. Retrying in {}s...",
                        opts.host,
                        attempt,
                        max_retries,
                        e,
                        retry_delay_secs
                    );
                    tokio::time::sleep(Duration::from_secs(retry_delay_secs)).await;
                }
                last_error = Some(e);
            }
        }
    }

    let last_error = last_error.map(|e| e.to_string()).unwrap_or_default();
    Err(anyhow::anyhow!(
        "Failed to connect to Meilisearch at '{}' after {} attempts. Last error: {}",
        opts.host,
        max_retries,
        last_error
    ))
}
