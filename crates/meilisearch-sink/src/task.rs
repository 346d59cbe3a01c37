//! Meilisearch response bodies.

use serde::Deserialize;

/// Summary returned for every asynchronous operation.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TaskInfo {
    pub task_uid: u64,
    #[serde(default)]
    pub index_uid: Option<String>,
    #[serde(default)]
    pub status: String,
    #[serde(rename = "type", default)]
    pub task_type: String,
    #[serde(default)]
    pub enqueued_at: Option<String>,
}

/// Error body returned by Meilisearch on a rejected request.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct MeilisearchError {
    #[serde(default)]
    pub message: String,
    #[serde(default)]
    pub code: String,
    #[serde(rename = "type", default)]
    pub error_type: String,
}

impl std::fmt::Display for MeilisearchError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} ({})", self.message, self.code)
    }
}
