//! The remote book agent, seen from this side of the wire.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::error::RemoteError;

/// One entry of a `/search` result list.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SearchHit {
    #[serde(default = "unknown_book")]
    pub book_id: String,

    #[serde(default)]
    pub content: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub page_number: Option<i64>,
}

fn unknown_book() -> String {
    "Unknown".into()
}

/// The knowledge-bearing agent that owns the conversation threads.
///
/// Each call is a single authenticated attempt; retry policy belongs to
/// the caller.
#[async_trait]
pub trait RemoteAgent: Send + Sync {
    /// Send one user message on `thread_id` and return the agent's reply.
    async fn chat(&self, message: &str, thread_id: &str) -> Result<String, RemoteError>;

    /// Retrieve up to `limit` knowledge passages relevant to `query`.
    async fn search(&self, query: &str, limit: usize) -> Result<Vec<SearchHit>, RemoteError>;
}
