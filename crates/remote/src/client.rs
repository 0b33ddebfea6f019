//! HTTP adapter for the book agent's `/chat` and `/search` endpoints.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use knowbridge_config::AppConfig;
use knowbridge_core::error::RemoteError;
use knowbridge_core::remote::{RemoteAgent, SearchHit};
use serde::Deserialize;
use tracing::{debug, warn};

use crate::auth::Authenticator;

/// Authenticated client for the remote book agent.
///
/// Every call makes exactly one attempt. A 401/403 drops the cached
/// identity token so the following call re-acquires one.
pub struct RemoteAgentClient {
    base_url: String,
    client: reqwest::Client,
    auth: Arc<Authenticator>,
}

impl RemoteAgentClient {
    pub fn new(
        base_url: impl Into<String>,
        timeout: Duration,
        auth: Arc<Authenticator>,
    ) -> Result<Self, RemoteError> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| RemoteError::Transport(format!("failed to build HTTP client: {e}")))?;

        Ok(Self {
            base_url: base_url.into().trim_end_matches('/').to_string(),
            client,
            auth,
        })
    }

    pub fn from_config(config: &AppConfig, auth: Arc<Authenticator>) -> Result<Self, RemoteError> {
        Self::new(
            &config.remote.book_agent_url,
            Duration::from_secs(config.remote.timeout_secs),
            auth,
        )
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Send one message; `None` on any failure, with the cause logged.
    pub async fn send(&self, message: &str, thread_id: &str) -> Option<String> {
        match self.chat(message, thread_id).await {
            Ok(reply) => Some(reply),
            Err(e) => {
                warn!(thread_id, error = %e, "Book agent call failed");
                None
            }
        }
    }

    async fn post(&self, path: &str, body: &serde_json::Value) -> Result<reqwest::Response, RemoteError> {
        let credential = self.auth.acquire().await.ok_or(RemoteError::CredentialUnavailable)?;
        let url = format!("{}{}", self.base_url, path);

        debug!(url = %url, token = %credential.redacted(), "Calling book agent");

        let response = self
            .client
            .post(&url)
            .header("Authorization", format!("Bearer {}", credential.token()))
            .header("Content-Type", "application/json")
            .json(body)
            .send()
            .await
            .map_err(map_transport)?;

        let status = response.status().as_u16();
        if status == 401 || status == 403 {
            self.auth.invalidate().await;
        }
        Ok(response)
    }
}

fn map_transport(e: reqwest::Error) -> RemoteError {
    if e.is_timeout() {
        RemoteError::Timeout(e.to_string())
    } else {
        RemoteError::Transport(e.to_string())
    }
}

async fn error_status(response: reqwest::Response) -> RemoteError {
    let status_code = response.status().as_u16();
    let body = response.text().await.unwrap_or_default();
    RemoteError::Status { status_code, body }
}

#[derive(Deserialize)]
struct ChatReply {
    response: String,
}

#[derive(Deserialize)]
struct SearchReply {
    #[serde(default)]
    result: Option<Vec<SearchHit>>,
}

#[async_trait]
impl RemoteAgent for RemoteAgentClient {
    async fn chat(&self, message: &str, thread_id: &str) -> Result<String, RemoteError> {
        let body = serde_json::json!({ "message": message, "thread_id": thread_id });
        let response = self.post("/chat", &body).await?;

        if response.status().as_u16() != 200 {
            return Err(error_status(response).await);
        }

        let reply: ChatReply = response
            .json()
            .await
            .map_err(|e| RemoteError::MalformedResponse(e.to_string()))?;
        Ok(reply.response)
    }

    async fn search(&self, query: &str, limit: usize) -> Result<Vec<SearchHit>, RemoteError> {
        let body = serde_json::json!({ "query": query, "limit": limit });
        let response = self.post("/search", &body).await?;

        if !response.status().is_success() {
            return Err(error_status(response).await);
        }

        let reply: SearchReply = response
            .json()
            .await
            .map_err(|e| RemoteError::MalformedResponse(e.to_string()))?;
        Ok(reply.result.unwrap_or_default())
    }
}
