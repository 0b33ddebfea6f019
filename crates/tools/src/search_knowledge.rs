//! Knowledge base search, backed by the book agent's `/search` endpoint.

use std::sync::Arc;

use async_trait::async_trait;
use knowbridge_core::error::ToolError;
use knowbridge_core::remote::{RemoteAgent, SearchHit};
use knowbridge_core::tool::{Tool, ToolResult};
use tracing::{debug, warn};

pub const DEFAULT_SEARCH_LIMIT: usize = 3;

const NO_RESULTS: &str = "No relevant insights found in the knowledge base.";

pub struct SearchKnowledgeTool {
    agent: Arc<dyn RemoteAgent>,
    limit: usize,
}

impl SearchKnowledgeTool {
    pub fn new(agent: Arc<dyn RemoteAgent>) -> Self {
        Self {
            agent,
            limit: DEFAULT_SEARCH_LIMIT,
        }
    }

    pub fn with_limit(mut self, limit: usize) -> Self {
        self.limit = limit;
        self
    }

    /// Run a search and render it as text for the model.
    ///
    /// Never fails: remote errors come back as an inline error message so
    /// the model can carry on without the knowledge base.
    pub async fn search(&self, query: &str) -> String {
        match self.agent.search(query, self.limit).await {
            Ok(hits) => {
                debug!(query, hits = hits.len(), "Knowledge search complete");
                format_results(&hits)
            }
            Err(e) => {
                warn!(query, error = %e, "Knowledge search failed");
                format!("Error searching knowledge base: {e}")
            }
        }
    }
}

/// Render search hits one per paragraph, citing book and page.
pub fn format_results(hits: &[SearchHit]) -> String {
    if hits.is_empty() {
        return NO_RESULTS.to_string();
    }

    hits.iter()
        .map(|hit| match hit.page_number {
            Some(page) if page != 0 => format!("From {} (page {}): {}", hit.book_id, page, hit.content),
            _ => format!("From {}: {}", hit.book_id, hit.content),
        })
        .collect::<Vec<_>>()
        .join("\n\n")
}

#[async_trait]
impl Tool for SearchKnowledgeTool {
    fn name(&self) -> &str {
        "search_knowledge"
    }

    fn description(&self) -> &str {
        "Search the knowledge base for relevant insights and information."
    }

    fn parameters_schema(&self) -> serde_json::Value {
        serde_json::json!({
            "type": "object",
            "properties": {
                "query": {
                    "type": "string",
                    "description": "Concepts, themes or ideas to look for"
                }
            },
            "required": ["query"]
        })
    }

    async fn execute(&self, arguments: serde_json::Value) -> Result<ToolResult, ToolError> {
        let query = arguments["query"]
            .as_str()
            .ok_or_else(|| ToolError::InvalidArguments("Missing 'query' argument".into()))?;

        Ok(ToolResult {
            call_id: String::new(),
            success: true,
            output: self.search(query).await,
        })
    }
}
