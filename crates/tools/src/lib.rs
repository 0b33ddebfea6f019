//! Tool implementations for the Knowbridge responder.
//!
//! The reasoning loop has one capability: searching the book agent's
//! knowledge base for passages relevant to the conversation.

pub mod search_knowledge;

use std::sync::Arc;

use knowbridge_core::remote::RemoteAgent;
use knowbridge_core::tool::ToolRegistry;

pub use search_knowledge::{DEFAULT_SEARCH_LIMIT, SearchKnowledgeTool, format_results};

/// Create the responder's tool registry, backed by `agent`.
pub fn default_registry(agent: Arc<dyn RemoteAgent>, search_limit: usize) -> ToolRegistry {
    let mut registry = ToolRegistry::new();
    registry.register(Box::new(SearchKnowledgeTool::new(agent).with_limit(search_limit)));
    registry
}
