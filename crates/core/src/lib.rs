//! # Knowbridge Core
//!
//! Domain types, traits, and error definitions for the Knowbridge
//! conversational proxy. This crate has **no transport dependencies**: it
//! defines the model that the remote client, the session orchestrator,
//! and the knowledge-augmented responder are written against.
//!
//! ## Seams
//!
//! Every external collaborator is a trait here:
//! - [`RemoteAgent`] : the remote book agent (`/chat`, `/search`)
//! - [`CredentialProvider`] : a source of identity tokens
//! - [`Provider`] : a language-model backend
//! - [`Tool`] : a capability the reasoning loop may invoke
//!
//! Implementations live in their own crates, and tests substitute
//! scripted versions of each.

pub mod credential;
pub mod error;
pub mod message;
pub mod provider;
pub mod remote;
pub mod session;
pub mod tool;

// Re-export key types at crate root for ergonomics
pub use credential::{AuthCredential, CredentialProvider};
pub use error::{CredentialError, Error, ProviderError, RemoteError, ToolError};
pub use message::{Message, MessageToolCall, Role, ThreadId};
pub use provider::{Provider, ProviderRequest, ProviderResponse, ToolDefinition, Usage};
pub use remote::{RemoteAgent, SearchHit};
pub use session::{ChatResponse, SessionInfo};
pub use tool::{Tool, ToolCall, ToolRegistry, ToolResult};
