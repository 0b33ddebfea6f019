//! Authenticated access to the remote book agent.
//!
//! - [`auth`] acquires identity tokens (supplied, metadata server, gcloud)
//!   and caches them for their validity window.
//! - [`client`] performs the `/chat` and `/search` calls with those tokens.

pub mod auth;
pub mod client;

pub use auth::{Authenticator, GcloudProvider, MetadataServerProvider};
pub use client::RemoteAgentClient;
