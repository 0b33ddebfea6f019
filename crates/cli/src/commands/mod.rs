pub mod agent;
pub mod auth;
pub mod chat;
pub mod repl;
pub mod search;
pub mod serve;

use std::path::Path;
use std::sync::Arc;

use knowbridge_config::AppConfig;
use knowbridge_remote::{Authenticator, RemoteAgentClient};
use tracing::debug;

/// Load config from `path` (or the default location) plus the environment.
pub fn load_config(path: Option<&Path>) -> Result<AppConfig, Box<dyn std::error::Error>> {
    let config = match path {
        Some(path) => AppConfig::load_with_env(path),
        None => AppConfig::load(),
    }
    .map_err(|e| format!("Failed to load config: {e}"))?;
    debug!(
        book_agent = %config.remote.book_agent_url,
        auth_source = ?config.auth.source,
        "Config loaded"
    );
    Ok(config)
}

/// The authenticated book-agent client every command shares.
pub fn remote_client(config: &AppConfig) -> Result<Arc<RemoteAgentClient>, Box<dyn std::error::Error>> {
    let auth = Arc::new(Authenticator::from_config(config)?);
    Ok(Arc::new(RemoteAgentClient::from_config(config, auth)?))
}
