//! Error types for the Knowbridge domain.
//!
//! Uses `thiserror` for ergonomic error definitions.
//! Each bounded context has its own error enum; the conversational path
//! converts them into absence values or sentinel strings at its edges.

use thiserror::Error;

/// The top-level error type for all Knowbridge operations.
#[derive(Debug, Error)]
pub enum Error {
    // --- Remote agent errors ---
    #[error("Remote agent error: {0}")]
    Remote(#[from] RemoteError),

    // --- Credential errors ---
    #[error("Credential error: {0}")]
    Credential(#[from] CredentialError),

    // --- Language model errors ---
    #[error("Provider error: {0}")]
    Provider(#[from] ProviderError),

    // --- Tool errors ---
    #[error("Tool error: {0}")]
    Tool(#[from] ToolError),
}

// --- Bounded context errors ---

/// Failures talking to the remote book agent.
#[derive(Debug, Clone, Error)]
pub enum RemoteError {
    #[error("No credential available for the remote agent")]
    CredentialUnavailable,

    #[error("Network error: {0}")]
    Transport(String),

    #[error("Request timed out: {0}")]
    Timeout(String),

    #[error("Remote agent returned status {status_code}: {body}")]
    Status { status_code: u16, body: String },

    #[error("Malformed response: {0}")]
    MalformedResponse(String),
}

/// Failures obtaining an identity token.
#[derive(Debug, Clone, Error)]
pub enum CredentialError {
    #[error("Credential source unavailable: {0}")]
    Unavailable(String),

    #[error("`{command}` failed: {reason}")]
    CommandFailed { command: String, reason: String },

    #[error("Metadata server error: {0}")]
    Metadata(String),

    #[error("Invalid token: {0}")]
    InvalidToken(String),

    #[error("Invalid token lifetime settings: {0}")]
    Lifetime(String),
}

#[derive(Debug, Clone, Error)]
pub enum ProviderError {
    #[error("API request failed: {message} (status: {status_code})")]
    ApiError {
        status_code: u16,
        message: String,
    },

    #[error("Rate limited by provider, retry after {retry_after_secs}s")]
    RateLimited { retry_after_secs: u64 },

    #[error("Authentication failed: {0}")]
    AuthenticationFailed(String),

    #[error("Provider not configured: {0}")]
    NotConfigured(String),

    #[error("Request timed out: {0}")]
    Timeout(String),

    #[error("Network error: {0}")]
    Network(String),
}

#[derive(Debug, Error)]
pub enum ToolError {
    #[error("Tool not found: {0}")]
    NotFound(String),

    #[error("Invalid tool arguments: {0}")]
    InvalidArguments(String),
}
