//! Identity credentials and the sources that produce them.

use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};

use crate::error::CredentialError;

/// Characters of a token that may appear in diagnostics.
pub const TOKEN_PREFIX_LEN: usize = 20;

/// A bearer identity token plus its validity window.
#[derive(Clone, PartialEq, Eq)]
pub struct AuthCredential {
    token: String,
    expires_at: Option<DateTime<Utc>>,
    source: String,
}

impl AuthCredential {
    pub fn new(token: impl Into<String>, source: impl Into<String>) -> Self {
        Self {
            token: token.into(),
            expires_at: None,
            source: source.into(),
        }
    }

    pub fn with_expiry(mut self, expires_at: DateTime<Utc>) -> Self {
        self.expires_at = Some(expires_at);
        self
    }

    /// The raw token. Only for building the `Authorization` header.
    pub fn token(&self) -> &str {
        &self.token
    }

    pub fn expires_at(&self) -> Option<DateTime<Utc>> {
        self.expires_at
    }

    /// Which provider produced this credential (e.g. "gcloud").
    pub fn source(&self) -> &str {
        &self.source
    }

    /// Whether the credential is unusable at `now`, treating it as expired
    /// `skew` before its actual expiry. Credentials without an expiry never
    /// expire.
    pub fn is_expired_at(&self, now: DateTime<Utc>, skew: Duration) -> bool {
        self.expires_at
            .is_some_and(|exp| now.checked_add_signed(skew).is_none_or(|deadline| deadline >= exp))
    }

    /// Truncated token for logs: the first 20 characters followed by `...`.
    pub fn redacted(&self) -> String {
        let prefix: String = self.token.chars().take(TOKEN_PREFIX_LEN).collect();
        format!("{prefix}...")
    }
}

impl std::fmt::Debug for AuthCredential {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AuthCredential")
            .field("token", &self.redacted())
            .field("expires_at", &self.expires_at)
            .field("source", &self.source)
            .finish()
    }
}

/// A source of identity tokens (metadata server, CLI, static value).
#[async_trait]
pub trait CredentialProvider: Send + Sync {
    fn name(&self) -> &str;

    /// Obtain a fresh credential. Called only when no usable cached
    /// credential exists.
    async fn fetch(&self) -> std::result::Result<AuthCredential, CredentialError>;
}
