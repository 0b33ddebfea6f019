//! Identity token acquisition.
//!
//! An [`Authenticator`] is built once per process and shared by every
//! client that calls the book agent. It either holds a token supplied by
//! the hosting environment, or walks a list of [`CredentialProvider`]s
//! (metadata server, gcloud CLI) and caches the first token obtained
//! until shortly before it expires.

use std::sync::Arc;
use std::time::Duration as StdDuration;

use async_trait::async_trait;
use base64::Engine;
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use chrono::{DateTime, Duration, Utc};
use knowbridge_config::{AppConfig, CredentialSource};
use knowbridge_core::credential::{AuthCredential, CredentialProvider};
use knowbridge_core::error::CredentialError;
use tokio::process::Command;
use tokio::sync::Mutex;
use tracing::{debug, info, warn};

const METADATA_ENDPOINT: &str = "http://metadata.google.internal";
const METADATA_IDENTITY_PATH: &str = "/computeMetadata/v1/instance/service-accounts/default/identity";
const METADATA_TIMEOUT_SECS: u64 = 3;

/// Hands out bearer credentials for the book agent.
pub struct Authenticator {
    supplied: Option<AuthCredential>,
    providers: Vec<Arc<dyn CredentialProvider>>,
    cache: Mutex<Option<AuthCredential>>,
    refresh_skew: Duration,
    default_lifetime: Duration,
}

impl Authenticator {
    /// Acquire tokens from `providers`, tried in order.
    pub fn new(providers: Vec<Arc<dyn CredentialProvider>>) -> Self {
        Self {
            supplied: None,
            providers,
            cache: Mutex::new(None),
            refresh_skew: Duration::seconds(60),
            default_lifetime: Duration::seconds(300),
        }
    }

    /// Use an externally supplied token; nothing is ever acquired.
    pub fn with_supplied_token(token: impl Into<String>) -> Self {
        let mut auth = Self::new(Vec::new());
        auth.supplied = Some(AuthCredential::new(token, "supplied"));
        auth
    }

    pub fn with_refresh_skew(mut self, skew: Duration) -> Self {
        self.refresh_skew = skew;
        self
    }

    /// Lifetime assumed for tokens whose expiry cannot be decoded.
    pub fn with_default_lifetime(mut self, lifetime: Duration) -> Self {
        self.default_lifetime = lifetime;
        self
    }

    /// Build from configuration: a supplied `remote.auth_token` wins,
    /// otherwise the providers named by `auth.source`.
    pub fn from_config(config: &AppConfig) -> Result<Self, CredentialError> {
        if let Some(token) = &config.remote.auth_token {
            return Ok(Self::with_supplied_token(token.clone()));
        }

        let project = Some(config.project_id.clone()).filter(|p| !p.is_empty());
        let gcloud = || -> Arc<dyn CredentialProvider> {
            Arc::new(GcloudProvider::new(&config.auth.gcloud_command).with_project(project.clone()))
        };

        let providers: Vec<Arc<dyn CredentialProvider>> = match config.auth.source {
            CredentialSource::Auto => vec![
                Arc::new(MetadataServerProvider::new(config.token_audience())?),
                gcloud(),
            ],
            CredentialSource::Metadata => {
                vec![Arc::new(MetadataServerProvider::new(config.token_audience())?)]
            }
            CredentialSource::Gcloud => vec![gcloud()],
        };

        Ok(Self::new(providers)
            .with_refresh_skew(lifetime_setting("refresh_skew_secs", config.auth.refresh_skew_secs)?)
            .with_default_lifetime(lifetime_setting(
                "default_lifetime_secs",
                config.auth.default_lifetime_secs,
            )?))
    }

    /// Return a usable credential, acquiring one if none is cached or the
    /// cached one is about to expire. `None` when every source fails.
    pub async fn acquire(&self) -> Option<AuthCredential> {
        if let Some(supplied) = &self.supplied {
            return Some(supplied.clone());
        }

        let mut cache = self.cache.lock().await;
        let now = Utc::now();
        if let Some(cached) = cache.as_ref() {
            if !cached.is_expired_at(now, self.refresh_skew) {
                return Some(cached.clone());
            }
            debug!(source = %cached.source(), "Cached identity token expired");
        }

        for provider in &self.providers {
            match provider.fetch().await {
                Ok(credential) => {
                    let credential = self.stamp_expiry(credential, now);
                    info!(
                        source = %provider.name(),
                        token = %credential.redacted(),
                        expires_at = ?credential.expires_at(),
                        "Acquired identity token"
                    );
                    *cache = Some(credential.clone());
                    return Some(credential);
                }
                Err(e) => {
                    warn!(source = %provider.name(), error = %e, "Identity token acquisition failed");
                }
            }
        }

        *cache = None;
        None
    }

    /// Drop the cached credential so the next call re-acquires.
    /// Has no effect on a supplied token.
    pub async fn invalidate(&self) {
        *self.cache.lock().await = None;
    }

    fn stamp_expiry(&self, credential: AuthCredential, now: DateTime<Utc>) -> AuthCredential {
        if credential.expires_at().is_some() {
            return credential;
        }
        // An unrepresentable expiry leaves the token already expired.
        let expires_at = jwt_expiry(credential.token())
            .or_else(|| now.checked_add_signed(self.default_lifetime))
            .unwrap_or(now);
        credential.with_expiry(expires_at)
    }
}

fn lifetime_setting(name: &str, secs: i64) -> Result<Duration, CredentialError> {
    Duration::try_seconds(secs)
        .ok_or_else(|| CredentialError::Lifetime(format!("auth.{name} = {secs} is out of range")))
}

/// Read the `exp` claim of a JWT without verifying it.
pub fn jwt_expiry(token: &str) -> Option<DateTime<Utc>> {
    let payload = token.split('.').nth(1)?;
    let bytes = URL_SAFE_NO_PAD.decode(payload.trim_end_matches('=')).ok()?;
    let claims: serde_json::Value = serde_json::from_slice(&bytes).ok()?;
    DateTime::from_timestamp(claims.get("exp")?.as_i64()?, 0)
}

/// Identity tokens from the compute metadata server (Cloud Run, GCE, GKE).
pub struct MetadataServerProvider {
    endpoint: String,
    audience: String,
    client: reqwest::Client,
}

impl MetadataServerProvider {
    pub fn new(audience: impl Into<String>) -> Result<Self, CredentialError> {
        let client = reqwest::Client::builder()
            .timeout(StdDuration::from_secs(METADATA_TIMEOUT_SECS))
            .build()
            .map_err(|e| CredentialError::Metadata(e.to_string()))?;

        Ok(Self {
            endpoint: METADATA_ENDPOINT.into(),
            audience: audience.into(),
            client,
        })
    }

    /// Point at a different metadata host (emulators, tests).
    pub fn with_endpoint(mut self, endpoint: impl Into<String>) -> Self {
        self.endpoint = endpoint.into().trim_end_matches('/').to_string();
        self
    }
}

#[async_trait]
impl CredentialProvider for MetadataServerProvider {
    fn name(&self) -> &str {
        "metadata"
    }

    async fn fetch(&self) -> Result<AuthCredential, CredentialError> {
        let url = format!("{}{}", self.endpoint, METADATA_IDENTITY_PATH);
        let response = self
            .client
            .get(&url)
            .header("Metadata-Flavor", "Google")
            .query(&[("audience", self.audience.as_str()), ("format", "full")])
            .send()
            .await
            .map_err(|e| CredentialError::Unavailable(format!("metadata server unreachable: {e}")))?;

        let status = response.status().as_u16();
        if status != 200 {
            return Err(CredentialError::Metadata(format!("status {status}")));
        }

        let token = response
            .text()
            .await
            .map_err(|e| CredentialError::Metadata(e.to_string()))?;
        let token = token.trim();
        if token.is_empty() {
            return Err(CredentialError::InvalidToken("metadata server returned an empty token".into()));
        }

        Ok(AuthCredential::new(token, self.name()))
    }
}

/// Identity tokens from `gcloud auth print-identity-token`.
pub struct GcloudProvider {
    command: String,
    project: Option<String>,
}

impl GcloudProvider {
    pub fn new(command: impl Into<String>) -> Self {
        Self {
            command: command.into(),
            project: None,
        }
    }

    pub fn with_project(mut self, project: Option<String>) -> Self {
        self.project = project;
        self
    }

    fn args(&self) -> Vec<String> {
        let mut args = vec!["auth".to_string(), "print-identity-token".to_string()];
        if let Some(project) = &self.project {
            args.push("--project".into());
            args.push(project.clone());
        }
        args
    }
}

#[async_trait]
impl CredentialProvider for GcloudProvider {
    fn name(&self) -> &str {
        "gcloud"
    }

    async fn fetch(&self) -> Result<AuthCredential, CredentialError> {
        let command_line = format!("{} auth print-identity-token", self.command);
        let output = Command::new(&self.command)
            .args(self.args())
            .output()
            .await
            .map_err(|e| CredentialError::CommandFailed {
                command: command_line.clone(),
                reason: e.to_string(),
            })?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr).trim().to_string();
            let code = output.status.code().unwrap_or(-1);
            return Err(CredentialError::CommandFailed {
                command: command_line,
                reason: format!("exit code {code}: {stderr}"),
            });
        }

        let token = String::from_utf8_lossy(&output.stdout).trim().to_string();
        if token.is_empty() {
            return Err(CredentialError::InvalidToken("gcloud printed an empty token".into()));
        }

        Ok(AuthCredential::new(token, self.name()))
    }
}
