//! Configuration loading, validation, and management for Knowbridge.
//!
//! Loads configuration from `~/.knowbridge/config.toml` with environment
//! variable overrides. Validates all settings at startup.
//!
//! Environment overrides (applied after the file):
//! - `GCP_PROJECT`: target project identifier
//! - `BOOK_AGENT_URL`: remote agent base URL
//! - `AUTH_TOKEN`: pre-supplied bearer token
//! - `PORT`: gateway listen port
//! - `KNOWBRIDGE_LLM_API_KEY`, then `GEMINI_API_KEY`: language model key
//! - `KNOWBRIDGE_MODEL`: language model name

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// The root configuration structure.
///
/// Maps directly to `~/.knowbridge/config.toml`.
#[derive(Clone, Serialize, Deserialize)]
pub struct AppConfig {
    /// Cloud project the remote agent and identity tokens belong to
    #[serde(default = "default_project_id")]
    pub project_id: String,

    /// Remote book agent settings
    #[serde(default)]
    pub remote: RemoteConfig,

    /// Identity token acquisition
    #[serde(default)]
    pub auth: AuthConfig,

    /// Language model used by the knowledge-augmented responder
    #[serde(default)]
    pub llm: LlmConfig,

    /// Local HTTP service
    #[serde(default)]
    pub gateway: GatewayConfig,
}

fn default_project_id() -> String {
    "knowbridge-dev".into()
}

/// Redact a secret string for Debug output.
fn redact(s: &Option<String>) -> &'static str {
    match s {
        Some(_) => "[REDACTED]",
        None => "None",
    }
}

impl std::fmt::Debug for AppConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AppConfig")
            .field("project_id", &self.project_id)
            .field("remote", &self.remote)
            .field("auth", &self.auth)
            .field("llm", &self.llm)
            .field("gateway", &self.gateway)
            .finish()
    }
}

#[derive(Clone, Serialize, Deserialize)]
pub struct RemoteConfig {
    /// Base URL of the book agent; `/chat` and `/search` are appended
    #[serde(default = "default_book_agent_url")]
    pub book_agent_url: String,

    /// Bearer token supplied by the hosting environment. When set, no
    /// identity token is ever acquired.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub auth_token: Option<String>,

    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,

    /// Passages requested per `search_knowledge` call
    #[serde(default = "default_search_limit")]
    pub search_limit: usize,
}

fn default_book_agent_url() -> String {
    "http://localhost:8081".into()
}
fn default_timeout_secs() -> u64 {
    30
}
fn default_search_limit() -> usize {
    3
}

impl Default for RemoteConfig {
    fn default() -> Self {
        Self {
            book_agent_url: default_book_agent_url(),
            auth_token: None,
            timeout_secs: default_timeout_secs(),
            search_limit: default_search_limit(),
        }
    }
}

impl std::fmt::Debug for RemoteConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RemoteConfig")
            .field("book_agent_url", &self.book_agent_url)
            .field("auth_token", &redact(&self.auth_token))
            .field("timeout_secs", &self.timeout_secs)
            .field("search_limit", &self.search_limit)
            .finish()
    }
}

/// Where identity tokens come from when none is supplied.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CredentialSource {
    /// Metadata server first, then the gcloud CLI
    #[default]
    Auto,
    Metadata,
    Gcloud,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuthConfig {
    #[serde(default)]
    pub source: CredentialSource,

    /// Token audience; defaults to the book agent URL
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub audience: Option<String>,

    /// Refresh this many seconds before the token's expiry
    #[serde(default = "default_refresh_skew_secs")]
    pub refresh_skew_secs: i64,

    /// Assumed lifetime for tokens whose expiry cannot be read
    #[serde(default = "default_lifetime_secs")]
    pub default_lifetime_secs: i64,

    #[serde(default = "default_gcloud_command")]
    pub gcloud_command: String,
}

/// Upper bound for token lifetime settings: one day.
pub const MAX_TOKEN_SECS: i64 = 86_400;

fn default_refresh_skew_secs() -> i64 {
    60
}
fn default_lifetime_secs() -> i64 {
    300
}
fn default_gcloud_command() -> String {
    "gcloud".into()
}

impl Default for AuthConfig {
    fn default() -> Self {
        Self {
            source: CredentialSource::default(),
            audience: None,
            refresh_skew_secs: default_refresh_skew_secs(),
            default_lifetime_secs: default_lifetime_secs(),
            gcloud_command: default_gcloud_command(),
        }
    }
}

#[derive(Clone, Serialize, Deserialize)]
pub struct LlmConfig {
    /// Provider name used in logs
    #[serde(default = "default_llm_provider")]
    pub provider: String,

    /// OpenAI-compatible base URL (`/chat/completions` is appended)
    #[serde(default = "default_llm_api_url")]
    pub api_url: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub api_key: Option<String>,

    #[serde(default = "default_model")]
    pub model: String,

    #[serde(default = "default_temperature")]
    pub temperature: f32,

    #[serde(default = "default_max_tokens")]
    pub max_tokens: u32,

    /// Maximum model calls per user turn
    #[serde(default = "default_max_iterations")]
    pub max_iterations: u32,

    /// Replace the built-in system instruction entirely
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub system_prompt_override: Option<String>,
}

fn default_llm_provider() -> String {
    "gemini".into()
}
fn default_llm_api_url() -> String {
    "https://generativelanguage.googleapis.com/v1beta/openai".into()
}
fn default_model() -> String {
    "gemini-2.0-flash".into()
}
fn default_temperature() -> f32 {
    0.7
}
fn default_max_tokens() -> u32 {
    1000
}
fn default_max_iterations() -> u32 {
    10
}

impl Default for LlmConfig {
    fn default() -> Self {
        Self {
            provider: default_llm_provider(),
            api_url: default_llm_api_url(),
            api_key: None,
            model: default_model(),
            temperature: default_temperature(),
            max_tokens: default_max_tokens(),
            max_iterations: default_max_iterations(),
            system_prompt_override: None,
        }
    }
}

impl std::fmt::Debug for LlmConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LlmConfig")
            .field("provider", &self.provider)
            .field("api_url", &self.api_url)
            .field("api_key", &redact(&self.api_key))
            .field("model", &self.model)
            .field("temperature", &self.temperature)
            .field("max_tokens", &self.max_tokens)
            .field("max_iterations", &self.max_iterations)
            .field("system_prompt_override", &self.system_prompt_override.is_some())
            .finish()
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GatewayConfig {
    #[serde(default = "default_port")]
    pub port: u16,

    #[serde(default = "default_host")]
    pub host: String,
}

fn default_port() -> u16 {
    8080
}
fn default_host() -> String {
    "0.0.0.0".into()
}

impl Default for GatewayConfig {
    fn default() -> Self {
        Self {
            port: default_port(),
            host: default_host(),
        }
    }
}

impl AppConfig {
    /// Load configuration from the default path (~/.knowbridge/config.toml)
    /// and apply environment overrides.
    pub fn load() -> Result<Self, ConfigError> {
        let config_path = Self::config_dir().join("config.toml");
        Self::load_with_env(&config_path)
    }

    /// Load from `path`, then apply environment overrides.
    pub fn load_with_env(path: &Path) -> Result<Self, ConfigError> {
        let mut config = Self::load_from(path)?;
        config.apply_env(|key| std::env::var(key).ok());
        config.validate()?;
        Ok(config)
    }

    /// Load configuration from a specific file path.
    pub fn load_from(path: &Path) -> Result<Self, ConfigError> {
        if !path.exists() {
            tracing::info!("No config file found at {}, using defaults", path.display());
            return Ok(Self::default());
        }

        let content = std::fs::read_to_string(path).map_err(|e| ConfigError::ReadError {
            path: path.to_path_buf(),
            reason: e.to_string(),
        })?;

        let config: Self = toml::from_str(&content).map_err(|e| ConfigError::ParseError {
            path: path.to_path_buf(),
            reason: e.to_string(),
        })?;

        config.validate()?;
        Ok(config)
    }

    /// Apply environment overrides through `lookup` (normally `std::env::var`).
    pub fn apply_env<F>(&mut self, lookup: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        let non_empty = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        if let Some(project) = non_empty("GCP_PROJECT") {
            self.project_id = project;
        }
        if let Some(url) = non_empty("BOOK_AGENT_URL") {
            self.remote.book_agent_url = url;
        }
        if let Some(token) = non_empty("AUTH_TOKEN") {
            self.remote.auth_token = Some(token);
        }
        if let Some(port) = non_empty("PORT") {
            match port.parse() {
                Ok(p) => self.gateway.port = p,
                Err(_) => tracing::warn!(value = %port, "Ignoring invalid PORT"),
            }
        }
        if self.llm.api_key.is_none() {
            self.llm.api_key = non_empty("KNOWBRIDGE_LLM_API_KEY").or_else(|| non_empty("GEMINI_API_KEY"));
        }
        if let Some(model) = non_empty("KNOWBRIDGE_MODEL") {
            self.llm.model = model;
        }
    }

    /// Get the configuration directory path.
    pub fn config_dir() -> PathBuf {
        dirs_home().join(".knowbridge")
    }

    /// The audience identity tokens are minted for.
    pub fn token_audience(&self) -> &str {
        self.auth.audience.as_deref().unwrap_or(&self.remote.book_agent_url)
    }

    /// Validate the configuration.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let url = &self.remote.book_agent_url;
        if !url.starts_with("http://") && !url.starts_with("https://") {
            return Err(ConfigError::ValidationError(format!(
                "remote.book_agent_url must start with http:// or https:// (got '{url}')"
            )));
        }

        if self.remote.timeout_secs == 0 {
            return Err(ConfigError::ValidationError(
                "remote.timeout_secs must be > 0".into(),
            ));
        }

        if self.remote.search_limit == 0 {
            return Err(ConfigError::ValidationError(
                "remote.search_limit must be > 0".into(),
            ));
        }

        if self.llm.temperature < 0.0 || self.llm.temperature > 2.0 {
            return Err(ConfigError::ValidationError(
                "llm.temperature must be between 0.0 and 2.0".into(),
            ));
        }

        if !(0..=MAX_TOKEN_SECS).contains(&self.auth.refresh_skew_secs) {
            return Err(ConfigError::ValidationError(format!(
                "auth.refresh_skew_secs must be between 0 and {MAX_TOKEN_SECS}"
            )));
        }

        if !(1..=MAX_TOKEN_SECS).contains(&self.auth.default_lifetime_secs) {
            return Err(ConfigError::ValidationError(format!(
                "auth.default_lifetime_secs must be between 1 and {MAX_TOKEN_SECS}"
            )));
        }

        Ok(())
    }

    /// Generate a default config TOML string.
    pub fn default_toml() -> String {
        toml::to_string_pretty(&Self::default()).unwrap_or_default()
    }
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            project_id: default_project_id(),
            remote: RemoteConfig::default(),
            auth: AuthConfig::default(),
            llm: LlmConfig::default(),
            gateway: GatewayConfig::default(),
        }
    }
}

/// Get the user's home directory.
fn dirs_home() -> PathBuf {
    #[cfg(target_os = "windows")]
    {
        std::env::var("USERPROFILE")
            .map(PathBuf::from)
            .unwrap_or_else(|_| PathBuf::from("C:\\Users\\Default"))
    }
    #[cfg(not(target_os = "windows"))]
    {
        std::env::var("HOME")
            .map(PathBuf::from)
            .unwrap_or_else(|_| PathBuf::from("/tmp"))
    }
}

/// Configuration errors.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Failed to read config file at {path}: {reason}")]
    ReadError { path: PathBuf, reason: String },

    #[error("Failed to parse config file at {path}: {reason}")]
    ParseError { path: PathBuf, reason: String },

    #[error("Configuration validation failed: {0}")]
    ValidationError(String),
}
