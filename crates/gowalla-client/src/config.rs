//! Configuration for the Gowalla client.
//!
//! Typed sections mapping to a YAML file, with loading, validation, defaults
//! and a builder for programmatic use.
//!
//! ```yaml
//! credentials:
//!   client_id: abc
//!   client_secret: s3cret
//! transport:
//!   request_timeout: 30
//!   connect_timeout: 5
//! dispatch: background
//! logging:
//!   level: debug
//! ```

use std::{
    net::IpAddr,
    path::{Path, PathBuf},
    time::Duration,
};

use oauth2::{AuthUrl, TokenUrl};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::transport::{
    TransportConfig, DEFAULT_CONNECT_TIMEOUT, DEFAULT_MAX_REDIRECTS, DEFAULT_REQUEST_TIMEOUT,
    DEFAULT_USER_AGENT,
};

/// Base URL for API calls
pub const DEFAULT_API_BASE: &str = "https://api.gowalla.com";

/// Page the user is sent to for granting access
pub const DEFAULT_AUTHORIZE_URL: &str = "https://gowalla.com/api/oauth/new";

/// Token endpoint for code and refresh-token exchanges
pub const DEFAULT_TOKEN_URL: &str = "https://api.gowalla.com/api/oauth/token";

// ---------------------------------------------------------------------------
// Sections
// ---------------------------------------------------------------------------

/// Top-level configuration for the client.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ClientConfig {
    pub credentials: CredentialsConfig,
    pub endpoints: Endpoints,
    pub transport: TransportSettings,
    pub dispatch: DispatchMode,
    pub logging: LoggingConfig,
}

/// Application credentials and an optional stored access token.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CredentialsConfig {
    pub client_id: Option<String>,
    pub client_secret: Option<String>,
    /// Access token from an earlier OAuth exchange, reused for offline access.
    pub access_token: Option<String>,
}

/// Service URLs.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Endpoints {
    /// Prefix for relative spots, e.g. `https://api.gowalla.com`.
    pub api_base: String,
    /// Authorization page for the three-legged flow.
    pub authorize_url: String,
    /// OAuth token endpoint.
    pub token_url: String,
}

/// Network settings, in the units a config file uses.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TransportSettings {
    /// Seconds to wait for the full response.
    pub request_timeout: f64,
    /// Seconds to wait for the connection.
    pub connect_timeout: f64,
    pub follow_redirects: bool,
    pub max_redirects: usize,
    pub verify_tls: bool,
    /// Outbound address to bind to; loopback addresses are ignored.
    pub bind_address: Option<IpAddr>,
    pub user_agent: String,
}

/// How requests are dispatched.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DispatchMode {
    /// Each call waits for the network exchange before returning.
    #[default]
    Blocking,
    /// Each call returns at once; the first access waits for the exchange.
    Background,
}

/// Logging / tracing settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Log level: `trace`, `debug`, `info`, `warn`, or `error`.
    pub level: String,
}

impl Default for Endpoints {
    fn default() -> Self {
        Self {
            api_base: DEFAULT_API_BASE.to_string(),
            authorize_url: DEFAULT_AUTHORIZE_URL.to_string(),
            token_url: DEFAULT_TOKEN_URL.to_string(),
        }
    }
}

impl Endpoints {
    /// All three endpoints on one base URL (handy for mock servers).
    pub fn with_base(base: impl Into<String>) -> Self {
        let base = base.into().trim_end_matches('/').to_string();
        Self {
            authorize_url: format!("{base}/api/oauth/new"),
            token_url: format!("{base}/api/oauth/token"),
            api_base: base,
        }
    }
}

impl Default for TransportSettings {
    fn default() -> Self {
        Self {
            request_timeout: DEFAULT_REQUEST_TIMEOUT.as_secs_f64(),
            connect_timeout: DEFAULT_CONNECT_TIMEOUT.as_secs_f64(),
            follow_redirects: false,
            max_redirects: DEFAULT_MAX_REDIRECTS,
            verify_tls: false,
            bind_address: None,
            user_agent: DEFAULT_USER_AGENT.to_string(),
        }
    }
}

impl TransportSettings {
    /// Converts to the runtime form. Out-of-range timeouts fall back to the
    /// defaults; [`ClientConfig::validate`] reports them.
    pub fn to_transport_config(&self) -> TransportConfig {
        TransportConfig {
            request_timeout: Duration::try_from_secs_f64(self.request_timeout)
                .unwrap_or(DEFAULT_REQUEST_TIMEOUT),
            connect_timeout: Duration::try_from_secs_f64(self.connect_timeout)
                .unwrap_or(DEFAULT_CONNECT_TIMEOUT),
            follow_redirects: self.follow_redirects,
            max_redirects: self.max_redirects,
            verify_tls: self.verify_tls,
            bind_address: self.bind_address,
            user_agent: self.user_agent.clone(),
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
        }
    }
}

// ---------------------------------------------------------------------------
// Loading and saving
// ---------------------------------------------------------------------------

/// Errors reading or writing a configuration file.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read {path}: {source}")]
    Read {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("Failed to write {path}: {source}")]
    Write {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("Invalid YAML: {0}")]
    Yaml(#[from] serde_yaml::Error),
}

impl ClientConfig {
    /// Load configuration from a YAML file at `path`.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        let config: ClientConfig = serde_yaml::from_str(&content)?;
        Ok(config)
    }

    /// Try to load from `path`; fall back to [`ClientConfig::default`] on any error.
    pub fn load_or_default(path: &Path) -> Self {
        Self::load(path).unwrap_or_default()
    }

    /// Write the configuration as YAML, creating parent directories.
    pub fn save(&self, path: &Path) -> Result<(), ConfigError> {
        let yaml = serde_yaml::to_string(self)?;
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).map_err(|source| ConfigError::Write {
                path: parent.to_path_buf(),
                source,
            })?;
        }
        std::fs::write(path, yaml).map_err(|source| ConfigError::Write {
            path: path.to_path_buf(),
            source,
        })
    }

    /// Platform-appropriate default path for the configuration file.
    ///
    /// Typically `$XDG_CONFIG_HOME/gowalla/config.yaml` on Linux.
    pub fn default_path() -> PathBuf {
        dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from("~/.config"))
            .join("gowalla")
            .join("config.yaml")
    }
}

// ---------------------------------------------------------------------------
// Validation
// ---------------------------------------------------------------------------

/// A single validation error found in the configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidationError {
    /// Dotted path to the offending field, e.g. `"transport.request_timeout"`.
    pub field: String,
    /// Human-readable explanation.
    pub message: String,
}

impl std::fmt::Display for ValidationError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}: {}", self.field, self.message)
    }
}

/// Valid values for `logging.level`.
pub const VALID_LOG_LEVELS: &[&str] = &["trace", "debug", "info", "warn", "error"];

impl ClientConfig {
    /// Validate the configuration and return all errors found.
    ///
    /// An empty vector means the configuration is valid. Missing credentials
    /// are not reported here: an authorization URL needs only the client id,
    /// and `GowallaClient::from_config` checks what it needs.
    pub fn validate(&self) -> Vec<ValidationError> {
        let mut errors = Vec::new();

        // --- endpoints ---
        if let Err(e) = url::Url::parse(&self.endpoints.api_base) {
            errors.push(ValidationError {
                field: "endpoints.api_base".into(),
                message: format!("invalid URL: {e}"),
            });
        }
        if let Err(e) = AuthUrl::new(self.endpoints.authorize_url.clone()) {
            errors.push(ValidationError {
                field: "endpoints.authorize_url".into(),
                message: format!("invalid URL: {e}"),
            });
        }
        if let Err(e) = TokenUrl::new(self.endpoints.token_url.clone()) {
            errors.push(ValidationError {
                field: "endpoints.token_url".into(),
                message: format!("invalid URL: {e}"),
            });
        }

        // --- credentials ---
        for (field, value) in [
            ("credentials.client_id", &self.credentials.client_id),
            ("credentials.client_secret", &self.credentials.client_secret),
            ("credentials.access_token", &self.credentials.access_token),
        ] {
            if value.as_deref().is_some_and(|v| v.trim().is_empty()) {
                errors.push(ValidationError {
                    field: field.into(),
                    message: "must not be empty when set".into(),
                });
            }
        }

        // --- transport ---
        for (field, secs) in [
            ("transport.request_timeout", self.transport.request_timeout),
            ("transport.connect_timeout", self.transport.connect_timeout),
        ] {
            if !secs.is_finite() || secs <= 0.0 {
                errors.push(ValidationError {
                    field: field.into(),
                    message: "must be a positive number of seconds".into(),
                });
            }
        }
        if self.transport.follow_redirects && self.transport.max_redirects == 0 {
            errors.push(ValidationError {
                field: "transport.max_redirects".into(),
                message: "must be greater than 0 when follow_redirects is enabled".into(),
            });
        }
        if self.transport.user_agent.trim().is_empty() {
            errors.push(ValidationError {
                field: "transport.user_agent".into(),
                message: "must not be empty".into(),
            });
        }

        // --- logging ---
        if !VALID_LOG_LEVELS.contains(&self.logging.level.as_str()) {
            errors.push(ValidationError {
                field: "logging.level".into(),
                message: format!(
                    "invalid level '{}'; valid options: {}",
                    self.logging.level,
                    VALID_LOG_LEVELS.join(", ")
                ),
            });
        }

        errors
    }
}

// ---------------------------------------------------------------------------
// ConfigBuilder
// ---------------------------------------------------------------------------

/// Builder for constructing a [`ClientConfig`] programmatically.
///
/// Starts from [`ClientConfig::default`] and allows selective overrides.
///
/// # Example
///
/// ```rust
/// use gowalla_client::config::{ConfigBuilder, DispatchMode};
///
/// let config = ConfigBuilder::new()
///     .client_id("abc")
///     .client_secret("s3cret")
///     .request_timeout(10.0)
///     .dispatch(DispatchMode::Background)
///     .build();
/// assert!(config.validate().is_empty());
/// ```
#[derive(Debug, Clone, Default)]
pub struct ConfigBuilder {
    config: ClientConfig,
}

impl ConfigBuilder {
    /// Create a new builder initialised with [`ClientConfig::default`] values.
    pub fn new() -> Self {
        Self::default()
    }

    // --- credentials ---

    pub fn client_id(mut self, id: impl Into<String>) -> Self {
        self.config.credentials.client_id = Some(id.into());
        self
    }

    pub fn client_secret(mut self, secret: impl Into<String>) -> Self {
        self.config.credentials.client_secret = Some(secret.into());
        self
    }

    pub fn access_token(mut self, token: impl Into<String>) -> Self {
        self.config.credentials.access_token = Some(token.into());
        self
    }

    // --- endpoints ---

    pub fn endpoints(mut self, endpoints: Endpoints) -> Self {
        self.config.endpoints = endpoints;
        self
    }

    pub fn api_base(mut self, url: impl Into<String>) -> Self {
        self.config.endpoints.api_base = url.into();
        self
    }

    // --- transport ---

    pub fn request_timeout(mut self, seconds: f64) -> Self {
        self.config.transport.request_timeout = seconds;
        self
    }

    pub fn connect_timeout(mut self, seconds: f64) -> Self {
        self.config.transport.connect_timeout = seconds;
        self
    }

    pub fn follow_redirects(mut self, follow: bool, max_redirects: usize) -> Self {
        self.config.transport.follow_redirects = follow;
        self.config.transport.max_redirects = max_redirects;
        self
    }

    pub fn verify_tls(mut self, verify: bool) -> Self {
        self.config.transport.verify_tls = verify;
        self
    }

    pub fn bind_address(mut self, addr: IpAddr) -> Self {
        self.config.transport.bind_address = Some(addr);
        self
    }

    // --- dispatch / logging ---

    pub fn dispatch(mut self, mode: DispatchMode) -> Self {
        self.config.dispatch = mode;
        self
    }

    pub fn logging_level(mut self, level: impl Into<String>) -> Self {
        self.config.logging.level = level.into();
        self
    }

    /// Consume the builder and return the configured [`ClientConfig`].
    pub fn build(self) -> ClientConfig {
        self.config
    }
}
