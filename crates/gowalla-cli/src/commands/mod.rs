//! CLI command implementations

pub mod auth;
pub mod call;
pub mod config;

use std::path::PathBuf;

use anyhow::{Context, Result};
use gowalla_client::{ClientConfig, GowallaClient};
use tracing::warn;

use crate::{
    output::{get_formatter, OutputFormat, OutputFormatter},
    token_store::TokenCache,
};

/// Settings resolved from global flags, shared by every command
#[derive(Debug)]
pub struct AppContext {
    pub format: OutputFormat,
    pub config_path: PathBuf,
    pub client_id: Option<String>,
    pub client_secret: Option<String>,
    pub token_cache: TokenCache,
}

impl AppContext {
    pub fn formatter(&self) -> Box<dyn OutputFormatter> {
        get_formatter(self.format)
    }

    /// Loads the config file (defaults when absent) and applies flag overrides.
    pub fn load_config(&self) -> Result<ClientConfig> {
        let mut config = if self.config_path.exists() {
            ClientConfig::load(&self.config_path).with_context(|| {
                format!("Failed to load configuration from {}", self.config_path.display())
            })?
        } else {
            ClientConfig::default()
        };

        if let Some(id) = &self.client_id {
            config.credentials.client_id = Some(id.clone());
        }
        if let Some(secret) = &self.client_secret {
            config.credentials.client_secret = Some(secret.clone());
        }
        Ok(config)
    }

    /// Builds a client from the config, without any cached token.
    pub fn client(&self) -> Result<GowallaClient> {
        let config = self.load_config()?;
        GowallaClient::from_config(&config).context(
            "Client is not configured. Set credentials.client_id and credentials.client_secret \
             in config.yaml or pass --client-id/--client-secret",
        )
    }

    /// Builds a client and authenticates it with the cached token when one is
    /// present and still valid.
    pub fn authenticated_client(&self) -> Result<GowallaClient> {
        let mut client = self.client()?;

        match self.token_cache.load()? {
            Some(tokens) if !tokens.is_expired() => {
                client.set_access_token(tokens.access_token);
            }
            Some(_) => {
                warn!("Cached access token has expired; run `gowalla auth refresh`");
            }
            None => {}
        }
        Ok(client)
    }
}
