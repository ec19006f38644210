//! On-disk cache for OAuth tokens
//!
//! Tokens obtained with `gowalla auth exchange` or `gowalla auth refresh` are
//! kept as JSON in `$XDG_DATA_HOME/gowalla/tokens.json` so later calls can
//! authenticate without repeating the OAuth dance. On Unix the file is
//! opened with mode `0600` before any token is written to it.

use std::{
    fs::{File, OpenOptions},
    io::Write,
    path::{Path, PathBuf},
};

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use gowalla_client::models::TokenResponse;
use serde::{Deserialize, Serialize};
use tracing::debug;

/// Tokens as persisted between invocations
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CachedTokens {
    pub access_token: String,
    #[serde(default)]
    pub refresh_token: Option<String>,
    pub expires_at: DateTime<Utc>,
    /// Profile path of the user who granted access
    #[serde(default)]
    pub username: Option<String>,
}

impl CachedTokens {
    /// Builds the cache entry for a token endpoint answer received at `issued_at`.
    ///
    /// A response without a refresh token keeps `previous_refresh`.
    pub fn from_response(
        response: &TokenResponse,
        issued_at: DateTime<Utc>,
        previous_refresh: Option<String>,
    ) -> Self {
        Self {
            access_token: response.access_token.clone(),
            refresh_token: response.refresh_token.clone().or(previous_refresh),
            expires_at: response.expires_at(issued_at),
            username: response.username.clone(),
        }
    }

    pub fn is_expired(&self) -> bool {
        self.is_expired_at(Utc::now())
    }

    pub fn is_expired_at(&self, now: DateTime<Utc>) -> bool {
        now >= self.expires_at
    }
}

/// JSON file holding the cached tokens
#[derive(Debug, Clone)]
pub struct TokenCache {
    path: PathBuf,
}

impl TokenCache {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// `$XDG_DATA_HOME/gowalla/tokens.json` or the platform equivalent
    pub fn default_path() -> PathBuf {
        dirs::data_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("gowalla")
            .join("tokens.json")
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn store(&self, tokens: &CachedTokens) -> Result<()> {
        if let Some(parent) = self.path.parent() {
            std::fs::create_dir_all(parent).context("Failed to create token cache directory")?;
        }

        let json = serde_json::to_string_pretty(tokens).context("Failed to serialize tokens")?;
        write_private(&self.path, json.as_bytes())?;

        debug!(path = %self.path.display(), "Stored tokens in cache");
        Ok(())
    }

    /// Returns `None` when nothing has been cached yet
    pub fn load(&self) -> Result<Option<CachedTokens>> {
        let json = match std::fs::read_to_string(&self.path) {
            Ok(json) => json,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(e).context("Failed to read token cache"),
        };

        let tokens = serde_json::from_str(&json).context("Failed to parse token cache")?;
        debug!(path = %self.path.display(), "Loaded tokens from cache");
        Ok(Some(tokens))
    }

    /// Deletes the cache file. Returns `false` if there was nothing to delete.
    pub fn clear(&self) -> Result<bool> {
        match std::fs::remove_file(&self.path) {
            Ok(()) => {
                debug!(path = %self.path.display(), "Cleared token cache");
                Ok(true)
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(false),
            Err(e) => Err(e).context("Failed to delete token cache"),
        }
    }
}

/// Writes `contents` to a file only its owner can read. A new file is created
/// with mode `0600`; an existing one is tightened before it is written.
fn write_private(path: &Path, contents: &[u8]) -> Result<()> {
    let mut options = OpenOptions::new();
    options.write(true).create(true).truncate(true);
    #[cfg(unix)]
    {
        use std::os::unix::fs::OpenOptionsExt;
        options.mode(0o600);
    }

    let mut file = options.open(path).context("Failed to open token cache")?;
    restrict_permissions(&file)?;
    file.write_all(contents).context("Failed to write token cache")?;
    Ok(())
}

#[cfg(unix)]
fn restrict_permissions(file: &File) -> Result<()> {
    use std::os::unix::fs::PermissionsExt;
    file.set_permissions(std::fs::Permissions::from_mode(0o600))
        .context("Failed to restrict token cache permissions")
}

#[cfg(not(unix))]
fn restrict_permissions(_file: &File) -> Result<()> {
    Ok(())
}
