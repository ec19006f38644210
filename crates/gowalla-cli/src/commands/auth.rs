//! Auth commands - OAuth authorization flow and token cache management
//!
//! Provides the `gowalla auth` CLI subcommands which:
//! 1. `url`      - Prints (or opens) the authorization URL for the user
//! 2. `exchange` - Trades the code from the redirect for tokens and caches them
//! 3. `refresh`  - Renews the access token using a refresh token
//! 4. `status`   - Shows what is cached and whether it is still valid
//! 5. `logout`   - Deletes the token cache

use anyhow::{bail, Context, Result};
use chrono::Utc;
use clap::Subcommand;
use gowalla_client::models::TokenResponse;
use tracing::{info, warn};

use super::AppContext;
use crate::{
    output::{OutputFormat, OutputFormatter},
    token_store::CachedTokens,
};

#[derive(Debug, Subcommand)]
pub enum AuthCommand {
    /// Print the URL where the user grants access
    Url {
        /// Where Gowalla redirects back with `?code=...`
        #[arg(long)]
        redirect_uri: String,
        /// Open the URL in the default browser
        #[arg(long)]
        open: bool,
    },
    /// Exchange an authorization code for tokens
    Exchange {
        /// Code received on the redirect URI
        #[arg(long)]
        code: String,
        /// Same redirect URI used to build the authorization URL
        #[arg(long)]
        redirect_uri: String,
    },
    /// Obtain a new access token from a refresh token
    Refresh {
        /// Refresh token to use instead of the cached one
        #[arg(long)]
        refresh_token: Option<String>,
    },
    /// Check authentication status
    Status,
    /// Remove cached tokens
    Logout,
}

impl AuthCommand {
    pub async fn execute(&self, ctx: &AppContext) -> Result<()> {
        let fmt = ctx.formatter();
        match self {
            AuthCommand::Url { redirect_uri, open } => {
                self.execute_url(ctx, redirect_uri, *open, &*fmt)
            }
            AuthCommand::Exchange { code, redirect_uri } => {
                self.execute_exchange(ctx, code, redirect_uri, &*fmt).await
            }
            AuthCommand::Refresh { refresh_token } => {
                self.execute_refresh(ctx, refresh_token.as_deref(), &*fmt).await
            }
            AuthCommand::Status => self.execute_status(ctx, &*fmt),
            AuthCommand::Logout => self.execute_logout(ctx, &*fmt),
        }
    }

    fn execute_url(
        &self,
        ctx: &AppContext,
        redirect_uri: &str,
        open: bool,
        fmt: &dyn OutputFormatter,
    ) -> Result<()> {
        let config = ctx.load_config()?;
        let client_id = config
            .credentials
            .client_id
            .clone()
            .context("No client_id provided. Use --client-id or set credentials.client_id in config.yaml")?;

        // Only the client id is needed to build the URL
        let client = gowalla_client::GowallaClient::new(client_id, "")
            .with_endpoints(config.endpoints.clone());
        let url = client.authorization_url(redirect_uri);

        if ctx.format == OutputFormat::Json {
            fmt.print_json(&serde_json::json!({ "authorization_url": url }));
        } else {
            fmt.success("Visit this URL to authorize the application:");
            println!("{url}");
        }

        if open {
            info!("Opening authorization URL in browser");
            if let Err(e) = webbrowser::open(&url) {
                warn!(error = %e, "Failed to open browser");
                fmt.warn("Could not open a browser; open the URL manually");
            }
        }
        Ok(())
    }

    async fn execute_exchange(
        &self,
        ctx: &AppContext,
        code: &str,
        redirect_uri: &str,
        fmt: &dyn OutputFormatter,
    ) -> Result<()> {
        let client = ctx.client()?;

        let issued_at = Utc::now();
        let response = client.exchange_code(code, redirect_uri).await;
        let token: TokenResponse = response
            .parse()
            .await
            .context("Authorization code exchange failed")?;

        let cached = CachedTokens::from_response(&token, issued_at, None);
        ctx.token_cache.store(&cached)?;
        info!(username = ?cached.username, "Stored new access token");

        report_tokens(ctx, fmt, "Authorization complete", &cached);
        Ok(())
    }

    async fn execute_refresh(
        &self,
        ctx: &AppContext,
        explicit: Option<&str>,
        fmt: &dyn OutputFormatter,
    ) -> Result<()> {
        let cached = ctx.token_cache.load()?;
        let refresh_token = match explicit {
            Some(token) => token.to_string(),
            None => match cached.as_ref().and_then(|t| t.refresh_token.clone()) {
                Some(token) => token,
                None => bail!(
                    "No refresh token available. Pass --refresh-token or run `gowalla auth exchange` first"
                ),
            },
        };

        let client = ctx.client()?;
        let issued_at = Utc::now();
        let token: TokenResponse = client
            .refresh_access_token(&refresh_token)
            .await
            .parse()
            .await
            .context("Token refresh failed")?;

        let mut refreshed = CachedTokens::from_response(&token, issued_at, Some(refresh_token));
        if refreshed.username.is_none() {
            refreshed.username = cached.and_then(|t| t.username);
        }
        ctx.token_cache.store(&refreshed)?;
        info!("Refreshed access token");

        report_tokens(ctx, fmt, "Access token refreshed", &refreshed);
        Ok(())
    }

    fn execute_status(&self, ctx: &AppContext, fmt: &dyn OutputFormatter) -> Result<()> {
        let cached = ctx.token_cache.load()?;

        if ctx.format == OutputFormat::Json {
            let json = match &cached {
                Some(tokens) => serde_json::json!({
                    "authenticated": !tokens.is_expired(),
                    "username": tokens.username,
                    "expires_at": tokens.expires_at.to_rfc3339(),
                    "expired": tokens.is_expired(),
                    "has_refresh_token": tokens.refresh_token.is_some(),
                    "cache_path": ctx.token_cache.path().display().to_string(),
                }),
                None => serde_json::json!({
                    "authenticated": false,
                    "cache_path": ctx.token_cache.path().display().to_string(),
                }),
            };
            fmt.print_json(&json);
            return Ok(());
        }

        match cached {
            Some(tokens) if !tokens.is_expired() => {
                fmt.success("Authenticated");
                if let Some(username) = &tokens.username {
                    fmt.info(&format!("User: {username}"));
                }
                fmt.info(&format!("Expires: {}", tokens.expires_at.to_rfc3339()));
            }
            Some(tokens) => {
                fmt.warn(&format!(
                    "Access token expired at {}",
                    tokens.expires_at.to_rfc3339()
                ));
                if tokens.refresh_token.is_some() {
                    fmt.info("Run `gowalla auth refresh` to renew it");
                }
            }
            None => {
                fmt.info("Not authenticated. Run `gowalla auth url` to start.");
            }
        }
        fmt.info(&format!("Token cache: {}", ctx.token_cache.path().display()));
        Ok(())
    }

    fn execute_logout(&self, ctx: &AppContext, fmt: &dyn OutputFormatter) -> Result<()> {
        if ctx.token_cache.clear()? {
            info!("Cleared cached tokens");
            fmt.success("Logged out");
        } else {
            fmt.info("No cached tokens. Nothing to log out.");
        }
        Ok(())
    }
}

fn report_tokens(ctx: &AppContext, fmt: &dyn OutputFormatter, headline: &str, tokens: &CachedTokens) {
    if ctx.format == OutputFormat::Json {
        fmt.print_json(&serde_json::json!({
            "success": true,
            "username": tokens.username,
            "expires_at": tokens.expires_at.to_rfc3339(),
            "has_refresh_token": tokens.refresh_token.is_some(),
        }));
    } else {
        fmt.success(headline);
        if let Some(username) = &tokens.username {
            fmt.info(&format!("User: {username}"));
        }
        fmt.info(&format!("Expires: {}", tokens.expires_at.to_rfc3339()));
        fmt.info(&format!("Tokens saved to {}", ctx.token_cache.path().display()));
    }
}
