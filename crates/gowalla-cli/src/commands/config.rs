//! Config command - View and manage the client configuration
//!
//! Provides the `gowalla config` CLI command which:
//! 1. Shows the effective configuration with secrets masked
//! 2. Prints the configuration file path
//! 3. Validates the configuration file and reports errors
//! 4. Writes a starter configuration file

use anyhow::{bail, Context, Result};
use clap::Subcommand;
use gowalla_client::ClientConfig;
use tracing::info;

use super::AppContext;
use crate::output::OutputFormat;

const MASK: &str = "********";

#[derive(Debug, Subcommand)]
pub enum ConfigCommand {
    /// Display current configuration
    Show,
    /// Print the configuration file path
    Path,
    /// Validate configuration file
    Validate,
    /// Write a default configuration file
    Init {
        /// Overwrite an existing file
        #[arg(long)]
        force: bool,
    },
}

impl ConfigCommand {
    /// Execute the config command
    pub async fn execute(&self, ctx: &AppContext) -> Result<()> {
        match self {
            ConfigCommand::Show => self.execute_show(ctx),
            ConfigCommand::Path => self.execute_path(ctx),
            ConfigCommand::Validate => self.execute_validate(ctx),
            ConfigCommand::Init { force } => self.execute_init(ctx, *force),
        }
    }

    fn execute_show(&self, ctx: &AppContext) -> Result<()> {
        let formatter = ctx.formatter();
        let config = masked(ctx.load_config()?);

        info!(config_path = %ctx.config_path.display(), "Showing configuration");

        if ctx.format == OutputFormat::Json {
            let json = serde_json::to_value(&config)
                .context("Failed to serialize configuration to JSON")?;
            formatter.print_json(&json);
        } else {
            formatter.success(&format!("Configuration ({})", ctx.config_path.display()));
            formatter.info("");

            let yaml = serde_yaml::to_string(&config)
                .context("Failed to serialize configuration to YAML")?;
            for line in yaml.lines() {
                formatter.info(line);
            }
        }
        Ok(())
    }

    fn execute_path(&self, ctx: &AppContext) -> Result<()> {
        if ctx.format == OutputFormat::Json {
            ctx.formatter().print_json(&serde_json::json!({
                "config_path": ctx.config_path.display().to_string(),
                "exists": ctx.config_path.exists(),
            }));
        } else {
            println!("{}", ctx.config_path.display());
        }
        Ok(())
    }

    fn execute_validate(&self, ctx: &AppContext) -> Result<()> {
        let formatter = ctx.formatter();

        if !ctx.config_path.exists() {
            formatter.warn(&format!(
                "No configuration file at {}; defaults apply",
                ctx.config_path.display()
            ));
        }

        let config = ctx.load_config()?;
        let errors = config.validate();

        if ctx.format == OutputFormat::Json {
            let json = serde_json::json!({
                "valid": errors.is_empty(),
                "config_path": ctx.config_path.display().to_string(),
                "errors": errors
                    .iter()
                    .map(|e| serde_json::json!({"field": e.field, "message": e.message}))
                    .collect::<Vec<_>>(),
            });
            formatter.print_json(&json);
        } else if errors.is_empty() {
            formatter.success("Configuration is valid");
        } else {
            formatter.error(&format!("Found {} error(s):", errors.len()));
            for e in &errors {
                formatter.info(&format!("{}: {}", e.field, e.message));
            }
        }

        if !errors.is_empty() {
            bail!("configuration has {} error(s)", errors.len());
        }
        Ok(())
    }

    fn execute_init(&self, ctx: &AppContext, force: bool) -> Result<()> {
        let formatter = ctx.formatter();
        let path = &ctx.config_path;

        if path.exists() && !force {
            bail!(
                "{} already exists; use --force to overwrite",
                path.display()
            );
        }

        let mut config = ClientConfig::default();
        config.credentials.client_id = ctx.client_id.clone();
        config.credentials.client_secret = ctx.client_secret.clone();
        config
            .save(path)
            .with_context(|| format!("Failed to write {}", path.display()))?;

        info!(config_path = %path.display(), "Wrote configuration file");
        formatter.success(&format!("Wrote {}", path.display()));
        if config.credentials.client_id.is_none() {
            formatter.info("Set credentials.client_id and credentials.client_secret before use");
        }
        Ok(())
    }
}

/// Replaces secrets with a fixed mask so they never reach the terminal
fn masked(mut config: ClientConfig) -> ClientConfig {
    if config.credentials.client_secret.is_some() {
        config.credentials.client_secret = Some(MASK.to_string());
    }
    if config.credentials.access_token.is_some() {
        config.credentials.access_token = Some(MASK.to_string());
    }
    config
}
