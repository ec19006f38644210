//! Gowalla CLI - Command-line interface for the Gowalla API
//!
//! Provides commands for:
//! - Walking through the OAuth authorization flow and caching tokens
//! - Issuing GET/POST/DELETE calls against any API resource
//! - Inspecting and initializing the configuration file

use std::path::PathBuf;

use anyhow::Result;
use clap::{Parser, Subcommand};
use gowalla_client::{ClientConfig, HttpMethod};
use tracing_subscriber::EnvFilter;

mod commands;
mod output;
mod token_store;

use commands::{auth::AuthCommand, call::CallArgs, config::ConfigCommand, AppContext};
use output::OutputFormat;
use token_store::TokenCache;

#[derive(Debug, Parser)]
#[command(name = "gowalla", version, about = "Command-line client for the Gowalla API")]
pub struct Cli {
    /// Output in JSON format
    #[arg(long, global = true)]
    json: bool,

    /// Verbose output (can be repeated: -v, -vv, -vvv)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    /// Use alternate config file
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Override the configured client id
    #[arg(long, global = true)]
    client_id: Option<String>,

    /// Override the configured client secret
    #[arg(long, global = true)]
    client_secret: Option<String>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Debug, Subcommand)]
pub enum Commands {
    /// OAuth authorization and token management
    #[command(subcommand)]
    Auth(AuthCommand),
    /// Send a GET request
    Get(CallArgs),
    /// Send a POST request
    Post(CallArgs),
    /// Send a DELETE request
    Delete(CallArgs),
    /// View and manage configuration
    #[command(subcommand)]
    Config(ConfigCommand),
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let config_path = cli.config.clone().unwrap_or_else(ClientConfig::default_path);

    // Setup tracing; logs go to stderr so stdout stays parseable
    let filter = match cli.verbose {
        0 => ClientConfig::load_or_default(&config_path).logging.level,
        1 => "debug".to_string(),
        _ => "trace".to_string(),
    };
    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(filter));

    let subscriber = tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_target(false)
        .with_writer(std::io::stderr);
    if cli.json {
        subscriber.json().init();
    } else {
        subscriber.init();
    }

    let format = OutputFormat::from_json_flag(cli.json);

    let ctx = AppContext {
        format,
        config_path,
        client_id: cli.client_id,
        client_secret: cli.client_secret,
        token_cache: TokenCache::new(TokenCache::default_path()),
    };

    match cli.command {
        Commands::Auth(cmd) => cmd.execute(&ctx).await,
        Commands::Get(args) => args.execute(HttpMethod::Get, &ctx).await,
        Commands::Post(args) => args.execute(HttpMethod::Post, &ctx).await,
        Commands::Delete(args) => args.execute(HttpMethod::Delete, &ctx).await,
        Commands::Config(cmd) => cmd.execute(&ctx).await,
    }
}
