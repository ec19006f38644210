//! API call commands - `gowalla get|post|delete SPOT [-p key=value]...`
//!
//! Sends one request through the client and prints the parsed body. Error
//! statuses are reported with their kind and status and fail the command.

use anyhow::{anyhow, Result};
use clap::Args;
use gowalla_client::{GowallaError, HttpMethod, Params};
use tracing::debug;

use super::AppContext;
use crate::output::OutputFormat;

#[derive(Debug, Args)]
pub struct CallArgs {
    /// Resource path (e.g. `/spots/7`) or absolute URL
    pub spot: String,

    /// Request parameter, repeatable
    #[arg(short = 'p', long = "param", value_name = "KEY=VALUE", value_parser = parse_key_val)]
    pub params: Vec<(String, String)>,

    /// Print status and headers along with the body
    #[arg(short = 'i', long)]
    pub include: bool,
}

impl CallArgs {
    pub async fn execute(&self, method: HttpMethod, ctx: &AppContext) -> Result<()> {
        let fmt = ctx.formatter();
        let client = ctx.authenticated_client()?;
        let params: Params = self.params.iter().cloned().collect();

        debug!(%method, spot = %self.spot, params = params.len(), "Calling API");
        let response = client.call(method, &self.spot, params).await;

        match response.json().await {
            Ok(body) => {
                if self.include {
                    let status = response.status_code().await?;
                    let headers = response.headers().await?;
                    if ctx.format == OutputFormat::Json {
                        let headers: serde_json::Map<String, serde_json::Value> = headers
                            .into_iter()
                            .map(|(k, v)| (k, serde_json::Value::String(v)))
                            .collect();
                        fmt.print_json(&serde_json::json!({
                            "status": status,
                            "headers": headers,
                            "body": body,
                        }));
                        return Ok(());
                    }
                    println!("HTTP {status}");
                    for (name, value) in headers {
                        println!("{name}: {value}");
                    }
                    println!();
                }
                fmt.print_json(&body);
                Ok(())
            }
            Err(GowallaError::Api(api)) => {
                if ctx.format == OutputFormat::Json {
                    fmt.print_json(&serde_json::json!({
                        "success": false,
                        "kind": api.kind().to_string(),
                        "status": api.status(),
                        "message": api.message(),
                    }));
                } else {
                    fmt.error(&format!("{} (HTTP {})", api.kind(), api.status()));
                    if !api.message().is_empty() {
                        fmt.info(api.message());
                    }
                }
                Err(anyhow!("{method} {} failed with HTTP {}", self.spot, api.status()))
            }
            Err(err) => Err(anyhow!(err).context(format!("{method} {} failed", self.spot))),
        }
    }
}

/// Parses `key=value`; the value may itself contain `=`.
fn parse_key_val(s: &str) -> Result<(String, String), String> {
    let (key, value) = s
        .split_once('=')
        .ok_or_else(|| format!("invalid KEY=VALUE: no `=` found in `{s}`"))?;
    if key.is_empty() {
        return Err(format!("invalid KEY=VALUE: empty key in `{s}`"));
    }
    Ok((key.to_string(), value.to_string()))
}
