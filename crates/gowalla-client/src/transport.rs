//! HTTP transport seam
//!
//! The client builds [`HttpRequest`] values and hands them, together with a
//! [`TransportConfig`], to an [`HttpTransport`]. The transport returns a
//! [`RawHttpResult`] (status, headers, body) and nothing else: status codes
//! are never interpreted here.
//!
//! [`ReqwestTransport`] is the default implementation. Tests and embedders can
//! plug in their own through `GowallaClient::with_transport`.

use std::{
    fmt,
    net::IpAddr,
    sync::{Mutex, PoisonError},
    time::Duration,
};

use async_trait::async_trait;
use reqwest::{redirect::Policy, Client};
use tracing::debug;

use crate::error::{is_success_status, TransportError};

/// Default total request timeout (30 seconds)
pub const DEFAULT_REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

/// Default connection timeout (5 seconds)
pub const DEFAULT_CONNECT_TIMEOUT: Duration = Duration::from_secs(5);

/// Default redirect depth when redirects are followed
pub const DEFAULT_MAX_REDIRECTS: usize = 5;

/// User agent sent with every request
pub const DEFAULT_USER_AGENT: &str = concat!("gowalla-client/", env!("CARGO_PKG_VERSION"));

// ============================================================================
// Request / result types
// ============================================================================

/// HTTP methods the Gowalla API is called with
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum HttpMethod {
    Get,
    Post,
    Delete,
}

impl HttpMethod {
    pub fn as_str(&self) -> &'static str {
        match self {
            HttpMethod::Get => "GET",
            HttpMethod::Post => "POST",
            HttpMethod::Delete => "DELETE",
        }
    }

    /// Whether parameters for this method travel in the URL query
    pub fn uses_query(&self) -> bool {
        matches!(self, HttpMethod::Get | HttpMethod::Delete)
    }
}

impl fmt::Display for HttpMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl From<HttpMethod> for reqwest::Method {
    fn from(method: HttpMethod) -> Self {
        match method {
            HttpMethod::Get => reqwest::Method::GET,
            HttpMethod::Post => reqwest::Method::POST,
            HttpMethod::Delete => reqwest::Method::DELETE,
        }
    }
}

/// A fully assembled request: absolute URL, headers and optional form body
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HttpRequest {
    pub method: HttpMethod,
    pub url: String,
    pub headers: Vec<(String, String)>,
    pub body: Option<String>,
}

impl HttpRequest {
    /// Case-insensitive header lookup
    pub fn header(&self, name: &str) -> Option<&str> {
        find_header(&self.headers, name)
    }

    /// The URL with its query string removed, safe to log
    pub fn redacted_url(&self) -> &str {
        self.url.split('?').next().unwrap_or(&self.url)
    }
}

/// Status, headers and body of a completed exchange. Never mutated.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawHttpResult {
    pub status: u16,
    pub headers: Vec<(String, String)>,
    pub body: String,
}

impl RawHttpResult {
    pub fn new(status: u16, body: impl Into<String>) -> Self {
        Self {
            status,
            headers: Vec::new(),
            body: body.into(),
        }
    }

    pub fn with_header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.push((name.into(), value.into()));
        self
    }

    /// Case-insensitive header lookup
    pub fn header(&self, name: &str) -> Option<&str> {
        find_header(&self.headers, name)
    }

    /// `true` when the status is within `[200, 400)`
    pub fn is_success(&self) -> bool {
        is_success_status(self.status)
    }
}

fn find_header<'a>(headers: &'a [(String, String)], name: &str) -> Option<&'a str> {
    headers
        .iter()
        .find(|(key, _)| key.eq_ignore_ascii_case(name))
        .map(|(_, value)| value.as_str())
}

// ============================================================================
// TransportConfig
// ============================================================================

/// Settings passed to the transport with every request
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransportConfig {
    /// Maximum time to wait for the full response
    pub request_timeout: Duration,
    /// Maximum time to establish the connection
    pub connect_timeout: Duration,
    /// Follow `Location` redirects
    pub follow_redirects: bool,
    /// Redirect depth limit, only used when `follow_redirects` is set
    pub max_redirects: usize,
    /// Verify TLS certificates and host names
    pub verify_tls: bool,
    /// Local address to bind outgoing connections to
    pub bind_address: Option<IpAddr>,
    /// Value of the `User-Agent` header
    pub user_agent: String,
}

impl Default for TransportConfig {
    fn default() -> Self {
        Self {
            request_timeout: DEFAULT_REQUEST_TIMEOUT,
            connect_timeout: DEFAULT_CONNECT_TIMEOUT,
            follow_redirects: false,
            max_redirects: DEFAULT_MAX_REDIRECTS,
            verify_tls: false,
            bind_address: None,
            user_agent: DEFAULT_USER_AGENT.to_string(),
        }
    }
}

impl TransportConfig {
    /// The bind address to use, if any. Loopback addresses are ignored.
    pub fn effective_bind_address(&self) -> Option<IpAddr> {
        self.bind_address.filter(|addr| !addr.is_loopback())
    }

    fn redirect_policy(&self) -> Policy {
        if self.follow_redirects {
            Policy::limited(self.max_redirects)
        } else {
            Policy::none()
        }
    }

    fn build_client(&self) -> Result<Client, TransportError> {
        let mut builder = Client::builder()
            .timeout(self.request_timeout)
            .connect_timeout(self.connect_timeout)
            .redirect(self.redirect_policy())
            .danger_accept_invalid_certs(!self.verify_tls)
            .user_agent(self.user_agent.clone());

        if let Some(addr) = self.effective_bind_address() {
            builder = builder.local_address(addr);
        }

        builder
            .build()
            .map_err(|e| TransportError::Setup(e.to_string()))
    }
}

// ============================================================================
// HttpTransport
// ============================================================================

/// Performs the network exchange for a prepared request.
///
/// Implementations must return every HTTP status as `Ok`; only failures that
/// prevent a status from being received are `Err`.
#[async_trait]
pub trait HttpTransport: Send + Sync {
    async fn execute(
        &self,
        request: HttpRequest,
        config: &TransportConfig,
    ) -> Result<RawHttpResult, TransportError>;
}

/// [`HttpTransport`] backed by `reqwest`.
///
/// Keeps one `reqwest::Client` and rebuilds it when the config it was built
/// from changes (for example after `set_timeout`).
#[derive(Default)]
pub struct ReqwestTransport {
    cached: Mutex<Option<(TransportConfig, Client)>>,
}

impl ReqwestTransport {
    pub fn new() -> Self {
        Self::default()
    }

    fn client_for(&self, config: &TransportConfig) -> Result<Client, TransportError> {
        let mut cached = self.cached.lock().unwrap_or_else(PoisonError::into_inner);

        if let Some((built_from, client)) = cached.as_ref() {
            if built_from == config {
                return Ok(client.clone());
            }
        }

        debug!(
            request_timeout_ms = config.request_timeout.as_millis(),
            connect_timeout_ms = config.connect_timeout.as_millis(),
            follow_redirects = config.follow_redirects,
            verify_tls = config.verify_tls,
            "Building HTTP client"
        );
        let client = config.build_client()?;
        *cached = Some((config.clone(), client.clone()));
        Ok(client)
    }
}

impl fmt::Debug for ReqwestTransport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ReqwestTransport").finish_non_exhaustive()
    }
}

#[async_trait]
impl HttpTransport for ReqwestTransport {
    async fn execute(
        &self,
        request: HttpRequest,
        config: &TransportConfig,
    ) -> Result<RawHttpResult, TransportError> {
        let client = self.client_for(config)?;

        let mut builder = client.request(request.method.into(), &request.url);
        for (name, value) in &request.headers {
            builder = builder.header(name.as_str(), value.as_str());
        }
        if let Some(body) = request.body {
            builder = builder.body(body);
        }

        let response = builder.send().await?;
        let status = response.status().as_u16();
        let headers = response
            .headers()
            .iter()
            .map(|(name, value)| {
                (
                    name.as_str().to_string(),
                    String::from_utf8_lossy(value.as_bytes()).into_owned(),
                )
            })
            .collect();
        let body = response.text().await?;

        Ok(RawHttpResult {
            status,
            headers,
            body,
        })
    }
}
