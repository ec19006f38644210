//! Gowalla API client
//!
//! Builds authorization URLs, performs OAuth token exchanges and issues
//! authenticated GET/POST/DELETE calls. Every call returns a
//! [`LazyResponse`]; nothing here inspects status codes.
//!
//! ## Usage
//!
//! ```rust,no_run
//! use gowalla_client::{GowallaClient, Params};
//!
//! # async fn example() -> Result<(), gowalla_client::GowallaError> {
//! let mut client = GowallaClient::new("client-id", "client-secret");
//! println!("Visit {}", client.authorization_url("https://app.example/cb"));
//!
//! // ... user comes back with ?code=...
//! let token = client.exchange_code("the-code", "https://app.example/cb").await;
//! let access_token: String = token.field("access_token").await?.unwrap_or_default();
//! client.set_access_token(access_token);
//!
//! let spots = client
//!     .get("/spots", Params::new().with("lat", "30.27").with("lng", "-97.74"))
//!     .await;
//! println!("{} spots nearby", spots.count().await?);
//! # Ok(())
//! # }
//! ```

use std::{collections::BTreeMap, fmt, sync::Arc, time::Duration};

use oauth2::{AccessToken, ClientId, ClientSecret};
use tokio_util::task::TaskTracker;
use tracing::{debug, info};
use url::form_urlencoded;

use crate::{
    config::{ClientConfig, DispatchMode, Endpoints},
    error::GowallaError,
    response::{LazyResponse, RequestLabel},
    transport::{HttpMethod, HttpRequest, HttpTransport, ReqwestTransport, TransportConfig},
};

const ACCEPT_JSON: (&str, &str) = ("Accept", "application/json");
const FORM_CONTENT_TYPE: (&str, &str) = ("Content-Type", "application/x-www-form-urlencoded");

// ============================================================================
// Params
// ============================================================================

/// Request parameters. Order is irrelevant; keys are unique.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Params(BTreeMap<String, String>);

impl Params {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder-style insert
    pub fn with(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.insert(key, value);
        self
    }

    pub fn insert(&mut self, key: impl Into<String>, value: impl Into<String>) -> Option<String> {
        self.0.insert(key.into(), value.into())
    }

    pub fn remove(&mut self, key: &str) -> Option<String> {
        self.0.remove(key)
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        self.0.get(key).map(String::as_str)
    }

    pub fn contains_key(&self, key: &str) -> bool {
        self.0.contains_key(key)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.0.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    /// `application/x-www-form-urlencoded` serialization
    pub fn encode(&self) -> String {
        form_urlencoded::Serializer::new(String::new())
            .extend_pairs(self.iter())
            .finish()
    }
}

impl<K: Into<String>, V: Into<String>> FromIterator<(K, V)> for Params {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        Self(
            iter.into_iter()
                .map(|(k, v)| (k.into(), v.into()))
                .collect(),
        )
    }
}

impl<K: Into<String>, V: Into<String>, const N: usize> From<[(K, V); N]> for Params {
    fn from(pairs: [(K, V); N]) -> Self {
        pairs.into_iter().collect()
    }
}

// ============================================================================
// Credentials
// ============================================================================

/// Application credentials plus the optional user access token.
///
/// Secrets are redacted in `Debug` output.
#[derive(Debug, Clone)]
struct Credentials {
    client_id: ClientId,
    client_secret: ClientSecret,
    access_token: Option<AccessToken>,
}

// ============================================================================
// GowallaClient
// ============================================================================

/// HTTP client for the Gowalla API.
///
/// Holds credentials and transport settings; those are the only state shared
/// between calls. Setters take `&mut self`, so concurrent mutation needs
/// external synchronization.
pub struct GowallaClient {
    credentials: Credentials,
    endpoints: Endpoints,
    transport: Arc<dyn HttpTransport>,
    transport_config: TransportConfig,
    dispatch: DispatchMode,
    /// Background requests and drains of dropped responses
    tracker: TaskTracker,
}

impl GowallaClient {
    /// Creates a client with default endpoints, blocking dispatch and the
    /// `reqwest` transport.
    pub fn new(client_id: impl Into<String>, client_secret: impl Into<String>) -> Self {
        Self {
            credentials: Credentials {
                client_id: ClientId::new(client_id.into()),
                client_secret: ClientSecret::new(client_secret.into()),
                access_token: None,
            },
            endpoints: Endpoints::default(),
            transport: Arc::new(ReqwestTransport::new()),
            transport_config: TransportConfig::default(),
            dispatch: DispatchMode::default(),
            tracker: TaskTracker::new(),
        }
    }

    /// Creates a client from a loaded configuration.
    ///
    /// Fails with [`GowallaError::Config`] when the configuration does not
    /// validate or lacks the client id or secret.
    pub fn from_config(config: &ClientConfig) -> Result<Self, GowallaError> {
        let errors = config.validate();
        if !errors.is_empty() {
            let joined = errors
                .iter()
                .map(ToString::to_string)
                .collect::<Vec<_>>()
                .join("; ");
            return Err(GowallaError::Config(joined));
        }

        let client_id = config
            .credentials
            .client_id
            .clone()
            .ok_or_else(|| GowallaError::Config("credentials.client_id is required".into()))?;
        let client_secret = config
            .credentials
            .client_secret
            .clone()
            .ok_or_else(|| GowallaError::Config("credentials.client_secret is required".into()))?;

        let mut client = Self::new(client_id, client_secret).with_endpoints(config.endpoints.clone());
        client.transport_config = config.transport.to_transport_config();
        client.dispatch = config.dispatch;
        if let Some(token) = &config.credentials.access_token {
            client.set_access_token(token.clone());
        }
        Ok(client)
    }

    /// Replaces the service URLs (useful for testing)
    pub fn with_endpoints(mut self, endpoints: Endpoints) -> Self {
        self.endpoints = endpoints;
        self
    }

    /// Replaces the transport
    pub fn with_transport(mut self, transport: Arc<dyn HttpTransport>) -> Self {
        self.transport = transport;
        self
    }

    /// Starts with an access token already set
    pub fn with_access_token(mut self, token: impl Into<String>) -> Self {
        self.set_access_token(token);
        self
    }

    /// Stores an access token; later calls authenticate with `oauth_token`.
    pub fn set_access_token(&mut self, token: impl Into<String>) -> &mut Self {
        self.credentials.access_token = Some(AccessToken::new(token.into()));
        debug!("Updated GowallaClient access token");
        self
    }

    /// Drops the access token; later calls fall back to client credentials.
    pub fn clear_access_token(&mut self) -> &mut Self {
        self.credentials.access_token = None;
        self
    }

    /// Returns the current access token, if any
    pub fn access_token(&self) -> Option<&str> {
        self.credentials
            .access_token
            .as_ref()
            .map(|t| t.secret().as_str())
    }

    pub fn client_id(&self) -> &str {
        self.credentials.client_id.as_str()
    }

    pub fn endpoints(&self) -> &Endpoints {
        &self.endpoints
    }

    /// Updates the request and/or connection timeout; `None` leaves a value unchanged.
    pub fn set_timeout(&mut self, request: Option<Duration>, connect: Option<Duration>) {
        if let Some(timeout) = request {
            self.transport_config.request_timeout = timeout;
        }
        if let Some(timeout) = connect {
            self.transport_config.connect_timeout = timeout;
        }
    }

    pub fn transport_config(&self) -> &TransportConfig {
        &self.transport_config
    }

    pub fn set_transport_config(&mut self, config: TransportConfig) {
        self.transport_config = config;
    }

    /// Switches between background (`true`) and blocking (`false`) dispatch.
    pub fn set_asynchronous(&mut self, asynchronous: bool) {
        self.dispatch = if asynchronous {
            DispatchMode::Background
        } else {
            DispatchMode::Blocking
        };
    }

    pub fn set_dispatch_mode(&mut self, mode: DispatchMode) {
        self.dispatch = mode;
    }

    pub fn dispatch_mode(&self) -> DispatchMode {
        self.dispatch
    }

    // ------------------------------------------------------------------------
    // OAuth
    // ------------------------------------------------------------------------

    /// URL the user must visit to grant this application access.
    pub fn authorization_url(&self, redirect_uri: &str) -> String {
        let query = form_urlencoded::Serializer::new(String::new())
            .append_pair("client_id", self.client_id())
            .append_pair("response_type", "code")
            .append_pair("redirect_uri", redirect_uri)
            .finish();
        format!("{}?{}", self.endpoints.authorize_url, query)
    }

    /// Exchanges an authorization code for an access token.
    ///
    /// The response body can be projected into
    /// [`TokenResponse`](crate::models::TokenResponse).
    pub async fn exchange_code(&self, code: &str, redirect_uri: &str) -> LazyResponse {
        info!("Exchanging authorization code for access token");
        let request = self.token_request(
            Params::new()
                .with("grant_type", "authorization_code")
                .with("redirect_uri", redirect_uri)
                .with("code", code),
        );
        self.send(request).await
    }

    /// Obtains a fresh access token from a refresh token.
    pub async fn refresh_access_token(&self, refresh_token: &str) -> LazyResponse {
        info!("Refreshing access token");
        let request = self.token_request(
            Params::new()
                .with("grant_type", "refresh_token")
                .with("refresh_token", refresh_token),
        );
        self.send(request).await
    }

    /// Token requests carry client credentials and never `oauth_token`.
    fn token_request(&self, mut params: Params) -> HttpRequest {
        params.insert("client_id", self.client_id());
        params.insert("client_secret", self.credentials.client_secret.secret().as_str());
        compose_request(HttpMethod::Post, self.endpoints.token_url.clone(), &params)
    }

    // ------------------------------------------------------------------------
    // API calls
    // ------------------------------------------------------------------------

    pub async fn get(&self, spot: &str, params: Params) -> LazyResponse {
        self.call(HttpMethod::Get, spot, params).await
    }

    pub async fn post(&self, spot: &str, params: Params) -> LazyResponse {
        self.call(HttpMethod::Post, spot, params).await
    }

    pub async fn delete(&self, spot: &str, params: Params) -> LazyResponse {
        self.call(HttpMethod::Delete, spot, params).await
    }

    /// Builds and sends an authenticated request
    pub async fn call(&self, method: HttpMethod, spot: &str, params: Params) -> LazyResponse {
        let request = self.build_request(method, spot, params);
        self.send(request).await
    }

    /// Assembles an authenticated request without sending it.
    ///
    /// - `spot` is used verbatim when it is an absolute URL, otherwise it is
    ///   appended to the API base.
    /// - With an access token, `oauth_token` is injected; without one,
    ///   `client_id` and `client_secret` are. Never both.
    /// - GET and DELETE carry parameters in the query, POST in a form body.
    pub fn build_request(&self, method: HttpMethod, spot: &str, mut params: Params) -> HttpRequest {
        match &self.credentials.access_token {
            Some(token) => {
                params.remove("client_id");
                params.remove("client_secret");
                params.insert("oauth_token", token.secret().as_str());
            }
            None => {
                params.remove("oauth_token");
                params.insert("client_id", self.client_id());
                params.insert("client_secret", self.credentials.client_secret.secret().as_str());
            }
        }

        compose_request(method, self.resolve_url(spot), &params)
    }

    fn resolve_url(&self, spot: &str) -> String {
        if is_absolute_url(spot) {
            return spot.to_string();
        }
        let base = self.endpoints.api_base.trim_end_matches('/');
        if spot.starts_with('/') {
            format!("{base}{spot}")
        } else {
            format!("{base}/{spot}")
        }
    }

    /// Dispatches a prepared request according to the dispatch mode.
    pub async fn send(&self, request: HttpRequest) -> LazyResponse {
        let label = RequestLabel::for_request(&request);
        debug!(request = %label, mode = ?self.dispatch, "Dispatching request");

        let transport = Arc::clone(&self.transport);
        let config = self.transport_config.clone();

        match self.dispatch {
            DispatchMode::Blocking => {
                let result = transport.execute(request, &config).await;
                LazyResponse::completed(label, result)
            }
            DispatchMode::Background => {
                let handle = self
                    .tracker
                    .spawn(async move { transport.execute(request, &config).await });
                LazyResponse::spawned(label, handle, self.tracker.clone())
            }
        }
    }

    // ------------------------------------------------------------------------
    // Background work
    // ------------------------------------------------------------------------

    /// Number of background requests and drains still running
    pub fn pending_count(&self) -> usize {
        self.tracker.len()
    }

    /// Waits until every background request, including those whose responses
    /// were dropped unobserved, has completed.
    pub async fn drain_pending(&self) {
        self.tracker.close();
        self.tracker.wait().await;
        self.tracker.reopen();
    }
}

impl fmt::Debug for GowallaClient {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("GowallaClient")
            .field("credentials", &self.credentials)
            .field("endpoints", &self.endpoints)
            .field("transport_config", &self.transport_config)
            .field("dispatch", &self.dispatch)
            .finish_non_exhaustive()
    }
}

/// `scheme://...` where the scheme is RFC 3986 shaped
fn is_absolute_url(spot: &str) -> bool {
    let Some((scheme, _)) = spot.split_once("://") else {
        return false;
    };
    let mut chars = scheme.chars();
    chars.next().is_some_and(|c| c.is_ascii_alphabetic())
        && chars.all(|c| c.is_ascii_alphanumeric() || matches!(c, '+' | '-' | '.'))
}

fn compose_request(method: HttpMethod, mut url: String, params: &Params) -> HttpRequest {
    let mut headers = vec![(ACCEPT_JSON.0.to_string(), ACCEPT_JSON.1.to_string())];

    let body = if method.uses_query() {
        if !params.is_empty() {
            url.push(if url.contains('?') { '&' } else { '?' });
            url.push_str(&params.encode());
        }
        None
    } else {
        headers.push((FORM_CONTENT_TYPE.0.to_string(), FORM_CONTENT_TYPE.1.to_string()));
        Some(params.encode())
    };

    HttpRequest {
        method,
        url,
        headers,
        body,
    }
}
