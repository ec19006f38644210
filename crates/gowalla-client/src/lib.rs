//! Gowalla Client - async client for the Gowalla REST API
//!
//! Provides:
//! - OAuth2 authorization URL construction and token exchange/refresh
//! - Authenticated GET/POST/DELETE calls with automatic credential injection
//! - Lazily evaluated JSON responses that classify HTTP errors on first access
//! - Blocking or background dispatch of requests
//!
//! ## Modules
//!
//! - [`client`] - request building, OAuth calls and dispatch
//! - [`response`] - [`LazyResponse`] and its accessors
//! - [`transport`] - the HTTP seam and its `reqwest` implementation
//! - [`config`] - YAML configuration with validation
//! - [`error`] - error classification
//! - [`models`] - typed views over common response bodies

pub mod client;
pub mod config;
pub mod error;
pub mod models;
pub mod response;
pub mod transport;

pub use client::{GowallaClient, Params};
pub use config::{ClientConfig, DispatchMode, Endpoints};
pub use error::{classify, ApiError, ApiErrorKind, GowallaError, TransportError};
pub use response::{Entries, Entry, Key, LazyResponse, Phase};
pub use transport::{
    HttpMethod, HttpRequest, HttpTransport, RawHttpResult, ReqwestTransport, TransportConfig,
};
