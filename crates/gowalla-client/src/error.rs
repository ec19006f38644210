//! Error types for the Gowalla client
//!
//! Three layers of failure are kept apart:
//!
//! - [`ApiError`] - the service answered with a status outside `[200, 400)`.
//!   Built only by [`classify`], carrying the raw body as its message.
//! - [`TransportError`] - the request never produced a status (timeout,
//!   refused connection, TLS failure, aborted background task).
//! - [`GowallaError`] - what response accessors return; wraps the two above
//!   plus body parsing and configuration problems.
//!
//! Every type here is `Clone` so a failed response can hand out the same
//! error on each access.

use std::fmt;

use thiserror::Error;

// ============================================================================
// ApiError
// ============================================================================

/// Classification of a non-success HTTP status
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ApiErrorKind {
    /// 400 - the request was malformed or missing parameters
    BadRequest,
    /// 401 - the token or client credentials were rejected
    Unauthorized,
    /// 403 - authenticated, but not allowed to touch the resource
    Forbidden,
    /// 404 - the spot or resource does not exist
    NotFound,
    /// Any other status below 200 or at/above 400
    Generic,
}

impl ApiErrorKind {
    /// Maps a status code to its kind. Success codes map to `Generic`;
    /// callers are expected to check [`is_success_status`] first.
    pub fn from_status(status: u16) -> Self {
        match status {
            400 => ApiErrorKind::BadRequest,
            401 => ApiErrorKind::Unauthorized,
            403 => ApiErrorKind::Forbidden,
            404 => ApiErrorKind::NotFound,
            _ => ApiErrorKind::Generic,
        }
    }
}

impl fmt::Display for ApiErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ApiErrorKind::BadRequest => "Bad request",
            ApiErrorKind::Unauthorized => "Unauthorized",
            ApiErrorKind::Forbidden => "Forbidden",
            ApiErrorKind::NotFound => "Not found",
            ApiErrorKind::Generic => "API error",
        };
        f.write_str(name)
    }
}

/// An error response from the Gowalla API
#[derive(Debug, Clone, Error, PartialEq, Eq)]
#[error("{kind} (HTTP {status}): {message}")]
pub struct ApiError {
    kind: ApiErrorKind,
    status: u16,
    message: String,
}

impl ApiError {
    /// The classified kind; match on this to decide how to react
    pub fn kind(&self) -> ApiErrorKind {
        self.kind
    }

    /// The HTTP status code the service returned
    pub fn status(&self) -> u16 {
        self.status
    }

    /// The raw response body, exactly as the service sent it
    pub fn message(&self) -> &str {
        &self.message
    }
}

/// Returns `true` for statuses the client treats as success: `[200, 400)`.
pub fn is_success_status(status: u16) -> bool {
    (200..400).contains(&status)
}

/// Maps a status code and raw body to an [`ApiError`].
///
/// Pure: the body is not parsed, it becomes the message verbatim.
pub fn classify(status: u16, body: &str) -> ApiError {
    ApiError {
        kind: ApiErrorKind::from_status(status),
        status,
        message: body.to_string(),
    }
}

// ============================================================================
// TransportError
// ============================================================================

/// Failures below the HTTP layer, surfaced as-is and never reclassified
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum TransportError {
    /// The request or connection timeout elapsed
    #[error("Request timed out: {0}")]
    Timeout(String),

    /// The connection could not be established
    #[error("Connection failed: {0}")]
    Connect(String),

    /// The HTTP client could not be built from the transport settings
    #[error("Transport setup failed: {0}")]
    Setup(String),

    /// The background task running the request panicked or was cancelled
    #[error("Request aborted: {0}")]
    Aborted(String),

    /// Any other network-level error
    #[error("Network error: {0}")]
    Other(String),
}

impl From<reqwest::Error> for TransportError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            TransportError::Timeout(err.to_string())
        } else if err.is_connect() {
            TransportError::Connect(err.to_string())
        } else if err.is_builder() {
            TransportError::Setup(err.to_string())
        } else {
            TransportError::Other(err.to_string())
        }
    }
}

impl From<tokio::task::JoinError> for TransportError {
    fn from(err: tokio::task::JoinError) -> Self {
        TransportError::Aborted(err.to_string())
    }
}

// ============================================================================
// GowallaError
// ============================================================================

/// Errors returned when inspecting a response or configuring a client
#[derive(Debug, Clone, Error)]
pub enum GowallaError {
    /// The service answered with an error status
    #[error(transparent)]
    Api(#[from] ApiError),

    /// The request never completed at the HTTP level
    #[error(transparent)]
    Transport(#[from] TransportError),

    /// A success status carried a body that is not valid JSON
    #[error("Invalid response (HTTP {status}): {message}")]
    InvalidResponse {
        /// Status of the response whose body failed to parse
        status: u16,
        /// Parser error description
        message: String,
    },

    /// The key does not fit the shape of the parsed body
    #[error("Key mismatch: {0}")]
    KeyMismatch(String),

    /// A typed projection of the body failed
    #[error("Deserialization failed: {0}")]
    Deserialize(String),

    /// The client configuration is incomplete or invalid
    #[error("Invalid configuration: {0}")]
    Config(String),
}

impl GowallaError {
    /// Returns the API error if this failure came from an error status
    pub fn api_error(&self) -> Option<&ApiError> {
        match self {
            GowallaError::Api(err) => Some(err),
            _ => None,
        }
    }

    /// Shorthand for `api_error().map(ApiError::kind)`
    pub fn api_kind(&self) -> Option<ApiErrorKind> {
        self.api_error().map(ApiError::kind)
    }
}
