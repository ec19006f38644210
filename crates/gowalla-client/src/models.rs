//! Typed views over Gowalla responses
//!
//! Every field is optional: the service omits fields freely and these structs
//! are projections, not schemas. Use them through
//! [`LazyResponse::parse`](crate::LazyResponse::parse).

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

/// Lifetime assumed when the token endpoint does not send `expires_in`
const DEFAULT_TOKEN_LIFETIME_SECS: i64 = 3600;

/// Body returned by the OAuth token endpoint
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TokenResponse {
    pub access_token: String,
    #[serde(default)]
    pub refresh_token: Option<String>,
    /// Lifetime of the access token in seconds
    #[serde(default)]
    pub expires_in: Option<u64>,
    #[serde(default)]
    pub token_type: Option<String>,
    #[serde(default)]
    pub scope: Option<String>,
    /// Profile URL of the user who granted access
    #[serde(default)]
    pub username: Option<String>,
}

impl TokenResponse {
    /// Absolute expiry computed from `issued_at`.
    ///
    /// Falls back to one hour when the service did not send `expires_in` or
    /// sent a lifetime too large to represent. Never panics; the result
    /// saturates at `DateTime::<Utc>::MAX_UTC`.
    pub fn expires_at(&self, issued_at: DateTime<Utc>) -> DateTime<Utc> {
        let lifetime = self
            .expires_in
            .and_then(|s| i64::try_from(s).ok())
            .and_then(Duration::try_seconds)
            .unwrap_or_else(|| Duration::seconds(DEFAULT_TOKEN_LIFETIME_SECS));
        issued_at
            .checked_add_signed(lifetime)
            .unwrap_or(DateTime::<Utc>::MAX_UTC)
    }
}

/// A place users check in to
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Spot {
    #[serde(default)]
    pub id: Option<u64>,
    /// Resource path, e.g. `/spots/18568`
    #[serde(default)]
    pub url: Option<String>,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub lat: Option<f64>,
    #[serde(default)]
    pub lng: Option<f64>,
    #[serde(default)]
    pub radius_meters: Option<u32>,
    #[serde(default)]
    pub checkins_count: Option<u64>,
    #[serde(default)]
    pub users_count: Option<u64>,
}

/// A Gowalla user profile
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct User {
    /// Resource path, e.g. `/users/sco`
    #[serde(default)]
    pub url: Option<String>,
    #[serde(default)]
    pub first_name: Option<String>,
    #[serde(default)]
    pub last_name: Option<String>,
    #[serde(default)]
    pub hometown: Option<String>,
    #[serde(default)]
    pub bio: Option<String>,
    #[serde(default)]
    pub pins_count: Option<u64>,
    #[serde(default)]
    pub stamps_count: Option<u64>,
}

impl User {
    /// "First Last", skipping missing parts
    pub fn display_name(&self) -> Option<String> {
        let parts: Vec<&str> = [self.first_name.as_deref(), self.last_name.as_deref()]
            .into_iter()
            .flatten()
            .filter(|s| !s.is_empty())
            .collect();
        (!parts.is_empty()).then(|| parts.join(" "))
    }
}
