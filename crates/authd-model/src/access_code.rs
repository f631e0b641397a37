//! Authorization codes (RFC 6749 §4.1.2).

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

/// Lifetime of an authorization code in seconds.
pub const ACCESS_CODE_LIFETIME_SECS: i64 = 600;

/// A single-use authorization code.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AccessCode {
    /// The code value handed to the client.
    pub code: String,
    /// Client the code was issued to.
    pub client_id: String,
    /// Subject of the authenticated resource owner.
    pub owner: String,
    /// Redirect URI the code was delivered to.
    pub redirect_uri: String,
    /// Granted scopes.
    pub scopes: Vec<String>,
    /// Nonce from the authorization request.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub nonce: Option<String>,
    /// Issue time.
    pub created_at: DateTime<Utc>,
    /// Whether the code has been redeemed.
    pub used: bool,
}

impl AccessCode {
    /// Creates a fresh, unused code.
    #[must_use]
    pub fn new(
        code: impl Into<String>,
        client_id: impl Into<String>,
        owner: impl Into<String>,
        redirect_uri: impl Into<String>,
        scopes: Vec<String>,
    ) -> Self {
        Self {
            code: code.into(),
            client_id: client_id.into(),
            owner: owner.into(),
            redirect_uri: redirect_uri.into(),
            scopes,
            nonce: None,
            created_at: Utc::now(),
            used: false,
        }
    }

    /// Sets the nonce.
    #[must_use]
    pub fn with_nonce(mut self, nonce: Option<String>) -> Self {
        self.nonce = nonce;
        self
    }

    /// Expiry time.
    #[must_use]
    pub fn expires_at(&self) -> DateTime<Utc> {
        self.created_at + Duration::seconds(ACCESS_CODE_LIFETIME_SECS)
    }

    /// Whether the code is expired at `now`.
    #[must_use]
    pub fn is_expired_at(&self, now: DateTime<Utc>) -> bool {
        self.expires_at() < now
    }

    /// Whether the code is expired now.
    #[must_use]
    pub fn is_expired(&self) -> bool {
        self.is_expired_at(Utc::now())
    }
}
