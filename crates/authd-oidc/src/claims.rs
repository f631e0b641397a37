//! JWT claim sets issued by the server.
//!
//! - RFC 7519 (JSON Web Token)
//! - `OpenID` Connect Core 1.0 §2 (ID Token)

use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};

/// Access token claims.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AccessTokenClaims {
    /// Issuer.
    pub iss: String,
    /// Resource owner subject.
    pub sub: String,
    /// Client the token was issued to.
    pub aud: String,
    /// Issued at (Unix timestamp).
    pub iat: i64,
    /// Expiration time (Unix timestamp).
    pub exp: i64,
    /// Granted scopes.
    pub scope: Vec<String>,
}

impl AccessTokenClaims {
    /// Granted scopes as a set.
    #[must_use]
    pub fn scopes(&self) -> BTreeSet<String> {
        self.scope.iter().cloned().collect()
    }
}

/// ID token claims.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IdTokenClaims {
    /// Issuer.
    pub iss: String,
    /// Subject.
    pub sub: String,
    /// Client the token was issued to.
    pub aud: String,
    /// Issued at (Unix timestamp).
    pub iat: i64,
    /// Expiration time (Unix timestamp).
    pub exp: i64,
    /// Nonce from the authorization request.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub nonce: Option<String>,
    /// Access token hash, when an access token was issued alongside.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub at_hash: Option<String>,
}
