//! External OpenID provider.
//!
//! Providers are created on the first federation attempt for an unseen domain
//! from the domain's discovery document, then cached. Signing keys are
//! populated lazily from the provider's JWKS.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Public signing key of a provider, in JWK component form.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProviderKey {
    /// Key type, normally `RSA`.
    pub kty: String,
    /// Declared algorithm.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub alg: Option<String>,
    /// Modulus, base64url.
    pub n: String,
    /// Exponent, base64url.
    pub e: String,
}

/// An external OpenID provider.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Provider {
    /// Unique identifier.
    pub id: Uuid,
    /// Domains served by this provider, used for lookup.
    pub domains: Vec<String>,
    /// Issuer identifier.
    pub issuer: Option<String>,
    /// Authorization endpoint.
    pub authorization_endpoint: Option<String>,
    /// Token endpoint.
    pub token_endpoint: Option<String>,
    /// UserInfo endpoint.
    pub userinfo_endpoint: Option<String>,
    /// JWKS endpoint.
    pub jwks_uri: Option<String>,
    /// Advertised response types.
    #[serde(default)]
    pub response_types_supported: Vec<String>,
    /// Advertised scopes.
    #[serde(default)]
    pub scopes_supported: Vec<String>,
    /// Client id registered with the provider.
    pub client_id: Option<String>,
    /// Client secret registered with the provider.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub client_secret: Option<String>,
    /// Known signing keys by `kid`.
    #[serde(default)]
    pub keys: BTreeMap<String, ProviderKey>,
    /// When the provider was discovered.
    pub created_at: DateTime<Utc>,
}

impl Provider {
    /// Creates an empty provider for `domain`.
    #[must_use]
    pub fn new(domain: impl Into<String>) -> Self {
        Self {
            id: Uuid::now_v7(),
            domains: vec![domain.into()],
            issuer: None,
            authorization_endpoint: None,
            token_endpoint: None,
            userinfo_endpoint: None,
            jwks_uri: None,
            response_types_supported: Vec::new(),
            scopes_supported: Vec::new(),
            client_id: None,
            client_secret: None,
            keys: BTreeMap::new(),
            created_at: Utc::now(),
        }
    }

    /// Whether the provider serves `domain`.
    #[must_use]
    pub fn serves(&self, domain: &str) -> bool {
        self.domains.iter().any(|d| d == domain)
    }

    /// Whether `response_type` is advertised.
    #[must_use]
    pub fn supports_response_type(&self, response_type: &str) -> bool {
        self.response_types_supported.iter().any(|t| t == response_type)
    }

    /// Whether `scope` is advertised.
    #[must_use]
    pub fn supports_scope(&self, scope: &str) -> bool {
        self.scopes_supported.iter().any(|s| s == scope)
    }

    /// Signing key by id.
    #[must_use]
    pub fn key(&self, kid: &str) -> Option<&ProviderKey> {
        self.keys.get(kid)
    }

    /// Replaces the whole key set.
    pub fn replace_keys(&mut self, keys: BTreeMap<String, ProviderKey>) {
        self.keys = keys;
    }
}
