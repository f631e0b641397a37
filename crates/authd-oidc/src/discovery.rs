//! `OpenID` Connect Discovery 1.0 implementation.
//!
//! Implements the `OpenID` Provider Metadata as defined in:
//! - [OpenID Connect Discovery 1.0](https://openid.net/specs/openid-connect-discovery-1_0.html)
//! - [RFC 8414](https://tools.ietf.org/html/rfc8414) (OAuth 2.0 Authorization Server Metadata)

use serde::{Deserialize, Serialize};

use crate::endpoints::{AUTHORIZE_PATH, JWKS_PATH, TOKEN_PATH, USERINFO_PATH};
use crate::jwks::RS256;
use crate::types::{GrantType, ResponseMode};

/// `OpenID` Provider Metadata.
///
/// This is returned by the `.well-known/openid-configuration` endpoint.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProviderMetadata {
    /// Issuer identifier.
    pub issuer: String,

    /// URL of the authorization endpoint.
    pub authorization_endpoint: String,

    /// URL of the token endpoint.
    pub token_endpoint: String,

    /// URL of the `UserInfo` endpoint.
    pub userinfo_endpoint: String,

    /// URL of the JSON Web Key Set document.
    pub jwks_uri: String,

    /// Supported response type combinations.
    pub response_types_supported: Vec<String>,

    /// Supported response modes.
    pub response_modes_supported: Vec<ResponseMode>,

    /// Supported subject types.
    pub subject_types_supported: Vec<String>,

    /// Supported signing algorithms for ID tokens.
    pub id_token_signing_alg_values_supported: Vec<String>,

    /// Supported scopes.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub scopes_supported: Option<Vec<String>>,

    /// Supported grant types.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub grant_types_supported: Option<Vec<String>>,

    /// Supported client authentication methods at the token endpoint.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub token_endpoint_auth_methods_supported: Option<Vec<String>>,
}

/// Builder for creating `ProviderMetadata`.
#[derive(Debug, Clone)]
pub struct ProviderMetadataBuilder {
    issuer: String,
    base_url: String,
    scopes: Option<Vec<String>>,
}

impl ProviderMetadataBuilder {
    /// Creates a builder. Endpoint URLs are rooted at `base_url`.
    #[must_use]
    pub fn new(issuer: impl Into<String>, base_url: impl Into<String>) -> Self {
        Self {
            issuer: issuer.into(),
            base_url: base_url.into().trim_end_matches('/').to_string(),
            scopes: None,
        }
    }

    /// Advertises these scopes.
    #[must_use]
    pub fn scopes_supported(mut self, scopes: Vec<String>) -> Self {
        self.scopes = Some(scopes);
        self
    }

    /// Builds the provider metadata.
    #[must_use]
    pub fn build(self) -> ProviderMetadata {
        let base = self.base_url;
        ProviderMetadata {
            issuer: self.issuer,
            authorization_endpoint: format!("{base}{AUTHORIZE_PATH}"),
            token_endpoint: format!("{base}{TOKEN_PATH}"),
            userinfo_endpoint: format!("{base}{USERINFO_PATH}"),
            jwks_uri: format!("{base}{JWKS_PATH}"),
            response_types_supported: [
                "code",
                "token",
                "id_token",
                "code token",
                "code id_token",
                "id_token token",
                "code id_token token",
            ]
            .into_iter()
            .map(String::from)
            .collect(),
            response_modes_supported: vec![ResponseMode::Query, ResponseMode::Fragment],
            subject_types_supported: vec!["public".to_string()],
            id_token_signing_alg_values_supported: vec![RS256.to_string()],
            scopes_supported: self.scopes,
            grant_types_supported: Some(vec![
                GrantType::AuthorizationCode.as_str().to_string(),
                "implicit".to_string(),
            ]),
            token_endpoint_auth_methods_supported: Some(vec![
                "client_secret_basic".to_string(),
                "client_secret_post".to_string(),
            ]),
        }
    }
}
