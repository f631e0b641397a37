//! Provider discovery and key retrieval.
//!
//! - [OpenID Connect Discovery 1.0](https://openid.net/specs/openid-connect-discovery-1_0.html)
//! - [RFC 7517](https://tools.ietf.org/html/rfc7517) key sets

use std::collections::BTreeMap;

use authd_model::{Provider, ProviderKey};
use authd_oidc::JsonWebKeySet;
use serde::Deserialize;
use tracing::{debug, warn};

use crate::config::FederationConfig;
use crate::error::ProviderError;

/// The parts of a discovery document the federation flow uses.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct ProviderDocument {
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
    pub response_types_supported: Vec<String>,
    /// Advertised scopes.
    pub scopes_supported: Vec<String>,
}

impl ProviderDocument {
    /// Builds a provider record for `domain` with the given credentials.
    #[must_use]
    pub fn into_provider(self, domain: &str, client_id: String, client_secret: String) -> Provider {
        let mut provider = Provider::new(domain);
        provider.issuer = self.issuer;
        provider.authorization_endpoint = self.authorization_endpoint;
        provider.token_endpoint = self.token_endpoint;
        provider.userinfo_endpoint = self.userinfo_endpoint;
        provider.jwks_uri = self.jwks_uri;
        provider.response_types_supported = self.response_types_supported;
        provider.scopes_supported = self.scopes_supported;
        provider.client_id = Some(client_id);
        provider.client_secret = Some(client_secret);
        provider
    }
}

/// Fetches the discovery document of `domain` and attaches our credentials.
///
/// # Errors
///
/// Returns [`ProviderError::RegistrationNeeded`] when no client is
/// configured for the domain, before any request is sent, and
/// [`ProviderError::Configuration`] on transport errors, a non-200 status or
/// a body that is not a JSON object.
pub async fn discover(
    http: &reqwest::Client,
    config: &FederationConfig,
    domain: &str,
) -> Result<Provider, ProviderError> {
    // Domains come from anonymous requests; only registered ones are fetched.
    let Some(registration) = config.clients.get(domain) else {
        warn!(domain, "no client registered with provider");
        return Err(ProviderError::RegistrationNeeded(format!(
            "Provider {domain} is not supported"
        )));
    };

    let url = config.discovery_url(domain);
    debug!(%url, "fetching provider configuration");

    let response = http.get(&url).send().await.map_err(|e| {
        ProviderError::Configuration(format!("Can't get configuration from {url}: {e}"))
    })?;

    if !response.status().is_success() {
        return Err(ProviderError::Configuration(format!(
            "Can't get configuration from {url}: response code is {}",
            response.status().as_u16()
        )));
    }

    let body: serde_json::Value = response.json().await.map_err(|e| {
        ProviderError::Configuration(format!("Can't get configuration from {url}: {e}"))
    })?;
    if !body.is_object() {
        return Err(ProviderError::Configuration(format!(
            "Invalid response while getting configuration for {domain}"
        )));
    }
    let document: ProviderDocument = serde_json::from_value(body).map_err(|e| {
        ProviderError::Configuration(format!(
            "Invalid response while getting configuration for {domain}: {e}"
        ))
    })?;

    Ok(document.into_provider(
        domain,
        registration.client_id.clone(),
        registration.client_secret.clone(),
    ))
}

/// Downloads a provider's key set, keeping complete RSA keys with a `kid`.
///
/// # Errors
///
/// Returns [`ProviderError::Configuration`] if the key set cannot be fetched
/// or parsed.
pub async fn fetch_keys(
    http: &reqwest::Client,
    jwks_uri: &str,
) -> Result<BTreeMap<String, ProviderKey>, ProviderError> {
    debug!(jwks_uri, "refreshing provider keys");

    let response = http
        .get(jwks_uri)
        .send()
        .await
        .and_then(reqwest::Response::error_for_status)
        .map_err(|e| ProviderError::Configuration(format!("Can't get keys from {jwks_uri}: {e}")))?;

    let jwks: JsonWebKeySet = response
        .json()
        .await
        .map_err(|e| ProviderError::Configuration(format!("Invalid key set at {jwks_uri}: {e}")))?;

    Ok(jwks
        .keys
        .iter()
        .filter(|key| key.is_signing_key())
        .filter_map(|key| {
            let kid = key.kid.clone()?;
            let (n, e) = key.rsa_components()?;
            Some((
                kid,
                ProviderKey {
                    kty: "RSA".to_string(),
                    alg: key.alg.clone(),
                    n: n.to_string(),
                    e: e.to_string(),
                },
            ))
        })
        .collect())
}

#[cfg(test)]
mod tests {
    use serde_json::json;
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    use super::*;

    const DISCOVERY: &str = "/.well-known/openid-configuration";

    fn config_for(server: &MockServer) -> (FederationConfig, String) {
        let domain = server.address().to_string();
        let config = FederationConfig::new("http://auth/cb")
            .with_protocol("http")
            .with_client(domain.clone(), "rp", "rp-secret");
        (config, domain)
    }

    #[tokio::test]
    async fn discovery_attaches_credentials() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path(DISCOVERY))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "issuer": server.uri(),
                "authorization_endpoint": format!("{}/authorize", server.uri()),
                "response_types_supported": ["code", "id_token"],
                "scopes_supported": ["openid", "email"],
                "claims_supported": ["sub"]
            })))
            .mount(&server)
            .await;

        let (config, domain) = config_for(&server);
        let provider = discover(&reqwest::Client::new(), &config, &domain).await.unwrap();
        assert!(provider.serves(&domain));
        assert_eq!(provider.client_id.as_deref(), Some("rp"));
        assert!(provider.supports_scope("openid"));
        assert!(provider.token_endpoint.is_none());
    }

    #[tokio::test]
    async fn discovery_failures_are_configuration_errors() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path(DISCOVERY))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!(["not", "an", "object"])))
            .mount(&server)
            .await;
        let (config, domain) = config_for(&server);
        let err = discover(&reqwest::Client::new(), &config, &domain).await.unwrap_err();
        assert!(matches!(err, ProviderError::Configuration(_)));

        let server = MockServer::start().await;
        let (config, domain) = config_for(&server);
        let err = discover(&reqwest::Client::new(), &config, &domain).await.unwrap_err();
        assert!(err.to_string().contains("response code is 404"));
    }

    #[tokio::test]
    async fn unregistered_domain_is_never_fetched() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({})))
            .expect(0)
            .mount(&server)
            .await;
        let config = FederationConfig::new("http://auth/cb").with_protocol("http");
        let domain = server.address().to_string();
        let err = discover(&reqwest::Client::new(), &config, &domain).await.unwrap_err();
        assert!(matches!(err, ProviderError::RegistrationNeeded(_)));
        assert_eq!(err.to_string(), format!("Provider {domain} is not supported"));
        assert!(server.received_requests().await.unwrap_or_default().is_empty());
    }

    #[tokio::test]
    async fn key_set_keeps_rsa_signing_keys() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/jwks"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "keys": [
                    {"kty": "RSA", "kid": "a", "n": "AQAB", "e": "AQAB", "use": "sig"},
                    {"kty": "RSA", "kid": "b", "n": "AQAB", "e": "AQAB", "use": "enc"},
                    {"kty": "EC", "kid": "c", "crv": "P-256", "x": "x", "y": "y"},
                    {"kty": "RSA", "n": "AQAB", "e": "AQAB"}
                ]
            })))
            .mount(&server)
            .await;

        let keys = fetch_keys(&reqwest::Client::new(), &format!("{}/jwks", server.uri()))
            .await
            .unwrap();
        assert_eq!(keys.keys().collect::<Vec<_>>(), vec!["a"]);
    }
}
