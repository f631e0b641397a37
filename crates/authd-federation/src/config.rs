//! Federation configuration.

use std::collections::HashMap;
use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Default timeout for calls to providers.
pub const DEFAULT_HTTP_TIMEOUT: Duration = Duration::from_secs(10);

/// Client credentials registered with a provider.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClientRegistration {
    /// Client id at the provider.
    pub client_id: String,
    /// Client secret at the provider.
    pub client_secret: String,
}

/// Federation settings.
#[derive(Debug, Clone)]
pub struct FederationConfig {
    /// Scheme used to fetch discovery documents (`https`, or `http` in tests).
    pub provider_protocol: String,
    /// Absolute URL of our federation callback, sent as `redirect_uri`.
    pub callback_uri: String,
    /// Bound on every outbound request.
    pub http_timeout: Duration,
    /// Client credentials by provider domain.
    pub clients: HashMap<String, ClientRegistration>,
}

impl FederationConfig {
    /// Creates a config with no registered providers.
    #[must_use]
    pub fn new(callback_uri: impl Into<String>) -> Self {
        Self {
            provider_protocol: "https".to_string(),
            callback_uri: callback_uri.into(),
            http_timeout: DEFAULT_HTTP_TIMEOUT,
            clients: HashMap::new(),
        }
    }

    /// Registers client credentials for `domain`.
    #[must_use]
    pub fn with_client(
        mut self,
        domain: impl Into<String>,
        client_id: impl Into<String>,
        client_secret: impl Into<String>,
    ) -> Self {
        self.clients.insert(
            domain.into(),
            ClientRegistration {
                client_id: client_id.into(),
                client_secret: client_secret.into(),
            },
        );
        self
    }

    /// Sets the discovery scheme.
    #[must_use]
    pub fn with_protocol(mut self, protocol: impl Into<String>) -> Self {
        self.provider_protocol = protocol.into();
        self
    }

    /// Discovery document URL for `domain`.
    #[must_use]
    pub fn discovery_url(&self, domain: &str) -> String {
        format!(
            "{}://{domain}/.well-known/openid-configuration",
            self.provider_protocol
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn discovery_url_uses_protocol() {
        let config = FederationConfig::new("https://auth/cb");
        assert_eq!(
            config.discovery_url("idp.example"),
            "https://idp.example/.well-known/openid-configuration"
        );
        let config = config.with_protocol("http");
        assert_eq!(
            config.discovery_url("127.0.0.1:8080"),
            "http://127.0.0.1:8080/.well-known/openid-configuration"
        );
    }
}
