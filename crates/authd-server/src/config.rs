//! Server configuration.
//!
//! Configuration is loaded from `AUTHD_*` environment variables with sensible
//! defaults. A `.env` file in the working directory is honored.

use std::path::PathBuf;
use std::time::Duration;

use anyhow::Context;
use authd_crypto::DEFAULT_KEY_BITS;
use authd_federation::FederationConfig;
use authd_federation::config::DEFAULT_HTTP_TIMEOUT;
use authd_oidc::TokenConfig;

/// Path of the federation callback endpoint.
pub const CALLBACK_PATH: &str = "/auth/oidc/callback";

/// Client credentials registered with an external provider.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FederationClient {
    /// Provider domain.
    pub domain: String,
    /// Client identifier at the provider.
    pub client_id: String,
    /// Client secret at the provider.
    pub client_secret: String,
}

/// Server configuration.
#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// Server host to bind to.
    pub host: String,

    /// Server port.
    pub port: u16,

    /// Base URL for the server, also the token issuer.
    pub base_url: String,

    /// PEM files holding the signing keys.
    pub key_paths: Vec<PathBuf>,

    /// Size of generated signing keys.
    pub key_bits: usize,

    /// Access token lifespan in seconds.
    pub access_token_lifespan: i64,

    /// ID token lifespan in seconds.
    pub id_token_lifespan: i64,

    /// CORS allowed origins.
    pub cors_origins: Vec<String>,

    /// Hex-encoded AES-256 key sealing federation state.
    pub cookie_key: Option<String>,

    /// Name of the session cookie.
    pub session_cookie: String,

    /// Session lifetime in seconds.
    pub session_lifespan: i64,

    /// How often expired sessions and access codes are swept.
    pub sweep_interval: Duration,

    /// Path of the login page.
    pub login_path: String,

    /// Path of the registration page.
    pub registration_path: String,

    /// Scheme used to reach external providers.
    pub federation_protocol: String,

    /// Client registrations at external providers.
    pub federation_clients: Vec<FederationClient>,

    /// Timeout for outbound HTTP calls.
    pub http_timeout: Duration,

    /// JSON file with clients, users and scopes loaded at startup.
    pub seed_file: Option<PathBuf>,
}

impl ServerConfig {
    /// Loads configuration from environment variables.
    ///
    /// # Errors
    ///
    /// Returns an error if a variable is set but malformed.
    pub fn from_env() -> anyhow::Result<Self> {
        // Load .env file if it exists
        let _ = dotenvy::dotenv();

        let defaults = Self::default();

        let host = env("HOST").unwrap_or(defaults.host);
        let port = match env("PORT") {
            Some(p) => p.parse().context("AUTHD_PORT is not a port number")?,
            None => defaults.port,
        };

        let base_url = env("BASE_URL").unwrap_or_else(|| format!("http://{host}:{port}"));

        let key_paths = env("KEY_PATHS")
            .map(|s| split_list(&s).map(PathBuf::from).collect())
            .unwrap_or_default();

        let key_bits = match env("KEY_BITS") {
            Some(bits) => bits.parse().context("AUTHD_KEY_BITS is not a number")?,
            None => defaults.key_bits,
        };

        let access_token_lifespan = parse_or("ACCESS_TOKEN_LIFESPAN", defaults.access_token_lifespan)?;
        let id_token_lifespan = parse_or("ID_TOKEN_LIFESPAN", defaults.id_token_lifespan)?;

        let cors_origins = env("CORS_ORIGINS")
            .map(|s| split_list(&s).map(String::from).collect())
            .unwrap_or(defaults.cors_origins);

        let federation_clients = match env("FEDERATION_CLIENTS") {
            Some(s) => parse_federation_clients(&s)?,
            None => Vec::new(),
        };

        let session_lifespan = parse_or("SESSION_LIFESPAN", defaults.session_lifespan)?;
        let sweep_interval = match env("SWEEP_INTERVAL") {
            Some(s) => Duration::from_secs(s.parse().context("AUTHD_SWEEP_INTERVAL is not a number of seconds")?),
            None => defaults.sweep_interval,
        };

        let http_timeout = match env("HTTP_TIMEOUT") {
            Some(s) => Duration::from_secs(s.parse().context("AUTHD_HTTP_TIMEOUT is not a number of seconds")?),
            None => defaults.http_timeout,
        };

        Ok(Self {
            host,
            port,
            base_url,
            key_paths,
            key_bits,
            access_token_lifespan,
            id_token_lifespan,
            cors_origins,
            cookie_key: env("COOKIE_KEY"),
            session_cookie: env("SESSION_COOKIE").unwrap_or(defaults.session_cookie),
            session_lifespan,
            sweep_interval,
            login_path: env("LOGIN_PATH").unwrap_or(defaults.login_path),
            registration_path: env("REGISTRATION_PATH").unwrap_or(defaults.registration_path),
            federation_protocol: env("FEDERATION_PROTOCOL").unwrap_or(defaults.federation_protocol),
            federation_clients,
            http_timeout,
            seed_file: env("SEED_FILE").map(PathBuf::from),
        })
    }

    /// Creates a configuration for testing.
    #[must_use]
    pub fn for_testing(base_url: &str) -> Self {
        Self {
            host: "127.0.0.1".to_string(),
            port: 0, // Random port
            base_url: base_url.trim_end_matches('/').to_string(),
            key_bits: 1024,
            cookie_key: Some("00".repeat(32)),
            federation_protocol: "http".to_string(),
            http_timeout: Duration::from_secs(2),
            ..Self::default()
        }
    }

    /// Token issuance settings.
    #[must_use]
    pub fn token_config(&self) -> TokenConfig {
        TokenConfig {
            issuer: self.base_url.clone(),
            access_token_lifespan: self.access_token_lifespan,
            id_token_lifespan: self.id_token_lifespan,
        }
    }

    /// Absolute URL of the federation callback.
    #[must_use]
    pub fn callback_uri(&self) -> String {
        format!("{}{CALLBACK_PATH}", self.base_url)
    }

    /// Federation settings.
    #[must_use]
    pub fn federation_config(&self) -> FederationConfig {
        let mut config = FederationConfig::new(self.callback_uri()).with_protocol(&self.federation_protocol);
        config.http_timeout = self.http_timeout;
        for client in &self.federation_clients {
            config = config.with_client(&client.domain, &client.client_id, &client.client_secret);
        }
        config
    }
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 8080,
            base_url: "http://0.0.0.0:8080".to_string(),
            key_paths: Vec::new(),
            key_bits: DEFAULT_KEY_BITS,
            access_token_lifespan: 300,
            id_token_lifespan: 600,
            cors_origins: vec!["*".to_string()],
            cookie_key: None,
            session_cookie: "authd_sid".to_string(),
            session_lifespan: 86_400,
            sweep_interval: Duration::from_secs(60),
            login_path: "/auth/login".to_string(),
            registration_path: "/auth/register".to_string(),
            federation_protocol: "https".to_string(),
            federation_clients: Vec::new(),
            http_timeout: DEFAULT_HTTP_TIMEOUT,
            seed_file: None,
        }
    }
}

fn env(name: &str) -> Option<String> {
    std::env::var(format!("AUTHD_{name}"))
        .ok()
        .filter(|v| !v.trim().is_empty())
}

fn parse_or(name: &str, default: i64) -> anyhow::Result<i64> {
    match env(name) {
        Some(v) => v.parse().with_context(|| format!("AUTHD_{name} is not a number")),
        None => Ok(default),
    }
}

fn split_list(s: &str) -> impl Iterator<Item = &str> {
    s.split(',').map(str::trim).filter(|item| !item.is_empty())
}

/// Parses `domain=client_id:secret` entries separated by commas.
fn parse_federation_clients(s: &str) -> anyhow::Result<Vec<FederationClient>> {
    split_list(s)
        .map(|entry| {
            let (domain, credentials) = entry
                .split_once('=')
                .with_context(|| format!("federation client `{entry}' has no `='"))?;
            let (client_id, client_secret) = credentials
                .split_once(':')
                .with_context(|| format!("federation client `{entry}' has no `:'"))?;
            Ok(FederationClient {
                domain: domain.to_string(),
                client_id: client_id.to_string(),
                client_secret: client_secret.to_string(),
            })
        })
        .collect()
}
