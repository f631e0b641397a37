//! Common test utilities and fixtures.

use std::sync::Arc;
use std::time::Duration;

use authd_model::{Client as OAuthClient, Scope, User};
use authd_server::{Server, ServerConfig};
use authd_storage::{ClientStore, MemoryStore, ScopeStore, UserStore};
use reqwest::{Client, Response, redirect};
use tokio::net::TcpListener;
use url::Url;

/// Registered redirect URI of the test clients.
pub const REDIRECT_URI: &str = "https://cb/";

/// Public test client.
pub const PUBLIC_CLIENT: &str = "abc";

/// Confidential test client and its secret.
pub const CONFIDENTIAL_CLIENT: (&str, &str) = ("web", "s3cret");

/// Local test user and password.
pub const USER: (&str, &str) = ("alice", "wonderland");

/// Running server plus an HTTP client with its own cookie jar.
pub struct TestEnv {
    /// Base URL of the running server.
    pub base_url: String,
    /// HTTP client for testing. Redirects are not followed.
    pub client: Client,
    /// The server's store.
    pub store: Arc<MemoryStore>,
    /// Seeded user.
    pub user: User,
}

impl TestEnv {
    /// Starts a server with the default fixtures.
    pub async fn new() -> anyhow::Result<Self> {
        Self::with_config(|_| {}).await
    }

    /// Starts a server after letting `configure` adjust the configuration.
    pub async fn with_config(configure: impl FnOnce(&mut ServerConfig)) -> anyhow::Result<Self> {
        let _ = tracing_subscriber::fmt()
            .with_env_filter("authd=debug,authd_server=debug,authd_oidc=debug,authd_federation=debug")
            .with_test_writer()
            .try_init();

        let listener = TcpListener::bind("127.0.0.1:0").await?;
        let base_url = format!("http://{}", listener.local_addr()?);

        let mut config = ServerConfig::for_testing(&base_url);
        configure(&mut config);

        let server = Server::new(config).await?;
        let store = Arc::clone(server.store());
        let user = seed(&store).await?;

        tokio::spawn(async move {
            if let Err(e) = server.serve(listener).await {
                tracing::error!("Server error: {}", e);
            }
        });

        Ok(Self {
            base_url,
            client: browser()?,
            store,
            user,
        })
    }

    /// Absolute URL for `path`.
    pub fn url(&self, path: &str) -> String {
        format!("{}{path}", self.base_url)
    }

    /// Token endpoint URL.
    pub fn token_url(&self) -> String {
        self.url("/auth/token")
    }

    /// Logs the test user in on `client`'s session.
    pub async fn login(&self, client: &Client) -> anyhow::Result<Response> {
        self.login_with_next(client, "/").await
    }

    /// Logs the test user in, asking to continue at `next`.
    pub async fn login_with_next(&self, client: &Client, next: &str) -> anyhow::Result<Response> {
        Ok(client
            .post(self.url("/auth/login"))
            .form(&[("username", USER.0), ("password", USER.1), ("next", next)])
            .send()
            .await?)
    }

    /// GET on a path or absolute URL.
    pub async fn get(&self, client: &Client, target: &str) -> anyhow::Result<Response> {
        let url = if target.starts_with('/') {
            self.url(target)
        } else {
            target.to_string()
        };
        Ok(client.get(url).send().await?)
    }
}

/// A fresh cookie-keeping client that does not follow redirects.
pub fn browser() -> anyhow::Result<Client> {
    Ok(Client::builder()
        .timeout(Duration::from_secs(30))
        .cookie_store(true)
        .redirect(redirect::Policy::none())
        .build()?)
}

/// `Location` of a 303 response.
pub fn location(response: &Response) -> anyhow::Result<String> {
    anyhow::ensure!(
        response.status() == reqwest::StatusCode::SEE_OTHER,
        "expected 303, got {}",
        response.status()
    );
    let location = response
        .headers()
        .get(reqwest::header::LOCATION)
        .ok_or_else(|| anyhow::anyhow!("no Location header"))?;
    Ok(location.to_str()?.to_string())
}

/// Parameters in the query or the fragment of a redirect.
pub fn redirect_params(location: &str, in_fragment: bool) -> anyhow::Result<Vec<(String, String)>> {
    let url = Url::parse(location)?;
    let encoded = if in_fragment {
        url.fragment().unwrap_or_default().to_string()
    } else {
        url.query().unwrap_or_default().to_string()
    };
    Ok(url::form_urlencoded::parse(encoded.as_bytes())
        .into_owned()
        .collect())
}

/// First value of `name` among `params`.
pub fn param<'a>(params: &'a [(String, String)], name: &str) -> Option<&'a str> {
    params
        .iter()
        .find(|(k, _)| k == name)
        .map(|(_, v)| v.as_str())
}

async fn seed(store: &MemoryStore) -> anyhow::Result<User> {
    let user = User::new(USER.0).with_password(USER.1)?;
    store.create_user(&user).await?;

    store
        .create_client(&OAuthClient::new_public(PUBLIC_CLIENT, "Public").with_redirect_uri(REDIRECT_URI))
        .await?;
    store
        .create_client(
            &OAuthClient::new_confidential(CONFIDENTIAL_CLIENT.0, "Confidential", CONFIDENTIAL_CLIENT.1)?
                .with_redirect_uri(REDIRECT_URI),
        )
        .await?;

    store.put_scope(&Scope::new("openid", "OpenID").as_default()).await?;
    store.put_scope(&Scope::new("email", "Email")).await?;
    Ok(user)
}
