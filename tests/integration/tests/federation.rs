//! Federated login through an external `OpenID` provider.

use std::sync::Arc;

use authd_crypto::{KeyJar, RsaKey};
use authd_oidc::{TokenCodec, TokenConfig};
use authd_server::config::FederationClient;
use authd_storage::UserStore;
use serde_json::json;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

use crate::common::{PUBLIC_CLIENT, REDIRECT_URI, TestEnv, browser, location, param, redirect_params};

/// External provider backed by a mock server.
struct Idp {
    server: MockServer,
    codec: TokenCodec,
}

impl Idp {
    /// Starts the provider, expecting `key_fetches` requests for its keys.
    async fn start(key_fetches: u64) -> anyhow::Result<Self> {
        let server = MockServer::start().await;
        let config = TokenConfig {
            issuer: server.uri(),
            ..TokenConfig::default()
        };
        let codec = TokenCodec::new(config, Arc::new(KeyJar::new(vec![RsaKey::generate(1024)?])))?;

        Mock::given(method("GET"))
            .and(path("/.well-known/openid-configuration"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "issuer": server.uri(),
                "authorization_endpoint": format!("{}/authorize", server.uri()),
                "token_endpoint": format!("{}/token", server.uri()),
                "jwks_uri": format!("{}/jwks", server.uri()),
                "response_types_supported": ["code", "id_token"],
                "scopes_supported": ["openid", "email", "profile"]
            })))
            .expect(1)
            .mount(&server)
            .await;

        Mock::given(method("GET"))
            .and(path("/jwks"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!(codec.jwks())))
            .expect(key_fetches)
            .mount(&server)
            .await;

        Ok(Self { server, codec })
    }

    fn domain(&self) -> String {
        self.server.address().to_string()
    }

    /// Answers the next code exchange with an ID token for `subject`.
    async fn answer_code(&self, subject: &str, nonce: &str) -> anyhow::Result<()> {
        let id_token = self.codec.issue_id_token(subject, "rp", Some(nonce), None)?;
        Mock::given(method("POST"))
            .and(path("/token"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "access_token": "opaque",
                "token_type": "bearer",
                "id_token": id_token
            })))
            .up_to_n_times(1)
            .mount(&self.server)
            .await;
        Ok(())
    }
}

async fn env_for(idp: &Idp) -> anyhow::Result<TestEnv> {
    let domain = idp.domain();
    TestEnv::with_config(move |config| {
        config.federation_clients.push(FederationClient {
            domain,
            client_id: "rp".to_string(),
            client_secret: "rp-secret".to_string(),
        });
    })
    .await
}

/// Starts a federated authorization request and returns the provider's
/// `state` and `nonce`.
async fn start(env: &TestEnv, idp: &Idp, client: &reqwest::Client) -> anyhow::Result<(String, String)> {
    let acr = format!("idp:{}", idp.domain());
    let response = client
        .get(env.url("/auth/authorize"))
        .query(&[
            ("client_id", PUBLIC_CLIENT),
            ("redirect_uri", REDIRECT_URI),
            ("response_type", "token"),
            ("state", "rp-state"),
            ("acr_values", acr.as_str()),
        ])
        .send()
        .await?;

    let provider_url = location(&response)?;
    assert!(provider_url.starts_with(&format!("{}/authorize?", idp.server.uri())));
    let params = redirect_params(&provider_url, false)?;
    assert_eq!(param(&params, "client_id"), Some("rp"));
    assert_eq!(param(&params, "scope"), Some("email openid profile"));
    assert_eq!(param(&params, "redirect_uri"), Some(env.url("/auth/oidc/callback").as_str()));

    let state = param(&params, "state").ok_or_else(|| anyhow::anyhow!("no state"))?;
    let nonce = param(&params, "nonce").ok_or_else(|| anyhow::anyhow!("no nonce"))?;
    Ok((state.to_string(), nonce.to_string()))
}

async fn callback(env: &TestEnv, client: &reqwest::Client, state: &str) -> anyhow::Result<reqwest::Response> {
    Ok(client
        .get(env.url("/auth/oidc/callback"))
        .query(&[("state", state), ("code", "provider-code")])
        .send()
        .await?)
}

/// First login links the account through a local login; the second is direct.
#[tokio::test]
async fn test_federated_login_links_then_authenticates() -> anyhow::Result<()> {
    let idp = Idp::start(1).await?;
    let env = env_for(&idp).await?;

    // First visit: the external account is unknown.
    let (state, nonce) = start(&env, &idp, &env.client).await?;
    idp.answer_code("ext-1", &nonce).await?;

    let login = location(&callback(&env, &env.client, &state).await?)?;
    assert!(login.starts_with("/auth/login?next=%2Fauth%2Foidc%2Fcallback%3Fstate%3D"));
    let next = url::Url::parse(&env.url(&login))?
        .query_pairs()
        .find(|(k, _)| k == "next")
        .map(|(_, v)| v.into_owned())
        .ok_or_else(|| anyhow::anyhow!("no next"))?;

    let linked = location(&env.login_with_next(&env.client, &next).await?)?;
    let resume = location(&env.get(&env.client, &linked).await?)?;
    assert!(resume.starts_with("/auth/authorize?"));

    let params = redirect_params(&location(&env.get(&env.client, &resume).await?)?, true)?;
    assert!(param(&params, "access_token").is_some());
    assert_eq!(param(&params, "state"), Some("rp-state"));

    // Second visit from a fresh browser: the account is linked.
    let browser = browser()?;
    let (state, nonce) = start(&env, &idp, &browser).await?;
    idp.answer_code("ext-1", &nonce).await?;

    let resume = location(&callback(&env, &browser, &state).await?)?;
    let params = redirect_params(&location(&env.get(&browser, &resume).await?)?, true)?;
    let access_token = param(&params, "access_token").ok_or_else(|| anyhow::anyhow!("no token"))?;
    let claims = crate::token_operations::unverified_claims(access_token)?;
    assert_eq!(claims["sub"], env.user.id.to_string());
    Ok(())
}

/// An unknown external account can be linked to a newly registered user.
#[tokio::test]
async fn test_federated_account_links_to_registered_user() -> anyhow::Result<()> {
    let idp = Idp::start(1).await?;
    let env = env_for(&idp).await?;

    let (state, nonce) = start(&env, &idp, &env.client).await?;
    idp.answer_code("ext-9", &nonce).await?;

    let login = location(&callback(&env, &env.client, &state).await?)?;
    let page = env.get(&env.client, &login).await?.text().await?;
    let next = url::Url::parse(&env.url(&login))?
        .query_pairs()
        .find(|(k, _)| k == "next")
        .map(|(_, v)| v.into_owned())
        .ok_or_else(|| anyhow::anyhow!("no next"))?;
    let encoded_next: String = url::form_urlencoded::byte_serialize(next.as_bytes()).collect();
    assert!(page.contains(&format!("/auth/register?next={encoded_next}")));

    let response = env
        .client
        .post(env.url("/auth/register"))
        .form(&[("username", "dave"), ("password", "pw"), ("next", next.as_str())])
        .send()
        .await?;
    let linked = location(&response)?;
    assert_eq!(linked, next);

    let resume = location(&env.get(&env.client, &linked).await?)?;
    let params = redirect_params(&location(&env.get(&env.client, &resume).await?)?, true)?;
    let access_token = param(&params, "access_token").ok_or_else(|| anyhow::anyhow!("no token"))?;

    let dave = env
        .store
        .get_user_by_username("dave")
        .await?
        .ok_or_else(|| anyhow::anyhow!("dave not registered"))?;
    assert_eq!(dave.accounts.len(), 1);
    assert_eq!(dave.accounts[0].subject, "ext-9");
    let claims = crate::token_operations::unverified_claims(access_token)?;
    assert_eq!(claims["sub"], dave.id.to_string());
    Ok(())
}

/// State issued to one browser cannot be replayed by another.
#[tokio::test]
async fn test_callback_from_other_session_is_rejected() -> anyhow::Result<()> {
    let idp = Idp::start(0).await?;
    let env = env_for(&idp).await?;

    let (state, _) = start(&env, &idp, &env.client).await?;

    let other = browser()?;
    env.get(&other, "/auth/login").await?;
    let response = callback(&env, &other, &state).await?;
    assert_eq!(response.status(), reqwest::StatusCode::UNAUTHORIZED);
    Ok(())
}

/// Domains without registered credentials send the user back to login.
#[tokio::test]
async fn test_unregistered_provider_returns_to_login() -> anyhow::Result<()> {
    let env = TestEnv::new().await?;

    let response = env
        .client
        .get(env.url("/auth/authorize"))
        .query(&[
            ("client_id", PUBLIC_CLIENT),
            ("redirect_uri", REDIRECT_URI),
            ("response_type", "token"),
            ("acr_values", "idp:127.0.0.1:9"),
        ])
        .send()
        .await?;

    let login = location(&response)?;
    assert!(login.starts_with("/auth/login?error=provider_error&error_description="));
    assert!(login.contains("next=%2Fauth%2Fauthorize%3F"));
    Ok(())
}
