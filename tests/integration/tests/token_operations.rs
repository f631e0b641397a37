//! Token endpoint, JWKS and discovery.

use authd_model::AccessCode;
use authd_storage::AccessCodeStore;
use base64::Engine;
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use chrono::{Duration, Utc};
use reqwest::StatusCode;
use serde::Deserialize;

use crate::common::{CONFIDENTIAL_CLIENT, REDIRECT_URI, TestEnv, location, param, redirect_params};

/// Token response from token endpoint.
#[derive(Debug, Deserialize)]
pub struct TokenResponse {
    pub access_token: String,
    pub token_type: String,
    pub expires_in: i64,
    pub id_token: Option<String>,
    pub scope: Option<String>,
}

/// Error response.
#[derive(Debug, Deserialize)]
pub struct ErrorResponse {
    pub error: String,
    pub error_description: Option<String>,
}

/// Decodes a JWT payload without verifying it.
pub fn unverified_claims(token: &str) -> anyhow::Result<serde_json::Value> {
    let payload = token
        .split('.')
        .nth(1)
        .ok_or_else(|| anyhow::anyhow!("malformed JWT"))?;
    Ok(serde_json::from_slice(&URL_SAFE_NO_PAD.decode(payload)?)?)
}

/// Runs the code flow up to the code for a logged-in user.
async fn authorization_code(env: &TestEnv, scope: &str) -> anyhow::Result<String> {
    env.login(&env.client).await?;
    let response = env
        .client
        .get(env.url("/auth/authorize"))
        .query(&[
            ("client_id", CONFIDENTIAL_CLIENT.0),
            ("client_secret", CONFIDENTIAL_CLIENT.1),
            ("redirect_uri", REDIRECT_URI),
            ("response_type", "code"),
            ("scope", scope),
            ("nonce", "abc123"),
        ])
        .send()
        .await?;
    let params = redirect_params(&location(&response)?, false)?;
    param(&params, "code")
        .map(ToString::to_string)
        .ok_or_else(|| anyhow::anyhow!("no code"))
}

async fn exchange(env: &TestEnv, code: &str) -> anyhow::Result<reqwest::Response> {
    Ok(env
        .client
        .post(env.token_url())
        .basic_auth(CONFIDENTIAL_CLIENT.0, Some(CONFIDENTIAL_CLIENT.1))
        .form(&[
            ("grant_type", "authorization_code"),
            ("code", code),
            ("redirect_uri", REDIRECT_URI),
        ])
        .send()
        .await?)
}

/// Codes redeem exactly once.
#[tokio::test]
async fn test_code_redeems_once() -> anyhow::Result<()> {
    let env = TestEnv::new().await?;
    let code = authorization_code(&env, "openid email").await?;

    let response = exchange(&env, &code).await?;
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(
        response
            .headers()
            .get(reqwest::header::CACHE_CONTROL)
            .and_then(|v| v.to_str().ok()),
        Some("no-store")
    );
    let token: TokenResponse = response.json().await?;
    assert_eq!(token.token_type, "Bearer");
    assert_eq!(token.expires_in, 300);
    assert_eq!(token.scope.as_deref(), Some("email openid"));

    let id_token = token.id_token.ok_or_else(|| anyhow::anyhow!("no id_token"))?;
    let claims = unverified_claims(&id_token)?;
    assert_eq!(claims["nonce"], "abc123");
    assert_eq!(claims["iss"], env.base_url);

    let response = exchange(&env, &code).await?;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let error: ErrorResponse = response.json().await?;
    assert_eq!(error.error, "invalid_grant");
    assert_eq!(error.error_description.as_deref(), Some("Code already used."));
    Ok(())
}

/// A code older than its lifetime is rejected.
#[tokio::test]
async fn test_expired_code() -> anyhow::Result<()> {
    let env = TestEnv::new().await?;

    let mut code = AccessCode::new(
        "stale-code",
        CONFIDENTIAL_CLIENT.0,
        env.user.subject(),
        REDIRECT_URI,
        vec!["openid".to_string()],
    );
    code.created_at = Utc::now() - Duration::minutes(11);
    env.store.create_code(&code).await?;

    let response = exchange(&env, "stale-code").await?;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let error: ErrorResponse = response.json().await?;
    assert_eq!(error.error, "invalid_grant");
    assert_eq!(error.error_description.as_deref(), Some("Code expired."));
    Ok(())
}

/// Client authentication failures are 401 JSON errors.
#[tokio::test]
async fn test_wrong_client_secret() -> anyhow::Result<()> {
    let env = TestEnv::new().await?;

    let response = env
        .client
        .post(env.token_url())
        .form(&[
            ("grant_type", "authorization_code"),
            ("code", "whatever"),
            ("client_id", CONFIDENTIAL_CLIENT.0),
            ("client_secret", "wrong"),
        ])
        .send()
        .await?;

    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    let error: ErrorResponse = response.json().await?;
    assert_eq!(error.error, "invalid_client");
    assert_eq!(error.error_description.as_deref(), Some("Invalid client's password."));
    Ok(())
}

/// Stub grant types are reported, not silently accepted.
#[tokio::test]
async fn test_client_credentials_not_implemented() -> anyhow::Result<()> {
    let env = TestEnv::new().await?;

    let response = env
        .client
        .post(env.token_url())
        .basic_auth(CONFIDENTIAL_CLIENT.0, Some(CONFIDENTIAL_CLIENT.1))
        .form(&[("grant_type", "client_credentials")])
        .send()
        .await?;

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let error: ErrorResponse = response.json().await?;
    assert_eq!(
        error.error_description.as_deref(),
        Some("Grant type `client_credentials' is not implemented.")
    );
    Ok(())
}

/// The token endpoint only accepts POST.
#[tokio::test]
async fn test_token_endpoint_rejects_get() -> anyhow::Result<()> {
    let env = TestEnv::new().await?;
    let response = env.client.get(env.token_url()).send().await?;
    assert_eq!(response.status(), StatusCode::METHOD_NOT_ALLOWED);
    Ok(())
}

/// Issued tokens name a published key and verify against it.
#[tokio::test]
async fn test_jwks_matches_token_kid() -> anyhow::Result<()> {
    let env = TestEnv::new().await?;
    let code = authorization_code(&env, "openid").await?;
    let token: TokenResponse = exchange(&env, &code).await?.json().await?;

    let jwks: authd_oidc::JsonWebKeySet = env
        .client
        .get(env.url("/auth/jwks"))
        .send()
        .await?
        .json()
        .await?;

    let header = jsonwebtoken::decode_header(&token.access_token)?;
    let kid = header.kid.ok_or_else(|| anyhow::anyhow!("no kid"))?;
    let key = jwks.find_key(&kid).ok_or_else(|| anyhow::anyhow!("kid not published"))?;
    let (n, e) = key.rsa_components().ok_or_else(|| anyhow::anyhow!("not RSA"))?;

    let id_token = token.id_token.ok_or_else(|| anyhow::anyhow!("no id_token"))?;
    let claims: serde_json::Value =
        authd_oidc::verify_rs256(&id_token, n, e, CONFIDENTIAL_CLIENT.0)?;
    assert_eq!(claims["sub"], env.user.id.to_string());
    Ok(())
}

/// The access token from the code flow opens the `UserInfo` endpoint.
#[tokio::test]
async fn test_userinfo_with_issued_token() -> anyhow::Result<()> {
    let env = TestEnv::new().await?;
    let code = authorization_code(&env, "openid").await?;
    let token: TokenResponse = exchange(&env, &code).await?.json().await?;

    let response = env
        .client
        .get(env.url("/auth/userinfo"))
        .bearer_auth(&token.access_token)
        .send()
        .await?;
    assert_eq!(response.status(), StatusCode::OK);
    let info: serde_json::Value = response.json().await?;
    assert_eq!(info, serde_json::json!({ "sub": env.user.id.to_string() }));

    let response = env.client.get(env.url("/auth/userinfo")).send().await?;
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    assert!(response.headers().contains_key(reqwest::header::WWW_AUTHENTICATE));
    Ok(())
}

/// The discovery document points at this server.
#[tokio::test]
async fn test_discovery_document() -> anyhow::Result<()> {
    let env = TestEnv::new().await?;

    let metadata: serde_json::Value = env
        .client
        .get(env.url("/.well-known/openid-configuration"))
        .send()
        .await?
        .json()
        .await?;

    assert_eq!(metadata["issuer"], env.base_url);
    assert_eq!(metadata["token_endpoint"], env.token_url());
    assert_eq!(metadata["jwks_uri"], env.url("/auth/jwks"));
    assert_eq!(metadata["userinfo_endpoint"], env.url("/auth/userinfo"));
    assert_eq!(metadata["id_token_signing_alg_values_supported"][0], "RS256");

    let health = env.client.get(env.url("/health")).send().await?;
    assert_eq!(health.status(), StatusCode::OK);
    Ok(())
}
