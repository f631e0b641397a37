//! Authorization endpoint flows.

use reqwest::StatusCode;

use crate::common::{
    CONFIDENTIAL_CLIENT, PUBLIC_CLIENT, REDIRECT_URI, TestEnv, location, param, redirect_params,
};

/// An empty `response_type` is reported to the client in the fragment.
#[tokio::test]
async fn test_missing_response_type_redirects_error() -> anyhow::Result<()> {
    let env = TestEnv::new().await?;

    let response = env
        .client
        .post(env.url("/auth/authorize"))
        .form(&[
            ("client_id", PUBLIC_CLIENT),
            ("redirect_uri", REDIRECT_URI),
            ("response_type", ""),
            ("scope", "openid"),
        ])
        .send()
        .await?;

    assert_eq!(
        location(&response)?,
        "https://cb/#error=invalid_request&error_description=Missing+response_type+parameter"
    );
    Ok(())
}

/// Requests without a client are fatal and never redirect.
#[tokio::test]
async fn test_missing_client_is_fatal() -> anyhow::Result<()> {
    let env = TestEnv::new().await?;

    let response = env
        .client
        .get(env.url("/auth/authorize"))
        .query(&[("redirect_uri", REDIRECT_URI), ("response_type", "code")])
        .send()
        .await?;

    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    assert!(response.headers().get(reqwest::header::LOCATION).is_none());
    assert!(response.text().await?.contains("client_id"));
    Ok(())
}

/// An unregistered redirect URI is never redirected to.
#[tokio::test]
async fn test_unregistered_redirect_uri_is_fatal() -> anyhow::Result<()> {
    let env = TestEnv::new().await?;

    let response = env
        .client
        .get(env.url("/auth/authorize"))
        .query(&[
            ("client_id", PUBLIC_CLIENT),
            ("redirect_uri", "https://evil.example/"),
            ("response_type", "token"),
        ])
        .send()
        .await?;

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert!(response.headers().get(reqwest::header::LOCATION).is_none());
    Ok(())
}

/// Anonymous users log in and land back on the authorization request.
#[tokio::test]
async fn test_implicit_flow_after_login() -> anyhow::Result<()> {
    let env = TestEnv::new().await?;

    let response = env
        .client
        .get(env.url("/auth/authorize"))
        .query(&[
            ("client_id", PUBLIC_CLIENT),
            ("redirect_uri", REDIRECT_URI),
            ("response_type", "token"),
            ("state", "af0ifjsldkj"),
        ])
        .send()
        .await?;
    let login = location(&response)?;
    assert!(login.starts_with("/auth/login?next="));

    let next = url::Url::parse(&env.url(&login))?
        .query_pairs()
        .find(|(k, _)| k == "next")
        .map(|(_, v)| v.into_owned())
        .ok_or_else(|| anyhow::anyhow!("no next"))?;

    let response = env.login_with_next(&env.client, &next).await?;
    let resume = location(&response)?;
    assert_eq!(resume, next);

    let response = env.get(&env.client, &resume).await?;
    let params = redirect_params(&location(&response)?, true)?;
    assert_eq!(param(&params, "token_type"), Some("Bearer"));
    assert_eq!(param(&params, "state"), Some("af0ifjsldkj"));

    let access_token = param(&params, "access_token").ok_or_else(|| anyhow::anyhow!("no token"))?;
    let claims = crate::token_operations::unverified_claims(access_token)?;
    assert_eq!(claims["scope"], serde_json::json!(["openid"]));
    assert_eq!(claims["sub"], env.user.id.to_string());
    Ok(())
}

/// Redirectable errors keep the client's state and use the query for `code`.
#[tokio::test]
async fn test_invalid_scope_in_query() -> anyhow::Result<()> {
    let env = TestEnv::new().await?;
    env.login(&env.client).await?;

    let response = env
        .client
        .get(env.url("/auth/authorize"))
        .query(&[
            ("client_id", CONFIDENTIAL_CLIENT.0),
            ("client_secret", CONFIDENTIAL_CLIENT.1),
            ("redirect_uri", REDIRECT_URI),
            ("response_type", "code"),
            ("scope", "openid admin"),
            ("state", "s1"),
        ])
        .send()
        .await?;

    let params = redirect_params(&location(&response)?, false)?;
    assert_eq!(param(&params, "error"), Some("invalid_scope"));
    assert_eq!(param(&params, "error_description"), Some("Invalid scope `admin'."));
    assert_eq!(param(&params, "state"), Some("s1"));
    Ok(())
}

/// A hybrid request returns every artifact in the fragment.
#[tokio::test]
async fn test_hybrid_flow_binds_tokens() -> anyhow::Result<()> {
    let env = TestEnv::new().await?;
    env.login(&env.client).await?;

    let response = env
        .client
        .get(env.url("/auth/authorize"))
        .query(&[
            ("client_id", PUBLIC_CLIENT),
            ("redirect_uri", REDIRECT_URI),
            ("response_type", "code id_token token"),
            ("scope", "openid email"),
            ("nonce", "n-0S6_WzA2Mj"),
        ])
        .send()
        .await?;

    let params = redirect_params(&location(&response)?, true)?;
    assert!(param(&params, "code").is_some());
    let access_token = param(&params, "access_token").ok_or_else(|| anyhow::anyhow!("no token"))?;
    let id_token = param(&params, "id_token").ok_or_else(|| anyhow::anyhow!("no id_token"))?;

    let claims = crate::token_operations::unverified_claims(id_token)?;
    assert_eq!(claims["nonce"], "n-0S6_WzA2Mj");
    assert_eq!(claims["aud"], PUBLIC_CLIENT);
    assert_eq!(claims["sub"], env.user.id.to_string());
    assert_eq!(claims["at_hash"], authd_oidc::compute_at_hash(access_token));
    Ok(())
}
