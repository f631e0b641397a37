//! Grant engines.
//!
//! Authorization endpoint grants:
//! - `code`: persists a single-use [`AccessCode`]
//! - `token`: signs an access token (implicit)
//! - `id_token`: signs an ID token, bound to a co-issued access token
//!
//! Token endpoint grants:
//! - `authorization_code`: redeems a code exactly once
//! - `client_credentials` and `password`: recognised but not implemented
//!
//! ## Fan-out
//!
//! A request may name several response types. [`execute_grants`] runs them in
//! [`ResponseType`] order and merges their outputs into one
//! [`AuthorizationResponse`], so the ID token grant can see the access token.

use authd_crypto::generate_access_code;
use authd_model::{AccessCode, Client};
use authd_storage::{AccessCodeStore, Redemption};
use chrono::Utc;
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::error::{OidcError, OidcResult};
use crate::request::{AuthorizationRequest, TokenRequest, join};
use crate::token::{TokenCodec, TokenResponse};
use crate::types::{GrantType, ResponseType, ResponseTypes};

/// Token type of every issued access token.
pub const BEARER: &str = "Bearer";

/// Shared dependencies of the grant engines.
pub struct GrantContext<'a, S: ?Sized> {
    /// Access code storage.
    pub store: &'a S,
    /// Token signer.
    pub codec: &'a TokenCodec,
}

impl<'a, S: AccessCodeStore + ?Sized> GrantContext<'a, S> {
    /// Creates a grant context.
    pub const fn new(store: &'a S, codec: &'a TokenCodec) -> Self {
        Self { store, codec }
    }
}

/// Merged output of the authorization endpoint grants.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuthorizationResponse {
    /// Authorization code (code grant).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub code: Option<String>,

    /// Access token (token grant).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub access_token: Option<String>,

    /// Token type, set with `access_token`.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub token_type: Option<String>,

    /// Access token lifetime in seconds.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub expires_in: Option<i64>,

    /// ID token (`id_token` grant).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub id_token: Option<String>,

    /// State parameter from the request.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub state: Option<String>,
}

impl AuthorizationResponse {
    /// Redirect parameters in a stable order.
    #[must_use]
    pub fn to_params(&self) -> Vec<(String, String)> {
        let mut params = Vec::new();

        if let Some(ref code) = self.code {
            params.push(("code".to_string(), code.clone()));
        }
        if let Some(ref token) = self.access_token {
            params.push(("access_token".to_string(), token.clone()));
        }
        if let Some(ref token_type) = self.token_type {
            params.push(("token_type".to_string(), token_type.clone()));
        }
        if let Some(expires_in) = self.expires_in {
            params.push(("expires_in".to_string(), expires_in.to_string()));
        }
        if let Some(ref id_token) = self.id_token {
            params.push(("id_token".to_string(), id_token.clone()));
        }
        if let Some(ref state) = self.state {
            params.push(("state".to_string(), state.clone()));
        }

        params
    }
}

/// Runs every requested grant and merges the results.
///
/// Expects a fully validated request with an authenticated client and owner.
///
/// # Errors
///
/// Returns [`OidcError::Internal`] if the client or owner is missing, and
/// storage or signing errors from the individual grants.
pub async fn execute_grants<S>(
    ctx: &GrantContext<'_, S>,
    request: &AuthorizationRequest,
    response_types: &ResponseTypes,
) -> OidcResult<AuthorizationResponse>
where
    S: AccessCodeStore + ?Sized,
{
    let mut response = AuthorizationResponse::default();

    for response_type in response_types.iter() {
        match response_type {
            ResponseType::Code => {
                response.code = Some(authorization_code_grant(ctx, request).await?);
            }
            ResponseType::Token => {
                let access_token = implicit_access_token(ctx.codec, request)?;
                response.access_token = Some(access_token);
                response.token_type = Some(BEARER.to_string());
                response.expires_in = Some(ctx.codec.config().access_token_lifespan);
            }
            ResponseType::IdToken => {
                response.id_token = Some(implicit_id_token(
                    ctx.codec,
                    request,
                    response.access_token.as_deref(),
                )?);
            }
        }
    }

    response.state.clone_from(&request.state);
    Ok(response)
}

fn owner_and_client(request: &AuthorizationRequest) -> OidcResult<(&str, &Client)> {
    let owner = request
        .owner
        .as_deref()
        .ok_or_else(|| OidcError::Internal("grant reached without resource owner".to_string()))?;
    let client = request
        .client
        .as_ref()
        .ok_or_else(|| OidcError::Internal("grant reached without client".to_string()))?;
    Ok((owner, client))
}

/// Persists a fresh authorization code and returns its value.
///
/// # Errors
///
/// Returns [`OidcError::Internal`] without owner, client or redirect URI,
/// and storage errors.
pub async fn authorization_code_grant<S>(
    ctx: &GrantContext<'_, S>,
    request: &AuthorizationRequest,
) -> OidcResult<String>
where
    S: AccessCodeStore + ?Sized,
{
    let (owner, client) = owner_and_client(request)?;
    let redirect_uri = request
        .redirect_uri
        .as_deref()
        .ok_or_else(|| OidcError::Internal("grant reached without redirect URI".to_string()))?;

    let code = AccessCode::new(
        generate_access_code(),
        &client.id,
        owner,
        redirect_uri,
        request.scope.iter().cloned().collect(),
    )
    .with_nonce(request.nonce.clone());

    ctx.store.create_code(&code).await?;
    debug!(client_id = %client.id, "authorization code issued");
    Ok(code.code)
}

/// Signs an access token for the request's owner and granted scopes.
///
/// # Errors
///
/// Returns [`OidcError::Internal`] without an authenticated owner.
pub fn implicit_access_token(codec: &TokenCodec, request: &AuthorizationRequest) -> OidcResult<String> {
    let (owner, client) = owner_and_client(request)?;
    codec.issue_access_token(owner, &client.id, &request.scope)
}

/// Signs an ID token, adding `at_hash` when `access_token` is given.
///
/// # Errors
///
/// Returns [`OidcError::Internal`] without an authenticated owner.
pub fn implicit_id_token(
    codec: &TokenCodec,
    request: &AuthorizationRequest,
    access_token: Option<&str>,
) -> OidcResult<String> {
    let (owner, client) = owner_and_client(request)?;
    codec.issue_id_token(owner, &client.id, request.nonce.as_deref(), access_token)
}

/// Dispatches a token endpoint request by `grant_type`.
///
/// # Errors
///
/// Returns [`OidcError::UnsupportedGrantType`] for unknown or unimplemented
/// grants, and any error of the selected grant.
pub async fn execute_token_grant<S>(
    ctx: &GrantContext<'_, S>,
    client: &Client,
    request: &TokenRequest,
) -> OidcResult<TokenResponse>
where
    S: AccessCodeStore + ?Sized,
{
    match request.grant_type.parse::<GrantType>()? {
        GrantType::AuthorizationCode => exchange_code(ctx, client, request).await,
        grant @ (GrantType::ClientCredentials | GrantType::Password) => {
            Err(OidcError::UnsupportedGrantType(format!(
                "Grant type `{}' is not implemented.",
                grant.as_str()
            )))
        }
    }
}

/// Redeems an authorization code for tokens.
///
/// # Errors
///
/// Returns [`OidcError::ParameterRequired`] without `code`, and
/// [`OidcError::InvalidGrant`] when the code is unknown, belongs to another
/// client, has expired, was delivered to another redirect URI, or was already
/// used.
pub async fn exchange_code<S>(
    ctx: &GrantContext<'_, S>,
    client: &Client,
    request: &TokenRequest,
) -> OidcResult<TokenResponse>
where
    S: AccessCodeStore + ?Sized,
{
    let code = request
        .code
        .as_deref()
        .ok_or_else(|| OidcError::ParameterRequired("code".to_string()))?;

    let stored = ctx
        .store
        .get_code(code)
        .await?
        .filter(|stored| stored.client_id == client.id)
        .ok_or_else(|| OidcError::InvalidGrant("Invalid code provided.".to_string()))?;

    if stored.is_expired_at(Utc::now()) {
        return Err(OidcError::InvalidGrant("Code expired.".to_string()));
    }

    if let Some(ref redirect_uri) = request.redirect_uri
        && *redirect_uri != stored.redirect_uri
    {
        return Err(OidcError::InvalidGrant(
            "Redirect URI does not match the authorization request.".to_string(),
        ));
    }

    let redeemed = match ctx.store.redeem_code(code).await? {
        Redemption::Redeemed(redeemed) => redeemed,
        Redemption::AlreadyUsed => {
            info!(client_id = %client.id, "authorization code replayed");
            return Err(OidcError::InvalidGrant("Code already used.".to_string()));
        }
        Redemption::NotFound => {
            return Err(OidcError::InvalidGrant("Invalid code provided.".to_string()));
        }
    };

    let scopes = redeemed.scopes.iter().cloned().collect();
    let access_token = ctx
        .codec
        .issue_access_token(&redeemed.owner, &client.id, &scopes)?;

    let id_token = if scopes.contains("openid") {
        Some(ctx.codec.issue_id_token(
            &redeemed.owner,
            &client.id,
            redeemed.nonce.as_deref(),
            Some(&access_token),
        )?)
    } else {
        None
    };

    Ok(TokenResponse {
        access_token,
        token_type: BEARER.to_string(),
        expires_in: ctx.codec.config().access_token_lifespan,
        id_token,
        scope: Some(join(&scopes)),
    })
}

#[cfg(test)]
mod tests {
    use std::collections::BTreeSet;
    use std::sync::Arc;

    use authd_crypto::{KeyJar, RsaKey};
    use authd_storage::MemoryStore;
    use chrono::Duration;

    use super::*;
    use crate::claims::{AccessTokenClaims, IdTokenClaims};
    use crate::token::{TokenConfig, compute_at_hash};

    fn codec() -> TokenCodec {
        let jar = KeyJar::new(vec![RsaKey::generate(1024).unwrap()]);
        TokenCodec::new(TokenConfig::default(), Arc::new(jar)).unwrap()
    }

    fn request(scope: &[&str]) -> AuthorizationRequest {
        AuthorizationRequest {
            client_id: Some("abc".to_string()),
            redirect_uri: Some("https://cb/".to_string()),
            scope: scope.iter().map(ToString::to_string).collect(),
            state: Some("xyz".to_string()),
            nonce: Some("n-0S6".to_string()),
            client: Some(Client::new_public("abc", "ABC").with_redirect_uri("https://cb/")),
            owner: Some("user-1".to_string()),
            ..AuthorizationRequest::default()
        }
    }

    fn token_request(code: &str) -> TokenRequest {
        TokenRequest {
            grant_type: "authorization_code".to_string(),
            code: Some(code.to_string()),
            ..TokenRequest::default()
        }
    }

    fn types(values: &[ResponseType]) -> ResponseTypes {
        values.iter().copied().collect()
    }

    #[tokio::test]
    async fn token_grant_carries_requested_scope() {
        let store = MemoryStore::new();
        let codec = codec();
        let ctx = GrantContext::new(&store, &codec);

        let response = execute_grants(&ctx, &request(&["email", "profile"]), &types(&[ResponseType::Token]))
            .await
            .unwrap();

        assert!(response.code.is_none());
        assert_eq!(response.token_type.as_deref(), Some(BEARER));
        assert_eq!(response.state.as_deref(), Some("xyz"));

        let claims: AccessTokenClaims = codec.decode(response.access_token.as_deref().unwrap()).unwrap();
        assert_eq!(claims.sub, "user-1");
        assert_eq!(
            claims.scopes(),
            BTreeSet::from(["email".to_string(), "profile".to_string()])
        );
    }

    #[tokio::test]
    async fn id_token_binds_co_issued_access_token() {
        let store = MemoryStore::new();
        let codec = codec();
        let ctx = GrantContext::new(&store, &codec);

        let response = execute_grants(
            &ctx,
            &request(&["openid"]),
            &types(&[ResponseType::IdToken, ResponseType::Token]),
        )
        .await
        .unwrap();

        let access_token = response.access_token.unwrap();
        let claims: IdTokenClaims = codec.decode(&response.id_token.unwrap()).unwrap();
        assert_eq!(claims.aud, "abc");
        assert_eq!(claims.nonce.as_deref(), Some("n-0S6"));
        assert_eq!(claims.at_hash, Some(compute_at_hash(&access_token)));
        assert_eq!(claims.exp - claims.iat, 600);
    }

    #[tokio::test]
    async fn lone_id_token_has_no_at_hash() {
        let store = MemoryStore::new();
        let codec = codec();
        let ctx = GrantContext::new(&store, &codec);

        let response = execute_grants(&ctx, &request(&["openid"]), &types(&[ResponseType::IdToken]))
            .await
            .unwrap();
        let claims: IdTokenClaims = codec.decode(&response.id_token.unwrap()).unwrap();
        assert!(claims.at_hash.is_none());
    }

    #[tokio::test]
    async fn missing_owner_is_an_internal_error() {
        let store = MemoryStore::new();
        let codec = codec();
        let ctx = GrantContext::new(&store, &codec);
        let mut req = request(&["email"]);
        req.owner = None;

        let err = execute_grants(&ctx, &req, &types(&[ResponseType::Token]))
            .await
            .unwrap_err();
        assert!(matches!(err, OidcError::Internal(_)));
        assert_eq!(err.http_status(), 500);
    }

    #[tokio::test]
    async fn code_redeems_exactly_once() {
        let store = MemoryStore::new();
        let codec = codec();
        let ctx = GrantContext::new(&store, &codec);
        let req = request(&["openid", "email"]);
        let client = req.client.clone().unwrap();

        let response = execute_grants(&ctx, &req, &types(&[ResponseType::Code]))
            .await
            .unwrap();
        let code = response.code.unwrap();
        assert!(response.access_token.is_none());

        let tokens = exchange_code(&ctx, &client, &token_request(&code)).await.unwrap();
        assert_eq!(tokens.token_type, "Bearer");
        assert_eq!(tokens.scope.as_deref(), Some("email openid"));
        let id_claims: IdTokenClaims = codec.decode(tokens.id_token.as_deref().unwrap()).unwrap();
        assert_eq!(id_claims.nonce.as_deref(), Some("n-0S6"));

        let err = exchange_code(&ctx, &client, &token_request(&code)).await.unwrap_err();
        assert_eq!(err.error_code(), "invalid_grant");
        assert_eq!(err.to_string(), "Code already used.");
    }

    #[tokio::test]
    async fn oauth2_code_exchange_has_no_id_token() {
        let store = MemoryStore::new();
        let codec = codec();
        let ctx = GrantContext::new(&store, &codec);
        let req = request(&["email"]);
        let client = req.client.clone().unwrap();

        let code = authorization_code_grant(&ctx, &req).await.unwrap();
        let tokens = exchange_code(&ctx, &client, &token_request(&code)).await.unwrap();
        assert!(tokens.id_token.is_none());
    }

    #[tokio::test]
    async fn code_of_another_client_is_invalid() {
        let store = MemoryStore::new();
        let codec = codec();
        let ctx = GrantContext::new(&store, &codec);
        let code = authorization_code_grant(&ctx, &request(&["email"])).await.unwrap();

        let other = Client::new_public("other", "Other");
        let err = exchange_code(&ctx, &other, &token_request(&code)).await.unwrap_err();
        assert_eq!(err.to_string(), "Invalid code provided.");

        let err = exchange_code(&ctx, &other, &token_request("missing")).await.unwrap_err();
        assert_eq!(err.to_string(), "Invalid code provided.");
    }

    #[tokio::test]
    async fn expired_code_is_rejected() {
        let store = MemoryStore::new();
        let codec = codec();
        let ctx = GrantContext::new(&store, &codec);
        let client = Client::new_public("abc", "ABC");

        let mut code = AccessCode::new("old", "abc", "user-1", "https://cb/", vec!["email".to_string()]);
        code.created_at = Utc::now() - Duration::minutes(11);
        store.create_code(&code).await.unwrap();

        let err = exchange_code(&ctx, &client, &token_request("old")).await.unwrap_err();
        assert_eq!(err.error_code(), "invalid_grant");
        assert_eq!(err.to_string(), "Code expired.");
    }

    #[tokio::test]
    async fn redirect_uri_must_match_the_code() {
        let store = MemoryStore::new();
        let codec = codec();
        let ctx = GrantContext::new(&store, &codec);
        let req = request(&["email"]);
        let client = req.client.clone().unwrap();
        let code = authorization_code_grant(&ctx, &req).await.unwrap();

        let mut token_req = token_request(&code);
        token_req.redirect_uri = Some("https://elsewhere/".to_string());
        let err = exchange_code(&ctx, &client, &token_req).await.unwrap_err();
        assert_eq!(err.error_code(), "invalid_grant");

        token_req.redirect_uri = Some("https://cb/".to_string());
        assert!(exchange_code(&ctx, &client, &token_req).await.is_ok());
    }

    #[tokio::test]
    async fn grant_type_dispatch() {
        let store = MemoryStore::new();
        let codec = codec();
        let ctx = GrantContext::new(&store, &codec);
        let client = Client::new_public("abc", "ABC");

        let mut req = TokenRequest {
            grant_type: "password".to_string(),
            ..TokenRequest::default()
        };
        let err = execute_token_grant(&ctx, &client, &req).await.unwrap_err();
        assert_eq!(err.to_string(), "Grant type `password' is not implemented.");

        req.grant_type = "urn:custom".to_string();
        let err = execute_token_grant(&ctx, &client, &req).await.unwrap_err();
        assert_eq!(err.to_string(), "Grant type `urn:custom' is not supported.");

        req.grant_type = "authorization_code".to_string();
        let err = execute_token_grant(&ctx, &client, &req).await.unwrap_err();
        assert_eq!(err.to_string(), "Parameter `code' required.");
    }
}
