//! Authorization request validator chain.
//!
//! Validators run in a fixed order: client, redirect URI, response type,
//! scope. Each later stage relies on the earlier ones having passed, so the
//! endpoint calls them one by one and stops at the first error.

use std::collections::BTreeSet;

use authd_model::Client;
use authd_storage::{ClientStore, ScopeStore};
use tracing::debug;
use url::Url;

use crate::error::{OidcError, OidcResult};
use crate::request::{AuthorizationRequest, ClientCredentials};
use crate::types::{ResponseType, ResponseTypes};

/// Resolves and authenticates the client named by `credentials`.
///
/// A secret is demanded from confidential clients and from public clients
/// that registered one anyway.
///
/// # Errors
///
/// Returns [`OidcError::InvalidClient`] when the id is missing, the client is
/// unknown, or the secret is missing or wrong.
pub async fn authenticate_client<S>(store: &S, credentials: &ClientCredentials) -> OidcResult<Client>
where
    S: ClientStore + ?Sized,
{
    let client_id = credentials
        .client_id
        .as_deref()
        .ok_or_else(|| OidcError::InvalidClient("Parameter `client_id' is not set.".to_string()))?;

    let client = store
        .get_client(client_id)
        .await?
        .ok_or_else(|| OidcError::InvalidClient(format!("Client `{client_id}' not found.")))?;

    if client.requires_authentication() {
        let secret = credentials.client_secret.as_deref().ok_or_else(|| {
            OidcError::InvalidClient("Client's credentials not specified.".to_string())
        })?;
        let valid = client
            .verify_secret(secret)
            .map_err(|e| OidcError::Internal(e.to_string()))?;
        if !valid {
            debug!(client_id, "client secret mismatch");
            return Err(OidcError::InvalidClient("Invalid client's password.".to_string()));
        }
    }

    Ok(client)
}

/// Checks the redirect URI against the client's registrations.
///
/// Returns the verified URI. Every failure here is fatal, because nothing may
/// be sent to an unverified redirect target.
///
/// # Errors
///
/// Returns [`OidcError::InvalidRedirectUri`] if the URI is missing, is not an
/// absolute URI with a host, carries a fragment, or is not registered.
pub fn validate_redirect_uri(client: &Client, redirect_uri: Option<&str>) -> OidcResult<String> {
    let redirect_uri = redirect_uri.ok_or_else(|| {
        OidcError::InvalidRedirectUri("Missing `redirect_uri' parameter.".to_string())
    })?;

    let parsed = Url::parse(redirect_uri).map_err(|_| {
        OidcError::InvalidRedirectUri(format!("Invalid `redirect_uri' parameter: {redirect_uri}."))
    })?;
    if parsed.host_str().is_none_or(str::is_empty) {
        return Err(OidcError::InvalidRedirectUri(
            "Redirect URI must be absolute.".to_string(),
        ));
    }
    if parsed.fragment().is_some() {
        return Err(OidcError::InvalidRedirectUri(
            "Redirect URI must not contain a fragment.".to_string(),
        ));
    }

    if !client.check_redirect_uri(redirect_uri) {
        return Err(OidcError::InvalidRedirectUri(format!(
            "Redirect URI `{redirect_uri}' is not registered."
        )));
    }

    Ok(redirect_uri.to_string())
}

/// Decides whether the requested `response_type` set is legal.
///
/// OpenID Connect requests may combine `code`, `token` and `id_token` freely.
/// Plain OAuth 2.0 requests take exactly one of `code` or `token`.
///
/// # Errors
///
/// Returns [`OidcError::InvalidRequest`] for an empty or illegal set and
/// [`OidcError::UnsupportedResponseType`] for unknown OAuth 2.0 values.
pub fn validate_response_type(request: &AuthorizationRequest) -> OidcResult<ResponseTypes> {
    if request.response_type.is_empty() {
        return Err(OidcError::InvalidRequest(
            "Missing response_type parameter".to_string(),
        ));
    }

    let invalid = || OidcError::InvalidRequest("Invalid response_type parameter".to_string());

    if request.is_openid() {
        return request
            .response_type
            .iter()
            .map(|value| value.parse::<ResponseType>().map_err(|_| invalid()))
            .collect::<OidcResult<BTreeSet<_>>>()
            .map(ResponseTypes::new);
    }

    let types = request
        .response_type
        .iter()
        .map(|value| value.parse::<ResponseType>())
        .collect::<OidcResult<BTreeSet<_>>>()?;

    match types.iter().copied().collect::<Vec<_>>().as_slice() {
        [ResponseType::Code | ResponseType::Token] => Ok(ResponseTypes::new(types)),
        _ => Err(invalid()),
    }
}

/// Resolves the request's scopes, substituting defaults for an empty set.
///
/// On success `request.scope` holds the granted set.
///
/// # Errors
///
/// Returns [`OidcError::InvalidScope`] when no defaults exist for an empty
/// request, or for the first unknown scope code.
pub async fn validate_scope<S>(store: &S, request: &mut AuthorizationRequest) -> OidcResult<()>
where
    S: ScopeStore + ?Sized,
{
    if request.scope.is_empty() {
        let defaults = store.default_scopes().await?;
        if defaults.is_empty() {
            return Err(OidcError::InvalidScope(
                "No scope in request and no default scopes configured.".to_string(),
            ));
        }
        request.scope = defaults.into_iter().map(|scope| scope.code).collect();
        return Ok(());
    }

    for code in &request.scope {
        if store.get_scope(code).await?.is_none() {
            return Err(OidcError::InvalidScope(format!("Invalid scope `{code}'.")));
        }
    }
    Ok(())
}
