//! Token endpoint handler.
//!
//! Implements POST `/auth/token` (RFC 6749 §3.2). Only the
//! `authorization_code` grant issues tokens.

use axum::{
    Form, Json,
    extract::State,
    http::{HeaderMap, HeaderValue, StatusCode, header},
    response::{IntoResponse, Response},
};
use base64::{Engine, engine::general_purpose::STANDARD};
use tracing::{debug, instrument};

use crate::error::{OidcError, OidcResult};
use crate::request::{ClientCredentials, FromParams, Params, TokenRequest};
use crate::token::TokenResponse;
use crate::validators::authenticate_client;

use super::grants::{GrantContext, execute_token_grant};
use super::state::{OidcProvider, OidcState};

/// POST `/auth/token`
///
/// Exchanges an authorization code for tokens.
///
/// # Responses
///
/// - 200 OK: Token response JSON
/// - 400 Bad Request: Invalid request or grant
/// - 401 Unauthorized: Client authentication failed
/// - 500 Internal Server Error: Server error
pub async fn token<P: OidcProvider>(
    State(state): State<OidcState<P>>,
    headers: HeaderMap,
    Form(pairs): Form<Vec<(String, String)>>,
) -> Response {
    match handle_token_request(&state, &headers, &Params::new(pairs)).await {
        Ok(response) => no_store((StatusCode::OK, Json(response)).into_response()),
        Err(ref err) => error_response(err),
    }
}

#[instrument(skip_all)]
async fn handle_token_request<P: OidcProvider>(
    state: &OidcState<P>,
    headers: &HeaderMap,
    params: &Params,
) -> OidcResult<TokenResponse> {
    let provider = &state.provider;

    let credentials = extract_credentials(headers, params)?;
    let client = authenticate_client(provider.store(), &credentials).await?;

    let request = TokenRequest::from_params(params)?;
    debug!(client_id = %client.id, grant_type = %request.grant_type, "token request");

    let ctx = GrantContext::new(provider.store(), provider.codec());
    execute_token_grant(&ctx, &client, &request).await
}

/// Extracts client credentials from the Authorization header or form body.
///
/// HTTP Basic authentication takes precedence (RFC 6749 §2.3.1).
///
/// # Errors
///
/// Returns [`OidcError::InvalidClient`] for a malformed Basic header.
pub fn extract_credentials(headers: &HeaderMap, params: &Params) -> OidcResult<ClientCredentials> {
    if let Some(value) = headers.get(header::AUTHORIZATION)
        && let Some(basic) = value.to_str().ok().and_then(|v| v.strip_prefix("Basic "))
    {
        let invalid = || OidcError::InvalidClient("Invalid basic authorization header.".to_string());

        let decoded = STANDARD.decode(basic.trim()).map_err(|_| invalid())?;
        let decoded = String::from_utf8(decoded).map_err(|_| invalid())?;
        let (client_id, client_secret) = decoded.split_once(':').ok_or_else(invalid)?;

        return Ok(ClientCredentials {
            client_id: Some(urlencoding::decode(client_id).map_err(|_| invalid())?.into_owned()),
            client_secret: Some(urlencoding::decode(client_secret).map_err(|_| invalid())?.into_owned())
                .filter(|secret| !secret.is_empty()),
        });
    }

    Ok(ClientCredentials {
        client_id: params.get("client_id").map(ToString::to_string),
        client_secret: params.get("client_secret").map(ToString::to_string),
    })
}

/// Converts an error to a JSON response.
fn error_response(err: &OidcError) -> Response {
    let status = StatusCode::from_u16(err.http_status()).unwrap_or(StatusCode::BAD_REQUEST);
    no_store((status, Json(err.to_error_response())).into_response())
}

fn no_store(mut response: Response) -> Response {
    let headers = response.headers_mut();
    headers.insert(header::CACHE_CONTROL, HeaderValue::from_static("no-store"));
    headers.insert(header::PRAGMA, HeaderValue::from_static("no-cache"));
    response
}
