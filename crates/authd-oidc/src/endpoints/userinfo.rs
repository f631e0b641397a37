//! `UserInfo` endpoint handler.
//!
//! Implements GET/POST `/auth/userinfo` (`OpenID` Connect Core §5.3). The
//! bearer access token must be one of ours and carry the `openid` scope.

use axum::{
    Json,
    extract::State,
    http::{HeaderMap, StatusCode, header},
    response::{IntoResponse, Response},
};
use serde::{Deserialize, Serialize};
use tracing::{debug, instrument};

use crate::claims::AccessTokenClaims;
use crate::error::{OidcError, OidcResult};

use super::state::{OidcProvider, OidcState};

/// `UserInfo` response.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserInfoResponse {
    /// Subject identifier.
    pub sub: String,
}

/// GET `/auth/userinfo`
///
/// # Responses
///
/// - 200 OK: `UserInfo` JSON
/// - 401 Unauthorized: missing, malformed or invalid token
/// - 403 Forbidden: token lacks the `openid` scope
pub async fn userinfo_get<P: OidcProvider>(State(state): State<OidcState<P>>, headers: HeaderMap) -> Response {
    respond(handle_userinfo_request(&state, &headers))
}

/// POST `/auth/userinfo`
///
/// Same as GET. The token is only read from the `Authorization` header.
pub async fn userinfo_post<P: OidcProvider>(State(state): State<OidcState<P>>, headers: HeaderMap) -> Response {
    respond(handle_userinfo_request(&state, &headers))
}

#[instrument(skip_all)]
fn handle_userinfo_request<P: OidcProvider>(
    state: &OidcState<P>,
    headers: &HeaderMap,
) -> OidcResult<UserInfoResponse> {
    let access_token = extract_bearer_token(headers)?;
    let claims: AccessTokenClaims = state.provider.codec().decode(access_token)?;

    if !claims.scope.iter().any(|scope| scope == "openid") {
        return Err(OidcError::InsufficientScope(
            "openid scope is required for userinfo endpoint".to_string(),
        ));
    }

    debug!(sub = %claims.sub, "userinfo request");
    Ok(UserInfoResponse { sub: claims.sub })
}

/// Extracts the bearer token from the `Authorization` header.
///
/// # Errors
///
/// Returns [`OidcError::TokenValidation`] if the header is missing, is not
/// a bearer credential or carries an empty token.
pub fn extract_bearer_token(headers: &HeaderMap) -> OidcResult<&str> {
    let value = headers
        .get(header::AUTHORIZATION)
        .ok_or_else(|| OidcError::TokenValidation("missing authorization header".to_string()))?
        .to_str()
        .map_err(|_| OidcError::TokenValidation("invalid authorization header".to_string()))?;

    let token = value
        .strip_prefix("Bearer ")
        .ok_or_else(|| OidcError::TokenValidation("expected Bearer token".to_string()))?
        .trim();

    if token.is_empty() {
        return Err(OidcError::TokenValidation("empty token".to_string()));
    }
    Ok(token)
}

fn respond(result: OidcResult<UserInfoResponse>) -> Response {
    match result {
        Ok(response) => (StatusCode::OK, Json(response)).into_response(),
        Err(ref err) => error_response(err),
    }
}

/// JSON error with a `WWW-Authenticate` challenge (RFC 6750 §3).
fn error_response(err: &OidcError) -> Response {
    let status = StatusCode::from_u16(err.http_status()).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
    let challenge = format!(
        "Bearer error=\"{}\", error_description=\"{}\"",
        err.error_code(),
        err.description().replace('"', "'")
    );
    (
        status,
        [(header::WWW_AUTHENTICATE, challenge)],
        Json(err.to_error_response()),
    )
        .into_response()
}
