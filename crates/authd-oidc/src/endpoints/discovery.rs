//! Discovery endpoint handlers.
//!
//! Implements:
//! - GET `/.well-known/openid-configuration` - `OpenID` Provider Metadata
//! - GET `/auth/jwks` - JSON Web Key Set

use axum::{Json, extract::State, http::StatusCode, response::IntoResponse};

use super::state::{OidcProvider, OidcState};

/// GET `/.well-known/openid-configuration`
pub async fn well_known<P: OidcProvider>(State(state): State<OidcState<P>>) -> impl IntoResponse {
    (StatusCode::OK, Json(state.provider.metadata()))
}

/// GET `/auth/jwks`
///
/// Publishes every key in the key jar, signing key first.
pub async fn jwks<P: OidcProvider>(State(state): State<OidcState<P>>) -> impl IntoResponse {
    (StatusCode::OK, Json(state.provider.codec().jwks()))
}
