//! Authorization endpoint handler.
//!
//! Implements GET/POST `/auth/authorize` for OAuth 2.0 and `OpenID` Connect.
//!
//! The request passes the validator chain in order, then the end user is
//! authenticated, then the grants run:
//!
//! 1. parse (fatal)
//! 2. client authentication (fatal)
//! 3. redirect URI verification (fatal)
//! 4. response type and scope (redirectable)
//! 5. end-user authentication (may answer with a challenge)
//! 6. grant execution (redirectable)

use axum::{
    Form,
    extract::{Query, State},
    http::HeaderMap,
    response::Response,
};
use tracing::{debug, instrument};

use crate::request::{AuthorizationRequest, FromParams, Params};
use crate::validators::{authenticate_client, validate_redirect_uri, validate_response_type, validate_scope};

use super::grants::{GrantContext, execute_grants};
use super::response::{error_page, error_response, success_redirect};
use super::state::{EndUser, OidcProvider, OidcState};

/// GET `/auth/authorize`
///
/// # Responses
///
/// - 303 See Other: grant output or a redirectable error on the client's
///   redirect URI, or a login challenge
/// - 400 / 401: the client or redirect URI could not be verified
/// - 500: unexpected server error
pub async fn authorize_get<P: OidcProvider>(
    State(state): State<OidcState<P>>,
    headers: HeaderMap,
    Query(pairs): Query<Vec<(String, String)>>,
) -> Response {
    handle_authorization_request(&state, &headers, Params::new(pairs)).await
}

/// POST `/auth/authorize`
///
/// Same as GET but accepts form-encoded parameters.
pub async fn authorize_post<P: OidcProvider>(
    State(state): State<OidcState<P>>,
    headers: HeaderMap,
    Form(pairs): Form<Vec<(String, String)>>,
) -> Response {
    handle_authorization_request(&state, &headers, Params::new(pairs)).await
}

/// Runs the authorization pipeline for one request.
#[instrument(skip_all, fields(client_id = params.get("client_id").unwrap_or_default()))]
pub async fn handle_authorization_request<P: OidcProvider>(
    state: &OidcState<P>,
    headers: &HeaderMap,
    params: Params,
) -> Response {
    let provider = &state.provider;
    let params = provider.restore_params(headers, params).await;

    let mut request = match AuthorizationRequest::from_params(&params) {
        Ok(request) => request,
        Err(ref err) => return error_page(err),
    };

    let client = match authenticate_client(provider.store(), &request.credentials()).await {
        Ok(client) => client,
        Err(ref err) => return error_page(err),
    };

    // Nothing is redirected before this point.
    let redirect_uri = match validate_redirect_uri(&client, request.redirect_uri.as_deref()) {
        Ok(uri) => uri,
        Err(ref err) => return error_page(err),
    };
    request.client = Some(client);

    let mode = request.response_mode();
    let fail = |err, request: &AuthorizationRequest| {
        error_response(&redirect_uri, &err, request.state.as_deref(), mode)
    };

    let response_types = match validate_response_type(&request) {
        Ok(types) => types,
        Err(err) => return fail(err, &request),
    };
    if let Err(err) = validate_scope(provider.store(), &mut request).await {
        return fail(err, &request);
    }

    match provider.authenticate_end_user(headers, &request, &params).await {
        EndUser::Authenticated(owner) => request.owner = Some(owner),
        EndUser::Challenge(response) => {
            debug!("end user must authenticate");
            return response;
        }
    }

    let ctx = GrantContext::new(provider.store(), provider.codec());
    match execute_grants(&ctx, &request, &response_types).await {
        Ok(response) => success_redirect(&redirect_uri, &response, mode),
        Err(err) => fail(err, &request),
    }
}
