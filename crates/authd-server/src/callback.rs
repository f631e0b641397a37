//! Federation callback (`/auth/oidc/callback`).

use authd_federation::{CallbackOutcome, CallbackRequest, FederationError};
use authd_oidc::{FromParams, Params};
use axum::{
    extract::{Query, State},
    http::HeaderMap,
    response::{IntoResponse, Redirect, Response},
};
use tracing::{info, instrument};
use url::form_urlencoded;

use crate::config::CALLBACK_PATH;
use crate::state::AppState;

/// Completes a federated login started by the authorization endpoint.
#[instrument(skip_all)]
pub async fn oidc_callback(
    State(state): State<AppState>,
    headers: HeaderMap,
    Query(pairs): Query<Vec<(String, String)>>,
) -> Response {
    let providers = state.providers();

    let callback = match CallbackRequest::from_params(&Params::new(pairs)) {
        Ok(callback) => callback,
        Err(e) => {
            return providers.federation_error(&FederationError::InvalidParameter(e.description()), "/");
        }
    };

    let Some(session) = providers.sessions().from_headers(&headers).await else {
        return providers.federation_error(&FederationError::SessionMismatch, "/");
    };

    match providers
        .federation()
        .complete(&session.binding, session.user_id, &callback)
        .await
    {
        Ok(CallbackOutcome::Authenticated { user_id, resume }) => {
            match providers.sessions().authenticate(&session.id, user_id).await {
                Some(session) => {
                    (providers.sessions().jar(&session, true), Redirect::to(&resume)).into_response()
                }
                None => providers.federation_error(&FederationError::SessionMismatch, "/"),
            }
        }
        Ok(CallbackOutcome::Linked { user_id, resume }) => {
            info!(%user_id, "resuming after account link");
            Redirect::to(&resume).into_response()
        }
        // The login page also offers registration with the same `next`.
        Ok(CallbackOutcome::LinkRequired { state }) => {
            let query = form_urlencoded::Serializer::new(String::new())
                .append_pair("state", &state)
                .finish();
            providers.login_redirect(&format!("{CALLBACK_PATH}?{query}"))
        }
        Err(e) => providers.federation_error(&e, "/"),
    }
}
