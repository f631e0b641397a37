//! Login page and password login.
//!
//! Also reports federation failures, either back on the login page or on an
//! error page.

use axum::{
    Form,
    extract::{Query, State},
    http::{HeaderMap, StatusCode},
    response::{IntoResponse, Redirect, Response},
};
use authd_federation::FederationError;
use authd_model::User;
use authd_storage::{MemoryStore, UserStore};
use serde::Deserialize;
use tracing::{error, info, warn};
use url::form_urlencoded;

use crate::pages::{LoginTemplate, message_page, render, with_next};
use crate::providers::ServerProviders;
use crate::state::AppState;

/// Query parameters of the login page.
#[derive(Debug, Default, Deserialize)]
pub struct LoginQuery {
    /// Where to go after logging in.
    pub next: Option<String>,
    /// Error code to display.
    pub error: Option<String>,
    /// Error description to display.
    pub error_description: Option<String>,
}

/// Form data for login submission.
#[derive(Debug, Deserialize)]
pub struct LoginForm {
    /// Username.
    pub username: String,
    /// Password.
    pub password: String,
    /// Where to go after logging in.
    #[serde(default)]
    pub next: Option<String>,
}

/// Shows the login page.
pub async fn login_page(
    State(state): State<AppState>,
    headers: HeaderMap,
    Query(query): Query<LoginQuery>,
) -> Response {
    let providers = state.providers();
    let (session, created) = providers.sessions().resume_or_create(&headers).await;
    let message = query.error_description.or(query.error);

    let page = login_template(providers, safe_next(query.next.as_deref()), message);
    (providers.sessions().jar(&session, created), render(&page, StatusCode::OK)).into_response()
}

/// Handles login form submission.
pub async fn login_submit(
    State(state): State<AppState>,
    headers: HeaderMap,
    Form(form): Form<LoginForm>,
) -> Response {
    let providers = state.providers();
    let (session, created) = providers.sessions().resume_or_create(&headers).await;
    let next = safe_next(form.next.as_deref());

    match check_password(providers.shared_store(), &form.username, &form.password).await {
        Ok(Some(user)) => {
            info!(user_id = %user.id, "password login");
            sign_in(providers, &session.id, &user, &next).await
        }
        Ok(None) => {
            warn!(username = %form.username, "failed password login");
            let page = login_template(
                providers,
                next,
                Some("Invalid username or password".to_string()),
            );
            let jar = providers.sessions().jar(&session, created);
            (jar, render(&page, StatusCode::UNAUTHORIZED)).into_response()
        }
        Err(e) => {
            error!(error = %e, "password login failed");
            message_page(StatusCode::INTERNAL_SERVER_ERROR, "Internal server error")
        }
    }
}

/// Authenticates `user` under a fresh session id and continues to `next`.
pub(crate) async fn sign_in(providers: &ServerProviders, session_id: &str, user: &User, next: &str) -> Response {
    match providers.sessions().authenticate(session_id, user.id).await {
        Some(session) => (providers.sessions().jar(&session, true), Redirect::to(next)).into_response(),
        None => {
            warn!(user_id = %user.id, "session vanished during login");
            providers.login_redirect(next)
        }
    }
}

fn login_template(providers: &ServerProviders, next: String, error: Option<String>) -> LoginTemplate {
    let config = providers.config();
    LoginTemplate {
        action_url: config.login_path.clone(),
        registration_url: with_next(&config.registration_path, &next),
        next,
        error,
    }
}

async fn check_password(store: &MemoryStore, username: &str, password: &str) -> anyhow::Result<Option<User>> {
    let Some(user) = store.get_user_by_username(username).await? else {
        return Ok(None);
    };
    Ok(user.verify_password(password)?.then_some(user))
}

/// Accepts only local, path-absolute targets.
pub(crate) fn safe_next(next: Option<&str>) -> String {
    match next {
        Some(next) if next.starts_with('/') && !next.starts_with("//") => next.to_string(),
        _ => "/".to_string(),
    }
}

/// Redirects to the login page with `next` and an optional provider error.
#[must_use]
pub fn login_redirect(login_path: &str, next: &str, provider_error: Option<&str>) -> Response {
    let mut query = form_urlencoded::Serializer::new(String::new());
    if let Some(description) = provider_error {
        query
            .append_pair("error", "provider_error")
            .append_pair("error_description", description);
    }
    query.append_pair("next", next);
    Redirect::to(&format!("{login_path}?{}", query.finish())).into_response()
}

/// Provider errors go back to the login page; the rest render with their status.
#[must_use]
pub fn federation_error_response(login_path: &str, error: &FederationError, next: &str) -> Response {
    if error.is_provider_error() {
        warn!(error = %error, "provider unusable");
        return login_redirect(login_path, next, Some(&error.to_string()));
    }

    let status = StatusCode::from_u16(error.http_status()).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
    if status.is_server_error() {
        error!(error = %error, "federation failed");
        message_page(status, "Internal server error")
    } else {
        warn!(error = %error, "federation rejected");
        message_page(status, &error.to_string())
    }
}
