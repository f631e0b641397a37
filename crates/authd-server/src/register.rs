//! Local registration.
//!
//! Creates a password user and logs the session in. Reached from the login
//! page, including when a federated account waits to be linked: `next` then
//! points back at the federation callback, which links the new user.

use axum::{
    Form,
    extract::{Query, State},
    http::{HeaderMap, StatusCode},
    response::{IntoResponse, Response},
};
use authd_model::User;
use authd_storage::{StorageError, UserStore};
use serde::Deserialize;
use tracing::{error, info, warn};

use crate::login::{safe_next, sign_in};
use crate::pages::{RegisterTemplate, message_page, render, with_next};
use crate::providers::ServerProviders;
use crate::state::AppState;

/// Longest accepted username or password.
const FIELD_LEN_LIMIT: usize = 1024;

/// Query parameters of the registration page.
#[derive(Debug, Default, Deserialize)]
pub struct RegisterQuery {
    /// Where to go after registering.
    pub next: Option<String>,
}

/// Form data for registration.
#[derive(Debug, Deserialize)]
pub struct RegisterForm {
    /// Requested username.
    pub username: String,
    /// Password.
    pub password: String,
    /// Where to go after registering.
    #[serde(default)]
    pub next: Option<String>,
}

impl RegisterForm {
    /// Trimmed username, or why the form is rejected.
    fn validate(&self) -> Result<&str, &'static str> {
        let username = self.username.trim();
        if username.is_empty() {
            return Err("Username is required");
        }
        if self.password.is_empty() {
            return Err("Password is required");
        }
        if username.len() > FIELD_LEN_LIMIT || self.password.len() > FIELD_LEN_LIMIT {
            return Err("Username or password is too long");
        }
        Ok(username)
    }
}

/// Shows the registration page.
pub async fn register_page(
    State(state): State<AppState>,
    headers: HeaderMap,
    Query(query): Query<RegisterQuery>,
) -> Response {
    let providers = state.providers();
    let (session, created) = providers.sessions().resume_or_create(&headers).await;

    let page = register_template(providers, safe_next(query.next.as_deref()), String::new(), None);
    (providers.sessions().jar(&session, created), render(&page, StatusCode::OK)).into_response()
}

/// Handles registration form submission.
pub async fn register_submit(
    State(state): State<AppState>,
    headers: HeaderMap,
    Form(form): Form<RegisterForm>,
) -> Response {
    let providers = state.providers();
    let (session, created) = providers.sessions().resume_or_create(&headers).await;
    let next = safe_next(form.next.as_deref());

    let rejected = |status: StatusCode, message: &str| {
        let page = register_template(
            providers,
            next.clone(),
            form.username.trim().to_string(),
            Some(message.to_string()),
        );
        (providers.sessions().jar(&session, created), render(&page, status)).into_response()
    };

    let username = match form.validate() {
        Ok(username) => username,
        Err(reason) => return rejected(StatusCode::BAD_REQUEST, reason),
    };

    let user = match User::new(username).with_password(&form.password) {
        Ok(user) => user,
        Err(e) => {
            error!(error = %e, "password hashing failed");
            return message_page(StatusCode::INTERNAL_SERVER_ERROR, "Internal server error");
        }
    };

    match providers.shared_store().create_user(&user).await {
        Ok(()) => {
            info!(user_id = %user.id, "user registered");
            sign_in(providers, &session.id, &user, &next).await
        }
        Err(StorageError::Duplicate { .. }) => {
            warn!(username, "registration with a taken username");
            rejected(StatusCode::CONFLICT, "Username is already taken")
        }
        Err(e) => {
            error!(error = %e, "registration failed");
            message_page(StatusCode::INTERNAL_SERVER_ERROR, "Internal server error")
        }
    }
}

fn register_template(
    providers: &ServerProviders,
    next: String,
    username: String,
    error: Option<String>,
) -> RegisterTemplate {
    let config = providers.config();
    RegisterTemplate {
        action_url: config.registration_path.clone(),
        login_url: with_next(&config.login_path, &next),
        next,
        username,
        error,
    }
}
