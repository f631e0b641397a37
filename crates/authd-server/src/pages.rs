//! HTML pages.
//!
//! Templates live under `templates/` and are compiled in by askama, which
//! escapes every interpolated value.

use askama::Template;
use axum::{
    http::StatusCode,
    response::{Html, IntoResponse, Response},
};
use tracing::error;
use url::form_urlencoded;

/// Login page template.
#[derive(Template)]
#[template(path = "login.html")]
pub struct LoginTemplate {
    /// Form action URL.
    pub action_url: String,
    /// Where to go after logging in.
    pub next: String,
    /// Registration page, resuming at the same `next`.
    pub registration_url: String,
    /// Error message to display.
    pub error: Option<String>,
}

/// Registration page template.
#[derive(Template)]
#[template(path = "register.html")]
pub struct RegisterTemplate {
    /// Form action URL.
    pub action_url: String,
    /// Where to go after registering.
    pub next: String,
    /// Username to prefill after a rejected attempt.
    pub username: String,
    /// Login page, resuming at the same `next`.
    pub login_url: String,
    /// Error message to display.
    pub error: Option<String>,
}

/// Error page template.
#[derive(Template)]
#[template(path = "error.html")]
pub struct ErrorTemplate {
    /// Short error title.
    pub error: String,
    /// Error description.
    pub error_description: Option<String>,
}

/// `path?next=<next>`.
#[must_use]
pub fn with_next(path: &str, next: &str) -> String {
    let query = form_urlencoded::Serializer::new(String::new())
        .append_pair("next", next)
        .finish();
    format!("{path}?{query}")
}

/// Renders `template` with `status`, or a plain 500 if rendering fails.
pub fn render(template: &impl Template, status: StatusCode) -> Response {
    match template.render() {
        Ok(html) => (status, Html(html)).into_response(),
        Err(e) => {
            error!(error = %e, "template render failed");
            (StatusCode::INTERNAL_SERVER_ERROR, "Template error").into_response()
        }
    }
}

/// Error page for `status` showing `message`.
#[must_use]
pub fn message_page(status: StatusCode, message: &str) -> Response {
    let template = ErrorTemplate {
        error: status.canonical_reason().unwrap_or("Error").to_string(),
        error_description: Some(message.to_string()),
    };
    render(&template, status)
}
