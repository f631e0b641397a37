//! Response assembly for the authorization endpoint.
//!
//! Grant output and redirectable errors go back to the verified redirect URI
//! as a 303, in the query or the fragment. Fatal and unexpected errors render
//! an HTML page and never redirect.

use axum::{
    http::StatusCode,
    response::{Html, IntoResponse, Redirect, Response},
};
use tracing::{error, warn};
use url::{Url, form_urlencoded};

use crate::error::{Disposition, OidcError};
use crate::types::ResponseMode;

use super::grants::AuthorizationResponse;

/// Redirects to `redirect_uri` with the grant output.
#[must_use]
pub fn success_redirect(redirect_uri: &str, response: &AuthorizationResponse, mode: ResponseMode) -> Response {
    build_redirect(redirect_uri, &response.to_params(), mode)
}

/// Reports `error` according to its disposition.
///
/// Only redirectable errors reach `redirect_uri`.
#[must_use]
pub fn error_response(
    redirect_uri: &str,
    error: &OidcError,
    state: Option<&str>,
    mode: ResponseMode,
) -> Response {
    match error.disposition() {
        Disposition::Redirect => {
            let mut params = vec![
                ("error".to_string(), error.error_code().to_string()),
                ("error_description".to_string(), error.description()),
            ];
            if let Some(state) = state {
                params.push(("state".to_string(), state.to_string()));
            }
            build_redirect(redirect_uri, &params, mode)
        }
        Disposition::Fatal | Disposition::Unexpected => error_page(error),
    }
}

/// Builds a 303 redirect, keeping parameters already on the URI.
#[must_use]
pub fn build_redirect(redirect_uri: &str, params: &[(String, String)], mode: ResponseMode) -> Response {
    let mut url = match Url::parse(redirect_uri) {
        Ok(url) => url,
        Err(e) => {
            error!(redirect_uri, error = %e, "verified redirect URI failed to parse");
            return error_page(&OidcError::Internal(e.to_string()));
        }
    };

    match mode {
        ResponseMode::Query => {
            url.query_pairs_mut().extend_pairs(params);
        }
        ResponseMode::Fragment => {
            let encoded = form_urlencoded::Serializer::new(String::new())
                .extend_pairs(params)
                .finish();
            let fragment = match url.fragment() {
                Some(existing) if !existing.is_empty() => format!("{existing}&{encoded}"),
                _ => encoded,
            };
            url.set_fragment(Some(&fragment));
        }
    }

    Redirect::to(url.as_str()).into_response()
}

/// Renders an error page for errors that must not be redirected.
#[must_use]
pub fn error_page(error: &OidcError) -> Response {
    if error.disposition() == Disposition::Unexpected {
        error!(error = %error, "authorization request failed");
    } else {
        warn!(error = %error, "authorization request rejected");
    }

    let status =
        StatusCode::from_u16(error.http_status()).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
    let html = format!(
        r"<!DOCTYPE html>
<html>
<head><title>Authorization Error</title></head>
<body>
<h1>Authorization Error</h1>
<p><strong>Error:</strong> {}</p>
<p><strong>Description:</strong> {}</p>
</body>
</html>",
        html_escape(error.error_code()),
        html_escape(&error.description())
    );

    (status, Html(html)).into_response()
}

/// Simple HTML escaping.
fn html_escape(s: &str) -> String {
    s.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
        .replace('\'', "&#x27;")
}

#[cfg(test)]
mod tests {
    use axum::http::header::LOCATION;
    use authd_storage::StorageError;

    use super::*;

    fn location(response: &Response) -> &str {
        response.headers().get(LOCATION).unwrap().to_str().unwrap()
    }

    fn params(pairs: &[(&str, &str)]) -> Vec<(String, String)> {
        pairs
            .iter()
            .map(|(k, v)| ((*k).to_string(), (*v).to_string()))
            .collect()
    }

    #[test]
    fn query_mode_keeps_existing_query() {
        let response = build_redirect(
            "https://cb/path?keep=1",
            &params(&[("code", "abc"), ("state", "s t")]),
            ResponseMode::Query,
        );
        assert_eq!(response.status(), StatusCode::SEE_OTHER);
        assert_eq!(location(&response), "https://cb/path?keep=1&code=abc&state=s+t");
    }

    #[test]
    fn fragment_mode_leaves_query_alone() {
        let response = build_redirect(
            "https://cb/?keep=1",
            &params(&[("access_token", "t")]),
            ResponseMode::Fragment,
        );
        assert_eq!(location(&response), "https://cb/?keep=1#access_token=t");
    }

    #[test]
    fn redirectable_error_carries_state() {
        let err = OidcError::InvalidRequest("Missing response_type parameter".into());
        let response = error_response("https://cb/", &err, Some("xyz"), ResponseMode::Fragment);
        assert_eq!(response.status(), StatusCode::SEE_OTHER);

        let url = Url::parse(location(&response)).unwrap();
        let fragment: Vec<(String, String)> = form_urlencoded::parse(url.fragment().unwrap().as_bytes())
            .into_owned()
            .collect();
        assert_eq!(
            fragment,
            params(&[
                ("error", "invalid_request"),
                ("error_description", "Missing response_type parameter"),
                ("state", "xyz"),
            ])
        );
    }

    #[test]
    fn fatal_and_unexpected_errors_never_redirect() {
        let fatal = OidcError::InvalidClient("Client `x' not found.".into());
        let response = error_response("https://cb/", &fatal, None, ResponseMode::Query);
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
        assert!(response.headers().get(LOCATION).is_none());

        let unexpected = OidcError::Storage(StorageError::Internal("boom".into()));
        let response = error_response("https://cb/", &unexpected, None, ResponseMode::Query);
        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
        assert!(response.headers().get(LOCATION).is_none());
    }

    #[test]
    fn html_escape_special_chars() {
        assert_eq!(html_escape("<script>"), "&lt;script&gt;");
        assert_eq!(html_escape("a & b"), "a &amp; b");
        assert_eq!(html_escape(r#"test"value"#), "test&quot;value");
    }
}
