//! OAuth 2.0 / OIDC protocol errors.
//!
//! Error codes follow RFC 6749 §4.1.2.1, §4.2.2.1 and §5.2. Every error also
//! carries a [`Disposition`] deciding how the authorization endpoint reports
//! it: as a flat error page, as a redirect back to the client, or as a 500.

use authd_storage::StorageError;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Description used for errors whose details must not reach the client.
pub const UNEXPECTED_ERROR_DESCRIPTION: &str = "Unexpected server error, please try later.";

/// How an error surfaces at the authorization endpoint.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Disposition {
    /// Redirect URI cannot be trusted; render an error page (400/401).
    Fatal,
    /// Report to the client on its verified redirect URI.
    Redirect,
    /// Internal failure; render a 500 and never redirect.
    Unexpected,
}

/// OIDC protocol errors.
///
/// `Display` yields the bare human-readable description.
#[derive(Debug, Error)]
pub enum OidcError {
    /// A declared required parameter is missing.
    #[error("Parameter `{0}' required.")]
    ParameterRequired(String),

    /// Malformed request.
    #[error("{0}")]
    InvalidRequest(String),

    /// Client authentication failed.
    #[error("{0}")]
    InvalidClient(String),

    /// Redirect URI missing, malformed or not registered.
    #[error("{0}")]
    InvalidRedirectUri(String),

    /// Response type not supported by this server.
    #[error("{0}")]
    UnsupportedResponseType(String),

    /// Requested scope is unknown.
    #[error("{0}")]
    InvalidScope(String),

    /// Resource owner or server denied the request.
    #[error("{0}")]
    AccessDenied(String),

    /// Authorization code invalid, expired or already used.
    #[error("{0}")]
    InvalidGrant(String),

    /// Grant type unknown or not implemented.
    #[error("{0}")]
    UnsupportedGrantType(String),

    /// Signing a token failed.
    #[error("token signing failed: {0}")]
    TokenSigning(String),

    /// A presented token failed verification.
    #[error("token validation failed: {0}")]
    TokenValidation(String),

    /// A valid token lacks a scope the resource requires.
    #[error("{0}")]
    InsufficientScope(String),

    /// Backend storage failed.
    #[error(transparent)]
    Storage(#[from] StorageError),

    /// Internal error, including broken pipeline preconditions.
    #[error("internal error: {0}")]
    Internal(String),
}

impl OidcError {
    /// Returns the OAuth 2.0 error code.
    #[must_use]
    pub const fn error_code(&self) -> &'static str {
        match self {
            Self::ParameterRequired(_) | Self::InvalidRequest(_) | Self::InvalidRedirectUri(_) => {
                "invalid_request"
            }
            Self::InvalidClient(_) => "invalid_client",
            Self::UnsupportedResponseType(_) => "unsupported_response_type",
            Self::InvalidScope(_) => "invalid_scope",
            Self::AccessDenied(_) => "access_denied",
            Self::InvalidGrant(_) => "invalid_grant",
            Self::UnsupportedGrantType(_) => "unsupported_grant_type",
            Self::TokenValidation(_) => "invalid_token",
            Self::InsufficientScope(_) => "insufficient_scope",
            Self::TokenSigning(_) | Self::Storage(_) | Self::Internal(_) => "server_error",
        }
    }

    /// Returns the HTTP status code for this error.
    #[must_use]
    pub const fn http_status(&self) -> u16 {
        match self {
            Self::ParameterRequired(_)
            | Self::InvalidRequest(_)
            | Self::InvalidRedirectUri(_)
            | Self::UnsupportedResponseType(_)
            | Self::InvalidScope(_)
            | Self::InvalidGrant(_)
            | Self::UnsupportedGrantType(_) => 400,
            Self::InvalidClient(_) | Self::TokenValidation(_) => 401,
            Self::AccessDenied(_) | Self::InsufficientScope(_) => 403,
            Self::TokenSigning(_) | Self::Storage(_) | Self::Internal(_) => 500,
        }
    }

    /// Returns how the authorization endpoint must report this error.
    #[must_use]
    pub const fn disposition(&self) -> Disposition {
        match self {
            Self::ParameterRequired(_)
            | Self::InvalidClient(_)
            | Self::InvalidRedirectUri(_)
            | Self::TokenValidation(_)
            | Self::InsufficientScope(_) => Disposition::Fatal,
            Self::TokenSigning(_) | Self::Storage(_) | Self::Internal(_) => Disposition::Unexpected,
            Self::InvalidRequest(_)
            | Self::UnsupportedResponseType(_)
            | Self::InvalidScope(_)
            | Self::AccessDenied(_)
            | Self::InvalidGrant(_)
            | Self::UnsupportedGrantType(_) => Disposition::Redirect,
        }
    }

    /// Description safe to show to the client.
    #[must_use]
    pub fn description(&self) -> String {
        match self.disposition() {
            Disposition::Unexpected => UNEXPECTED_ERROR_DESCRIPTION.to_string(),
            Disposition::Fatal | Disposition::Redirect => self.to_string(),
        }
    }

    /// Creates an error response for OAuth 2.0/OIDC.
    #[must_use]
    pub fn to_error_response(&self) -> ErrorResponse {
        ErrorResponse {
            error: self.error_code().to_string(),
            error_description: Some(self.description()),
            error_uri: None,
        }
    }
}

/// OAuth 2.0 error response.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ErrorResponse {
    /// Error code.
    pub error: String,

    /// Human-readable error description.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error_description: Option<String>,

    /// URI with more information about the error.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error_uri: Option<String>,
}

/// Result type for OIDC operations.
pub type OidcResult<T> = Result<T, OidcError>;
