//! Common OAuth 2.0 / OIDC enumerations.

use std::collections::BTreeSet;
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::OidcError;

/// A single `response_type` value.
///
/// The derived ordering is the order in which grants execute: the code grant
/// first, the ID token last so it can bind a co-issued access token.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ResponseType {
    /// Authorization code.
    Code,
    /// Access token (implicit).
    Token,
    /// ID token (implicit).
    IdToken,
}

impl ResponseType {
    /// Wire name.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Code => "code",
            Self::Token => "token",
            Self::IdToken => "id_token",
        }
    }
}

impl fmt::Display for ResponseType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ResponseType {
    type Err = OidcError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "code" => Ok(Self::Code),
            "token" => Ok(Self::Token),
            "id_token" => Ok(Self::IdToken),
            other => Err(OidcError::UnsupportedResponseType(format!(
                "Unsupported response_type `{other}'."
            ))),
        }
    }
}

/// A validated, ordered set of response types.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ResponseTypes(BTreeSet<ResponseType>);

impl ResponseTypes {
    /// Wraps a set.
    #[must_use]
    pub const fn new(types: BTreeSet<ResponseType>) -> Self {
        Self(types)
    }

    /// Whether `response_type` is in the set.
    #[must_use]
    pub fn contains(&self, response_type: ResponseType) -> bool {
        self.0.contains(&response_type)
    }

    /// Iterates in grant execution order.
    pub fn iter(&self) -> impl Iterator<Item = ResponseType> + '_ {
        self.0.iter().copied()
    }

    /// Number of response types.
    #[must_use]
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Whether the set is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl FromIterator<ResponseType> for ResponseTypes {
    fn from_iter<I: IntoIterator<Item = ResponseType>>(iter: I) -> Self {
        Self(iter.into_iter().collect())
    }
}

/// Where grant output is placed on the redirect URI.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ResponseMode {
    /// Query component.
    Query,
    /// Fragment component.
    Fragment,
}

impl ResponseMode {
    /// Default mode for a raw `response_type` set.
    ///
    /// Only a lone `code` uses the query; once a token takes part, or when the
    /// set is empty or invalid, output goes in the fragment.
    #[must_use]
    pub fn for_response_type(response_type: &BTreeSet<String>) -> Self {
        if response_type.len() == 1 && response_type.contains("code") {
            Self::Query
        } else {
            Self::Fragment
        }
    }

    /// Wire name.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Query => "query",
            Self::Fragment => "fragment",
        }
    }
}

/// Token endpoint grant type.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GrantType {
    /// Authorization code exchange (RFC 6749 §4.1.3).
    AuthorizationCode,
    /// Client credentials (RFC 6749 §4.4). Not implemented.
    ClientCredentials,
    /// Resource owner password (RFC 6749 §4.3). Not implemented.
    Password,
}

impl GrantType {
    /// Wire name.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::AuthorizationCode => "authorization_code",
            Self::ClientCredentials => "client_credentials",
            Self::Password => "password",
        }
    }
}

impl FromStr for GrantType {
    type Err = OidcError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "authorization_code" => Ok(Self::AuthorizationCode),
            "client_credentials" => Ok(Self::ClientCredentials),
            "password" => Ok(Self::Password),
            other => Err(OidcError::UnsupportedGrantType(format!(
                "Grant type `{other}' is not supported."
            ))),
        }
    }
}
