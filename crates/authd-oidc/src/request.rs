//! Typed requests built from raw query or form parameters.
//!
//! Each request type declares its fields once ([`FromParams::FIELDS`]). Unknown
//! parameters are discarded, set-valued fields are split on whitespace, and a
//! missing required field fails with [`OidcError::ParameterRequired`].
//!
//! Parameters sent without a value are treated as omitted (RFC 6749 §3.1).

use std::collections::{BTreeSet, HashMap};

use authd_model::Client;
use url::form_urlencoded;

use crate::error::{OidcError, OidcResult};
use crate::types::ResponseMode;

/// Raw request parameters in arrival order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Params(Vec<(String, String)>);

impl Params {
    /// Wraps decoded pairs, dropping those with empty values.
    #[must_use]
    pub fn new(pairs: Vec<(String, String)>) -> Self {
        Self(pairs.into_iter().filter(|(_, v)| !v.is_empty()).collect())
    }

    /// Parses an `application/x-www-form-urlencoded` string.
    #[must_use]
    pub fn parse(encoded: &str) -> Self {
        Self::new(form_urlencoded::parse(encoded.as_bytes()).into_owned().collect())
    }

    /// First value of `name`.
    #[must_use]
    pub fn get(&self, name: &str) -> Option<&str> {
        self.0
            .iter()
            .find(|(k, _)| k == name)
            .map(|(_, v)| v.as_str())
    }

    /// Every value of `name`.
    pub fn get_all<'a>(&'a self, name: &'a str) -> impl Iterator<Item = &'a str> + 'a {
        self.0
            .iter()
            .filter(move |(k, _)| k == name)
            .map(|(_, v)| v.as_str())
    }

    /// All pairs.
    #[must_use]
    pub fn pairs(&self) -> &[(String, String)] {
        &self.0
    }

    /// Copy without any `name` pair.
    #[must_use]
    pub fn without(&self, name: &str) -> Self {
        Self(self.0.iter().filter(|(k, _)| k != name).cloned().collect())
    }

    /// Adds a pair unless `name` is already present.
    pub fn insert_missing(&mut self, name: &str, value: impl Into<String>) {
        if self.get(name).is_none() {
            self.0.push((name.to_string(), value.into()));
        }
    }

    /// Re-encodes the parameters.
    #[must_use]
    pub fn to_query_string(&self) -> String {
        form_urlencoded::Serializer::new(String::new())
            .extend_pairs(self.0.iter())
            .finish()
    }
}

impl From<Vec<(String, String)>> for Params {
    fn from(pairs: Vec<(String, String)>) -> Self {
        Self::new(pairs)
    }
}

/// Shape of a declared field.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldKind {
    /// Single optional value.
    Optional,
    /// Single value that must be present.
    Required,
    /// Whitespace-separated set, empty when absent.
    Set,
}

/// A declared request field.
#[derive(Debug, Clone, Copy)]
pub struct Field {
    /// Parameter name.
    pub name: &'static str,
    /// Field shape.
    pub kind: FieldKind,
}

impl Field {
    /// Optional scalar field.
    #[must_use]
    pub const fn optional(name: &'static str) -> Self {
        Self { name, kind: FieldKind::Optional }
    }

    /// Required scalar field.
    #[must_use]
    pub const fn required(name: &'static str) -> Self {
        Self { name, kind: FieldKind::Required }
    }

    /// Set field.
    #[must_use]
    pub const fn set(name: &'static str) -> Self {
        Self { name, kind: FieldKind::Set }
    }
}

#[derive(Debug)]
enum FieldValue {
    Scalar(Option<String>),
    Set(BTreeSet<String>),
}

/// Values extracted for the declared fields of one request type.
#[derive(Debug)]
pub struct Fields {
    values: HashMap<&'static str, FieldValue>,
}

impl Fields {
    /// Extracts `declared` fields from `params`.
    ///
    /// # Errors
    ///
    /// Returns [`OidcError::ParameterRequired`] for the first missing required field.
    pub fn extract(params: &Params, declared: &[Field]) -> OidcResult<Self> {
        let mut values = HashMap::with_capacity(declared.len());
        for field in declared {
            let value = match field.kind {
                FieldKind::Optional => FieldValue::Scalar(params.get(field.name).map(str::to_owned)),
                FieldKind::Required => {
                    let value = params
                        .get(field.name)
                        .ok_or_else(|| OidcError::ParameterRequired(field.name.to_string()))?;
                    FieldValue::Scalar(Some(value.to_owned()))
                }
                FieldKind::Set => FieldValue::Set(
                    params
                        .get_all(field.name)
                        .flat_map(str::split_whitespace)
                        .map(str::to_owned)
                        .collect(),
                ),
            };
            values.insert(field.name, value);
        }
        Ok(Self { values })
    }

    /// Takes a scalar value.
    pub fn scalar(&mut self, name: &str) -> Option<String> {
        match self.values.remove(name) {
            Some(FieldValue::Scalar(value)) => value,
            _ => None,
        }
    }

    /// Takes a required scalar value. Present whenever extraction succeeded.
    pub fn required(&mut self, name: &str) -> String {
        self.scalar(name).unwrap_or_default()
    }

    /// Takes a set value.
    pub fn set(&mut self, name: &str) -> BTreeSet<String> {
        match self.values.remove(name) {
            Some(FieldValue::Set(value)) => value,
            _ => BTreeSet::new(),
        }
    }
}

/// A request type constructible from raw parameters.
pub trait FromParams: Sized {
    /// Declared fields.
    const FIELDS: &'static [Field];

    /// Builds the request from extracted fields.
    fn from_fields(fields: Fields) -> Self;

    /// Extracts declared fields and builds the request.
    ///
    /// # Errors
    ///
    /// Returns [`OidcError::ParameterRequired`] when a required field is missing.
    fn from_params(params: &Params) -> OidcResult<Self> {
        Fields::extract(params, Self::FIELDS).map(Self::from_fields)
    }
}

/// Client credentials as presented by the caller.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ClientCredentials {
    /// Presented `client_id`.
    pub client_id: Option<String>,
    /// Presented `client_secret`.
    pub client_secret: Option<String>,
}

/// Authorization endpoint request (RFC 6749 §4.1.1, §4.2.1; OIDC Core §3.1.2.1).
#[derive(Debug, Clone, Default)]
pub struct AuthorizationRequest {
    /// Client identifier.
    pub client_id: Option<String>,
    /// Client secret, for clients that authenticate here.
    pub client_secret: Option<String>,
    /// Redirection URI.
    pub redirect_uri: Option<String>,
    /// Requested response types.
    pub response_type: BTreeSet<String>,
    /// Requested scopes; replaced by the granted set after validation.
    pub scope: BTreeSet<String>,
    /// Opaque client state, echoed back.
    pub state: Option<String>,
    /// OIDC nonce.
    pub nonce: Option<String>,
    /// OIDC `acr_values`; `idp:<domain>` selects federation.
    pub acr_values: BTreeSet<String>,
    /// Authenticated client, attached by client authentication.
    pub client: Option<Client>,
    /// Authenticated resource owner subject, attached by end-user authentication.
    pub owner: Option<String>,
}

impl FromParams for AuthorizationRequest {
    const FIELDS: &'static [Field] = &[
        Field::optional("client_id"),
        Field::optional("client_secret"),
        Field::optional("redirect_uri"),
        Field::set("response_type"),
        Field::set("scope"),
        Field::optional("state"),
        Field::optional("nonce"),
        Field::set("acr_values"),
    ];

    fn from_fields(mut fields: Fields) -> Self {
        Self {
            client_id: fields.scalar("client_id"),
            client_secret: fields.scalar("client_secret"),
            redirect_uri: fields.scalar("redirect_uri"),
            response_type: fields.set("response_type"),
            scope: fields.set("scope"),
            state: fields.scalar("state"),
            nonce: fields.scalar("nonce"),
            acr_values: fields.set("acr_values"),
            client: None,
            owner: None,
        }
    }
}

impl AuthorizationRequest {
    /// Whether this is an OpenID Connect request.
    #[must_use]
    pub fn is_openid(&self) -> bool {
        self.scope.contains("openid")
    }

    /// Presented client credentials.
    #[must_use]
    pub fn credentials(&self) -> ClientCredentials {
        ClientCredentials {
            client_id: self.client_id.clone(),
            client_secret: self.client_secret.clone(),
        }
    }

    /// Response mode implied by the raw response type.
    #[must_use]
    pub fn response_mode(&self) -> ResponseMode {
        ResponseMode::for_response_type(&self.response_type)
    }

    /// Granted scopes joined by spaces.
    #[must_use]
    pub fn scope_string(&self) -> String {
        join(&self.scope)
    }
}

/// Token endpoint request (RFC 6749 §4.1.3).
#[derive(Debug, Clone, Default)]
pub struct TokenRequest {
    /// Grant type.
    pub grant_type: String,
    /// Authorization code.
    pub code: Option<String>,
    /// Redirect URI used in the authorization request.
    pub redirect_uri: Option<String>,
    /// Client identifier (form authentication).
    pub client_id: Option<String>,
    /// Client secret (form authentication).
    pub client_secret: Option<String>,
    /// Requested scope.
    pub scope: BTreeSet<String>,
}

impl FromParams for TokenRequest {
    const FIELDS: &'static [Field] = &[
        Field::required("grant_type"),
        Field::optional("code"),
        Field::optional("redirect_uri"),
        Field::optional("client_id"),
        Field::optional("client_secret"),
        Field::set("scope"),
    ];

    fn from_fields(mut fields: Fields) -> Self {
        Self {
            grant_type: fields.required("grant_type"),
            code: fields.scalar("code"),
            redirect_uri: fields.scalar("redirect_uri"),
            client_id: fields.scalar("client_id"),
            client_secret: fields.scalar("client_secret"),
            scope: fields.set("scope"),
        }
    }
}

/// Joins a set with single spaces.
#[must_use]
pub fn join(values: &BTreeSet<String>) -> String {
    values.iter().map(String::as_str).collect::<Vec<_>>().join(" ")
}
