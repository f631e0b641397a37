//! Token codec: signs and verifies RS256 JWTs.
//!
//! Every token carries the signing key's id in its `kid` header. Decoding
//! resolves the key by that id, so tokens signed by any key still in the jar
//! stay verifiable after the signing key changes.

use std::collections::{BTreeSet, HashMap, HashSet};
use std::sync::Arc;

use authd_crypto::{KeyJar, sha256};
use base64::{Engine, engine::general_purpose::URL_SAFE_NO_PAD};
use chrono::{Duration, Utc};
use jsonwebtoken::{Algorithm, DecodingKey, EncodingKey, Header, Validation, decode, encode};
use serde::{Deserialize, Serialize, de::DeserializeOwned};

use crate::claims::{AccessTokenClaims, IdTokenClaims};
use crate::error::{OidcError, OidcResult};
use crate::jwks::JsonWebKeySet;

/// Token configuration.
#[derive(Debug, Clone)]
pub struct TokenConfig {
    /// Issuer URL.
    pub issuer: String,

    /// Access token lifespan in seconds.
    pub access_token_lifespan: i64,

    /// ID token lifespan in seconds.
    pub id_token_lifespan: i64,
}

impl Default for TokenConfig {
    fn default() -> Self {
        Self {
            issuer: "http://localhost:8080".to_string(),
            access_token_lifespan: 300, // 5 minutes
            id_token_lifespan: 600,     // 10 minutes
        }
    }
}

struct CodecKey {
    encoding: EncodingKey,
    decoding: DecodingKey,
}

/// Signs and verifies tokens with the keys of a [`KeyJar`].
pub struct TokenCodec {
    config: TokenConfig,
    jar: Arc<KeyJar>,
    keys: HashMap<String, CodecKey>,
}

impl std::fmt::Debug for TokenCodec {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TokenCodec")
            .field("config", &self.config)
            .field("kids", &self.keys.keys().collect::<Vec<_>>())
            .field("keys", &"[REDACTED]")
            .finish()
    }
}

impl TokenCodec {
    /// Prepares signing and verification keys for every key in `jar`.
    ///
    /// # Errors
    ///
    /// Returns [`OidcError::TokenSigning`] if the jar is empty or a key cannot
    /// be converted.
    pub fn new(config: TokenConfig, jar: Arc<KeyJar>) -> OidcResult<Self> {
        if jar.is_empty() {
            return Err(OidcError::TokenSigning("key jar is empty".to_string()));
        }

        let mut keys = HashMap::with_capacity(jar.len());
        for key in jar.keys() {
            let der = key
                .to_pkcs1_der()
                .map_err(|e| OidcError::TokenSigning(e.to_string()))?;
            let decoding = DecodingKey::from_rsa_components(
                &URL_SAFE_NO_PAD.encode(key.modulus()),
                &URL_SAFE_NO_PAD.encode(key.exponent()),
            )
            .map_err(|e| OidcError::TokenSigning(e.to_string()))?;
            keys.insert(
                key.kid().to_string(),
                CodecKey {
                    encoding: EncodingKey::from_rsa_der(&der),
                    decoding,
                },
            );
        }

        Ok(Self { config, jar, keys })
    }

    /// Signs `claims` with the jar's signing key.
    ///
    /// # Errors
    ///
    /// Returns [`OidcError::TokenSigning`] if signing fails.
    pub fn encode<T: Serialize>(&self, claims: &T) -> OidcResult<String> {
        let kid = self
            .jar
            .signing_key()
            .map(|key| key.kid().to_string())
            .ok_or_else(|| OidcError::TokenSigning("no signing key".to_string()))?;
        let key = self
            .keys
            .get(&kid)
            .ok_or_else(|| OidcError::TokenSigning(format!("signing key not found: {kid}")))?;

        let mut header = Header::new(Algorithm::RS256);
        header.kid = Some(kid);
        header.typ = Some("JWT".to_string());

        encode(&header, claims, &key.encoding).map_err(|e| OidcError::TokenSigning(e.to_string()))
    }

    /// Verifies a token signed by this server and returns its claims.
    ///
    /// `exp` is checked when present. Audience is not checked here.
    ///
    /// # Errors
    ///
    /// Returns [`OidcError::TokenValidation`] for an unknown `kid`, a bad
    /// signature or an expired token.
    pub fn decode<T: DeserializeOwned>(&self, token: &str) -> OidcResult<T> {
        let header = jsonwebtoken::decode_header(token)
            .map_err(|e| OidcError::TokenValidation(e.to_string()))?;

        let kid = header
            .kid
            .ok_or_else(|| OidcError::TokenValidation("missing kid in token header".to_string()))?;

        let key = self
            .keys
            .get(&kid)
            .ok_or_else(|| OidcError::TokenValidation(format!("unknown signing key: {kid}")))?;

        let mut validation = Validation::new(Algorithm::RS256);
        validation.validate_aud = false;
        validation.required_spec_claims = HashSet::new();

        decode::<T>(token, &key.decoding, &validation)
            .map(|data| data.claims)
            .map_err(|e| OidcError::TokenValidation(e.to_string()))
    }

    /// Signs an access token for `owner` scoped to `scopes`.
    ///
    /// # Errors
    ///
    /// Returns [`OidcError::TokenSigning`] if signing fails.
    pub fn issue_access_token(
        &self,
        owner: &str,
        client_id: &str,
        scopes: &BTreeSet<String>,
    ) -> OidcResult<String> {
        let now = Utc::now();
        let claims = AccessTokenClaims {
            iss: self.config.issuer.clone(),
            sub: owner.to_string(),
            aud: client_id.to_string(),
            iat: now.timestamp(),
            exp: (now + Duration::seconds(self.config.access_token_lifespan)).timestamp(),
            scope: scopes.iter().cloned().collect(),
        };
        self.encode(&claims)
    }

    /// Signs an ID token, binding `access_token` through `at_hash` when given.
    ///
    /// # Errors
    ///
    /// Returns [`OidcError::TokenSigning`] if signing fails.
    pub fn issue_id_token(
        &self,
        owner: &str,
        client_id: &str,
        nonce: Option<&str>,
        access_token: Option<&str>,
    ) -> OidcResult<String> {
        let now = Utc::now();
        let claims = IdTokenClaims {
            iss: self.config.issuer.clone(),
            sub: owner.to_string(),
            aud: client_id.to_string(),
            iat: now.timestamp(),
            exp: (now + Duration::seconds(self.config.id_token_lifespan)).timestamp(),
            nonce: nonce.map(ToString::to_string),
            at_hash: access_token.map(compute_at_hash),
        };
        self.encode(&claims)
    }

    /// Public keys of the jar.
    #[must_use]
    pub fn jwks(&self) -> JsonWebKeySet {
        JsonWebKeySet::from_key_jar(&self.jar)
    }

    /// Returns the issuer URL.
    #[must_use]
    pub fn issuer(&self) -> &str {
        &self.config.issuer
    }

    /// Returns the token configuration.
    #[must_use]
    pub const fn config(&self) -> &TokenConfig {
        &self.config
    }
}

/// Verifies an RS256 token against explicit RSA components.
///
/// Used for tokens from other issuers. `aud` must contain `audience`, and
/// `exp` is required and checked.
///
/// # Errors
///
/// Returns [`OidcError::TokenValidation`] if the key is malformed or the
/// token fails verification.
pub fn verify_rs256<T: DeserializeOwned>(token: &str, n: &str, e: &str, audience: &str) -> OidcResult<T> {
    let key = DecodingKey::from_rsa_components(n, e)
        .map_err(|err| OidcError::TokenValidation(err.to_string()))?;

    let mut validation = Validation::new(Algorithm::RS256);
    validation.set_audience(&[audience]);

    decode::<T>(token, &key, &validation)
        .map(|data| data.claims)
        .map_err(|err| OidcError::TokenValidation(err.to_string()))
}

/// Computes the OIDC `at_hash` of an access token.
///
/// Left half of SHA-256 over the ASCII token, base64url without padding.
#[must_use]
pub fn compute_at_hash(access_token: &str) -> String {
    let hash = sha256(access_token.as_bytes());
    URL_SAFE_NO_PAD.encode(&hash[..hash.len() / 2])
}

/// Token endpoint response (RFC 6749 §5.1).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TokenResponse {
    /// The access token.
    pub access_token: String,

    /// Token type (always "Bearer").
    pub token_type: String,

    /// Access token lifetime in seconds.
    pub expires_in: i64,

    /// ID token (if `OpenID` scope was granted).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub id_token: Option<String>,

    /// Granted scope.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub scope: Option<String>,
}
