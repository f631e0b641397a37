//! JSON Web Key Set (JWKS) types.
//!
//! Implements JWKS as defined in:
//! - [RFC 7517](https://tools.ietf.org/html/rfc7517) (JSON Web Key)
//! - [RFC 7518](https://tools.ietf.org/html/rfc7518) (JSON Web Algorithms)
//!
//! The server publishes only RSA signing keys. Foreign key sets may contain
//! other key types; they deserialize but are never used for verification.

use authd_crypto::{KeyJar, RsaKey};
use base64::{Engine, engine::general_purpose::URL_SAFE_NO_PAD};
use serde::{Deserialize, Serialize};

/// JWA name of the only signing algorithm in use.
pub const RS256: &str = "RS256";

/// JSON Web Key Set.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct JsonWebKeySet {
    /// Array of JSON Web Keys.
    pub keys: Vec<JsonWebKey>,
}

impl JsonWebKeySet {
    /// Creates a JWKS with the given keys.
    #[must_use]
    pub const fn with_keys(keys: Vec<JsonWebKey>) -> Self {
        Self { keys }
    }

    /// Publishes every key in the jar.
    #[must_use]
    pub fn from_key_jar(jar: &KeyJar) -> Self {
        Self::with_keys(jar.keys().iter().map(JsonWebKey::from_rsa_key).collect())
    }

    /// Finds a key by its ID.
    #[must_use]
    pub fn find_key(&self, kid: &str) -> Option<&JsonWebKey> {
        self.keys.iter().find(|k| k.kid.as_deref() == Some(kid))
    }
}

/// JSON Web Key.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct JsonWebKey {
    /// Key type.
    pub kty: KeyType,

    /// Algorithm intended for use with the key.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub alg: Option<String>,

    /// RSA modulus (base64url encoded).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub n: Option<String>,

    /// RSA exponent (base64url encoded).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub e: Option<String>,

    /// Key ID.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub kid: Option<String>,

    /// Public key use ("sig" for signature, "enc" for encryption).
    #[serde(rename = "use", default, skip_serializing_if = "Option::is_none")]
    pub key_use: Option<String>,
}

impl JsonWebKey {
    /// Public half of a server key.
    #[must_use]
    pub fn from_rsa_key(key: &RsaKey) -> Self {
        Self {
            kty: KeyType::Rsa,
            alg: Some(RS256.to_string()),
            n: Some(URL_SAFE_NO_PAD.encode(key.modulus())),
            e: Some(URL_SAFE_NO_PAD.encode(key.exponent())),
            kid: Some(key.kid().to_string()),
            key_use: Some("sig".to_string()),
        }
    }

    /// RSA `(n, e)` components, if this is a complete RSA key.
    #[must_use]
    pub fn rsa_components(&self) -> Option<(&str, &str)> {
        match (self.kty, self.n.as_deref(), self.e.as_deref()) {
            (KeyType::Rsa, Some(n), Some(e)) => Some((n, e)),
            _ => None,
        }
    }

    /// Checks if this key is for signing.
    #[must_use]
    pub fn is_signing_key(&self) -> bool {
        self.key_use.as_deref() == Some("sig") || self.key_use.is_none()
    }
}

/// Key type for JWK.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum KeyType {
    /// RSA key.
    #[serde(rename = "RSA")]
    Rsa,

    /// Elliptic Curve key.
    #[serde(rename = "EC")]
    Ec,

    /// Octet sequence (symmetric key).
    #[serde(rename = "oct")]
    Oct,

    /// Octet Key Pair (Ed25519, X25519).
    #[serde(rename = "OKP")]
    Okp,
}
