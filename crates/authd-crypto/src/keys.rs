//! RSA signing keys.
//!
//! Keys are RSA private keys held in memory and serialized as PEM. Each key is
//! named by a key id derived from its public modulus:
//!
//! ```text
//! kid = hex(SHA-1(modulus big-endian bytes, leading zero bytes stripped))
//! ```
//!
//! The same id is published in the JWKS document and stamped into the `kid`
//! header of every token the key signs.

use std::fmt;

use rsa::pkcs1::{DecodeRsaPrivateKey, EncodeRsaPrivateKey, LineEnding};
use rsa::pkcs8::DecodePrivateKey;
use rsa::traits::PublicKeyParts;
use rsa::{BigUint, RsaPrivateKey};

use crate::error::{CryptoError, CryptoResult};
use crate::hash::sha1_hex;

/// Modulus size for generated keys.
pub const DEFAULT_KEY_BITS: usize = 2048;

/// Public exponent for generated keys.
pub const PUBLIC_EXPONENT: u64 = 65_537;

/// An RSA private key together with its key id.
#[derive(Clone)]
pub struct RsaKey {
    inner: RsaPrivateKey,
    kid: String,
}

impl RsaKey {
    /// Generates a fresh key with exponent 65537.
    ///
    /// # Errors
    ///
    /// Returns [`CryptoError::KeyGeneration`] if the RNG or prime search fails.
    pub fn generate(bits: usize) -> CryptoResult<Self> {
        let exponent = BigUint::from(PUBLIC_EXPONENT);
        let inner = RsaPrivateKey::new_with_exp(&mut rsa::rand_core::OsRng, bits, &exponent)
            .map_err(|e| CryptoError::KeyGeneration(e.to_string()))?;
        Ok(Self::from_private_key(inner))
    }

    /// Parses a PEM private key, PKCS#1 (`RSA PRIVATE KEY`) or PKCS#8 (`PRIVATE KEY`).
    ///
    /// # Errors
    ///
    /// Returns [`CryptoError::InvalidKey`] if neither encoding parses.
    pub fn from_pem(pem: &str) -> CryptoResult<Self> {
        let inner = RsaPrivateKey::from_pkcs1_pem(pem)
            .or_else(|_| RsaPrivateKey::from_pkcs8_pem(pem))
            .map_err(|e| CryptoError::InvalidKey(e.to_string()))?;
        Ok(Self::from_private_key(inner))
    }

    /// Wraps an existing private key.
    #[must_use]
    pub fn from_private_key(inner: RsaPrivateKey) -> Self {
        let kid = key_id(&inner.n().to_bytes_be());
        Self { inner, kid }
    }

    /// Serializes the key as PKCS#1 PEM with LF line endings.
    ///
    /// # Errors
    ///
    /// Returns [`CryptoError::InvalidKey`] if encoding fails.
    pub fn to_pem(&self) -> CryptoResult<String> {
        self.inner
            .to_pkcs1_pem(LineEnding::LF)
            .map(|pem| pem.to_string())
            .map_err(|e| CryptoError::InvalidKey(e.to_string()))
    }

    /// PKCS#1 DER encoding of the private key, as JWT signers expect it.
    ///
    /// # Errors
    ///
    /// Returns [`CryptoError::InvalidKey`] if encoding fails.
    pub fn to_pkcs1_der(&self) -> CryptoResult<Vec<u8>> {
        self.inner
            .to_pkcs1_der()
            .map(|der| der.as_bytes().to_vec())
            .map_err(|e| CryptoError::InvalidKey(e.to_string()))
    }

    /// Key id.
    #[must_use]
    pub fn kid(&self) -> &str {
        &self.kid
    }

    /// Public modulus, big-endian, without leading zeros.
    #[must_use]
    pub fn modulus(&self) -> Vec<u8> {
        self.inner.n().to_bytes_be()
    }

    /// Public exponent, big-endian.
    #[must_use]
    pub fn exponent(&self) -> Vec<u8> {
        self.inner.e().to_bytes_be()
    }

    /// Modulus size in bits.
    #[must_use]
    pub fn bits(&self) -> usize {
        self.inner.size() * 8
    }
}

impl fmt::Debug for RsaKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RsaKey")
            .field("kid", &self.kid)
            .field("bits", &self.bits())
            .field("private", &"[REDACTED]")
            .finish()
    }
}

/// Derives the key id for an RSA modulus.
///
/// Leading zero bytes are stripped first so that padded and unpadded
/// encodings of the same modulus share one id.
#[must_use]
pub fn key_id(modulus: &[u8]) -> String {
    let start = modulus
        .iter()
        .position(|byte| *byte != 0)
        .unwrap_or(modulus.len());
    sha1_hex(&modulus[start..])
}
