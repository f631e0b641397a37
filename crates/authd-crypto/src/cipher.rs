//! Authenticated encryption of opaque state blobs.
//!
//! Federation round-trips carry server state through the browser. The blob is
//! sealed with AES-256-GCM and encoded as URL-safe base64:
//!
//! ```text
//! base64url(nonce[12] || ciphertext || tag[16])
//! ```

use std::fmt;

use aws_lc_rs::aead::{Aad, LessSafeKey, Nonce, UnboundKey, AES_256_GCM, NONCE_LEN};
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use base64::Engine;

use crate::error::{CryptoError, CryptoResult};
use crate::random::random_bytes;

/// Length of a state cipher key in bytes.
pub const KEY_LEN: usize = 32;

/// AES-256-GCM cipher for state blobs.
pub struct StateCipher {
    key: LessSafeKey,
}

impl StateCipher {
    /// Creates a cipher from a 32-byte key.
    ///
    /// # Errors
    ///
    /// Returns [`CryptoError::InvalidKey`] if the key has the wrong length.
    pub fn new(key: &[u8]) -> CryptoResult<Self> {
        if key.len() != KEY_LEN {
            return Err(CryptoError::InvalidKey(format!(
                "state key must be {KEY_LEN} bytes, got {}",
                key.len()
            )));
        }
        let unbound = UnboundKey::new(&AES_256_GCM, key)
            .map_err(|_| CryptoError::InvalidKey("rejected AES-256-GCM key".to_string()))?;
        Ok(Self {
            key: LessSafeKey::new(unbound),
        })
    }

    /// Creates a cipher from a hex-encoded key.
    ///
    /// # Errors
    ///
    /// Returns [`CryptoError::InvalidKey`] if the hex is malformed or the wrong length.
    pub fn from_hex(key: &str) -> CryptoResult<Self> {
        let bytes = hex::decode(key.trim()).map_err(|e| CryptoError::InvalidKey(e.to_string()))?;
        Self::new(&bytes)
    }

    /// Creates a cipher with a random key.
    ///
    /// # Errors
    ///
    /// Propagates [`StateCipher::new`] errors.
    pub fn generate() -> CryptoResult<Self> {
        Self::new(&random_bytes(KEY_LEN))
    }

    /// Seals `plaintext` under a fresh random nonce.
    ///
    /// # Errors
    ///
    /// Returns [`CryptoError::Encryption`] if sealing fails.
    pub fn seal(&self, plaintext: &[u8]) -> CryptoResult<String> {
        let mut out = random_bytes(NONCE_LEN);
        let nonce = Nonce::try_assume_unique_for_key(&out)
            .map_err(|_| CryptoError::Encryption("invalid nonce".to_string()))?;

        let mut in_out = plaintext.to_vec();
        self.key
            .seal_in_place_append_tag(nonce, Aad::empty(), &mut in_out)
            .map_err(|_| CryptoError::Encryption("AES-256-GCM seal failed".to_string()))?;

        out.extend_from_slice(&in_out);
        Ok(URL_SAFE_NO_PAD.encode(out))
    }

    /// Opens a blob produced by [`StateCipher::seal`].
    ///
    /// # Errors
    ///
    /// Returns [`CryptoError::Decryption`] if the blob is not valid base64, is
    /// truncated, or fails authentication.
    pub fn open(&self, sealed: &str) -> CryptoResult<Vec<u8>> {
        let data = URL_SAFE_NO_PAD
            .decode(sealed)
            .map_err(|e| CryptoError::Decryption(e.to_string()))?;
        if data.len() < NONCE_LEN + AES_256_GCM.tag_len() {
            return Err(CryptoError::Decryption("payload too short".to_string()));
        }

        let (nonce, ciphertext) = data.split_at(NONCE_LEN);
        let nonce = Nonce::try_assume_unique_for_key(nonce)
            .map_err(|_| CryptoError::Decryption("invalid nonce".to_string()))?;

        let mut in_out = ciphertext.to_vec();
        let plaintext = self
            .key
            .open_in_place(nonce, Aad::empty(), &mut in_out)
            .map_err(|_| CryptoError::Decryption("authentication failed".to_string()))?;
        Ok(plaintext.to_vec())
    }
}

impl fmt::Debug for StateCipher {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("StateCipher")
            .field("key", &"[REDACTED]")
            .finish()
    }
}
