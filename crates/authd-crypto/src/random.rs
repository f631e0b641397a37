//! Cryptographically secure random values.
//!
//! Used for authorization codes, session identifiers, nonces and cipher keys.

use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use base64::Engine;
use rand::distr::{Alphanumeric, SampleString};
use rand::Rng;

/// Generates `len` random bytes from the thread-local CSPRNG.
#[must_use]
pub fn random_bytes(len: usize) -> Vec<u8> {
    let mut rng = rand::rng();
    let mut bytes = vec![0u8; len];
    rng.fill(&mut bytes[..]);
    bytes
}

/// Generates an alphanumeric string of `len` characters.
#[must_use]
pub fn random_alphanumeric(len: usize) -> String {
    let mut rng = rand::rng();
    Alphanumeric.sample_string(&mut rng, len)
}

/// Generates an authorization code: 128 random bits, lowercase hex.
#[must_use]
pub fn generate_access_code() -> String {
    hex::encode(random_bytes(16))
}

/// Generates a session identifier.
///
/// 32 alphanumeric characters, roughly 190 bits of entropy.
#[must_use]
pub fn generate_session_id() -> String {
    random_alphanumeric(32)
}

/// Generates a URL-safe base64 string (no padding) from `byte_len` random bytes.
#[must_use]
pub fn random_base64url(byte_len: usize) -> String {
    URL_SAFE_NO_PAD.encode(random_bytes(byte_len))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    #[test]
    fn random_bytes_produces_correct_length() {
        assert_eq!(random_bytes(12).len(), 12);
        assert_eq!(random_bytes(32).len(), 32);
    }

    #[test]
    fn access_code_is_128_bit_hex() {
        let code = generate_access_code();
        assert_eq!(code.len(), 32);
        assert!(code.chars().all(|c| c.is_ascii_hexdigit()));
    }

    #[test]
    fn access_codes_are_unique() {
        let codes: HashSet<String> = (0..1000).map(|_| generate_access_code()).collect();
        assert_eq!(codes.len(), 1000);
    }

    #[test]
    fn session_id_format() {
        let id = generate_session_id();
        assert_eq!(id.len(), 32);
        assert!(id.chars().all(|c| c.is_ascii_alphanumeric()));
    }

    #[test]
    fn random_base64url_no_special_chars() {
        let s = random_base64url(32);
        assert!(s.chars().all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_'));
    }
}
