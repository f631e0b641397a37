//! Password hashing and verification using Argon2id.
//!
//! Hashes are PHC strings, so the salt and parameters travel with the hash.

use argon2::{
    password_hash::{rand_core::OsRng, PasswordHash, PasswordHasher, PasswordVerifier, SaltString},
    Argon2,
};

use crate::error::{CryptoError, CryptoResult};

/// Hashes a password with a random salt.
///
/// # Errors
///
/// Returns [`CryptoError::PasswordHash`] if hashing fails.
pub fn hash_password(password: &str) -> CryptoResult<String> {
    let salt = SaltString::generate(&mut OsRng);
    Argon2::default()
        .hash_password(password.as_bytes(), &salt)
        .map(|hash| hash.to_string())
        .map_err(|e| CryptoError::PasswordHash(e.to_string()))
}

/// Checks a password against a PHC hash.
///
/// Returns `Ok(false)` on mismatch.
///
/// # Errors
///
/// Returns [`CryptoError::PasswordHash`] if the stored hash cannot be parsed.
pub fn verify_password(password: &str, hash: &str) -> CryptoResult<bool> {
    let parsed = PasswordHash::new(hash).map_err(|e| CryptoError::PasswordHash(e.to_string()))?;
    Ok(Argon2::default()
        .verify_password(password.as_bytes(), &parsed)
        .is_ok())
}
