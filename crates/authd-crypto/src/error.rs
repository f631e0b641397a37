//! Cryptographic error types.

use std::path::PathBuf;

use thiserror::Error;

/// Errors raised by key handling, hashing and encryption.
#[derive(Debug, Error)]
pub enum CryptoError {
    /// RSA key generation failed.
    #[error("key generation failed: {0}")]
    KeyGeneration(String),

    /// Key material could not be parsed or is unusable.
    #[error("invalid key: {0}")]
    InvalidKey(String),

    /// Reading or writing a key file failed.
    #[error("key file {path}: {source}")]
    Io {
        /// File involved.
        path: PathBuf,
        /// Underlying I/O error.
        #[source]
        source: std::io::Error,
    },

    /// Sealing a payload failed.
    #[error("encryption failed: {0}")]
    Encryption(String),

    /// Opening a payload failed (tampered, truncated or foreign key).
    #[error("decryption failed: {0}")]
    Decryption(String),

    /// Password hashing or hash parsing failed.
    #[error("password hash error: {0}")]
    PasswordHash(String),
}

/// Result type for cryptographic operations.
pub type CryptoResult<T> = Result<T, CryptoError>;
