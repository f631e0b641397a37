//! Model validation errors.

use authd_crypto::CryptoError;
use thiserror::Error;

/// Errors raised while building or checking domain entities.
#[derive(Debug, Error)]
pub enum ModelError {
    /// An entity violates a structural invariant.
    #[error("invalid {entity}: {reason}")]
    Invalid {
        /// Entity kind.
        entity: &'static str,
        /// What is wrong.
        reason: String,
    },

    /// Hashing or verifying a secret failed.
    #[error(transparent)]
    Crypto(#[from] CryptoError),
}

impl ModelError {
    /// Shorthand for [`ModelError::Invalid`].
    pub fn invalid(entity: &'static str, reason: impl Into<String>) -> Self {
        Self::Invalid {
            entity,
            reason: reason.into(),
        }
    }
}

/// Result type for model operations.
pub type ModelResult<T> = Result<T, ModelError>;
