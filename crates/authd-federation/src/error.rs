//! Federation error types.

use authd_crypto::CryptoError;
use authd_storage::StorageError;
use thiserror::Error;

/// Provider cannot be used. Reported to the user on the login page.
#[derive(Debug, Error)]
pub enum ProviderError {
    /// Discovery failed or the provider lacks a required capability.
    #[error("{0}")]
    Configuration(String),

    /// No client credentials are configured for the provider.
    #[error("{0}")]
    RegistrationNeeded(String),
}

/// Errors that can occur during federation operations.
#[derive(Debug, Error)]
pub enum FederationError {
    /// A request parameter is missing or malformed.
    #[error("{0}")]
    InvalidParameter(String),

    /// The provider is unusable.
    #[error(transparent)]
    Provider(#[from] ProviderError),

    /// The callback belongs to another session.
    #[error("State does not belong to the current session")]
    SessionMismatch,

    /// The provider's ID token failed verification.
    #[error("Invalid ID token: {0}")]
    InvalidToken(String),

    /// Storage error when reading or persisting providers and users.
    #[error("Storage error: {0}")]
    Storage(#[from] StorageError),

    /// Cryptographic failure other than state decryption.
    #[error("Crypto error: {0}")]
    Crypto(#[from] CryptoError),
}

impl FederationError {
    /// Creates a configuration error.
    #[must_use]
    pub fn config(msg: impl Into<String>) -> Self {
        Self::Provider(ProviderError::Configuration(msg.into()))
    }

    /// Creates an invalid token error.
    #[must_use]
    pub fn invalid_token(msg: impl Into<String>) -> Self {
        Self::InvalidToken(msg.into())
    }

    /// Returns the HTTP status code for errors that are not redirected.
    #[must_use]
    pub const fn http_status(&self) -> u16 {
        match self {
            Self::InvalidParameter(_) => 400,
            Self::SessionMismatch | Self::InvalidToken(_) => 401,
            Self::Provider(_) => 303,
            Self::Storage(_) | Self::Crypto(_) => 500,
        }
    }

    /// Checks if this error is reported through the login page.
    #[must_use]
    pub const fn is_provider_error(&self) -> bool {
        matches!(self, Self::Provider(_))
    }
}

/// Result type for federation operations.
pub type FederationResult<T> = Result<T, FederationError>;
