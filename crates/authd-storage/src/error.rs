//! Storage error types.

use thiserror::Error;

/// Errors that can occur during storage operations.
#[derive(Debug, Error)]
pub enum StorageError {
    /// Entity not found.
    #[error("Entity not found: {entity_type} '{key}'")]
    NotFound {
        /// Type of entity (e.g., "User", "Client").
        entity_type: &'static str,
        /// Lookup key.
        key: String,
    },

    /// Duplicate entity (unique constraint violation).
    #[error("Duplicate {entity_type}: {field} '{value}' already exists")]
    Duplicate {
        /// Type of entity.
        entity_type: &'static str,
        /// Field that caused the conflict.
        field: &'static str,
        /// Conflicting value.
        value: String,
    },

    /// Backend unavailable.
    #[error("Storage backend unavailable: {0}")]
    Unavailable(String),

    /// Internal error.
    #[error("Internal storage error: {0}")]
    Internal(String),
}

impl StorageError {
    /// Creates a not found error.
    #[must_use]
    pub fn not_found(entity_type: &'static str, key: impl Into<String>) -> Self {
        Self::NotFound {
            entity_type,
            key: key.into(),
        }
    }

    /// Creates a duplicate error.
    #[must_use]
    pub fn duplicate(entity_type: &'static str, field: &'static str, value: impl Into<String>) -> Self {
        Self::Duplicate {
            entity_type,
            field,
            value: value.into(),
        }
    }
}

/// Result type for storage operations.
pub type StorageResult<T> = Result<T, StorageError>;
