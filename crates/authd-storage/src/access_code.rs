//! Access code store trait.

use async_trait::async_trait;
use authd_model::AccessCode;

use crate::error::StorageResult;

/// Outcome of an atomic redemption attempt.
#[derive(Debug, Clone)]
pub enum Redemption {
    /// The code was unused and is now marked used.
    Redeemed(AccessCode),
    /// The code had already been redeemed.
    AlreadyUsed,
    /// No such code.
    NotFound,
}

/// Storage for authorization codes.
#[async_trait]
pub trait AccessCodeStore: Send + Sync {
    /// Persists a new code.
    ///
    /// ## Errors
    ///
    /// Returns `StorageError::Duplicate` if the code value collides.
    async fn create_code(&self, code: &AccessCode) -> StorageResult<()>;

    /// Gets a code without changing it.
    async fn get_code(&self, code: &str) -> StorageResult<Option<AccessCode>>;

    /// Marks a code used if and only if it is currently unused.
    ///
    /// The check and the update happen atomically, so of two concurrent
    /// redemptions exactly one observes [`Redemption::Redeemed`].
    async fn redeem_code(&self, code: &str) -> StorageResult<Redemption>;

    /// Drops expired codes. Returns how many were removed.
    async fn remove_expired_codes(&self) -> StorageResult<usize>;
}
