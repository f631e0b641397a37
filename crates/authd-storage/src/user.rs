//! User store trait.

use async_trait::async_trait;
use authd_model::User;
use uuid::Uuid;

use crate::error::StorageResult;

/// Storage for local users.
#[async_trait]
pub trait UserStore: Send + Sync {
    /// Creates a user.
    ///
    /// ## Errors
    ///
    /// Returns `StorageError::Duplicate` if the username is taken.
    async fn create_user(&self, user: &User) -> StorageResult<()>;

    /// Replaces a stored user.
    ///
    /// ## Errors
    ///
    /// Returns `StorageError::NotFound` if the user doesn't exist.
    async fn update_user(&self, user: &User) -> StorageResult<()>;

    /// Gets a user by id.
    async fn get_user(&self, id: Uuid) -> StorageResult<Option<User>>;

    /// Gets a user by username.
    async fn get_user_by_username(&self, username: &str) -> StorageResult<Option<User>>;

    /// Gets the user linked to a federated account.
    async fn get_user_by_account(&self, provider_id: Uuid, subject: &str) -> StorageResult<Option<User>>;
}
