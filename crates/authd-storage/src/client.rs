//! Client store trait.

use async_trait::async_trait;
use authd_model::Client;

use crate::error::StorageResult;

/// Storage for registered clients.
///
/// Implementations must be thread-safe and support concurrent access.
#[async_trait]
pub trait ClientStore: Send + Sync {
    /// Creates a client.
    ///
    /// ## Errors
    ///
    /// Returns `StorageError::Duplicate` if the client id is taken.
    async fn create_client(&self, client: &Client) -> StorageResult<()>;

    /// Gets a client by its OAuth `client_id`.
    async fn get_client(&self, client_id: &str) -> StorageResult<Option<Client>>;
}
