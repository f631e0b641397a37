//! Provider store trait.

use async_trait::async_trait;
use authd_model::Provider;

use crate::error::StorageResult;

/// Storage for discovered OpenID providers.
///
/// `put_provider` overwrites unconditionally, so concurrent discovery of the
/// same domain converges on the last writer.
#[async_trait]
pub trait ProviderStore: Send + Sync {
    /// Inserts or replaces a provider.
    async fn put_provider(&self, provider: &Provider) -> StorageResult<()>;

    /// Gets the provider serving `domain`.
    async fn get_provider_by_domain(&self, domain: &str) -> StorageResult<Option<Provider>>;
}
