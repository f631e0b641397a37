//! Scope store trait.

use async_trait::async_trait;
use authd_model::Scope;

use crate::error::StorageResult;

/// Storage for scopes.
#[async_trait]
pub trait ScopeStore: Send + Sync {
    /// Inserts or replaces a scope.
    async fn put_scope(&self, scope: &Scope) -> StorageResult<()>;

    /// Gets a scope by code.
    async fn get_scope(&self, code: &str) -> StorageResult<Option<Scope>>;

    /// Scopes flagged as default.
    async fn default_scopes(&self) -> StorageResult<Vec<Scope>>;
}
