//! In-memory store.
//!
//! Every collection is a `HashMap` behind a tokio `RwLock`. Suitable for
//! tests, development and single-node deployments where losing state on
//! restart is acceptable.

use std::collections::HashMap;

use async_trait::async_trait;
use authd_model::{AccessCode, Client, Provider, Scope, User};
use chrono::Utc;
use tokio::sync::RwLock;
use tracing::debug;
use uuid::Uuid;

use crate::access_code::{AccessCodeStore, Redemption};
use crate::client::ClientStore;
use crate::error::{StorageError, StorageResult};
use crate::provider::ProviderStore;
use crate::scope::ScopeStore;
use crate::user::UserStore;

/// In-memory implementation of every store trait.
#[derive(Debug, Default)]
pub struct MemoryStore {
    clients: RwLock<HashMap<String, Client>>,
    users: RwLock<HashMap<Uuid, User>>,
    providers: RwLock<HashMap<Uuid, Provider>>,
    scopes: RwLock<HashMap<String, Scope>>,
    codes: RwLock<HashMap<String, AccessCode>>,
}

impl MemoryStore {
    /// Creates an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl ClientStore for MemoryStore {
    async fn create_client(&self, client: &Client) -> StorageResult<()> {
        let mut clients = self.clients.write().await;
        if clients.contains_key(&client.id) {
            return Err(StorageError::duplicate("Client", "id", client.id.clone()));
        }
        clients.insert(client.id.clone(), client.clone());
        Ok(())
    }

    async fn get_client(&self, client_id: &str) -> StorageResult<Option<Client>> {
        Ok(self.clients.read().await.get(client_id).cloned())
    }
}

#[async_trait]
impl UserStore for MemoryStore {
    async fn create_user(&self, user: &User) -> StorageResult<()> {
        let mut users = self.users.write().await;
        if users.values().any(|u| u.username == user.username) {
            return Err(StorageError::duplicate("User", "username", user.username.clone()));
        }
        users.insert(user.id, user.clone());
        Ok(())
    }

    async fn update_user(&self, user: &User) -> StorageResult<()> {
        match self.users.write().await.get_mut(&user.id) {
            Some(stored) => {
                *stored = user.clone();
                Ok(())
            }
            None => Err(StorageError::not_found("User", user.id.to_string())),
        }
    }

    async fn get_user(&self, id: Uuid) -> StorageResult<Option<User>> {
        Ok(self.users.read().await.get(&id).cloned())
    }

    async fn get_user_by_username(&self, username: &str) -> StorageResult<Option<User>> {
        Ok(self
            .users
            .read()
            .await
            .values()
            .find(|u| u.username == username)
            .cloned())
    }

    async fn get_user_by_account(&self, provider_id: Uuid, subject: &str) -> StorageResult<Option<User>> {
        Ok(self
            .users
            .read()
            .await
            .values()
            .find(|u| u.is_linked_to(provider_id, subject))
            .cloned())
    }
}

#[async_trait]
impl ProviderStore for MemoryStore {
    async fn put_provider(&self, provider: &Provider) -> StorageResult<()> {
        let mut providers = self.providers.write().await;
        // A rediscovered domain replaces whichever provider served it before.
        providers.retain(|id, existing| {
            *id == provider.id || !existing.domains.iter().any(|d| provider.serves(d))
        });
        providers.insert(provider.id, provider.clone());
        Ok(())
    }

    async fn get_provider_by_domain(&self, domain: &str) -> StorageResult<Option<Provider>> {
        Ok(self
            .providers
            .read()
            .await
            .values()
            .find(|p| p.serves(domain))
            .cloned())
    }
}

#[async_trait]
impl ScopeStore for MemoryStore {
    async fn put_scope(&self, scope: &Scope) -> StorageResult<()> {
        self.scopes
            .write()
            .await
            .insert(scope.code.clone(), scope.clone());
        Ok(())
    }

    async fn get_scope(&self, code: &str) -> StorageResult<Option<Scope>> {
        Ok(self.scopes.read().await.get(code).cloned())
    }

    async fn default_scopes(&self) -> StorageResult<Vec<Scope>> {
        let mut defaults: Vec<Scope> = self
            .scopes
            .read()
            .await
            .values()
            .filter(|s| s.default)
            .cloned()
            .collect();
        defaults.sort_by(|a, b| a.code.cmp(&b.code));
        Ok(defaults)
    }
}

#[async_trait]
impl AccessCodeStore for MemoryStore {
    async fn create_code(&self, code: &AccessCode) -> StorageResult<()> {
        let mut codes = self.codes.write().await;
        if codes.contains_key(&code.code) {
            return Err(StorageError::duplicate("AccessCode", "code", "<redacted>"));
        }
        codes.insert(code.code.clone(), code.clone());
        Ok(())
    }

    async fn get_code(&self, code: &str) -> StorageResult<Option<AccessCode>> {
        Ok(self.codes.read().await.get(code).cloned())
    }

    async fn redeem_code(&self, code: &str) -> StorageResult<Redemption> {
        // Check and set under one write guard.
        let mut codes = self.codes.write().await;
        Ok(match codes.get_mut(code) {
            None => Redemption::NotFound,
            Some(stored) if stored.used => Redemption::AlreadyUsed,
            Some(stored) => {
                stored.used = true;
                Redemption::Redeemed(stored.clone())
            }
        })
    }

    async fn remove_expired_codes(&self) -> StorageResult<usize> {
        let mut codes = self.codes.write().await;
        let now = Utc::now();
        let initial_len = codes.len();
        codes.retain(|_, code| !code.is_expired_at(now));
        let removed = initial_len - codes.len();
        debug!(removed, "Removed expired access codes");
        Ok(removed)
    }
}
