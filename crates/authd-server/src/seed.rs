//! Startup data: clients, users and scopes from a JSON file.
//!
//! ```json
//! {
//!   "scopes": [{"code": "openid", "default": true}],
//!   "users": [{"username": "alice", "password": "secret"}],
//!   "clients": [{"id": "abc", "secret": "s", "redirect_uris": ["https://cb/"], "owner": "alice"}]
//! }
//! ```

use std::path::Path;

use anyhow::Context;
use authd_model::{Client, Scope, User};
use authd_storage::Store;
use serde::Deserialize;
use tracing::info;

/// Contents of a seed file.
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct Seed {
    /// Scopes.
    pub scopes: Vec<SeedScope>,
    /// Users.
    pub users: Vec<SeedUser>,
    /// Clients.
    pub clients: Vec<SeedClient>,
}

/// A seeded scope.
#[derive(Debug, Deserialize)]
pub struct SeedScope {
    /// Scope code.
    pub code: String,
    /// Display title, the code when absent.
    #[serde(default)]
    pub title: Option<String>,
    /// Description.
    #[serde(default)]
    pub description: Option<String>,
    /// Granted when a request names no scope.
    #[serde(default)]
    pub default: bool,
}

/// A seeded user.
#[derive(Debug, Deserialize)]
pub struct SeedUser {
    /// Login name.
    pub username: String,
    /// Clear-text password, hashed on load.
    #[serde(default)]
    pub password: Option<String>,
}

/// A seeded client.
#[derive(Debug, Deserialize)]
pub struct SeedClient {
    /// Client identifier.
    pub id: String,
    /// Display title, the id when absent.
    #[serde(default)]
    pub title: Option<String>,
    /// Client secret. Clients without one are public.
    #[serde(default)]
    pub secret: Option<String>,
    /// Registered redirect URIs.
    #[serde(default)]
    pub redirect_uris: Vec<String>,
    /// Username of the owning user.
    #[serde(default)]
    pub owner: Option<String>,
}

impl Seed {
    /// Reads a seed file.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read or parsed.
    pub fn load(path: &Path) -> anyhow::Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("reading seed file {}", path.display()))?;
        serde_json::from_str(&content).with_context(|| format!("parsing seed file {}", path.display()))
    }

    /// Codes of the seeded scopes.
    #[must_use]
    pub fn scope_codes(&self) -> Vec<String> {
        self.scopes.iter().map(|s| s.code.clone()).collect()
    }

    /// Writes everything to `store`. Users go first so client owners resolve.
    ///
    /// # Errors
    ///
    /// Returns an error on invalid entries, unknown owners or storage failures.
    pub async fn apply<S: Store + ?Sized>(&self, store: &S) -> anyhow::Result<()> {
        for seed in &self.scopes {
            let mut scope = Scope::new(&seed.code, seed.title.as_deref().unwrap_or(&seed.code));
            if let Some(ref description) = seed.description {
                scope = scope.with_description(description);
            }
            if seed.default {
                scope = scope.as_default();
            }
            store.put_scope(&scope).await?;
        }

        for seed in &self.users {
            let mut user = User::new(&seed.username);
            if let Some(ref password) = seed.password {
                user = user.with_password(password)?;
            }
            store.create_user(&user).await?;
        }

        for seed in &self.clients {
            let title = seed.title.as_deref().unwrap_or(&seed.id);
            let mut client = match seed.secret {
                Some(ref secret) => Client::new_confidential(&seed.id, title, secret)?,
                None => Client::new_public(&seed.id, title),
            };
            for uri in &seed.redirect_uris {
                client = client.with_redirect_uri(uri);
            }
            if let Some(ref owner) = seed.owner {
                let user = store
                    .get_user_by_username(owner)
                    .await?
                    .with_context(|| format!("owner `{owner}' of client `{}' not found", seed.id))?;
                client = client.with_owner(user.id);
            }
            client
                .validate()
                .with_context(|| format!("invalid client `{}'", seed.id))?;
            store.create_client(&client).await?;
        }

        info!(
            scopes = self.scopes.len(),
            users = self.users.len(),
            clients = self.clients.len(),
            "seed data loaded"
        );
        Ok(())
    }
}
