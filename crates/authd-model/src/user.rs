//! User domain model.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::ModelResult;

/// A federated account linked to a local user.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FederatedAccount {
    /// Provider that authenticated the account.
    pub provider_id: Uuid,
    /// `sub` claim issued by that provider.
    pub subject: String,
}

/// A local resource owner.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct User {
    /// Unique identifier, used as the token `sub`.
    pub id: Uuid,
    /// Login name.
    pub username: String,
    /// Argon2id PHC hash of the password.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub password_hash: Option<String>,
    /// Linked federated accounts.
    #[serde(default)]
    pub accounts: Vec<FederatedAccount>,
    /// Creation time.
    pub created_at: DateTime<Utc>,
}

impl User {
    /// Creates a user without credentials.
    #[must_use]
    pub fn new(username: impl Into<String>) -> Self {
        Self {
            id: Uuid::now_v7(),
            username: username.into(),
            password_hash: None,
            accounts: Vec::new(),
            created_at: Utc::now(),
        }
    }

    /// Sets the password.
    ///
    /// # Errors
    ///
    /// Returns an error if hashing fails.
    pub fn with_password(mut self, password: &str) -> ModelResult<Self> {
        self.password_hash = Some(authd_crypto::hash_password(password)?);
        Ok(self)
    }

    /// Verifies a password. Users without a password never verify.
    ///
    /// # Errors
    ///
    /// Returns an error if the stored hash is malformed.
    pub fn verify_password(&self, password: &str) -> ModelResult<bool> {
        match &self.password_hash {
            Some(hash) => Ok(authd_crypto::verify_password(password, hash)?),
            None => Ok(false),
        }
    }

    /// Links a federated account. Linking the same account twice is a no-op.
    pub fn link_account(&mut self, provider_id: Uuid, subject: impl Into<String>) {
        let subject = subject.into();
        if !self.is_linked_to(provider_id, &subject) {
            self.accounts.push(FederatedAccount {
                provider_id,
                subject,
            });
        }
    }

    /// Whether the given federated account is linked.
    #[must_use]
    pub fn is_linked_to(&self, provider_id: Uuid, subject: &str) -> bool {
        self.accounts
            .iter()
            .any(|account| account.provider_id == provider_id && account.subject == subject)
    }

    /// Subject identifier used in issued tokens.
    #[must_use]
    pub fn subject(&self) -> String {
        self.id.to_string()
    }
}
