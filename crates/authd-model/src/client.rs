//! Client domain model.
//!
//! Clients are the applications that request authorization (RFC 6749 §2).
//! Confidential clients always carry a password; public clients may.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::{ModelError, ModelResult};

/// Client type (RFC 6749 §2.1).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ClientType {
    /// Can keep a secret.
    #[default]
    Confidential,
    /// Runs where a secret cannot be kept (browser, device).
    Public,
}

/// A registered OAuth2 client.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Client {
    /// OAuth `client_id`.
    pub id: String,
    /// Client type.
    pub client_type: ClientType,
    /// Display name.
    pub title: String,
    /// User that registered the client.
    pub user_id: Option<Uuid>,
    /// Registered redirect URIs, matched exactly.
    pub redirect_uris: Vec<String>,
    /// Argon2id PHC hash of the client password.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub password_hash: Option<String>,
    /// Registration time.
    pub created_at: DateTime<Utc>,
}

impl Client {
    /// Creates a public client without a password.
    #[must_use]
    pub fn new_public(id: impl Into<String>, title: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            client_type: ClientType::Public,
            title: title.into(),
            user_id: None,
            redirect_uris: Vec::new(),
            password_hash: None,
            created_at: Utc::now(),
        }
    }

    /// Creates a confidential client with the given password.
    ///
    /// # Errors
    ///
    /// Returns an error if hashing the password fails.
    pub fn new_confidential(
        id: impl Into<String>,
        title: impl Into<String>,
        password: &str,
    ) -> ModelResult<Self> {
        let mut client = Self::new_public(id, title);
        client.client_type = ClientType::Confidential;
        client.set_password(password)?;
        Ok(client)
    }

    /// Adds a redirect URI.
    #[must_use]
    pub fn with_redirect_uri(mut self, uri: impl Into<String>) -> Self {
        self.redirect_uris.push(uri.into());
        self
    }

    /// Sets the owning user.
    #[must_use]
    pub const fn with_owner(mut self, user_id: Uuid) -> Self {
        self.user_id = Some(user_id);
        self
    }

    /// Replaces the client password.
    ///
    /// # Errors
    ///
    /// Returns an error if hashing fails.
    pub fn set_password(&mut self, password: &str) -> ModelResult<()> {
        self.password_hash = Some(authd_crypto::hash_password(password)?);
        Ok(())
    }

    /// Whether `uri` is registered for this client. Exact, case-sensitive.
    #[must_use]
    pub fn check_redirect_uri(&self, uri: &str) -> bool {
        self.redirect_uris.iter().any(|registered| registered == uri)
    }

    /// Whether the client must present its password.
    #[must_use]
    pub const fn requires_authentication(&self) -> bool {
        matches!(self.client_type, ClientType::Confidential) || self.password_hash.is_some()
    }

    /// Verifies a presented secret.
    ///
    /// A client without a password never verifies.
    ///
    /// # Errors
    ///
    /// Returns an error if the stored hash is malformed.
    pub fn verify_secret(&self, secret: &str) -> ModelResult<bool> {
        match &self.password_hash {
            Some(hash) => Ok(authd_crypto::verify_password(secret, hash)?),
            None => Ok(false),
        }
    }

    /// Checks structural invariants.
    ///
    /// # Errors
    ///
    /// Returns [`ModelError::Invalid`] for a confidential client without a
    /// password or a client without redirect URIs.
    pub fn validate(&self) -> ModelResult<()> {
        if self.client_type == ClientType::Confidential && self.password_hash.is_none() {
            return Err(ModelError::invalid(
                "client",
                format!("confidential client `{}' has no password", self.id),
            ));
        }
        if self.redirect_uris.is_empty() {
            return Err(ModelError::invalid(
                "client",
                format!("client `{}' has no redirect URIs", self.id),
            ));
        }
        Ok(())
    }
}
