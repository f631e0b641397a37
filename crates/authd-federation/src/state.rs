//! Encrypted federation state.
//!
//! The `state` sent to a provider carries everything needed to finish the
//! round trip: the session it belongs to, the nonce, the provider domain and
//! the request to resume. It is sealed with AES-256-GCM so the user agent can
//! neither read nor forge it.

use authd_crypto::StateCipher;
use serde::{Deserialize, Serialize};
use url::form_urlencoded;
use uuid::Uuid;

use crate::error::{FederationError, FederationResult};

/// A verified external account waiting to be linked to a local user.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PendingLink {
    /// Provider that authenticated the account.
    pub provider_id: Uuid,
    /// Subject at the provider.
    pub subject: String,
}

/// State bound to one federation round trip.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuthState {
    /// Session that started the round trip.
    pub sid: String,
    /// Nonce expected in the ID token.
    pub nonce: String,
    /// Provider domain.
    pub domain: String,
    /// Path of the interrupted request.
    pub path: String,
    /// Parameters of the interrupted request.
    pub params: Vec<(String, String)>,
    /// Account to link once the user logs in locally.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub link: Option<PendingLink>,
}

impl AuthState {
    /// Encrypts the state into a URL-safe token.
    ///
    /// # Errors
    ///
    /// Returns [`FederationError::Crypto`] if encryption fails.
    pub fn seal(&self, cipher: &StateCipher) -> FederationResult<String> {
        let json = serde_json::to_vec(self)
            .map_err(|e| FederationError::InvalidParameter(format!("Can't encode state: {e}")))?;
        Ok(cipher.seal(&json)?)
    }

    /// Decrypts a token produced by [`AuthState::seal`].
    ///
    /// # Errors
    ///
    /// Returns [`FederationError::InvalidParameter`] for anything that does
    /// not decrypt to a valid state.
    pub fn open(cipher: &StateCipher, token: &str) -> FederationResult<Self> {
        let json = cipher
            .open(token)
            .map_err(|_| FederationError::InvalidParameter("Can't decode state".to_string()))?;
        serde_json::from_slice(&json)
            .map_err(|_| FederationError::InvalidParameter("Can't decode state".to_string()))
    }

    /// Relative URI that resumes the interrupted request.
    #[must_use]
    pub fn resume_uri(&self) -> String {
        let query = form_urlencoded::Serializer::new(String::new())
            .extend_pairs(self.params.iter())
            .finish();
        if query.is_empty() {
            self.path.clone()
        } else {
            format!("{}?{query}", self.path)
        }
    }
}
