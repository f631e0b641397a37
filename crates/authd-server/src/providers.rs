//! The server's [`OidcProvider`] implementation.
//!
//! Ties the OIDC endpoints to the in-memory store, the signing keys, browser
//! sessions and provider federation.

use std::sync::Arc;

use async_trait::async_trait;
use authd_crypto::StateCipher;
use authd_federation::{FederationError, FederationService};
use authd_oidc::endpoints::AUTHORIZE_PATH;
use authd_oidc::{
    AuthorizationRequest, EndUser, OidcProvider, Params, ProviderMetadata, ProviderMetadataBuilder,
    TokenCodec,
};
use authd_storage::{AccessCodeStore, MemoryStore, StorageResult};
use axum::http::HeaderMap;
use axum::response::{IntoResponse, Redirect, Response};
use chrono::Duration;
use tracing::{debug, info};

use crate::config::ServerConfig;
use crate::login::{federation_error_response, login_redirect};
use crate::session::SessionStore;

/// Everything the endpoints share: store, keys, sessions and federation.
pub struct ServerProviders {
    config: ServerConfig,
    store: Arc<MemoryStore>,
    codec: TokenCodec,
    metadata: ProviderMetadata,
    sessions: SessionStore,
    federation: FederationService<MemoryStore>,
}

impl ServerProviders {
    /// Creates the providers.
    ///
    /// `scopes` are advertised in the discovery document.
    ///
    /// # Errors
    ///
    /// Returns an error if the federation HTTP client cannot be built.
    pub fn new(
        config: ServerConfig,
        store: Arc<MemoryStore>,
        codec: TokenCodec,
        cipher: StateCipher,
        scopes: Vec<String>,
    ) -> anyhow::Result<Self> {
        let mut metadata = ProviderMetadataBuilder::new(codec.issuer(), &config.base_url);
        if !scopes.is_empty() {
            metadata = metadata.scopes_supported(scopes);
        }
        let federation = FederationService::new(Arc::clone(&store), cipher, config.federation_config())?;
        Ok(Self {
            sessions: SessionStore::new(&config.session_cookie),
            metadata: metadata.build(),
            config,
            store,
            codec,
            federation,
        })
    }

    /// Server configuration.
    #[must_use]
    pub const fn config(&self) -> &ServerConfig {
        &self.config
    }

    /// Shared handle to the store.
    #[must_use]
    pub const fn shared_store(&self) -> &Arc<MemoryStore> {
        &self.store
    }

    /// Browser sessions.
    #[must_use]
    pub const fn sessions(&self) -> &SessionStore {
        &self.sessions
    }

    /// Provider federation.
    #[must_use]
    pub const fn federation(&self) -> &FederationService<MemoryStore> {
        &self.federation
    }

    /// Redirect to the login page, resuming at `next`.
    #[must_use]
    pub fn login_redirect(&self, next: &str) -> Response {
        login_redirect(&self.config.login_path, next, None)
    }

    /// Drops expired sessions and access codes.
    ///
    /// Returns the number of sessions and codes removed.
    ///
    /// # Errors
    ///
    /// Returns an error if the code store fails.
    pub async fn sweep(&self) -> StorageResult<(usize, usize)> {
        let sessions = self
            .sessions
            .remove_expired(Duration::seconds(self.config.session_lifespan))
            .await;
        let codes = self.store.remove_expired_codes().await?;
        if sessions + codes > 0 {
            info!(sessions, codes, "swept expired state");
        }
        Ok((sessions, codes))
    }

    /// Reports a federation failure.
    #[must_use]
    pub fn federation_error(&self, error: &FederationError, next: &str) -> Response {
        federation_error_response(&self.config.login_path, error, next)
    }
}

#[async_trait]
impl OidcProvider for ServerProviders {
    type Store = MemoryStore;

    fn store(&self) -> &Self::Store {
        &self.store
    }

    fn codec(&self) -> &TokenCodec {
        &self.codec
    }

    fn metadata(&self) -> ProviderMetadata {
        self.metadata.clone()
    }

    async fn authenticate_end_user(
        &self,
        headers: &HeaderMap,
        request: &AuthorizationRequest,
        params: &Params,
    ) -> EndUser {
        let (session, created) = self.sessions.resume_or_create(headers).await;
        if let Some(user_id) = session.user_id {
            return EndUser::Authenticated(user_id.to_string());
        }

        // The resume URL passes through the user agent; the secret stays here.
        if let (Some(client_id), Some(secret)) = (params.get("client_id"), params.get("client_secret")) {
            self.sessions.withhold_secret(&session.id, client_id, secret).await;
        }
        let params = params.without("client_secret");

        let resume = format!("{AUTHORIZE_PATH}?{}", params.to_query_string());
        let challenge = if request.acr_values.is_empty() {
            debug!("no session user, sending to login page");
            self.login_redirect(&resume)
        } else {
            match self
                .federation
                .begin(
                    &session.binding,
                    request.acr_values.iter().map(String::as_str),
                    AUTHORIZE_PATH,
                    params.pairs(),
                )
                .await
            {
                Ok(url) => Redirect::to(url.as_str()).into_response(),
                Err(e) => self.federation_error(&e, &resume),
            }
        };

        EndUser::Challenge((self.sessions.jar(&session, created), challenge).into_response())
    }

    async fn restore_params(&self, headers: &HeaderMap, mut params: Params) -> Params {
        let Some(session) = self.sessions.from_headers(headers).await else {
            return params;
        };
        let secret = params
            .get("client_id")
            .and_then(|client_id| session.client_secrets.get(client_id))
            .cloned();
        if let Some(secret) = secret {
            params.insert_missing("client_secret", secret);
        }
        params
    }
}
