//! The federation round trip.
//!
//! 1. [`FederationService::begin`] picks the provider named in `acr_values`,
//!    discovering it if needed, and returns the URL to send the user to.
//! 2. [`FederationService::complete`] handles the provider's callback: it
//!    redeems the code, verifies the ID token and maps the external account
//!    to a local user, or asks for a local login to link it.

use std::collections::BTreeSet;
use std::sync::Arc;

use authd_crypto::{StateCipher, sha256_hex};
use authd_model::Provider;
use authd_oidc::request::{Field, Fields, FromParams};
use authd_oidc::verify_rs256;
use authd_storage::{ProviderStore, UserStore};
use jsonwebtoken::Algorithm;
use serde::Deserialize;
use tracing::{debug, info, instrument, warn};
use url::Url;
use uuid::Uuid;

use crate::acr::domain_from_acr;
use crate::config::FederationConfig;
use crate::discovery::{discover, fetch_keys};
use crate::error::{FederationError, FederationResult, ProviderError};
use crate::state::{AuthState, PendingLink};

/// Scopes requested in addition to `openid` when the provider offers them.
const OPTIONAL_SCOPES: [&str; 2] = ["email", "profile"];

/// Parameters of the provider's callback.
#[derive(Debug, Clone, Default)]
pub struct CallbackRequest {
    /// Sealed [`AuthState`].
    pub state: String,
    /// Authorization code issued by the provider.
    pub code: Option<String>,
    /// Error reported by the provider.
    pub error: Option<String>,
}

impl FromParams for CallbackRequest {
    const FIELDS: &'static [Field] = &[
        Field::required("state"),
        Field::optional("code"),
        Field::optional("error"),
    ];

    fn from_fields(mut fields: Fields) -> Self {
        Self {
            state: fields.required("state"),
            code: fields.scalar("code"),
            error: fields.scalar("error"),
        }
    }
}

/// Result of a provider callback.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CallbackOutcome {
    /// The external account maps to a local user; log the session in.
    Authenticated {
        /// Local user.
        user_id: Uuid,
        /// Where to resume.
        resume: String,
    },
    /// The pending account was linked to the session's user.
    Linked {
        /// Local user.
        user_id: Uuid,
        /// Where to resume.
        resume: String,
    },
    /// The account is unknown; the user must log in locally to link it.
    LinkRequired {
        /// Sealed state carrying the pending link.
        state: String,
    },
}

#[derive(Debug, Deserialize)]
struct ProviderTokenResponse {
    #[serde(default)]
    token_type: Option<String>,
    #[serde(default)]
    id_token: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ForeignIdClaims {
    #[serde(default)]
    sub: Option<String>,
    #[serde(default)]
    nonce: Option<String>,
}

/// Runs federation against external `OpenID` providers.
pub struct FederationService<S: ?Sized> {
    store: Arc<S>,
    cipher: StateCipher,
    http: reqwest::Client,
    config: FederationConfig,
}

impl<S: ?Sized> std::fmt::Debug for FederationService<S> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FederationService")
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}

impl<S> FederationService<S>
where
    S: UserStore + ProviderStore + ?Sized,
{
    /// Creates the service with an HTTP client bounded by the configured timeout.
    ///
    /// # Errors
    ///
    /// Returns a configuration error if the HTTP client cannot be built.
    pub fn new(store: Arc<S>, cipher: StateCipher, config: FederationConfig) -> FederationResult<Self> {
        let http = reqwest::Client::builder()
            .timeout(config.http_timeout)
            .build()
            .map_err(|e| FederationError::config(format!("Can't build HTTP client: {e}")))?;
        Ok(Self {
            store,
            cipher,
            http,
            config,
        })
    }

    /// Returns the configuration.
    #[must_use]
    pub const fn config(&self) -> &FederationConfig {
        &self.config
    }

    /// Cached provider for `domain`, discovering and storing it on first use.
    ///
    /// # Errors
    ///
    /// Returns provider errors from discovery and storage errors.
    pub async fn provider(&self, domain: &str) -> FederationResult<Provider> {
        if let Some(provider) = self.store.get_provider_by_domain(domain).await? {
            return Ok(provider);
        }
        let provider = discover(&self.http, &self.config, domain).await?;
        self.store.put_provider(&provider).await?;
        info!(domain, provider_id = %provider.id, "provider discovered");
        Ok(provider)
    }

    /// Starts a federated login and returns the provider URL to redirect to.
    ///
    /// `path` and `params` describe the request to resume afterwards.
    ///
    /// # Errors
    ///
    /// Returns [`FederationError::InvalidParameter`] for bad `acr_values` and
    /// [`FederationError::Provider`] when the provider cannot be used.
    #[instrument(skip_all)]
    pub async fn begin<'a, I>(
        &self,
        session_id: &str,
        acr_values: I,
        path: &str,
        params: &[(String, String)],
    ) -> FederationResult<Url>
    where
        I: IntoIterator<Item = &'a str>,
    {
        let domain = domain_from_acr(acr_values)?;
        let provider = self.provider(&domain).await?;

        let authorization_endpoint = provider
            .authorization_endpoint
            .as_deref()
            .filter(|e| !e.is_empty())
            .ok_or_else(|| ProviderError::Configuration("Authorization endpoint is not defined".into()))?;
        let client_id = provider
            .client_id
            .as_deref()
            .filter(|c| !c.is_empty())
            .ok_or_else(|| ProviderError::Configuration("Client is not registered".into()))?;
        if !provider.supports_response_type("code") {
            return Err(ProviderError::Configuration(
                "Response type \"code\" is not supported by provider".into(),
            )
            .into());
        }
        if !provider.supports_scope("openid") {
            return Err(
                ProviderError::Configuration("Scope \"openid\" is not supported by provider".into())
                    .into(),
            );
        }

        let mut scopes = BTreeSet::from(["openid"]);
        scopes.extend(
            OPTIONAL_SCOPES
                .into_iter()
                .filter(|scope| provider.supports_scope(scope)),
        );
        let scope = scopes.into_iter().collect::<Vec<_>>().join(" ");

        let nonce = sha256_hex(session_id.as_bytes());
        let state = AuthState {
            sid: session_id.to_string(),
            nonce: nonce.clone(),
            domain: domain.clone(),
            path: path.to_string(),
            params: params.to_vec(),
            link: None,
        }
        .seal(&self.cipher)?;

        let mut url = Url::parse(authorization_endpoint).map_err(|e| {
            ProviderError::Configuration(format!("Invalid authorization endpoint: {e}"))
        })?;
        url.query_pairs_mut()
            .append_pair("redirect_uri", &self.config.callback_uri)
            .append_pair("client_id", client_id)
            .append_pair("state", &state)
            .append_pair("scope", &scope)
            .append_pair("response_type", "code")
            .append_pair("nonce", &nonce);

        debug!(domain = %domain, "redirecting to provider");
        Ok(url)
    }

    /// Handles the provider's callback for the session `session_id`.
    ///
    /// `session_user` is the locally authenticated user, if any; it is only
    /// used to link a pending account.
    ///
    /// # Errors
    ///
    /// - [`FederationError::InvalidParameter`]: undecodable state, missing code
    /// - [`FederationError::SessionMismatch`]: state from another session
    /// - [`FederationError::Provider`]: the provider misbehaved or is unreachable
    /// - [`FederationError::InvalidToken`]: the ID token failed verification
    #[instrument(skip_all)]
    pub async fn complete(
        &self,
        session_id: &str,
        session_user: Option<Uuid>,
        callback: &CallbackRequest,
    ) -> FederationResult<CallbackOutcome> {
        let state = AuthState::open(&self.cipher, &callback.state)?;
        if state.sid != session_id {
            warn!("federation state presented by another session");
            return Err(FederationError::SessionMismatch);
        }

        if let Some(ref link) = state.link {
            return match session_user {
                Some(user_id) => self.link(user_id, link, &state).await,
                None => Ok(CallbackOutcome::LinkRequired {
                    state: callback.state.clone(),
                }),
            };
        }

        if let Some(ref error) = callback.error {
            return Err(FederationError::config(format!("Provider returned error: {error}")));
        }
        let code = callback
            .code
            .as_deref()
            .ok_or_else(|| FederationError::InvalidParameter("No code provided".to_string()))?;

        let mut provider = self.provider(&state.domain).await?;
        let id_token = self.redeem_code(&provider, code).await?;
        let subject = self.verify_id_token(&mut provider, &id_token, &state.nonce).await?;

        let linked = self.store.get_user_by_account(provider.id, &subject).await?;
        match linked {
            Some(user) => {
                info!(user_id = %user.id, domain = %state.domain, "federated login");
                Ok(CallbackOutcome::Authenticated {
                    user_id: user.id,
                    resume: state.resume_uri(),
                })
            }
            None => {
                info!(domain = %state.domain, "federated account not linked");
                let pending = AuthState {
                    link: Some(PendingLink {
                        provider_id: provider.id,
                        subject,
                    }),
                    ..state
                };
                Ok(CallbackOutcome::LinkRequired {
                    state: pending.seal(&self.cipher)?,
                })
            }
        }
    }

    async fn link(&self, user_id: Uuid, link: &PendingLink, state: &AuthState) -> FederationResult<CallbackOutcome> {
        let mut user = self
            .store
            .get_user(user_id)
            .await?
            .ok_or_else(|| authd_storage::StorageError::not_found("user", user_id.to_string()))?;
        user.link_account(link.provider_id, link.subject.clone());
        self.store.update_user(&user).await?;
        info!(%user_id, provider_id = %link.provider_id, "federated account linked");
        Ok(CallbackOutcome::Linked {
            user_id,
            resume: state.resume_uri(),
        })
    }

    /// Exchanges the provider's code for an ID token.
    ///
    /// The provider must advertise the `id_token` response type.
    async fn redeem_code(&self, provider: &Provider, code: &str) -> FederationResult<String> {
        let token_endpoint = provider
            .token_endpoint
            .as_deref()
            .ok_or_else(|| FederationError::config("No token endpoint"))?;
        if !provider.supports_response_type("id_token") {
            return Err(FederationError::config("ID token not supported"));
        }
        let client_id = provider.client_id.as_deref().unwrap_or_default();
        let client_secret = provider.client_secret.as_deref().unwrap_or_default();

        let response = self
            .http
            .post(token_endpoint)
            .form(&[
                ("grant_type", "authorization_code"),
                ("code", code),
                ("redirect_uri", self.config.callback_uri.as_str()),
                ("client_id", client_id),
                ("client_secret", client_secret),
            ])
            .send()
            .await
            .map_err(|e| FederationError::config(format!("Can't obtain token: {e}")))?;

        if !response.status().is_success() {
            warn!(status = response.status().as_u16(), "provider rejected code");
            return Err(FederationError::config("Can't obtain token from provider"));
        }

        let body: ProviderTokenResponse = response
            .json()
            .await
            .map_err(|_| FederationError::config("Invalid response from provider"))?;

        if !body
            .token_type
            .as_deref()
            .is_some_and(|t| t.eq_ignore_ascii_case("bearer"))
        {
            return Err(FederationError::config("Invalid token type returned by provider"));
        }
        body.id_token
            .ok_or_else(|| FederationError::config("Invalid response from provider"))
    }

    /// Verifies an ID token and returns its subject.
    ///
    /// An unknown `kid` refreshes the provider's keys once.
    async fn verify_id_token(
        &self,
        provider: &mut Provider,
        id_token: &str,
        nonce: &str,
    ) -> FederationResult<String> {
        let header = jsonwebtoken::decode_header(id_token)
            .map_err(|e| FederationError::invalid_token(format!("Can't decode token: {e}")))?;
        if header.alg != Algorithm::RS256 {
            return Err(FederationError::invalid_token("Key algorithm not supported"));
        }
        let kid = header
            .kid
            .ok_or_else(|| FederationError::invalid_token("Token has no key id"))?;

        if provider.key(&kid).is_none() {
            let jwks_uri = provider
                .jwks_uri
                .as_deref()
                .ok_or_else(|| FederationError::config("Provider has no jwks_uri"))?;
            let keys = fetch_keys(&self.http, jwks_uri).await?;
            provider.replace_keys(keys);
            self.store.put_provider(provider).await?;
        }
        let key = provider
            .key(&kid)
            .ok_or_else(|| FederationError::invalid_token(format!("Can't get key with kid {kid}")))?;

        let client_id = provider.client_id.as_deref().unwrap_or_default();
        let claims: ForeignIdClaims = verify_rs256(id_token, &key.n, &key.e, client_id)
            .map_err(|e| FederationError::invalid_token(e.to_string()))?;

        if claims.nonce.as_deref() != Some(nonce) {
            return Err(FederationError::invalid_token("Can't verify nonce"));
        }
        claims
            .sub
            .ok_or_else(|| FederationError::invalid_token("Token has no subject"))
    }
}
