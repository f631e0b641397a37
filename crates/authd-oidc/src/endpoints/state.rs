//! Shared state for OIDC endpoints.

use std::sync::Arc;

use async_trait::async_trait;
use axum::http::HeaderMap;
use axum::response::Response;

use authd_storage::Store;

use crate::discovery::ProviderMetadata;
use crate::request::{AuthorizationRequest, Params};
use crate::token::TokenCodec;

/// Outcome of end-user authentication at the authorization endpoint.
#[derive(Debug)]
pub enum EndUser {
    /// The resource owner is known; carries its subject.
    Authenticated(String),
    /// The user agent must authenticate first (login page, federation).
    Challenge(Response),
}

/// Everything the endpoints need from the hosting server.
///
/// Implement this trait to plug in storage, keys and the way end users log in.
#[async_trait]
pub trait OidcProvider: Send + Sync + 'static {
    /// Backing store.
    type Store: Store + ?Sized;

    /// Returns the store.
    fn store(&self) -> &Self::Store;

    /// Returns the token codec.
    fn codec(&self) -> &TokenCodec;

    /// Returns the discovery document.
    fn metadata(&self) -> ProviderMetadata;

    /// Identifies the resource owner for a validated request.
    ///
    /// `params` are the raw parameters, for resuming the request after a
    /// challenge.
    async fn authenticate_end_user(
        &self,
        headers: &HeaderMap,
        request: &AuthorizationRequest,
        params: &Params,
    ) -> EndUser;

    /// Restores parameters withheld from the user agent when a challenged
    /// request resumes. The default returns `params` unchanged.
    async fn restore_params(&self, _headers: &HeaderMap, params: Params) -> Params {
        params
    }
}

/// Shared state for OIDC endpoints.
pub struct OidcState<P: OidcProvider> {
    /// Provider backing the endpoints.
    pub provider: Arc<P>,
}

impl<P: OidcProvider> Clone for OidcState<P> {
    fn clone(&self) -> Self {
        Self {
            provider: Arc::clone(&self.provider),
        }
    }
}

impl<P: OidcProvider> OidcState<P> {
    /// Creates a new OIDC state.
    pub fn new(provider: P) -> Self {
        Self {
            provider: Arc::new(provider),
        }
    }

    /// Creates a new OIDC state from an Arc.
    pub const fn from_arc(provider: Arc<P>) -> Self {
        Self { provider }
    }
}
