//! Application state management.
//!
//! This module defines the shared state that is passed to all request handlers.

use std::sync::Arc;

use authd_oidc::OidcState;

use crate::providers::ServerProviders;

/// Application state shared across all request handlers.
#[derive(Clone)]
pub struct AppState {
    /// Server providers.
    pub providers: Arc<ServerProviders>,
}

impl AppState {
    /// Creates a new application state.
    #[must_use]
    pub const fn new(providers: Arc<ServerProviders>) -> Self {
        Self { providers }
    }

    /// Gets the OIDC state for the protocol endpoints.
    #[must_use]
    pub fn oidc_state(&self) -> OidcState<ServerProviders> {
        OidcState::from_arc(Arc::clone(&self.providers))
    }

    /// Returns a reference to the server providers.
    #[must_use]
    pub fn providers(&self) -> &ServerProviders {
        &self.providers
    }
}
