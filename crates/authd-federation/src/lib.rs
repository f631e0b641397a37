//! # authd-federation
//!
//! Sign-in through external `OpenID` Connect providers.
//!
//! A request carrying `acr_values=idp:<domain>` is sent to that domain's
//! provider. Unknown domains are discovered on first use and cached in the
//! store. The round trip is bound to the user's session by an encrypted
//! `state` parameter and a nonce derived from the session id.

#![forbid(unsafe_code)]
#![warn(missing_docs)]

pub mod acr;
pub mod config;
pub mod discovery;
pub mod error;
pub mod service;
pub mod state;

pub use acr::domain_from_acr;
pub use config::{ClientRegistration, FederationConfig};
pub use error::{FederationError, FederationResult, ProviderError};
pub use service::{CallbackOutcome, CallbackRequest, FederationService};
pub use state::{AuthState, PendingLink};
