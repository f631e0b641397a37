//! # authd-model
//!
//! Domain entities persisted by the authorization server.
//!
//! - [`Client`]: a registered OAuth2 application
//! - [`User`]: a local resource owner, optionally linked to federated accounts
//! - [`Provider`]: an external OpenID provider discovered on demand
//! - [`AccessCode`]: a single-use authorization code
//! - [`Scope`]: a grantable scope, possibly granted by default

#![forbid(unsafe_code)]
#![warn(missing_docs)]

pub mod access_code;
pub mod client;
pub mod error;
pub mod provider;
pub mod scope;
pub mod user;

pub use access_code::AccessCode;
pub use client::{Client, ClientType};
pub use error::{ModelError, ModelResult};
pub use provider::{Provider, ProviderKey};
pub use scope::Scope;
pub use user::{FederatedAccount, User};
