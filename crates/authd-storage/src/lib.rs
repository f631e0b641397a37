//! # authd-storage
//!
//! Storage interfaces for the authorization server and an in-memory backend.
//!
//! ## Store Traits
//!
//! - [`ClientStore`] - registered clients
//! - [`UserStore`] - local users and their federated links
//! - [`ProviderStore`] - discovered OpenID providers, cached by domain
//! - [`ScopeStore`] - scopes and the default scope set
//! - [`AccessCodeStore`] - authorization codes with atomic redemption
//!
//! [`Store`] bundles all five and is implemented for any type that
//! implements each of them.

#![forbid(unsafe_code)]
#![warn(missing_docs)]

pub mod access_code;
pub mod client;
pub mod error;
pub mod memory;
pub mod provider;
pub mod scope;
pub mod user;

pub use access_code::{AccessCodeStore, Redemption};
pub use client::ClientStore;
pub use error::{StorageError, StorageResult};
pub use memory::MemoryStore;
pub use provider::ProviderStore;
pub use scope::ScopeStore;
pub use user::UserStore;

/// All collections the server needs.
pub trait Store: ClientStore + UserStore + ProviderStore + ScopeStore + AccessCodeStore {}

impl<T> Store for T where T: ClientStore + UserStore + ProviderStore + ScopeStore + AccessCodeStore {}
