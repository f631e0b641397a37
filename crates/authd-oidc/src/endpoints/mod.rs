//! OIDC endpoint handlers for Axum.
//!
//! This module provides HTTP handlers for the authorization server:
//! - Authorization (`/auth/authorize`)
//! - Token (`/auth/token`)
//! - `UserInfo` (`/auth/userinfo`)
//! - JWKS (`/auth/jwks`)
//! - Discovery (`/.well-known/openid-configuration`)
//!
//! ## Router Setup
//!
//! Use [`oidc_router`] to create a configured Axum router with all endpoints.
//! The hosting server supplies an [`OidcProvider`], which owns the store, the
//! token codec and end-user authentication.

mod authorization;
mod discovery;
pub mod grants;
pub mod response;
mod router;
mod state;
mod token;
mod userinfo;

pub use authorization::handle_authorization_request;
pub use grants::{AuthorizationResponse, BEARER, GrantContext};
pub use response::{build_redirect, error_page};
pub use router::{AUTHORIZE_PATH, DISCOVERY_PATH, JWKS_PATH, TOKEN_PATH, USERINFO_PATH, oidc_router};
pub use state::{EndUser, OidcProvider, OidcState};
pub use token::extract_credentials;
pub use userinfo::{UserInfoResponse, extract_bearer_token};
