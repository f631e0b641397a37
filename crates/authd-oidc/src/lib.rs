//! # authd-oidc
//!
//! OAuth 2.0 and `OpenID` Connect authorization pipeline for authd.
//!
//! An authorization request flows through:
//! 1. [`request`]: typed parsing of raw parameters
//! 2. [`validators`]: client, redirect URI, response type, scope
//! 3. [`endpoints::grants`]: code, token and ID token grants
//! 4. [`endpoints::response`]: redirect or error page
//!
//! ## Modules
//!
//! - [`claims`] - JWT claim types for access and ID tokens
//! - [`discovery`] - `OpenID` Provider Metadata for `.well-known` endpoint
//! - [`endpoints`] - Axum HTTP handlers
//! - [`error`] - OIDC error types following RFC 6749
//! - [`jwks`] - JSON Web Key Set types
//! - [`token`] - RS256 token codec
//! - [`types`] - response types, response modes and grant types

#![forbid(unsafe_code)]
#![warn(missing_docs)]

pub mod claims;
pub mod discovery;
pub mod endpoints;
pub mod error;
pub mod jwks;
pub mod request;
pub mod token;
pub mod types;
pub mod validators;

pub use claims::{AccessTokenClaims, IdTokenClaims};
pub use discovery::{ProviderMetadata, ProviderMetadataBuilder};
pub use endpoints::{EndUser, OidcProvider, OidcState, oidc_router};
pub use error::{Disposition, ErrorResponse, OidcError, OidcResult};
pub use jwks::{JsonWebKey, JsonWebKeySet, KeyType, RS256};
pub use request::{AuthorizationRequest, ClientCredentials, FromParams, Params, TokenRequest};
pub use token::{TokenCodec, TokenConfig, TokenResponse, compute_at_hash, verify_rs256};
pub use types::{GrantType, ResponseMode, ResponseType, ResponseTypes};
