//! OIDC router configuration.

use axum::{
    Router,
    routing::{get, post},
};

use super::authorization::{authorize_get, authorize_post};
use super::discovery::{jwks, well_known};
use super::state::{OidcProvider, OidcState};
use super::token::token;
use super::userinfo::{userinfo_get, userinfo_post};

/// Authorization endpoint path.
pub const AUTHORIZE_PATH: &str = "/auth/authorize";
/// Token endpoint path.
pub const TOKEN_PATH: &str = "/auth/token";
/// `UserInfo` endpoint path.
pub const USERINFO_PATH: &str = "/auth/userinfo";
/// JWKS path.
pub const JWKS_PATH: &str = "/auth/jwks";
/// Discovery document path.
pub const DISCOVERY_PATH: &str = "/.well-known/openid-configuration";

/// Creates the OIDC protocol router.
///
/// # Endpoints
///
/// | Method    | Path                                | Handler      |
/// |-----------|-------------------------------------|--------------|
/// | GET, POST | `/auth/authorize`                   | `authorize`  |
/// | POST      | `/auth/token`                       | `token`      |
/// | GET, POST | `/auth/userinfo`                    | `userinfo`   |
/// | GET       | `/auth/jwks`                        | `jwks`       |
/// | GET       | `/.well-known/openid-configuration` | `well_known` |
///
/// # Usage
///
/// ```rust,ignore
/// use authd_oidc::endpoints::{oidc_router, OidcState};
///
/// let app = Router::new()
///     .merge(oidc_router())
///     .with_state(OidcState::new(provider));
/// ```
pub fn oidc_router<P: OidcProvider>() -> Router<OidcState<P>> {
    Router::new()
        .route(
            AUTHORIZE_PATH,
            get(authorize_get::<P>).post(authorize_post::<P>),
        )
        .route(TOKEN_PATH, post(token::<P>))
        .route(
            USERINFO_PATH,
            get(userinfo_get::<P>).post(userinfo_post::<P>),
        )
        .route(JWKS_PATH, get(jwks::<P>))
        .route(DISCOVERY_PATH, get(well_known::<P>))
}
