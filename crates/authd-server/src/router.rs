//! Router configuration.
//!
//! This module creates the main Axum router that combines all endpoints.

use axum::{
    Router,
    http::{HeaderValue, StatusCode},
    response::Json,
    routing::get,
};
use authd_oidc::oidc_router;
use serde::Serialize;
use tower_http::cors::{AllowOrigin, Any, CorsLayer};
use tower_http::trace::TraceLayer;
use tracing::warn;

use crate::callback::oidc_callback;
use crate::config::CALLBACK_PATH;
use crate::login::{login_page, login_submit};
use crate::providers::ServerProviders;
use crate::register::{register_page, register_submit};
use crate::state::AppState;

/// Creates the main application router.
pub fn create_router(state: AppState) -> Router {
    let oidc = oidc_router::<ServerProviders>().with_state(state.oidc_state());

    let config = state.providers().config();
    let login_path = config.login_path.clone();
    let registration_path = config.registration_path.clone();
    let cors = cors_layer(&config.cors_origins);

    let pages = Router::new()
        .route(&login_path, get(login_page).post(login_submit))
        .route(&registration_path, get(register_page).post(register_submit))
        .route(CALLBACK_PATH, get(oidc_callback))
        .with_state(state);

    Router::new()
        .merge(oidc)
        .merge(pages)
        .route("/health", get(health_check))
        .layer(TraceLayer::new_for_http())
        .layer(cors)
}

fn cors_layer(origins: &[String]) -> CorsLayer {
    let layer = CorsLayer::new().allow_methods(Any).allow_headers(Any);
    if origins.iter().any(|o| o == "*") {
        return layer.allow_origin(Any);
    }
    let origins: Vec<HeaderValue> = origins
        .iter()
        .filter_map(|origin| match HeaderValue::from_str(origin) {
            Ok(value) => Some(value),
            Err(_) => {
                warn!(origin = %origin, "ignoring invalid CORS origin");
                None
            }
        })
        .collect();
    layer.allow_origin(AllowOrigin::list(origins))
}

/// Health check response.
#[derive(Serialize)]
pub struct HealthResponse {
    status: &'static str,
    version: &'static str,
}

/// Liveness check.
async fn health_check() -> (StatusCode, Json<HealthResponse>) {
    (
        StatusCode::OK,
        Json(HealthResponse {
            status: "healthy",
            version: env!("CARGO_PKG_VERSION"),
        }),
    )
}
