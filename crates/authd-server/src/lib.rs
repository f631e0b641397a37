//! # authd-server
//!
//! Axum server for authd.
//!
//! This crate provides the HTTP server combining:
//! - OAuth2 / `OpenID` Connect endpoints (authorization, token, JWKS, discovery)
//! - Password login and browser sessions
//! - Local registration and the federation callback for external `OpenID`
//!   providers
//! - The `UserInfo` endpoint
//! - A background sweep of expired sessions and access codes
//! - A health check
//!
//! ## Usage
//!
//! ```ignore
//! use authd_server::{Server, ServerConfig};
//!
//! let config = ServerConfig::from_env()?;
//! let server = Server::new(config).await?;
//! server.run().await?;
//! ```

#![forbid(unsafe_code)]
#![warn(missing_docs)]

pub mod callback;
pub mod config;
pub mod login;
pub mod pages;
pub mod providers;
pub mod register;
pub mod router;
pub mod seed;
pub mod session;
pub mod state;

pub use config::ServerConfig;
pub use providers::ServerProviders;
pub use router::create_router;
pub use seed::Seed;
pub use state::AppState;

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use authd_crypto::{KeyJar, StateCipher};
use authd_oidc::TokenCodec;
use authd_storage::MemoryStore;
use axum::Router;
use tokio::net::TcpListener;
use tokio::time::MissedTickBehavior;
use tracing::{info, warn};

/// The authd server.
pub struct Server {
    config: ServerConfig,
    providers: Arc<ServerProviders>,
}

impl Server {
    /// Creates a new server instance.
    ///
    /// Loads or generates the signing keys and applies the seed file.
    ///
    /// # Errors
    ///
    /// Returns an error if keys cannot be generated, the cookie key is
    /// malformed or the seed file is invalid.
    pub async fn new(config: ServerConfig) -> anyhow::Result<Self> {
        let jar = KeyJar::load_or_generate(&config.key_paths, config.key_bits)?;
        info!(keys = jar.len(), "Signing keys ready");
        let codec = TokenCodec::new(config.token_config(), Arc::new(jar))?;

        let cipher = match config.cookie_key {
            Some(ref key) => StateCipher::from_hex(key)?,
            None => {
                warn!("AUTHD_COOKIE_KEY not set, federation state will not survive a restart");
                StateCipher::generate()?
            }
        };

        let store = Arc::new(MemoryStore::new());
        let mut scopes = Vec::new();
        if let Some(ref path) = config.seed_file {
            let seed = Seed::load(path)?;
            seed.apply(store.as_ref()).await?;
            scopes = seed.scope_codes();
        }

        let providers = ServerProviders::new(config.clone(), store, codec, cipher, scopes)?;
        Ok(Self {
            config,
            providers: Arc::new(providers),
        })
    }

    /// Runs the server on the configured address until a shutdown signal.
    ///
    /// # Errors
    ///
    /// Returns an error if the address cannot be bound.
    pub async fn run(self) -> anyhow::Result<()> {
        let addr: SocketAddr = format!("{}:{}", self.config.host, self.config.port).parse()?;
        let listener = TcpListener::bind(addr).await?;
        self.serve(listener).await
    }

    /// Serves on an already bound listener until a shutdown signal.
    ///
    /// # Errors
    ///
    /// Returns an error if serving fails.
    pub async fn serve(self, listener: TcpListener) -> anyhow::Result<()> {
        info!("Server listening on http://{}", listener.local_addr()?);

        let sweeper = tokio::spawn(sweep_periodically(
            Arc::clone(&self.providers),
            self.config.sweep_interval,
        ));

        let served = axum::serve(listener, self.router())
            .with_graceful_shutdown(shutdown_signal())
            .await;
        sweeper.abort();
        served?;

        info!("Server shutdown complete");
        Ok(())
    }

    /// Returns the store, for seeding in tests.
    #[must_use]
    pub fn store(&self) -> &Arc<MemoryStore> {
        self.providers.shared_store()
    }

    /// Returns the server configuration.
    #[must_use]
    pub const fn config(&self) -> &ServerConfig {
        &self.config
    }

    /// Creates the router without starting the server.
    pub fn router(&self) -> Router {
        create_router(AppState::new(Arc::clone(&self.providers)))
    }
}

/// Sweeps expired sessions and access codes every `period`.
async fn sweep_periodically(providers: Arc<ServerProviders>, period: Duration) {
    let mut interval = tokio::time::interval(period);
    interval.set_missed_tick_behavior(MissedTickBehavior::Delay);
    loop {
        interval.tick().await;
        if let Err(e) = providers.sweep().await {
            warn!(error = %e, "sweep failed");
        }
    }
}

/// Waits for a shutdown signal.
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            warn!(error = %e, "failed to listen for Ctrl+C");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                warn!(error = %e, "failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => {},
        () = terminate => {},
    }

    info!("Shutdown signal received");
}
