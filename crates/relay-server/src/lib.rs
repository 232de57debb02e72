//! HTTP server for the relay OAuth proxy.
//!
//! Binds browser sessions to access tokens obtained through the OAuth 2.0
//! authorization-code flow, forwards `/api/v4/*` GETs upstream with the
//! caller's token, and offers a local email/password login checked against
//! an external user service.
//!
//! # Routes
//!
//! | Route | Purpose |
//! |-------|---------|
//! | `GET /oauth` | redirect to the provider's authorization page |
//! | `GET /oauth/response` | exchange the code, install the token, redirect to `/done` |
//! | `GET /done` | confirmation page |
//! | `GET /api/v4/*` | authenticated pass-through to the upstream API |
//! | `GET /login`, `POST /login` | login page and credential check |
//! | `GET /authrequired` | page for logged-in users only |
//! | `GET /health` | liveness probe |
//! | any other `GET` | `Unsupported request: <path>` |
//!
//! # Example
//!
//! ```ignore
//! use std::sync::Arc;
//! use relay_oauth::{ApiClient, OAuthClient};
//! use relay_server::{AppState, HttpUserDirectory, Server, ServerConfig};
//! use relay_session::FileSessionStore;
//!
//! let sessions = Arc::new(FileSessionStore::new("sessions", ttl)?);
//! let state = AppState::new(
//!     ServerConfig::new(),
//!     &session_secret,
//!     OAuthClient::new(oauth_config),
//!     ApiClient::new("https://app.example.com"),
//!     Arc::new(HttpUserDirectory::new("http://localhost:5000")),
//!     sessions,
//! );
//! Server::from_state(state).run().await?;
//! ```

pub mod auth;
pub mod config;
pub mod error;
pub mod logging;
pub mod routes;
pub mod session;
pub mod state;
pub mod users;

pub use auth::{
    AuthError, Authenticator, Credentials, LocalPasswordAuthenticator, SharedAuthenticator,
    hash_password, verify_password,
};
pub use config::ServerConfig;
pub use error::{Result, ServerError};
pub use logging::request_logging_middleware;
pub use session::{CurrentSession, session_middleware, spawn_session_reaper};
pub use state::AppState;
pub use users::{
    DirectoryError, HttpUserDirectory, InMemoryUserDirectory, SharedUserDirectory, User,
    UserDirectory,
};

use std::future::Future;
use std::net::SocketAddr;

use axum::{
    Router, middleware,
    routing::get,
};
use tokio::net::TcpListener;
use tower_http::trace::TraceLayer;
use tracing::info;

use relay_oauth::API_PREFIX;

/// The relay HTTP server.
pub struct Server {
    /// Application state.
    state: AppState,
}

impl Server {
    /// Create a server from a pre-built application state.
    pub fn from_state(state: AppState) -> Self {
        Self { state }
    }

    /// Build the router with all routes and middleware.
    pub fn router(&self) -> Router {
        let api_route = format!("{}/{{*path}}", API_PREFIX);

        Router::new()
            .route("/done", get(routes::done_handler))
            .route(&api_route, get(routes::api_proxy_handler))
            .route("/oauth", get(routes::oauth_start_handler))
            .route("/oauth/response", get(routes::oauth_response_handler))
            .route(
                "/login",
                get(routes::login_page_handler).post(routes::login_handler),
            )
            .route("/authrequired", get(routes::authrequired_handler))
            .fallback(routes::unsupported_handler)
            // Every route above gets a session
            .layer(middleware::from_fn_with_state(
                self.state.clone(),
                session::session_middleware,
            ))
            // Health is added after the session layer and stays sessionless
            .merge(routes::health_routes())
            .layer(middleware::from_fn_with_state(
                self.state.clone(),
                logging::request_logging_middleware,
            ))
            .layer(TraceLayer::new_for_http())
            .with_state(self.state.clone())
    }

    /// Run the server on the configured address until Ctrl-C.
    pub async fn run(self) -> Result<()> {
        let addr = self.state.config.bind_address;
        self.run_on(addr).await
    }

    /// Run the server on a specific address until Ctrl-C.
    pub async fn run_on(self, addr: SocketAddr) -> Result<()> {
        let listener = TcpListener::bind(addr)
            .await
            .map_err(|e| ServerError::Internal(format!("Failed to bind {}: {}", addr, e)))?;

        self.serve(listener, shutdown_signal()).await
    }

    /// Serve on an already-bound listener until `shutdown` resolves.
    pub async fn serve<F>(self, listener: TcpListener, shutdown: F) -> Result<()>
    where
        F: Future<Output = ()> + Send + 'static,
    {
        let router = self.router();

        if let Ok(addr) = listener.local_addr() {
            info!("Starting server on {}", addr);
        }

        axum::serve(listener, router)
            .with_graceful_shutdown(shutdown)
            .await
            .map_err(|e| ServerError::Internal(format!("Server error: {}", e)))?;

        info!("Server stopped");
        Ok(())
    }

    /// Get the configured bind address.
    pub fn bind_address(&self) -> SocketAddr {
        self.state.config.bind_address
    }

    /// Get the application state the router is built from.
    pub fn state(&self) -> &AppState {
        &self.state
    }
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::warn!(error = %e, "Failed to listen for Ctrl-C");
        std::future::pending::<()>().await;
    }
    info!("Shutdown signal received");
}
