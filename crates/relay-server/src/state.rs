//! Application state shared across handlers.

use std::sync::Arc;

use axum::extract::FromRef;
use axum_extra::extract::cookie::Key;

use relay_oauth::{ApiClient, MemoryCredentialStore, OAuthClient, SharedCredentialStore};
use relay_session::SharedSessionStore;

use crate::auth::{LocalPasswordAuthenticator, SharedAuthenticator};
use crate::config::ServerConfig;
use crate::session::derive_cookie_key;
use crate::users::SharedUserDirectory;

/// Application state shared across all handlers.
#[derive(Clone)]
pub struct AppState {
    /// Server configuration.
    pub config: Arc<ServerConfig>,

    /// Authorization-code client for the OAuth provider.
    pub oauth: Arc<OAuthClient>,

    /// Client for the upstream API.
    pub api: Arc<ApiClient>,

    /// Access tokens by owner.
    pub credentials: SharedCredentialStore,

    /// Browser sessions.
    pub sessions: SharedSessionStore,

    /// User lookup service.
    pub users: SharedUserDirectory,

    /// Login credential check.
    pub authenticator: SharedAuthenticator,

    cookie_key: Key,
}

impl AppState {
    /// Create application state.
    ///
    /// Logins are checked by a [`LocalPasswordAuthenticator`] over `users` and
    /// access tokens are kept in memory unless overridden.
    pub fn new(
        config: ServerConfig,
        session_secret: &str,
        oauth: OAuthClient,
        api: ApiClient,
        users: SharedUserDirectory,
        sessions: SharedSessionStore,
    ) -> Self {
        Self {
            config: Arc::new(config),
            oauth: Arc::new(oauth),
            api: Arc::new(api),
            credentials: Arc::new(MemoryCredentialStore::new()),
            sessions,
            authenticator: Arc::new(LocalPasswordAuthenticator::new(users.clone())),
            users,
            cookie_key: derive_cookie_key(session_secret),
        }
    }

    /// Replace the login authenticator.
    pub fn with_authenticator(mut self, authenticator: SharedAuthenticator) -> Self {
        self.authenticator = authenticator;
        self
    }

    /// Replace the credential store.
    pub fn with_credential_store(mut self, credentials: SharedCredentialStore) -> Self {
        self.credentials = credentials;
        self
    }

    /// Get the server configuration.
    pub fn config(&self) -> &ServerConfig {
        &self.config
    }
}

impl FromRef<AppState> for Key {
    fn from_ref(state: &AppState) -> Self {
        state.cookie_key.clone()
    }
}
