//! Common test utilities for integration tests.
//!
//! [`Provider`] stands in for the three services the proxy talks to: the
//! OAuth token endpoint, the upstream API and the user service. Tokens are
//! minted as `tok-<code>` for any code starting with `good`; the API path
//! `/api/v4/broken` always fails.

#![allow(dead_code)]

use std::collections::HashMap;
use std::net::SocketAddr;
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use anyhow::Result;
use axum::{
    Form, Json, Router,
    extract::{Path as UrlPath, Query, RawQuery},
    http::{HeaderMap, StatusCode, header::AUTHORIZATION},
    routing::{get, post},
};
use reqwest::{Client, redirect::Policy};
use serde_json::{Value, json};
use tokio::net::TcpListener;
use tokio::task::JoinHandle;
use tokio::time::timeout;

use relay_oauth::{ApiClient, OAuthClient, OAuthConfig};
use relay_server::{AppState, HttpUserDirectory, Server, ServerConfig, hash_password};
use relay_session::{FileSessionStore, MemorySessionStore, SharedSessionStore};

pub const SESSION_SECRET: &str = "integration-test-session-secret-0123";
pub const USER_EMAIL: &str = "owner@example.com";
pub const USER_PASSWORD: &str = "correct horse";

// ─────────────────────────────────────────────────────────────────────────────
// Stub provider
// ─────────────────────────────────────────────────────────────────────────────

/// Stub OAuth provider, upstream API and user service on one port.
///
/// Dropping it stops the listener.
pub struct Provider {
    pub addr: SocketAddr,
    handle: JoinHandle<()>,
}

impl Provider {
    pub async fn start() -> Result<Self> {
        let password_hash = hash_password(USER_PASSWORD)?;
        let user = json!({"id": 1, "email": USER_EMAIL, "password": password_hash});

        let by_email = {
            let user = user.clone();
            move |Query(q): Query<HashMap<String, String>>| {
                let user = user.clone();
                async move {
                    if q.get("email").map(String::as_str) == Some(USER_EMAIL) {
                        Json(json!([user]))
                    } else {
                        Json(json!([]))
                    }
                }
            }
        };
        let by_id = move |UrlPath(id): UrlPath<String>| {
            let user = user.clone();
            async move {
                if id == "1" {
                    Ok(Json(user))
                } else {
                    Err(StatusCode::NOT_FOUND)
                }
            }
        };

        let app = Router::new()
            .route("/oauth/token", post(token))
            .route("/api/v4/{*path}", get(api))
            .route("/users", get(by_email))
            .route("/users/{id}", get(by_id));

        let listener = TcpListener::bind("127.0.0.1:0").await?;
        let addr = listener.local_addr()?;
        let handle = tokio::spawn(async move {
            axum::serve(listener, app).await.ok();
        });

        Ok(Self { addr, handle })
    }

    pub fn base_url(&self) -> String {
        format!("http://{}", self.addr)
    }
}

impl Drop for Provider {
    fn drop(&mut self) {
        self.handle.abort();
    }
}

async fn token(Form(form): Form<HashMap<String, String>>) -> (StatusCode, Json<Value>) {
    let code = form.get("code").cloned().unwrap_or_default();
    let well_formed = form.get("grant_type").map(String::as_str) == Some("authorization_code")
        && form.get("client_id").map(String::as_str) == Some("client-1")
        && form.get("client_secret").map(String::as_str) == Some("client-secret");

    if well_formed && code.starts_with("good") {
        (
            StatusCode::OK,
            Json(json!({"access_token": format!("tok-{}", code), "token_type": "bearer"})),
        )
    } else {
        (
            StatusCode::BAD_REQUEST,
            Json(json!({"error": "invalid_grant", "error_description": "code rejected"})),
        )
    }
}

async fn api(
    headers: HeaderMap,
    UrlPath(path): UrlPath<String>,
    RawQuery(query): RawQuery,
) -> (StatusCode, Json<Value>) {
    let bearer = headers
        .get(AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.strip_prefix("Bearer "))
        .map(str::to_string);

    match bearer {
        Some(_) if path == "broken" => (
            StatusCode::INTERNAL_SERVER_ERROR,
            Json(json!({"error": "upstream exploded"})),
        ),
        Some(token) if token.starts_with("tok-") => (
            StatusCode::OK,
            Json(json!({"data": {"token": token, "path": path, "query": query}})),
        ),
        _ => (
            StatusCode::UNAUTHORIZED,
            Json(json!({"error": "invalid_token"})),
        ),
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Proxy under test
// ─────────────────────────────────────────────────────────────────────────────

/// A relay server running in the background against a [`Provider`].
pub struct TestServer {
    /// The server's address.
    pub addr: SocketAddr,
    /// Handle to the server task.
    handle: JoinHandle<()>,
}

impl TestServer {
    /// Start a server with in-memory sessions.
    pub async fn start(provider: &Provider) -> Result<Self> {
        let sessions = Arc::new(MemorySessionStore::new(Duration::from_secs(600))?);
        Self::start_with_sessions(provider, sessions).await
    }

    /// Start a server with file-backed sessions in `dir`.
    pub async fn start_with_session_dir(provider: &Provider, dir: &Path) -> Result<Self> {
        let sessions = Arc::new(FileSessionStore::new(dir, Duration::from_secs(600))?);
        Self::start_with_sessions(provider, sessions).await
    }

    pub async fn start_with_sessions(
        provider: &Provider,
        sessions: SharedSessionStore,
    ) -> Result<Self> {
        let addr = find_available_port().await?;

        let oauth = OAuthClient::new(OAuthConfig {
            client_id: "client-1".to_string(),
            client_secret: "client-secret".to_string(),
            token_host: provider.base_url(),
            authorize_path: "/oauth/authorize".to_string(),
            token_path: "/oauth/token".to_string(),
            redirect_uri: format!("http://{}/oauth/response", addr),
            scope: None,
        });

        let config = ServerConfig::new()
            .with_bind_address(addr)
            .with_request_logging(false);

        let state = AppState::new(
            config,
            SESSION_SECRET,
            oauth,
            ApiClient::new(provider.base_url()),
            Arc::new(HttpUserDirectory::new(provider.base_url())),
            sessions,
        );

        let server = Server::from_state(state);
        let handle = tokio::spawn(async move {
            let _ = server.run_on(addr).await;
        });

        wait_for_server(&Client::new(), addr).await?;

        Ok(Self { addr, handle })
    }

    /// Get the base URL for the server.
    pub fn base_url(&self) -> String {
        format!("http://{}", self.addr)
    }

    pub fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url(), path)
    }

    /// Stop the server task.
    pub fn stop(self) {
        self.handle.abort();
    }
}

/// A client that keeps cookies and does not follow redirects, like one
/// browser profile.
pub fn browser() -> Client {
    Client::builder()
        .cookie_store(true)
        .redirect(Policy::none())
        .build()
        .expect("failed to build client")
}

/// Find an available port for the test server.
async fn find_available_port() -> Result<SocketAddr> {
    let listener = TcpListener::bind("127.0.0.1:0").await?;
    let addr = listener.local_addr()?;
    drop(listener);
    Ok(addr)
}

/// Wait for the server to become ready.
async fn wait_for_server(client: &Client, addr: SocketAddr) -> Result<()> {
    let url = format!("http://{}/health", addr);

    let ready = timeout(Duration::from_secs(5), async {
        loop {
            match client.get(&url).send().await {
                Ok(resp) if resp.status().is_success() => return,
                _ => tokio::time::sleep(Duration::from_millis(50)).await,
            }
        }
    })
    .await;

    match ready {
        Ok(()) => Ok(()),
        Err(_) => anyhow::bail!("Timeout waiting for server to start"),
    }
}
