//! User lookup against the external user service.
//!
//! Users are owned by that service; this crate only reads them, by email
//! during login and by id when an authenticated session is checked.

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use serde::{Deserialize, Deserializer, Serialize};
use tokio::sync::RwLock;

/// A user record as served by the user service.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct User {
    #[serde(deserialize_with = "string_or_number")]
    pub id: String,
    pub email: String,
    /// Argon2 PHC string.
    #[serde(rename = "password", alias = "password_hash")]
    pub password_hash: String,
}

impl std::fmt::Debug for User {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("User")
            .field("id", &self.id)
            .field("email", &self.email)
            .finish_non_exhaustive()
    }
}

// The user service may key users by integer or string.
fn string_or_number<'de, D: Deserializer<'de>>(deserializer: D) -> Result<String, D::Error> {
    match serde_json::Value::deserialize(deserializer)? {
        serde_json::Value::String(s) => Ok(s),
        serde_json::Value::Number(n) => Ok(n.to_string()),
        other => Err(serde::de::Error::custom(format!(
            "expected string or number id, got {}",
            other
        ))),
    }
}

/// Errors reaching the user service.
#[derive(Debug, Clone, thiserror::Error)]
pub enum DirectoryError {
    #[error("User service request failed: {0}")]
    Network(String),

    #[error("User service error: {0}")]
    Backend(String),
}

/// Read-only access to user records.
#[async_trait]
pub trait UserDirectory: Send + Sync + std::fmt::Debug {
    async fn find_by_email(&self, email: &str) -> Result<Option<User>, DirectoryError>;

    async fn find_by_id(&self, id: &str) -> Result<Option<User>, DirectoryError>;
}

/// Shared user directory for use across async contexts.
pub type SharedUserDirectory = Arc<dyn UserDirectory>;

// ─────────────────────────────────────────────────────────────────────────────
// HTTP directory
// ─────────────────────────────────────────────────────────────────────────────

/// User directory backed by the user service's REST API.
///
/// - `GET {base}/users?email=<email>` returns an array; the first match wins.
/// - `GET {base}/users/{id}` returns one user, or 404.
#[derive(Debug, Clone)]
pub struct HttpUserDirectory {
    client: Client,
    base_url: String,
}

impl HttpUserDirectory {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            client: Client::new(),
            base_url: base_url.into().trim_end_matches('/').to_string(),
        }
    }

    async fn fetch<T: serde::de::DeserializeOwned>(
        &self,
        request: reqwest::RequestBuilder,
    ) -> Result<Option<T>, DirectoryError> {
        let response = request
            .send()
            .await
            .map_err(|e| DirectoryError::Network(e.to_string()))?;

        let status = response.status();
        if status == StatusCode::NOT_FOUND {
            return Ok(None);
        }
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(DirectoryError::Backend(format!("{}: {}", status, body)));
        }

        response
            .json()
            .await
            .map(Some)
            .map_err(|e| DirectoryError::Backend(format!("Failed to parse user record: {}", e)))
    }
}

#[async_trait]
impl UserDirectory for HttpUserDirectory {
    async fn find_by_email(&self, email: &str) -> Result<Option<User>, DirectoryError> {
        let request = self
            .client
            .get(format!("{}/users", self.base_url))
            .query(&[("email", email)]);
        let users: Option<Vec<User>> = self.fetch(request).await?;
        Ok(users.and_then(|users| users.into_iter().next()))
    }

    async fn find_by_id(&self, id: &str) -> Result<Option<User>, DirectoryError> {
        let request = self.client.get(format!(
            "{}/users/{}",
            self.base_url,
            urlencoding::encode(id)
        ));
        self.fetch(request).await
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// In-memory directory
// ─────────────────────────────────────────────────────────────────────────────

/// In-memory user directory for tests and local runs.
#[derive(Debug, Default)]
pub struct InMemoryUserDirectory {
    users: RwLock<HashMap<String, User>>,
}

impl InMemoryUserDirectory {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_users(users: impl IntoIterator<Item = User>) -> Self {
        let users = users.into_iter().map(|u| (u.id.clone(), u)).collect();
        Self {
            users: RwLock::new(users),
        }
    }

    pub async fn insert(&self, user: User) {
        self.users.write().await.insert(user.id.clone(), user);
    }

    pub async fn remove(&self, id: &str) -> Option<User> {
        self.users.write().await.remove(id)
    }
}

#[async_trait]
impl UserDirectory for InMemoryUserDirectory {
    async fn find_by_email(&self, email: &str) -> Result<Option<User>, DirectoryError> {
        let users = self.users.read().await;
        Ok(users.values().find(|u| u.email == email).cloned())
    }

    async fn find_by_id(&self, id: &str) -> Result<Option<User>, DirectoryError> {
        Ok(self.users.read().await.get(id).cloned())
    }
}
