//! Access tokens held per credential owner.
//!
//! Each browser gets its own token: a session that has not logged in owns
//! its token by session id, and a logged-in user owns it by user id. A
//! token installed by one browser is never attached to another browser's
//! upstream requests.

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::RwLock;

use crate::error::Result;
use crate::oauth::AccessToken;

// ============================================================================
// CredentialOwner
// ============================================================================

/// Identity an access token is stored under.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum CredentialOwner {
    /// A logged-in user, by user id.
    User(String),
    /// An anonymous browser session, by session id.
    Session(String),
}

impl fmt::Display for CredentialOwner {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CredentialOwner::User(id) => write!(f, "user:{}", id),
            CredentialOwner::Session(id) => write!(f, "session:{}", id),
        }
    }
}

// ============================================================================
// CredentialStore Trait
// ============================================================================

/// Trait for storing access tokens by owner.
#[async_trait]
pub trait CredentialStore: Send + Sync + fmt::Debug {
    /// Get the token held by `owner`.
    async fn get(&self, owner: &CredentialOwner) -> Result<Option<AccessToken>>;

    /// Install a token for `owner`, replacing any previous one.
    async fn put(&self, owner: CredentialOwner, token: AccessToken) -> Result<()>;

    /// Remove and return the token held by `owner`.
    async fn remove(&self, owner: &CredentialOwner) -> Result<Option<AccessToken>>;

    /// Move the token held by `from` to `to`.
    ///
    /// Returns `false` (and leaves `to` untouched) when `from` holds nothing.
    async fn transfer(&self, from: &CredentialOwner, to: CredentialOwner) -> Result<bool> {
        match self.remove(from).await? {
            Some(token) => {
                self.put(to, token).await?;
                Ok(true)
            }
            None => Ok(false),
        }
    }
}

/// Shared credential store for use across async contexts.
pub type SharedCredentialStore = Arc<dyn CredentialStore>;

// ============================================================================
// MemoryCredentialStore
// ============================================================================

/// Credential store kept in process memory.
///
/// Tokens do not survive a restart; the OAuth flow must be re-run.
#[derive(Debug, Default)]
pub struct MemoryCredentialStore {
    tokens: RwLock<HashMap<CredentialOwner, AccessToken>>,
}

impl MemoryCredentialStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of owners currently holding a token.
    pub async fn len(&self) -> usize {
        self.tokens.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.tokens.read().await.is_empty()
    }
}

#[async_trait]
impl CredentialStore for MemoryCredentialStore {
    async fn get(&self, owner: &CredentialOwner) -> Result<Option<AccessToken>> {
        Ok(self.tokens.read().await.get(owner).cloned())
    }

    async fn put(&self, owner: CredentialOwner, token: AccessToken) -> Result<()> {
        tracing::debug!(owner = %owner, "Installing access token");
        self.tokens.write().await.insert(owner, token);
        Ok(())
    }

    async fn remove(&self, owner: &CredentialOwner) -> Result<Option<AccessToken>> {
        Ok(self.tokens.write().await.remove(owner))
    }

    async fn transfer(&self, from: &CredentialOwner, to: CredentialOwner) -> Result<bool> {
        let mut tokens = self.tokens.write().await;
        match tokens.remove(from) {
            Some(token) => {
                tracing::debug!(from = %from, to = %to, "Transferring access token");
                tokens.insert(to, token);
                Ok(true)
            }
            None => Ok(false),
        }
    }
}
