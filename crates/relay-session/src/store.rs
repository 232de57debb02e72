//! Persistence interface for sessions.
//!
//! This trait decouples the HTTP layer from a specific storage backend.
//! Stores own the session TTL: `save` and `touch` stamp a new expiry and
//! `load` treats expired records as absent. The TTL is an idle timeout.

use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::Result;
use crate::session::{Session, SessionId};

/// A session as written to storage, with its expiry.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StoredSession {
    pub session: Session,
    pub expires_at: DateTime<Utc>,
}

impl StoredSession {
    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        now >= self.expires_at
    }
}

/// Trait for session persistence backends.
#[async_trait]
pub trait SessionStore: Send + Sync + std::fmt::Debug {
    /// Load a live session. Returns `Ok(None)` if it is unknown or expired.
    async fn load(&self, id: &SessionId) -> Result<Option<Session>>;

    /// Insert or replace a session, restarting its TTL.
    async fn save(&self, session: &Session) -> Result<()>;

    /// Restart the TTL of a live session without changing its contents.
    ///
    /// Returns `false` when the session is unknown or already expired.
    async fn touch(&self, id: &SessionId) -> Result<bool>;

    /// Delete a session. Deleting an unknown session is not an error.
    async fn delete(&self, id: &SessionId) -> Result<()>;

    /// Delete every expired session, returning the ids removed.
    async fn reap_expired(&self) -> Result<Vec<SessionId>>;
}

/// Shared session store for use across async contexts.
pub type SharedSessionStore = Arc<dyn SessionStore>;
