//! Session identity and state.

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::Error;

/// Opaque session identifier (a random UUID v4).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SessionId(Uuid);

impl SessionId {
    /// Generate a new random session id.
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for SessionId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for SessionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

impl FromStr for SessionId {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Uuid::parse_str(s)
            .map(Self)
            .map_err(|_| Error::InvalidId(s.to_string()))
    }
}

/// Server-side record of a browser session.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Session {
    pub id: SessionId,
    /// Identity of the logged-in user, once the local login succeeded.
    pub user_id: Option<String>,
    pub created_at: DateTime<Utc>,
}

impl Session {
    /// Issue a fresh anonymous session.
    pub fn new() -> Self {
        Self {
            id: SessionId::new(),
            user_id: None,
            created_at: Utc::now(),
        }
    }

    /// Whether a user has logged in on this session.
    pub fn is_authenticated(&self) -> bool {
        self.user_id.is_some()
    }

    /// Promote the session to authenticated for `user_id`.
    pub fn authenticate(&mut self, user_id: impl Into<String>) {
        self.user_id = Some(user_id.into());
    }
}

impl Default for Session {
    fn default() -> Self {
        Self::new()
    }
}
