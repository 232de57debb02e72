//! In-memory session store.

use std::collections::HashMap;
use std::time::Duration;

use async_trait::async_trait;
use chrono::Utc;
use tokio::sync::RwLock;

use crate::error::{Error, Result};
use crate::session::{Session, SessionId};
use crate::store::{SessionStore, StoredSession};

/// Session store kept in process memory.
///
/// Sessions do not survive a restart; use [`FileSessionStore`](crate::FileSessionStore)
/// for that.
#[derive(Debug)]
pub struct MemorySessionStore {
    sessions: RwLock<HashMap<SessionId, StoredSession>>,
    ttl: chrono::Duration,
}

impl MemorySessionStore {
    pub fn new(ttl: Duration) -> Result<Self> {
        Ok(Self {
            sessions: RwLock::new(HashMap::new()),
            ttl: to_chrono(ttl)?,
        })
    }

    /// Number of records held, including expired ones not yet reaped.
    pub async fn len(&self) -> usize {
        self.sessions.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.sessions.read().await.is_empty()
    }
}

pub(crate) fn to_chrono(ttl: Duration) -> Result<chrono::Duration> {
    chrono::Duration::from_std(ttl)
        .map_err(|_| Error::Persistence(format!("session TTL out of range: {:?}", ttl)))
}

#[async_trait]
impl SessionStore for MemorySessionStore {
    async fn load(&self, id: &SessionId) -> Result<Option<Session>> {
        let now = Utc::now();
        {
            let sessions = self.sessions.read().await;
            match sessions.get(id) {
                None => return Ok(None),
                Some(stored) if !stored.is_expired(now) => {
                    return Ok(Some(stored.session.clone()));
                }
                Some(_) => {}
            }
        }

        self.sessions.write().await.remove(id);
        tracing::debug!(session_id = %id, "Dropped expired session");
        Ok(None)
    }

    async fn save(&self, session: &Session) -> Result<()> {
        let stored = StoredSession {
            session: session.clone(),
            expires_at: Utc::now() + self.ttl,
        };
        self.sessions.write().await.insert(session.id, stored);
        Ok(())
    }

    async fn touch(&self, id: &SessionId) -> Result<bool> {
        let now = Utc::now();
        let mut sessions = self.sessions.write().await;
        match sessions.get_mut(id) {
            Some(stored) if !stored.is_expired(now) => {
                stored.expires_at = now + self.ttl;
                Ok(true)
            }
            _ => Ok(false),
        }
    }

    async fn delete(&self, id: &SessionId) -> Result<()> {
        self.sessions.write().await.remove(id);
        Ok(())
    }

    async fn reap_expired(&self) -> Result<Vec<SessionId>> {
        let now = Utc::now();
        let mut sessions = self.sessions.write().await;
        let expired: Vec<SessionId> = sessions
            .iter()
            .filter(|(_, stored)| stored.is_expired(now))
            .map(|(id, _)| *id)
            .collect();
        for id in &expired {
            sessions.remove(id);
        }
        Ok(expired)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_save_and_load() {
        let store = MemorySessionStore::new(Duration::from_secs(60)).unwrap();
        let mut session = Session::new();
        store.save(&session).await.unwrap();

        let loaded = store.load(&session.id).await.unwrap().unwrap();
        assert!(!loaded.is_authenticated());

        session.authenticate("7");
        store.save(&session).await.unwrap();
        let loaded = store.load(&session.id).await.unwrap().unwrap();
        assert_eq!(loaded.user_id.as_deref(), Some("7"));
    }

    #[tokio::test]
    async fn test_unknown_session_is_none() {
        let store = MemorySessionStore::new(Duration::from_secs(60)).unwrap();
        assert!(store.load(&SessionId::new()).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_expired_session_is_dropped_on_load() {
        let store = MemorySessionStore::new(Duration::ZERO).unwrap();
        let session = Session::new();
        store.save(&session).await.unwrap();

        assert!(store.load(&session.id).await.unwrap().is_none());
        assert!(store.is_empty().await);
    }

    #[tokio::test]
    async fn test_reap_expired() {
        let store = MemorySessionStore::new(Duration::ZERO).unwrap();
        let a = Session::new();
        let b = Session::new();
        store.save(&a).await.unwrap();
        store.save(&b).await.unwrap();

        let mut reaped = store.reap_expired().await.unwrap();
        reaped.sort_by_key(|id| id.to_string());
        let mut expected = vec![a.id, b.id];
        expected.sort_by_key(|id| id.to_string());
        assert_eq!(reaped, expected);
        assert_eq!(store.len().await, 0);
    }

    #[tokio::test]
    async fn test_touch_extends_expiry() {
        let store = MemorySessionStore::new(Duration::from_millis(300)).unwrap();
        let session = Session::new();
        store.save(&session).await.unwrap();

        for _ in 0..4 {
            tokio::time::sleep(Duration::from_millis(150)).await;
            assert!(store.touch(&session.id).await.unwrap());
        }
        // 600ms after the save, kept alive by the touches
        assert!(store.load(&session.id).await.unwrap().is_some());
    }

    #[tokio::test]
    async fn test_touch_unknown_or_expired() {
        let store = MemorySessionStore::new(Duration::ZERO).unwrap();
        assert!(!store.touch(&SessionId::new()).await.unwrap());

        let session = Session::new();
        store.save(&session).await.unwrap();
        assert!(!store.touch(&session.id).await.unwrap());
    }

    #[tokio::test]
    async fn test_delete() {
        let store = MemorySessionStore::new(Duration::from_secs(60)).unwrap();
        let session = Session::new();
        store.save(&session).await.unwrap();
        store.delete(&session.id).await.unwrap();
        store.delete(&session.id).await.unwrap();
        assert!(store.load(&session.id).await.unwrap().is_none());
    }
}
