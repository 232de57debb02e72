//! File-backed session store.
//!
//! Each session lives in `<dir>/<session-id>.json`, so sessions survive a
//! process restart. Writes go through a uniquely named `.tmp` file and a
//! rename, and are serialized within the process so a `touch` never
//! overwrites a concurrent `save`.

use std::path::{Path, PathBuf};
use std::time::Duration;

use async_trait::async_trait;
use chrono::Utc;
use tokio::sync::Mutex;
use uuid::Uuid;

use crate::error::Result;
use crate::memory::to_chrono;
use crate::session::{Session, SessionId};
use crate::store::{SessionStore, StoredSession};

const SESSION_EXT: &str = "json";
const TMP_EXT: &str = "tmp";

/// File-based session store for production use.
#[derive(Debug)]
pub struct FileSessionStore {
    dir: PathBuf,
    ttl: chrono::Duration,
    write_lock: Mutex<()>,
}

impl FileSessionStore {
    /// Create a store rooted at `dir`. The directory is created on first save.
    pub fn new(dir: impl Into<PathBuf>, ttl: Duration) -> Result<Self> {
        Ok(Self {
            dir: dir.into(),
            ttl: to_chrono(ttl)?,
            write_lock: Mutex::new(()),
        })
    }

    /// Directory holding the session files.
    pub fn dir(&self) -> &Path {
        &self.dir
    }

    fn session_path(&self, id: &SessionId) -> PathBuf {
        self.dir.join(format!("{}.{}", id, SESSION_EXT))
    }

    async fn read_record(path: &Path) -> Result<Option<StoredSession>> {
        match tokio::fs::read_to_string(path).await {
            Ok(content) => Ok(Some(serde_json::from_str(&content)?)),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    /// Write `stored` atomically. Callers hold `write_lock`.
    async fn write_record(&self, stored: &StoredSession) -> Result<PathBuf> {
        tokio::fs::create_dir_all(&self.dir).await?;
        let json = serde_json::to_string_pretty(stored)?;

        let path = self.session_path(&stored.session.id);
        let tmp = self
            .dir
            .join(format!("{}.{}.{}", stored.session.id, Uuid::new_v4(), TMP_EXT));
        tokio::fs::write(&tmp, json).await?;
        if let Err(e) = tokio::fs::rename(&tmp, &path).await {
            Self::remove_file(&tmp).await.ok();
            return Err(e.into());
        }
        Ok(path)
    }

    async fn remove_file(path: &Path) -> Result<()> {
        match tokio::fs::remove_file(path).await {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e.into()),
        }
    }
}

/// Session id encoded in a `<id>.json` file name.
fn id_from_path(path: &Path) -> Option<SessionId> {
    path.file_stem()?.to_str()?.parse().ok()
}

#[async_trait]
impl SessionStore for FileSessionStore {
    async fn load(&self, id: &SessionId) -> Result<Option<Session>> {
        let path = self.session_path(id);
        let Some(stored) = Self::read_record(&path).await? else {
            return Ok(None);
        };

        if stored.is_expired(Utc::now()) {
            Self::remove_file(&path).await?;
            tracing::debug!(session_id = %id, "Removed expired session file");
            return Ok(None);
        }

        Ok(Some(stored.session))
    }

    async fn save(&self, session: &Session) -> Result<()> {
        let stored = StoredSession {
            session: session.clone(),
            expires_at: Utc::now() + self.ttl,
        };

        let _guard = self.write_lock.lock().await;
        let path = self.write_record(&stored).await?;

        tracing::trace!(session_id = %session.id, path = %path.display(), "Session saved");
        Ok(())
    }

    async fn touch(&self, id: &SessionId) -> Result<bool> {
        let _guard = self.write_lock.lock().await;

        let now = Utc::now();
        let Some(mut stored) = Self::read_record(&self.session_path(id)).await? else {
            return Ok(false);
        };
        if stored.is_expired(now) {
            return Ok(false);
        }

        stored.expires_at = now + self.ttl;
        self.write_record(&stored).await?;
        Ok(true)
    }

    async fn delete(&self, id: &SessionId) -> Result<()> {
        let _guard = self.write_lock.lock().await;
        Self::remove_file(&self.session_path(id)).await
    }

    async fn reap_expired(&self) -> Result<Vec<SessionId>> {
        let _guard = self.write_lock.lock().await;

        let mut entries = match tokio::fs::read_dir(&self.dir).await {
            Ok(entries) => entries,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => return Err(e.into()),
        };

        let now = Utc::now();
        let mut reaped = Vec::new();
        while let Some(entry) = entries.next_entry().await? {
            let path = entry.path();
            match path.extension().and_then(|e| e.to_str()) {
                Some(SESSION_EXT) => {}
                // No write is in flight while the lock is held
                Some(TMP_EXT) => {
                    tracing::debug!(path = %path.display(), "Removing leftover temp file");
                    Self::remove_file(&path).await?;
                    continue;
                }
                _ => continue,
            }

            let expired = match Self::read_record(&path).await {
                Ok(Some(stored)) => stored.is_expired(now),
                Ok(None) => false,
                Err(e) => {
                    tracing::warn!(path = %path.display(), error = %e, "Removing unreadable session file");
                    true
                }
            };
            if expired {
                Self::remove_file(&path).await?;
                if let Some(id) = id_from_path(&path) {
                    reaped.push(id);
                }
            }
        }

        if !reaped.is_empty() {
            tracing::info!(reaped = reaped.len(), dir = %self.dir.display(), "Reaped expired sessions");
        }
        Ok(reaped)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[tokio::test]
    async fn test_save_and_load() {
        let temp = tempdir().unwrap();
        let store = FileSessionStore::new(temp.path().join("sessions"), Duration::from_secs(60))
            .unwrap();

        let session = Session::new();
        store.save(&session).await.unwrap();
        assert!(store.session_path(&session.id).exists());

        let loaded = store.load(&session.id).await.unwrap().unwrap();
        assert_eq!(loaded, session);
    }

    #[tokio::test]
    async fn test_session_survives_new_store_instance() {
        let temp = tempdir().unwrap();
        let mut session = Session::new();
        session.authenticate("user-1");

        {
            let store = FileSessionStore::new(temp.path(), Duration::from_secs(60)).unwrap();
            store.save(&session).await.unwrap();
        }

        let reopened = FileSessionStore::new(temp.path(), Duration::from_secs(60)).unwrap();
        let loaded = reopened.load(&session.id).await.unwrap().unwrap();
        assert_eq!(loaded.user_id.as_deref(), Some("user-1"));
    }

    #[tokio::test]
    async fn test_load_missing() {
        let temp = tempdir().unwrap();
        let store = FileSessionStore::new(temp.path(), Duration::from_secs(60)).unwrap();
        assert!(store.load(&SessionId::new()).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_expired_file_removed_on_load() {
        let temp = tempdir().unwrap();
        let store = FileSessionStore::new(temp.path(), Duration::ZERO).unwrap();
        let session = Session::new();
        store.save(&session).await.unwrap();

        assert!(store.load(&session.id).await.unwrap().is_none());
        assert!(!store.session_path(&session.id).exists());
    }

    #[tokio::test]
    async fn test_delete() {
        let temp = tempdir().unwrap();
        let store = FileSessionStore::new(temp.path(), Duration::from_secs(60)).unwrap();
        let session = Session::new();
        store.save(&session).await.unwrap();

        store.delete(&session.id).await.unwrap();
        assert!(!store.session_path(&session.id).exists());
        // Second delete is a no-op
        store.delete(&session.id).await.unwrap();
    }

    #[tokio::test]
    async fn test_reap_expired_skips_live_and_foreign_files() {
        let temp = tempdir().unwrap();
        let expired = FileSessionStore::new(temp.path(), Duration::ZERO).unwrap();
        let live = FileSessionStore::new(temp.path(), Duration::from_secs(60)).unwrap();

        expired.save(&Session::new()).await.unwrap();
        expired.save(&Session::new()).await.unwrap();
        let keeper = Session::new();
        live.save(&keeper).await.unwrap();
        std::fs::write(temp.path().join("notes.txt"), "unrelated").unwrap();

        assert_eq!(live.reap_expired().await.unwrap().len(), 2);
        assert!(live.load(&keeper.id).await.unwrap().is_some());
        assert!(temp.path().join("notes.txt").exists());
    }

    #[tokio::test]
    async fn test_reap_reports_ids_and_clears_temp_files() {
        let temp = tempdir().unwrap();
        let store = FileSessionStore::new(temp.path(), Duration::ZERO).unwrap();
        let session = Session::new();
        store.save(&session).await.unwrap();
        let leftover = temp.path().join(format!("{}.crashed.tmp", session.id));
        std::fs::write(&leftover, "{").unwrap();

        assert_eq!(store.reap_expired().await.unwrap(), vec![session.id]);
        assert!(!leftover.exists());
    }

    #[tokio::test]
    async fn test_concurrent_saves_of_one_session() {
        let temp = tempdir().unwrap();
        let store = std::sync::Arc::new(
            FileSessionStore::new(temp.path(), Duration::from_secs(60)).unwrap(),
        );
        let session = Session::new();

        for _ in 0..20 {
            let mut tasks = Vec::new();
            for _ in 0..8 {
                let save_store = store.clone();
                let save_session = session.clone();
                tasks.push(tokio::spawn(async move { save_store.save(&save_session).await }));
                let store = store.clone();
                let id = session.id;
                tasks.push(tokio::spawn(async move { store.touch(&id).await.map(|_| ()) }));
            }
            for task in tasks {
                task.await.unwrap().unwrap();
            }
        }

        assert!(store.load(&session.id).await.unwrap().is_some());
        let leftovers = std::fs::read_dir(temp.path())
            .unwrap()
            .filter_map(|e| e.ok())
            .filter(|e| e.path().extension().and_then(|x| x.to_str()) == Some(TMP_EXT))
            .count();
        assert_eq!(leftovers, 0);
    }

    #[tokio::test]
    async fn test_touch_extends_expiry() {
        let temp = tempdir().unwrap();
        let store = FileSessionStore::new(temp.path(), Duration::from_millis(400)).unwrap();
        let mut session = Session::new();
        session.authenticate("7");
        store.save(&session).await.unwrap();

        for _ in 0..4 {
            tokio::time::sleep(Duration::from_millis(200)).await;
            assert!(store.touch(&session.id).await.unwrap());
        }
        let loaded = store.load(&session.id).await.unwrap().unwrap();
        assert_eq!(loaded.user_id.as_deref(), Some("7"));
    }

    #[tokio::test]
    async fn test_touch_missing_session() {
        let temp = tempdir().unwrap();
        let store = FileSessionStore::new(temp.path(), Duration::from_secs(60)).unwrap();
        assert!(!store.touch(&SessionId::new()).await.unwrap());
        assert!(!store.session_path(&SessionId::new()).exists());
    }

    #[tokio::test]
    async fn test_reap_missing_dir() {
        let temp = tempdir().unwrap();
        let store =
            FileSessionStore::new(temp.path().join("never-created"), Duration::from_secs(60))
                .unwrap();
        assert!(store.reap_expired().await.unwrap().is_empty());
    }
}
