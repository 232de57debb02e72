//! Browser sessions for the relay proxy.
//!
//! A session is issued lazily the first time a browser without one makes a
//! request, persisted by a [`SessionStore`], and promoted to authenticated
//! when the local login succeeds:
//!
//! ```text
//! Anonymous ──issue──▶ SessionIssued ──login──▶ Authenticated
//! ```
//!
//! Sessions end only through TTL expiry. Stores own the TTL: every `save`
//! or `touch` stamps a fresh expiry, and `load` treats expired records as
//! absent, so a session stays alive as long as it keeps being used.
//!
//! # Example
//!
//! ```rust,ignore
//! use relay_session::{FileSessionStore, Session, SessionStore};
//!
//! let store = FileSessionStore::new("sessions", Duration::from_secs(3600))?;
//! let session = Session::new();
//! store.save(&session).await?;
//! ```

mod error;
mod file;
mod memory;
mod session;
mod store;

pub use error::{Error, Result};
pub use file::FileSessionStore;
pub use memory::MemorySessionStore;
pub use session::{Session, SessionId};
pub use store::{SessionStore, SharedSessionStore, StoredSession};
