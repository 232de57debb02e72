//! Session cookie middleware.
//!
//! Every request is bound to a [`Session`]. The session id travels in a
//! signed cookie; a missing, tampered, unknown or expired id gets a fresh
//! session which is persisted before the handler runs. A known session has
//! its TTL restarted on every request.

use std::time::Duration;

use axum::{
    body::Body,
    extract::State,
    http::{Request, header::SET_COOKIE},
    middleware::Next,
    response::{IntoResponse, Response},
};
use axum_extra::extract::{
    SignedCookieJar,
    cookie::{Cookie, Key, SameSite},
};
use sha2::{Digest, Sha512};
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use relay_oauth::{CredentialOwner, SharedCredentialStore};
use relay_session::{Session, SessionId, SharedSessionStore};

use crate::config::ServerConfig;
use crate::error::Result;
use crate::state::AppState;

/// The session bound to the current request, inserted by [`session_middleware`].
#[derive(Debug, Clone)]
pub struct CurrentSession(pub Session);

impl CurrentSession {
    /// Who owns access tokens obtained on this request.
    pub fn owner(&self) -> CredentialOwner {
        credential_owner(&self.0)
    }
}

/// Logged-in sessions own tokens by user id, anonymous ones by session id.
pub fn credential_owner(session: &Session) -> CredentialOwner {
    match &session.user_id {
        Some(user_id) => CredentialOwner::User(user_id.clone()),
        None => CredentialOwner::Session(session.id.to_string()),
    }
}

/// Derive the 64-byte cookie signing key from the configured secret.
pub fn derive_cookie_key(secret: &str) -> Key {
    let digest = Sha512::digest(secret.as_bytes());
    Key::from(digest.as_slice())
}

/// The cookie carrying `id`.
pub(crate) fn session_cookie(config: &ServerConfig, id: &SessionId) -> Cookie<'static> {
    Cookie::build((config.cookie_name.clone(), id.to_string()))
        .path("/")
        .http_only(true)
        .secure(config.secure_cookies)
        .same_site(SameSite::Lax)
        .build()
}

/// Bind the request to a session, issuing a new one when needed.
pub async fn session_middleware(
    State(state): State<AppState>,
    jar: SignedCookieJar,
    mut request: Request<Body>,
    next: Next,
) -> Result<Response> {
    let existing = match jar.get(&state.config().cookie_name) {
        Some(cookie) => load_session(&state, cookie.value()).await,
        None => None,
    };

    let issued = match existing {
        Some(session) => {
            request.extensions_mut().insert(CurrentSession(session));
            None
        }
        None => {
            let session = Session::new();
            state.sessions.save(&session).await?;
            info!(session_id = %session.id, "Issued new session");
            request.extensions_mut().insert(CurrentSession(session.clone()));
            Some(session.id)
        }
    };

    let response = next.run(request).await;

    // A handler that rotated the session already set the cookie
    match issued {
        Some(id) if !sets_cookie(&response, &state.config().cookie_name) => {
            let jar = jar.add(session_cookie(state.config(), &id));
            Ok((jar, response).into_response())
        }
        _ => Ok(response),
    }
}

fn sets_cookie(response: &Response, name: &str) -> bool {
    response
        .headers()
        .get_all(SET_COOKIE)
        .iter()
        .filter_map(|v| v.to_str().ok())
        .any(|v| v.strip_prefix(name).is_some_and(|rest| rest.starts_with('=')))
}

async fn load_session(state: &AppState, raw_id: &str) -> Option<Session> {
    let id: SessionId = match raw_id.parse() {
        Ok(id) => id,
        Err(_) => {
            debug!("Session cookie does not hold a session id");
            return None;
        }
    };

    let loaded = match state.sessions.load(&id).await {
        Ok(loaded) => loaded,
        Err(e) => {
            warn!(session_id = %id, error = %e, "Failed to load session; issuing a new one");
            return None;
        }
    };

    let Some(session) = loaded else {
        debug!(session_id = %id, "Session unknown or expired");
        forget_session_token(&state.credentials, &id).await;
        return None;
    };

    match state.sessions.touch(&id).await {
        Ok(true) => {}
        Ok(false) => debug!(session_id = %id, "Session vanished before touch"),
        Err(e) => warn!(session_id = %id, error = %e, "Failed to extend session"),
    }
    Some(session)
}

/// Drop the token an ended anonymous session was holding.
pub(crate) async fn forget_session_token(credentials: &SharedCredentialStore, id: &SessionId) {
    match credentials
        .remove(&CredentialOwner::Session(id.to_string()))
        .await
    {
        Ok(Some(_)) => debug!(session_id = %id, "Dropped access token of ended session"),
        Ok(None) => {}
        Err(e) => warn!(session_id = %id, error = %e, "Failed to drop access token"),
    }
}

/// Periodically remove expired sessions from `store` and the access tokens
/// they held in `credentials`.
pub fn spawn_session_reaper(
    store: SharedSessionStore,
    credentials: SharedCredentialStore,
    every: Duration,
) -> JoinHandle<()> {
    let every = every.max(Duration::from_secs(1));
    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(every);
        // First tick completes immediately.
        ticker.tick().await;
        loop {
            ticker.tick().await;
            match store.reap_expired().await {
                Ok(reaped) => {
                    for id in &reaped {
                        forget_session_token(&credentials, id).await;
                    }
                    debug!(reaped = reaped.len(), "Session reap finished");
                }
                Err(e) => warn!(error = %e, "Session reap failed"),
            }
        }
    })
}
