//! `POST /login`.

use axum::{
    Extension,
    body::Bytes,
    extract::State,
    http::{HeaderMap, StatusCode, header::CONTENT_TYPE},
    response::{IntoResponse, Response},
};
use axum_extra::extract::SignedCookieJar;
use tracing::{info, warn};

use relay_oauth::CredentialOwner;
use relay_session::Session;

use crate::auth::{AuthError, Credentials};
use crate::error::{Result, ServerError};
use crate::session::{CurrentSession, credential_owner, session_cookie};
use crate::state::AppState;

/// Check email/password and attach the user to the session.
///
/// The body may be `application/x-www-form-urlencoded` or JSON. A successful
/// login replaces the session with a new id, and a token the anonymous
/// session already obtained moves to the user.
pub async fn login_handler(
    State(state): State<AppState>,
    Extension(CurrentSession(session)): Extension<CurrentSession>,
    jar: SignedCookieJar,
    headers: HeaderMap,
    body: Bytes,
) -> Result<Response> {
    let credentials = parse_credentials(&headers, &body)?;

    let user = match state.authenticator.verify(&credentials).await {
        Ok(user) => user,
        Err(AuthError::InvalidCredentials) => {
            warn!(session_id = %session.id, "Login rejected");
            return Ok((StatusCode::UNAUTHORIZED, "Invalid credentials.\n").into_response());
        }
        Err(e) => return Err(e.into()),
    };

    let mut rotated = Session::new();
    rotated.authenticate(user.id.clone());
    state.sessions.save(&rotated).await?;
    state.sessions.delete(&session.id).await?;

    let previous_owner = credential_owner(&session);
    if matches!(previous_owner, CredentialOwner::Session(_)) {
        state
            .credentials
            .transfer(&previous_owner, CredentialOwner::User(user.id.clone()))
            .await?;
    }

    info!(
        previous_session_id = %session.id,
        session_id = %rotated.id,
        user_id = %user.id,
        "User logged in"
    );
    let jar = jar.add(session_cookie(state.config(), &rotated.id));
    Ok((jar, "You were authenticated & logged in!\n").into_response())
}

fn parse_credentials(headers: &HeaderMap, body: &[u8]) -> Result<Credentials> {
    let is_json = headers
        .get(CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .is_some_and(|ct| ct.starts_with("application/json"));

    let credentials: Credentials = if is_json {
        serde_json::from_slice(body)
            .map_err(|e| ServerError::BadRequest(format!("Invalid login body: {}", e)))?
    } else {
        serde_urlencoded::from_bytes(body)
            .map_err(|e| ServerError::BadRequest(format!("Invalid login form: {}", e)))?
    };

    if credentials.email.is_empty() || credentials.password.is_empty() {
        return Err(ServerError::BadRequest("Missing credentials".to_string()));
    }
    Ok(credentials)
}
