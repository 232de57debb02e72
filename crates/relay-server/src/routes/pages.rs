//! Fixed-text pages and the catch-all.

use axum::{
    Extension,
    extract::State,
    http::{Method, StatusCode, Uri},
    response::{Html, IntoResponse, Response},
};
use tracing::debug;

use super::found;
use crate::error::Result;
use crate::session::CurrentSession;
use crate::state::AppState;

/// `GET /done`, the landing page after a successful OAuth callback.
pub async fn done_handler() -> Html<&'static str> {
    Html("<pre>Setup done</pre>")
}

/// `GET /login`.
pub async fn login_page_handler() -> &'static str {
    "You got the login page!\n"
}

/// `GET /authrequired`.
///
/// Served only when the session names a user the user service still knows;
/// everyone else is sent to `/`.
pub async fn authrequired_handler(
    State(state): State<AppState>,
    Extension(current): Extension<CurrentSession>,
) -> Result<Response> {
    let user = match &current.0.user_id {
        Some(user_id) => state.users.find_by_id(user_id).await?,
        None => None,
    };

    match user {
        Some(user) => {
            debug!(user_id = %user.id, "Authenticated page served");
            Ok("you hit the authentication endpoint\n".into_response())
        }
        None => Ok(found("/")),
    }
}

/// Fallback for every unmatched request.
///
/// GETs (and HEADs) answer 200 naming the request; other methods get a
/// plain 404.
pub async fn unsupported_handler(method: Method, uri: Uri) -> Response {
    if method != Method::GET && method != Method::HEAD {
        return StatusCode::NOT_FOUND.into_response();
    }

    let target = uri
        .path_and_query()
        .map(|pq| pq.as_str())
        .unwrap_or_else(|| uri.path());
    format!("Unsupported request: {}", target).into_response()
}
