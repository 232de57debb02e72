//! `GET /api/v4/*`: forward to the upstream API with the caller's token.

use axum::{
    Extension,
    extract::State,
    http::Uri,
    response::Html,
};
use chrono::Utc;

use relay_oauth::extract_payload;

use crate::error::{Result, ServerError};
use crate::session::CurrentSession;
use crate::state::AppState;

/// Forward the request path and query verbatim and render the response
/// payload as pretty-printed JSON.
pub async fn api_proxy_handler(
    State(state): State<AppState>,
    Extension(current): Extension<CurrentSession>,
    uri: Uri,
) -> Result<Html<String>> {
    let owner = current.owner();
    let token = state.credentials.get(&owner).await?.ok_or_else(|| {
        ServerError::Unauthorized(
            "No access token for this session; authorize at /oauth first".to_string(),
        )
    })?;

    if token.is_expired(Utc::now()) {
        return Err(ServerError::Unauthorized(
            "Access token expired; authorize again at /oauth".to_string(),
        ));
    }

    let target = uri
        .path_and_query()
        .map(|pq| pq.as_str())
        .unwrap_or_else(|| uri.path());
    let body = state.api.get(target, &token).await?;

    let pretty = serde_json::to_string_pretty(&extract_payload(body))
        .map_err(|e| ServerError::Internal(format!("Failed to render response: {}", e)))?;
    Ok(Html(format!("<pre>{}</pre>", escape_html(&pretty))))
}

fn escape_html(text: &str) -> String {
    let mut escaped = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '&' => escaped.push_str("&amp;"),
            '<' => escaped.push_str("&lt;"),
            '>' => escaped.push_str("&gt;"),
            _ => escaped.push(c),
        }
    }
    escaped
}
