//! Authorization-code flow endpoints.

use axum::{
    Extension,
    extract::{Query, State},
    response::Response,
};
use serde::Deserialize;
use tracing::{error, info, warn};

use super::found;
use crate::error::{Result, ServerError};
use crate::session::CurrentSession;
use crate::state::AppState;

/// Where the browser lands once a token is installed.
pub const DONE_PATH: &str = "/done";

/// Query parameters the provider sends to the redirect URI.
#[derive(Debug, Deserialize)]
pub struct CallbackParams {
    pub code: Option<String>,
    pub error: Option<String>,
    pub error_description: Option<String>,
}

/// `GET /oauth`: send the browser to the provider's consent page.
pub async fn oauth_start_handler(State(state): State<AppState>) -> Response {
    found(&state.oauth.authorization_url())
}

/// `GET /oauth/response`: exchange the code and install the token for the
/// current credential owner.
pub async fn oauth_response_handler(
    State(state): State<AppState>,
    Extension(current): Extension<CurrentSession>,
    Query(params): Query<CallbackParams>,
) -> Result<Response> {
    if let Some(denied) = params.error {
        let detail = match params.error_description {
            Some(description) => format!("{}: {}", denied, description),
            None => denied,
        };
        warn!(error = %detail, "Authorization denied by provider");
        return Err(ServerError::BadRequest(format!(
            "Authorization failed: {}",
            detail
        )));
    }

    let code = params
        .code
        .filter(|code| !code.is_empty())
        .ok_or_else(|| ServerError::BadRequest("Missing authorization code".to_string()))?;

    let token = state.oauth.exchange_code(&code).await.map_err(|e| {
        error!(error = %e, "Access token error");
        e
    })?;

    let owner = current.owner();
    state.credentials.put(owner.clone(), token).await?;
    info!(owner = %owner, "Access token installed");

    Ok(found(DONE_PATH))
}
