//! Error types for the server.

use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde::Serialize;
use thiserror::Error;

use relay_oauth::OAuthError;

use crate::auth::AuthError;
use crate::users::DirectoryError;

/// Server error type.
#[derive(Debug, Error)]
pub enum ServerError {
    /// No usable credential for the request.
    #[error("Unauthorized: {0}")]
    Unauthorized(String),

    /// Bad request.
    #[error("Bad request: {0}")]
    BadRequest(String),

    /// The authorization server, upstream API or user service failed.
    #[error("Bad gateway: {0}")]
    BadGateway(String),

    /// Session storage error.
    #[error("Session error: {0}")]
    Session(#[from] relay_session::Error),

    /// Internal server error.
    #[error("Internal error: {0}")]
    Internal(String),
}

impl From<OAuthError> for ServerError {
    fn from(e: OAuthError) -> Self {
        match e {
            OAuthError::Network(msg) | OAuthError::Backend(msg) => ServerError::BadGateway(msg),
            OAuthError::InvalidRequest(msg) => ServerError::BadRequest(msg),
            OAuthError::Store(msg) => ServerError::Internal(format!("Credential store: {}", msg)),
        }
    }
}

impl From<DirectoryError> for ServerError {
    fn from(e: DirectoryError) -> Self {
        ServerError::BadGateway(e.to_string())
    }
}

impl From<AuthError> for ServerError {
    fn from(e: AuthError) -> Self {
        match e {
            AuthError::InvalidCredentials => {
                ServerError::Unauthorized("Invalid credentials.".to_string())
            }
            AuthError::Directory(e) => e.into(),
        }
    }
}

/// Result type for server operations.
pub type Result<T> = std::result::Result<T, ServerError>;

/// Error response body.
#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    /// Error code for programmatic handling.
    pub code: String,
    /// Human-readable error message.
    pub message: String,
}

impl IntoResponse for ServerError {
    fn into_response(self) -> Response {
        let (status, code) = match &self {
            ServerError::Unauthorized(_) => (StatusCode::UNAUTHORIZED, "unauthorized"),
            ServerError::BadRequest(_) => (StatusCode::BAD_REQUEST, "bad_request"),
            ServerError::BadGateway(_) => (StatusCode::BAD_GATEWAY, "bad_gateway"),
            ServerError::Session(_) => (StatusCode::INTERNAL_SERVER_ERROR, "session_error"),
            ServerError::Internal(_) => (StatusCode::INTERNAL_SERVER_ERROR, "internal_error"),
        };

        let message = self.to_string();

        if status.is_server_error() {
            tracing::error!(status = %status, code, error = %message, "Server error");
        } else {
            tracing::warn!(status = %status, code, error = %message, "Client error");
        }

        let body = ErrorResponse {
            code: code.to_string(),
            message,
        };

        (status, Json(body)).into_response()
    }
}
