//! HTTP routes.

pub mod health;
pub mod login;
pub mod oauth;
pub mod pages;
pub mod proxy;

pub use health::{HealthResponse, health_routes};
pub use login::login_handler;
pub use oauth::{CallbackParams, DONE_PATH, oauth_response_handler, oauth_start_handler};
pub use pages::{authrequired_handler, done_handler, login_page_handler, unsupported_handler};
pub use proxy::api_proxy_handler;

use axum::{
    http::{StatusCode, header::LOCATION},
    response::{IntoResponse, Response},
};

/// `302 Found` to `location`.
pub(crate) fn found(location: &str) -> Response {
    (StatusCode::FOUND, [(LOCATION, location.to_string())]).into_response()
}
