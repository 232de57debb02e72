//! Client for forwarding GET requests to the upstream REST API.
//!
//! Paths are passed through verbatim (including any query string) and the
//! caller's access token is attached as a bearer credential.

use reqwest::{Client, header};

use crate::error::{OAuthError, Result};
use crate::oauth::AccessToken;

/// Path prefix of proxied API requests.
pub const API_PREFIX: &str = "/api/v4";

/// Upstream API client.
#[derive(Debug, Clone)]
pub struct ApiClient {
    client: Client,
    base_url: String,
}

impl ApiClient {
    /// Create a client for the API rooted at `base_url`.
    pub fn new(base_url: impl Into<String>) -> Self {
        Self::with_http_client(base_url, Client::new())
    }

    pub fn with_http_client(base_url: impl Into<String>, client: Client) -> Self {
        Self {
            client,
            base_url: base_url.into().trim_end_matches('/').to_string(),
        }
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Full upstream URL for a path-and-query such as `/api/v4/users/who_am_i?fields=id`.
    pub fn url_for(&self, path_and_query: &str) -> String {
        if path_and_query.starts_with('/') {
            format!("{}{}", self.base_url, path_and_query)
        } else {
            format!("{}/{}", self.base_url, path_and_query)
        }
    }

    /// GET `path_and_query` upstream with `token` and return the JSON body.
    pub async fn get(&self, path_and_query: &str, token: &AccessToken) -> Result<serde_json::Value> {
        let url = self.url_for(path_and_query);
        tracing::debug!(url = %url, "Forwarding upstream GET");

        let response = self
            .client
            .get(&url)
            .header(header::ACCEPT, "application/json")
            .bearer_auth(&token.access_token)
            .send()
            .await
            .map_err(|e| OAuthError::Network(format!("Failed to forward request: {}", e)))?;

        let status = response.status();
        let body = response
            .text()
            .await
            .map_err(|e| OAuthError::Backend(format!("Failed to read response: {}", e)))?;

        if !status.is_success() {
            return Err(OAuthError::Backend(format!(
                "Upstream API error ({}): {}",
                status, body
            )));
        }

        serde_json::from_str(&body)
            .map_err(|e| OAuthError::Backend(format!("Failed to parse response: {}", e)))
    }
}

/// The payload of an upstream response.
///
/// The API wraps results in a top-level `data` field; bodies without one are
/// returned whole.
pub fn extract_payload(body: serde_json::Value) -> serde_json::Value {
    match body {
        serde_json::Value::Object(mut map) if map.contains_key("data") => {
            map.remove("data").unwrap_or(serde_json::Value::Null)
        }
        other => other,
    }
}
