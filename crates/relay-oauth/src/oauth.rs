//! OAuth 2.0 authorization-code flow against a fixed token host.

use chrono::{DateTime, Utc};
use reqwest::Client;
use serde::{Deserialize, Serialize};

use crate::error::{OAuthError, Result};

/// OAuth client registration and provider endpoints.
#[derive(Clone)]
pub struct OAuthConfig {
    pub client_id: String,
    pub client_secret: String,
    pub token_host: String,
    pub authorize_path: String,
    pub token_path: String,
    pub redirect_uri: String,
    pub scope: Option<String>,
}

impl std::fmt::Debug for OAuthConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("OAuthConfig")
            .field("client_id", &self.client_id)
            .field("client_secret", &"<redacted>")
            .field("token_host", &self.token_host)
            .field("authorize_path", &self.authorize_path)
            .field("token_path", &self.token_path)
            .field("redirect_uri", &self.redirect_uri)
            .field("scope", &self.scope)
            .finish()
    }
}

impl OAuthConfig {
    /// Full URL of the authorization endpoint.
    pub fn authorize_endpoint(&self) -> String {
        join_url(&self.token_host, &self.authorize_path)
    }

    /// Full URL of the token endpoint.
    pub fn token_endpoint(&self) -> String {
        join_url(&self.token_host, &self.token_path)
    }
}

fn join_url(host: &str, path: &str) -> String {
    format!(
        "{}/{}",
        host.trim_end_matches('/'),
        path.trim_start_matches('/')
    )
}

/// Build the authorization URL the browser is redirected to.
pub fn build_authorization_url(config: &OAuthConfig) -> String {
    let mut params = vec![
        ("response_type", "code"),
        ("client_id", config.client_id.as_str()),
        ("redirect_uri", config.redirect_uri.as_str()),
    ];
    if let Some(scope) = &config.scope {
        params.push(("scope", scope.as_str()));
    }

    let query = params
        .iter()
        .map(|(k, v)| format!("{}={}", k, urlencoding::encode(v)))
        .collect::<Vec<_>>()
        .join("&");

    format!("{}?{}", config.authorize_endpoint(), query)
}

/// Access token obtained from the token endpoint.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AccessToken {
    pub access_token: String,
    pub token_type: String,
    pub expires_in: Option<u64>,
    pub refresh_token: Option<String>,
    pub scope: Option<String>,
    pub obtained_at: DateTime<Utc>,
    /// `None` when the provider did not report a lifetime.
    pub expires_at: Option<DateTime<Utc>>,
}

impl std::fmt::Debug for AccessToken {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AccessToken")
            .field("access_token", &"<redacted>")
            .field("token_type", &self.token_type)
            .field("expires_in", &self.expires_in)
            .field("scope", &self.scope)
            .field("obtained_at", &self.obtained_at)
            .field("expires_at", &self.expires_at)
            .finish()
    }
}

impl AccessToken {
    /// Wrap a bare bearer token with no expiry information.
    pub fn bearer(access_token: impl Into<String>) -> Self {
        Self {
            access_token: access_token.into(),
            token_type: "Bearer".to_string(),
            expires_in: None,
            refresh_token: None,
            scope: None,
            obtained_at: Utc::now(),
            expires_at: None,
        }
    }

    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        self.expires_at.is_some_and(|at| now >= at)
    }
}

/// Wire format of a successful token endpoint response.
#[derive(Debug, Deserialize)]
struct TokenResponse {
    access_token: String,
    #[serde(default = "default_token_type")]
    token_type: String,
    expires_in: Option<u64>,
    refresh_token: Option<String>,
    scope: Option<String>,
}

fn default_token_type() -> String {
    "Bearer".to_string()
}

impl From<TokenResponse> for AccessToken {
    fn from(resp: TokenResponse) -> Self {
        let obtained_at = Utc::now();
        let expires_at = resp
            .expires_in
            .and_then(|secs| i64::try_from(secs).ok())
            .map(|secs| obtained_at + chrono::Duration::seconds(secs));
        Self {
            access_token: resp.access_token,
            token_type: resp.token_type,
            expires_in: resp.expires_in,
            refresh_token: resp.refresh_token,
            scope: resp.scope,
            obtained_at,
            expires_at,
        }
    }
}

/// Wire format of an RFC 6749 error response.
#[derive(Debug, Deserialize)]
struct TokenErrorResponse {
    error: String,
    error_description: Option<String>,
}

#[derive(Debug, Serialize)]
struct TokenExchangeRequest<'a> {
    grant_type: &'a str,
    code: &'a str,
    redirect_uri: &'a str,
    client_id: &'a str,
    client_secret: &'a str,
}

/// OAuth client bound to one provider registration.
#[derive(Debug, Clone)]
pub struct OAuthClient {
    http: Client,
    config: OAuthConfig,
}

impl OAuthClient {
    pub fn new(config: OAuthConfig) -> Self {
        Self::with_http_client(config, Client::new())
    }

    pub fn with_http_client(config: OAuthConfig, http: Client) -> Self {
        Self { http, config }
    }

    pub fn config(&self) -> &OAuthConfig {
        &self.config
    }

    /// Authorization URL for the configured client and redirect URI.
    pub fn authorization_url(&self) -> String {
        build_authorization_url(&self.config)
    }

    /// Exchange an authorization code for an access token.
    ///
    /// The redirect URI sent here must equal the one used in the
    /// authorization URL, so both come from the same config.
    pub async fn exchange_code(&self, code: &str) -> Result<AccessToken> {
        if code.trim().is_empty() {
            return Err(OAuthError::InvalidRequest(
                "Missing authorization code".to_string(),
            ));
        }

        let request_body = TokenExchangeRequest {
            grant_type: "authorization_code",
            code,
            redirect_uri: &self.config.redirect_uri,
            client_id: &self.config.client_id,
            client_secret: &self.config.client_secret,
        };

        let token_url = self.config.token_endpoint();
        tracing::debug!(url = %token_url, "Exchanging authorization code");

        let response = self
            .http
            .post(&token_url)
            .header(reqwest::header::ACCEPT, "application/json")
            .form(&request_body)
            .send()
            .await
            .map_err(|e| OAuthError::Network(format!("Token exchange request failed: {}", e)))?;

        let status = response.status();
        let body = response
            .text()
            .await
            .map_err(|e| OAuthError::Network(format!("Failed to read token response: {}", e)))?;

        if !status.is_success() {
            let detail = match serde_json::from_str::<TokenErrorResponse>(&body) {
                Ok(err) => match err.error_description {
                    Some(desc) => format!("{}: {}", err.error, desc),
                    None => err.error,
                },
                Err(_) => body,
            };
            return Err(OAuthError::Backend(format!(
                "Token exchange failed ({}): {}",
                status, detail
            )));
        }

        let tokens: TokenResponse = serde_json::from_str(&body)
            .map_err(|e| OAuthError::Backend(format!("Failed to parse token response: {}", e)))?;

        Ok(tokens.into())
    }
}
