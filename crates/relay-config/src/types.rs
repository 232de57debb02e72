//! Configuration types mapping to the TOML schema.
//!
//! Top-level config:
//! ```toml
//! [oauth]      # client credentials and provider endpoints
//! [server]     # listener settings
//! [upstream]   # API that /api/v4 requests are forwarded to
//! [users]      # user-lookup service for local login
//! [session]    # session persistence and cookie settings
//! ```

use std::net::{IpAddr, SocketAddr};
use std::path::PathBuf;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::{ConfigError, Result};

/// Default port the proxy listens on.
pub const DEFAULT_PORT: u16 = 3000;

/// Default bind address.
pub const DEFAULT_BIND: &str = "127.0.0.1";

/// Default authorization endpoint path on the token host.
pub const DEFAULT_AUTHORIZE_PATH: &str = "/oauth/authorize";

/// Default token endpoint path on the token host.
pub const DEFAULT_TOKEN_PATH: &str = "/oauth/token";

/// Default user-lookup service.
pub const DEFAULT_USERS_URL: &str = "http://localhost:5000";

/// Default session cookie name.
pub const DEFAULT_COOKIE_NAME: &str = "relay.sid";

/// Default session lifetime (one hour).
pub const DEFAULT_SESSION_TTL_SECS: u64 = 3600;

/// Minimum length of the cookie signing secret.
pub const MIN_SESSION_SECRET_LEN: usize = 32;

// ─────────────────────────────────────────────────────────────────────────────
// Top-level Config
// ─────────────────────────────────────────────────────────────────────────────

/// Root configuration structure.
///
/// All sections are optional so that partial configs (e.g. a project-local
/// override holding only `[server]`) can be loaded and merged.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct RelayConfig {
    pub oauth: Option<OAuthConfig>,
    pub server: Option<ServerConfig>,
    pub upstream: Option<UpstreamConfig>,
    pub users: Option<UsersConfig>,
    pub session: Option<SessionConfig>,
}

impl RelayConfig {
    /// Create an empty config.
    pub fn new() -> Self {
        Self::default()
    }

    /// Parse from a TOML string.
    pub fn from_toml(toml_str: &str) -> Result<Self> {
        Ok(toml::from_str(toml_str)?)
    }

    /// Merge another config on top of this one (other takes priority).
    ///
    /// Merging is per section: a section present in `other` replaces the
    /// whole section here.
    pub fn merge(&mut self, other: RelayConfig) {
        if other.oauth.is_some() {
            self.oauth = other.oauth;
        }
        if other.server.is_some() {
            self.server = other.server;
        }
        if other.upstream.is_some() {
            self.upstream = other.upstream;
        }
        if other.users.is_some() {
            self.users = other.users;
        }
        if other.session.is_some() {
            self.session = other.session;
        }
    }

    /// The `[oauth]` section, which is required.
    pub fn oauth(&self) -> Result<&OAuthConfig> {
        self.oauth.as_ref().ok_or_else(|| missing("oauth", "config"))
    }

    /// The `[upstream]` section, which is required.
    pub fn upstream(&self) -> Result<&UpstreamConfig> {
        self.upstream
            .as_ref()
            .ok_or_else(|| missing("upstream", "config"))
    }

    /// The `[server]` section, or defaults.
    pub fn server(&self) -> ServerConfig {
        self.server.clone().unwrap_or_default()
    }

    /// The `[users]` section, or defaults.
    pub fn users(&self) -> UsersConfig {
        self.users.clone().unwrap_or_default()
    }

    /// The `[session]` section, or defaults.
    pub fn session(&self) -> SessionConfig {
        self.session.clone().unwrap_or_default()
    }

    /// Check that every field needed to start the proxy is present.
    pub fn validate(&self) -> Result<()> {
        let oauth = self.oauth()?;
        require(&oauth.client_id, "client_id", "[oauth]")?;
        require(&oauth.client_secret, "client_secret", "[oauth]")?;
        require(&oauth.token_host, "token_host", "[oauth]")?;
        require(&oauth.redirect_uri, "redirect_uri", "[oauth]")?;

        require(&self.upstream()?.api_base_url, "api_base_url", "[upstream]")?;

        let session = self.session();
        let secret = session
            .secret
            .as_deref()
            .ok_or_else(|| missing("secret", "[session]"))?;
        if secret.len() < MIN_SESSION_SECRET_LEN {
            return Err(ConfigError::Invalid {
                field: "session.secret".to_string(),
                reason: format!("must be at least {} bytes", MIN_SESSION_SECRET_LEN),
            });
        }

        self.server().bind_address()?;
        Ok(())
    }
}

fn missing(field: &str, context: &str) -> ConfigError {
    ConfigError::MissingField {
        field: field.to_string(),
        context: context.to_string(),
    }
}

fn require(value: &str, field: &str, context: &str) -> Result<()> {
    if value.trim().is_empty() {
        return Err(missing(field, context));
    }
    Ok(())
}

// ─────────────────────────────────────────────────────────────────────────────
// Sections
// ─────────────────────────────────────────────────────────────────────────────

/// OAuth client registration and provider endpoints.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct OAuthConfig {
    pub client_id: String,
    pub client_secret: String,
    /// Scheme and host of the provider, e.g. `https://app.example.com`.
    pub token_host: String,
    pub authorize_path: String,
    pub token_path: String,
    /// Must match the redirect URI registered with the provider.
    pub redirect_uri: String,
    pub scope: Option<String>,
}

impl Default for OAuthConfig {
    fn default() -> Self {
        Self {
            client_id: String::new(),
            client_secret: String::new(),
            token_host: String::new(),
            authorize_path: DEFAULT_AUTHORIZE_PATH.to_string(),
            token_path: DEFAULT_TOKEN_PATH.to_string(),
            redirect_uri: String::new(),
            scope: None,
        }
    }
}

/// Listener settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    /// Port to listen on.
    pub port: u16,
    /// Address to bind to.
    pub bind: String,
    /// Log every request with its status and latency.
    pub request_logging: bool,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            port: DEFAULT_PORT,
            bind: DEFAULT_BIND.to_string(),
            request_logging: true,
        }
    }
}

impl ServerConfig {
    /// Socket address built from `bind` and `port`.
    pub fn bind_address(&self) -> Result<SocketAddr> {
        let ip: IpAddr = self.bind.parse().map_err(|_| ConfigError::Invalid {
            field: "server.bind".to_string(),
            reason: format!("'{}' is not an IP address", self.bind),
        })?;
        Ok(SocketAddr::new(ip, self.port))
    }
}

/// Upstream API that `/api/v4/*` requests are forwarded to.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct UpstreamConfig {
    pub api_base_url: String,
}

/// User-lookup service used by the local login.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct UsersConfig {
    pub base_url: String,
}

impl Default for UsersConfig {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_USERS_URL.to_string(),
        }
    }
}

/// Session persistence and cookie settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SessionConfig {
    /// Directory holding one file per session.
    pub dir: PathBuf,
    /// Lifetime of a session since it was last saved.
    pub ttl_secs: u64,
    /// Interval between sweeps that delete expired session files.
    pub reap_interval_secs: u64,
    pub cookie_name: String,
    /// Cookie signing secret.
    pub secret: Option<String>,
    /// Mark the cookie `Secure` (HTTPS only).
    pub secure_cookies: bool,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            dir: PathBuf::from("sessions"),
            ttl_secs: DEFAULT_SESSION_TTL_SECS,
            reap_interval_secs: DEFAULT_SESSION_TTL_SECS,
            cookie_name: DEFAULT_COOKIE_NAME.to_string(),
            secret: None,
            secure_cookies: false,
        }
    }
}

impl SessionConfig {
    pub fn ttl(&self) -> Duration {
        Duration::from_secs(self.ttl_secs)
    }

    pub fn reap_interval(&self) -> Duration {
        Duration::from_secs(self.reap_interval_secs)
    }
}
