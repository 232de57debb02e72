//! Server configuration.

use std::net::{Ipv4Addr, SocketAddr};

/// Default listener port.
pub const DEFAULT_PORT: u16 = 3000;

/// Default name of the session cookie.
pub const DEFAULT_COOKIE_NAME: &str = "relay.sid";

/// Server configuration.
#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// Address to bind the server to.
    pub bind_address: SocketAddr,

    /// Name of the signed session cookie.
    pub cookie_name: String,

    /// Mark the session cookie `Secure` (HTTPS deployments).
    pub secure_cookies: bool,

    /// Enable request logging.
    pub request_logging: bool,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind_address: SocketAddr::from((Ipv4Addr::LOCALHOST, DEFAULT_PORT)),
            cookie_name: DEFAULT_COOKIE_NAME.to_string(),
            secure_cookies: false,
            request_logging: true,
        }
    }
}

impl ServerConfig {
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the bind address.
    pub fn with_bind_address(mut self, addr: SocketAddr) -> Self {
        self.bind_address = addr;
        self
    }

    /// Set the session cookie name.
    pub fn with_cookie_name(mut self, name: impl Into<String>) -> Self {
        self.cookie_name = name.into();
        self
    }

    pub fn with_secure_cookies(mut self, secure: bool) -> Self {
        self.secure_cookies = secure;
        self
    }

    /// Enable or disable request logging.
    pub fn with_request_logging(mut self, enabled: bool) -> Self {
        self.request_logging = enabled;
        self
    }
}
