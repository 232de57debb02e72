//! OAuth 2.0 authorization-code client and upstream API access for relay.
//!
//! # Components
//!
//! - [`oauth`]: authorization URL construction and code-for-token exchange
//! - [`credentials`]: access tokens held per credential owner
//! - [`upstream`]: GET pass-through to the upstream REST API with a bearer token

pub mod credentials;
pub mod error;
pub mod oauth;
pub mod upstream;

pub use credentials::{
    CredentialOwner, CredentialStore, MemoryCredentialStore, SharedCredentialStore,
};
pub use error::{OAuthError, Result};
pub use oauth::{AccessToken, OAuthClient, OAuthConfig, build_authorization_url};
pub use upstream::{API_PREFIX, ApiClient, extract_payload};
