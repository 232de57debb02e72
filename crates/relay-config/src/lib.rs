//! Configuration system for the relay OAuth proxy.
//!
//! Provides TOML-based configuration with:
//! - OAuth client credentials and endpoints (`[oauth]`)
//! - Listener settings (`[server]`)
//! - Upstream API and user-service locations (`[upstream]`, `[users]`)
//! - Session persistence and cookie settings (`[session]`)
//! - Config file layering (user config dir + project-local overrides)
//! - Secret overrides from environment variables

pub mod discovery;
pub mod error;
pub mod secrets;
pub mod types;

pub use discovery::{
    LoadedConfig, load_config, load_config_file, load_config_with_options, xdg_config_dir,
    xdg_config_path,
};
pub use error::{ConfigError, Result};
pub use types::*;
