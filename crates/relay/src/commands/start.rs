//! Start command - launches the proxy server.

use std::sync::Arc;

use anyhow::{Context as _, Result};
use clap::Args;
use tracing::info;

use relay_config::{LoadedConfig, RelayConfig};
use relay_oauth::{ApiClient, OAuthClient, OAuthConfig};
use relay_server::{AppState, HttpUserDirectory, Server, ServerConfig, spawn_session_reaper};
use relay_session::{FileSessionStore, SharedSessionStore};

use super::Context;

/// Arguments for the start command.
///
/// CLI arguments override config file values.
#[derive(Args, Debug)]
pub struct StartArgs {
    /// Port to listen on (overrides config)
    #[arg(short, long)]
    pub port: Option<u16>,

    /// Address to bind to (overrides config)
    #[arg(short, long)]
    pub bind: Option<String>,
}

/// Run the start command.
pub async fn run(args: StartArgs, ctx: &Context) -> Result<()> {
    // ── Load configuration ──────────────────────────────────────────────

    let loaded = match &ctx.config_path {
        Some(path) => relay_config::load_config_file(path)?,
        None => relay_config::load_config(None)?,
    };

    for warning in &loaded.warnings {
        eprintln!("warning: {}", warning);
    }

    if ctx.verbose {
        report_sources(&loaded);
    }

    let mut config = loaded.config;
    apply_cli_overrides(&mut config, &args);
    config.validate()?;

    // ── Build services ──────────────────────────────────────────────────

    let server_section = config.server();
    let session_section = config.session();
    let session_secret = session_section
        .secret
        .clone()
        .context("session secret missing after validation")?;

    let oauth = OAuthClient::new(oauth_config(&config)?);
    let api = ApiClient::new(config.upstream()?.api_base_url.clone());
    let users = Arc::new(HttpUserDirectory::new(config.users().base_url));

    let sessions: SharedSessionStore = Arc::new(
        FileSessionStore::new(&session_section.dir, session_section.ttl())
            .with_context(|| format!("opening session store {}", session_section.dir.display()))?,
    );

    let server_config = ServerConfig::new()
        .with_bind_address(server_section.bind_address()?)
        .with_cookie_name(session_section.cookie_name.clone())
        .with_secure_cookies(session_section.secure_cookies)
        .with_request_logging(server_section.request_logging);

    let state = AppState::new(
        server_config,
        &session_secret,
        oauth,
        api,
        users,
        sessions.clone(),
    );

    // ── Run ─────────────────────────────────────────────────────────────

    let reaper = spawn_session_reaper(
        sessions,
        state.credentials.clone(),
        session_section.reap_interval(),
    );

    let server = Server::from_state(state);
    info!(
        addr = %server.bind_address(),
        sessions = %session_section.dir.display(),
        "Relay starting"
    );
    println!("Relay listening on http://{}", server.bind_address());
    println!("Authorize at http://{}/oauth", server.bind_address());

    let result = server.run().await;
    reaper.abort();
    result?;

    Ok(())
}

fn report_sources(loaded: &LoadedConfig) {
    let sources = loaded.loaded_from();
    if sources.is_empty() {
        println!("No config files found, using defaults + CLI args");
    } else {
        for source in sources {
            println!("Loaded config: {}", source.display());
        }
    }
}

fn apply_cli_overrides(config: &mut RelayConfig, args: &StartArgs) {
    if args.port.is_none() && args.bind.is_none() {
        return;
    }

    let mut server = config.server();
    if let Some(port) = args.port {
        server.port = port;
    }
    if let Some(bind) = &args.bind {
        server.bind = bind.clone();
    }
    config.server = Some(server);
}

fn oauth_config(config: &RelayConfig) -> Result<OAuthConfig> {
    let oauth = config.oauth()?;
    Ok(OAuthConfig {
        client_id: oauth.client_id.clone(),
        client_secret: oauth.client_secret.clone(),
        token_host: oauth.token_host.clone(),
        authorize_path: oauth.authorize_path.clone(),
        token_path: oauth.token_path.clone(),
        redirect_uri: oauth.redirect_uri.clone(),
        scope: oauth.scope.clone(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cli_overrides_server_section() {
        let mut config = RelayConfig::from_toml("[server]\nport = 4000\n").unwrap();
        let args = StartArgs {
            port: Some(5000),
            bind: Some("0.0.0.0".to_string()),
        };

        apply_cli_overrides(&mut config, &args);

        let server = config.server();
        assert_eq!(server.port, 5000);
        assert_eq!(server.bind, "0.0.0.0");
    }

    #[test]
    fn test_no_overrides_leaves_config_untouched() {
        let mut config = RelayConfig::new();
        apply_cli_overrides(
            &mut config,
            &StartArgs {
                port: None,
                bind: None,
            },
        );
        assert!(config.server.is_none());
    }

    #[test]
    fn test_oauth_config_mapping() {
        let config = RelayConfig::from_toml(
            r#"
[oauth]
client_id = "abc"
client_secret = "shh"
token_host = "https://app.example.com"
redirect_uri = "http://localhost:3000/oauth/response"
scope = "read"
"#,
        )
        .unwrap();

        let oauth = oauth_config(&config).unwrap();
        assert_eq!(oauth.client_id, "abc");
        assert_eq!(
            oauth.token_endpoint(),
            "https://app.example.com/oauth/token"
        );
        assert_eq!(oauth.scope.as_deref(), Some("read"));
    }
}
