//! Secret resolution: environment variables override config file values.
//!
//! Resolution order:
//! 1. Environment variable
//! 2. Config file (with warning)

use crate::types::RelayConfig;

/// Environment variable overriding `oauth.client_secret`.
pub const CLIENT_SECRET_ENV: &str = "RELAY_CLIENT_SECRET";

/// Environment variable overriding `session.secret`.
pub const SESSION_SECRET_ENV: &str = "RELAY_SESSION_SECRET";

/// Result of secret resolution with provenance.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedSecret {
    pub value: String,
    pub source: SecretSource,
}

/// Where a secret was resolved from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SecretSource {
    EnvVar(String),
    /// Config file (plaintext).
    ConfigFile,
}

impl std::fmt::Display for SecretSource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SecretSource::EnvVar(var) => write!(f, "env var {}", var),
            SecretSource::ConfigFile => write!(f, "config file (plaintext)"),
        }
    }
}

/// Resolve a secret from `env_var`, falling back to the config value.
pub fn resolve_secret(env_var: &str, config_value: Option<&str>) -> Option<ResolvedSecret> {
    if let Ok(value) = std::env::var(env_var)
        && !value.is_empty()
    {
        return Some(ResolvedSecret {
            value,
            source: SecretSource::EnvVar(env_var.to_string()),
        });
    }

    config_value
        .filter(|v| !v.is_empty())
        .map(|v| ResolvedSecret {
            value: v.to_string(),
            source: SecretSource::ConfigFile,
        })
}

/// Apply environment overrides to the secrets in `config`.
///
/// Returns warnings for secrets that were left in the config file.
pub fn apply_env_overrides(config: &mut RelayConfig) -> Vec<String> {
    let mut warnings = Vec::new();

    let file_secret = config.oauth.as_ref().map(|o| o.client_secret.clone());
    if let Some(resolved) = resolve_secret(CLIENT_SECRET_ENV, file_secret.as_deref()) {
        if resolved.source == SecretSource::ConfigFile {
            warnings.push(format!(
                "[oauth] client_secret is stored in plaintext. Consider setting {} instead.",
                CLIENT_SECRET_ENV
            ));
        }
        config.oauth.get_or_insert_with(Default::default).client_secret = resolved.value;
    }

    let file_secret = config.session.as_ref().and_then(|s| s.secret.clone());
    if let Some(resolved) = resolve_secret(SESSION_SECRET_ENV, file_secret.as_deref()) {
        config.session.get_or_insert_with(Default::default).secret = Some(resolved.value);
    }

    warnings
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_resolve_from_config_value() {
        let resolved = resolve_secret("RELAY_TEST_UNSET_SECRET", Some("from-file")).unwrap();
        assert_eq!(resolved.value, "from-file");
        assert_eq!(resolved.source, SecretSource::ConfigFile);
    }

    #[test]
    fn test_resolve_empty_is_none() {
        assert!(resolve_secret("RELAY_TEST_UNSET_SECRET", Some("")).is_none());
        assert!(resolve_secret("RELAY_TEST_UNSET_SECRET", None).is_none());
    }

    #[test]
    fn test_plaintext_client_secret_warns() {
        let mut config = RelayConfig::from_toml(
            r#"
[oauth]
client_secret = "plain"
"#,
        )
        .unwrap();

        let warnings = apply_env_overrides(&mut config);
        if std::env::var(CLIENT_SECRET_ENV).is_err() {
            assert_eq!(warnings.len(), 1);
            assert_eq!(config.oauth.unwrap().client_secret, "plain");
        }
    }

    #[test]
    fn test_source_display() {
        assert_eq!(
            SecretSource::EnvVar("X".to_string()).to_string(),
            "env var X"
        );
        assert_eq!(
            SecretSource::ConfigFile.to_string(),
            "config file (plaintext)"
        );
    }
}
