//! Configuration loading from disk and environment.

use std::fs;
use std::path::Path;
use thiserror::Error;

use crate::config::schema::RelayConfig;
use crate::config::validation::{validate_config, ValidationError};

/// Environment variables that override file values.
pub const ENV_SSE_URL: &str = "RELAY_UPSTREAM_SSE_URL";
pub const ENV_API_URL: &str = "RELAY_API_URL";
pub const ENV_API_TOKEN: &str = "RELAY_API_TOKEN";
pub const ENV_DASHBOARD_SECRET: &str = "RELAY_DASHBOARD_SECRET";
pub const ENV_BIND_ADDRESS: &str = "RELAY_BIND_ADDRESS";

/// Error type for configuration loading.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Parse error: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("Validation failed: {}", join_errors(.0))]
    Validation(Vec<ValidationError>),
}

fn join_errors(errors: &[ValidationError]) -> String {
    errors
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join(", ")
}

/// Load and validate configuration from a TOML file.
pub fn load_config(path: &Path) -> Result<RelayConfig, ConfigError> {
    let content = fs::read_to_string(path)?;
    let mut config: RelayConfig = toml::from_str(&content)?;
    apply_env_overrides(&mut config, |key| std::env::var(key).ok());

    validate_config(&config).map_err(ConfigError::Validation)?;

    Ok(config)
}

/// Startup entry point: file if given, defaults otherwise, then environment.
pub fn load(path: Option<&Path>) -> Result<RelayConfig, ConfigError> {
    match path {
        Some(path) => load_config(path),
        None => {
            let mut config = RelayConfig::default();
            apply_env_overrides(&mut config, |key| std::env::var(key).ok());
            validate_config(&config).map_err(ConfigError::Validation)?;
            Ok(config)
        }
    }
}

/// Overlay non-empty environment values onto `config`.
pub fn apply_env_overrides<F>(config: &mut RelayConfig, lookup: F)
where
    F: Fn(&str) -> Option<String>,
{
    let get = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

    if let Some(v) = get(ENV_SSE_URL) {
        config.upstream.sse_url = Some(v);
    }
    if let Some(v) = get(ENV_API_URL) {
        config.upstream.api_url = Some(v);
    }
    if let Some(v) = get(ENV_API_TOKEN) {
        config.upstream.api_token = Some(v);
    }
    if let Some(v) = get(ENV_DASHBOARD_SECRET) {
        config.auth.dashboard_secret = Some(v);
    }
    if let Some(v) = get(ENV_BIND_ADDRESS) {
        config.listener.bind_address = v;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    #[test]
    fn test_env_overrides() {
        let env: HashMap<&str, &str> = [
            (ENV_SSE_URL, "http://controller:3003/sse"),
            (ENV_API_TOKEN, "s3cret"),
            (ENV_DASHBOARD_SECRET, "  "),
        ]
        .into_iter()
        .collect();

        let mut config = RelayConfig::default();
        config.auth.dashboard_secret = Some("from-file".into());
        apply_env_overrides(&mut config, |k| env.get(k).map(|v| v.to_string()));

        assert_eq!(config.upstream.sse_url.as_deref(), Some("http://controller:3003/sse"));
        assert_eq!(config.upstream.api_token.as_deref(), Some("s3cret"));
        // blank values are ignored
        assert_eq!(config.auth.dashboard_secret.as_deref(), Some("from-file"));
        assert!(config.upstream.api_url.is_none());
    }

    #[test]
    fn test_load_config_reports_validation() {
        let path = std::env::temp_dir().join(format!("relay-config-{}.toml", uuid::Uuid::new_v4()));
        fs::write(&path, "[relay]\nchannel_capacity = 0\n").unwrap();

        let err = load_config(&path).unwrap_err();
        let _ = fs::remove_file(&path);

        assert!(matches!(err, ConfigError::Validation(_)));
        assert!(err.to_string().contains("relay.channel_capacity"));
    }

    #[test]
    fn test_missing_file_is_io_error() {
        let err = load_config(Path::new("/definitely/not/here.toml")).unwrap_err();
        assert!(matches!(err, ConfigError::Io(_)));
    }
}
