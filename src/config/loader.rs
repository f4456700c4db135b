//! Configuration loading from disk.

use std::path::Path;
use std::fs;
use crate::config::schema::GateConfig;
use crate::config::validation::{validate_config, ValidationError};

/// Error type for configuration loading.
#[derive(Debug, thiserror::Error)]
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
        .map(|e| e.to_string())
        .collect::<Vec<_>>()
        .join(", ")
}

/// Environment variables that override file settings.
pub const ENV_AUTH_URL: &str = "SUPABASE_URL";
pub const ENV_AUTH_ANON_KEY: &str = "SUPABASE_ANON_KEY";
pub const ENV_UPSTREAM: &str = "NOTE_GATE_UPSTREAM";

/// Load and validate configuration from a TOML file.
pub fn load_config(path: &Path) -> Result<GateConfig, ConfigError> {
    let content = fs::read_to_string(path)?;
    parse_config(&content, |key| std::env::var(key).ok())
}

/// Parse configuration text, apply overrides, and validate.
///
/// `env` is consulted for each override key so callers can inject a
/// fixed environment.
pub fn parse_config<F>(content: &str, env: F) -> Result<GateConfig, ConfigError>
where
    F: Fn(&str) -> Option<String>,
{
    let mut config: GateConfig = toml::from_str(content)?;
    apply_env_overrides(&mut config, env);

    validate_config(&config).map_err(ConfigError::Validation)?;

    Ok(config)
}

/// Apply environment overrides to an already parsed config.
pub fn apply_env_overrides<F>(config: &mut GateConfig, env: F)
where
    F: Fn(&str) -> Option<String>,
{
    if let Some(url) = env(ENV_AUTH_URL) {
        config.auth.url = url;
    }
    if let Some(key) = env(ENV_AUTH_ANON_KEY) {
        config.auth.anon_key = key;
    }
    if let Some(addr) = env(ENV_UPSTREAM) {
        config.upstream.address = addr;
    }
}
