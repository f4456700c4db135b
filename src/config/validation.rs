//! Configuration validation.
//!
//! Semantic checks only; serde handles syntax. Every problem is reported,
//! not just the first.

use std::fmt;
use std::net::SocketAddr;

use crate::config::schema::GateConfig;

/// A single semantic problem in a config.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidationError {
    pub field: &'static str,
    pub message: String,
}

impl ValidationError {
    fn new(field: &'static str, message: impl Into<String>) -> Self {
        Self {
            field,
            message: message.into(),
        }
    }
}

impl fmt::Display for ValidationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.field, self.message)
    }
}

/// Validate a parsed config.
pub fn validate_config(config: &GateConfig) -> Result<(), Vec<ValidationError>> {
    let mut errors = Vec::new();

    if config.listener.bind_address.parse::<SocketAddr>().is_err() {
        errors.push(ValidationError::new(
            "listener.bind_address",
            format!("'{}' is not a socket address", config.listener.bind_address),
        ));
    }

    if config.upstream.address.is_empty() || config.upstream.address.contains('/') {
        errors.push(ValidationError::new(
            "upstream.address",
            format!("'{}' must be host:port", config.upstream.address),
        ));
    }

    if url::Url::parse(&config.auth.url).is_err() {
        errors.push(ValidationError::new(
            "auth.url",
            format!("'{}' is not a URL", config.auth.url),
        ));
    }

    if let Some(base) = &config.notes.base_url {
        if url::Url::parse(base).is_err() {
            errors.push(ValidationError::new("notes.base_url", format!("'{}' is not a URL", base)));
        }
    }

    for (field, path) in [
        ("notes.fetch_newest_path", &config.notes.fetch_newest_path),
        ("notes.create_path", &config.notes.create_path),
        ("gate.home_path", &config.gate.home_path),
        ("gate.notes_path", &config.gate.notes_path),
        ("gate.login_path", &config.gate.login_path),
    ] {
        if !path.starts_with('/') {
            errors.push(ValidationError::new(field, format!("'{}' must start with '/'", path)));
        }
    }

    if config.gate.next_param.is_empty() || config.gate.note_param.is_empty() {
        errors.push(ValidationError::new("gate", "query parameter names must not be empty"));
    }

    if config.timeouts.request_secs == 0 {
        errors.push(ValidationError::new("timeouts.request_secs", "must be greater than zero"));
    }
    if config.timeouts.collaborator_secs == 0 {
        errors.push(ValidationError::new("timeouts.collaborator_secs", "must be greater than zero"));
    }

    if config.observability.metrics_enabled
        && config.observability.metrics_address.parse::<SocketAddr>().is_err()
    {
        errors.push(ValidationError::new(
            "observability.metrics_address",
            format!("'{}' is not a socket address", config.observability.metrics_address),
        ));
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}
