//! Structured logging.
//!
//! `RUST_LOG` wins over the configured level; the output format comes from
//! the config (pretty for development, JSON for log shippers).

use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use crate::config::{LogFormat, ObservabilityConfig};

/// Filter directives used when `RUST_LOG` is unset.
pub fn default_directives(level: &str) -> String {
    format!("note_gate={level},tower_http={level}")
}

/// Install the global subscriber. Call once, before anything logs.
pub fn init_logging(config: &ObservabilityConfig) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(default_directives(&config.log_level)));

    let registry = tracing_subscriber::registry().with(filter);
    match config.log_format {
        LogFormat::Pretty => registry.with(tracing_subscriber::fmt::layer()).init(),
        LogFormat::Json => registry
            .with(tracing_subscriber::fmt::layer().json().with_current_span(false))
            .init(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn directives_cover_crate_and_http_layers() {
        assert_eq!(default_directives("debug"), "note_gate=debug,tower_http=debug");
        assert!(EnvFilter::try_new(default_directives("info")).is_ok());
    }
}
