//! Configuration schema definitions.
//!
//! This module defines the complete configuration structure for the gate.
//! All types derive Serde traits for deserialization from config files.

use serde::{Deserialize, Serialize};

/// Root configuration for the gate.
#[derive(Debug, Clone, Deserialize, Serialize, Default)]
#[serde(default)]
pub struct GateConfig {
    /// Listener configuration (bind address).
    pub listener: ListenerConfig,

    /// The web application that pass-through traffic is forwarded to.
    pub upstream: UpstreamConfig,

    /// Auth collaborator settings.
    pub auth: AuthConfig,

    /// Notes collaborator endpoints.
    pub notes: NotesConfig,

    /// Gated paths and query parameter names.
    pub gate: GateRulesConfig,

    /// Paths the gate never inspects.
    pub scope: ScopeConfig,

    /// Timeout configuration.
    pub timeouts: TimeoutConfig,

    /// Observability settings.
    pub observability: ObservabilityConfig,

    #[serde(default)]
    pub security: SecurityConfig,
}

/// Listener configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ListenerConfig {
    /// Bind address (e.g., "0.0.0.0:8080").
    pub bind_address: String,
}

impl Default for ListenerConfig {
    fn default() -> Self {
        Self {
            bind_address: "0.0.0.0:8080".to_string(),
        }
    }
}

/// Upstream web application.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct UpstreamConfig {
    /// Upstream address (e.g., "127.0.0.1:3000").
    pub address: String,
}

impl Default for UpstreamConfig {
    fn default() -> Self {
        Self {
            address: "127.0.0.1:3000".to_string(),
        }
    }
}

impl UpstreamConfig {
    /// Base URL of the upstream, without trailing slash.
    pub fn base_url(&self) -> String {
        format!("http://{}", self.address)
    }
}

/// Auth collaborator (Supabase-compatible GoTrue service).
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct AuthConfig {
    /// Project URL, e.g. "https://abcd.supabase.co".
    pub url: String,

    /// Public anon key sent as the `apikey` header.
    pub anon_key: String,

    /// Session cookie name. Derived from the project URL when unset.
    pub cookie_name: Option<String>,

    /// Refresh the session when it expires within this many seconds.
    pub refresh_margin_secs: u64,
}

impl Default for AuthConfig {
    fn default() -> Self {
        Self {
            url: "http://127.0.0.1:54321".to_string(),
            anon_key: String::new(),
            cookie_name: None,
            refresh_margin_secs: 10,
        }
    }
}

impl AuthConfig {
    /// Effective session cookie name: `sb-<project-ref>-auth-token` unless overridden.
    pub fn cookie_name(&self) -> String {
        if let Some(name) = &self.cookie_name {
            return name.clone();
        }
        let project_ref = url::Url::parse(&self.url)
            .ok()
            .and_then(|u| u.host_str().map(|h| h.split('.').next().unwrap_or(h).to_string()))
            .unwrap_or_default();
        format!("sb-{}-auth-token", project_ref)
    }
}

/// Notes collaborator endpoints.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct NotesConfig {
    /// Base URL of the API routes. Defaults to the upstream.
    pub base_url: Option<String>,

    /// Path of the newest-note lookup.
    pub fetch_newest_path: String,

    /// Path of the note creation endpoint.
    pub create_path: String,
}

impl Default for NotesConfig {
    fn default() -> Self {
        Self {
            base_url: None,
            fetch_newest_path: "/api/fetch-newest-note".to_string(),
            create_path: "/api/create-new-note".to_string(),
        }
    }
}

/// Gated paths and parameter names.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct GateRulesConfig {
    /// Paths only reachable while signed out.
    pub auth_paths: Vec<String>,

    /// Home path; canonicalized to the notes path for signed-in users.
    pub home_path: String,

    /// Notes path; also the landing path after sign-in.
    pub notes_path: String,

    /// Where guests are sent.
    pub login_path: String,

    /// Query parameter carrying the post-login destination.
    pub next_param: String,

    /// Query parameter carrying the selected note.
    pub note_param: String,
}

impl Default for GateRulesConfig {
    fn default() -> Self {
        Self {
            auth_paths: vec!["/login".to_string(), "/sign-up".to_string()],
            home_path: "/".to_string(),
            notes_path: "/notes".to_string(),
            login_path: "/login".to_string(),
            next_param: "next".to_string(),
            note_param: "noteId".to_string(),
        }
    }
}

/// Requests matching these rules bypass the gate entirely.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ScopeConfig {
    /// Excluded path prefixes.
    pub excluded_prefixes: Vec<String>,

    /// Excluded exact paths.
    pub excluded_paths: Vec<String>,

    /// Excluded file extensions (without dot, case-insensitive).
    pub excluded_extensions: Vec<String>,
}

impl Default for ScopeConfig {
    fn default() -> Self {
        Self {
            excluded_prefixes: vec!["/_next/static".to_string(), "/_next/image".to_string()],
            excluded_paths: vec!["/favicon.ico".to_string()],
            excluded_extensions: ["svg", "png", "jpg", "jpeg", "gif", "webp"]
                .iter()
                .map(|s| s.to_string())
                .collect(),
        }
    }
}

/// Timeout configuration for various operations.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct TimeoutConfig {
    /// Request timeout (total time for request/response) in seconds.
    pub request_secs: u64,

    /// Per-call deadline for auth and notes collaborators in seconds.
    pub collaborator_secs: u64,
}

impl Default for TimeoutConfig {
    fn default() -> Self {
        Self {
            request_secs: 30,
            collaborator_secs: 10,
        }
    }
}

/// Log output format.
#[derive(Debug, Clone, Copy, Deserialize, Serialize, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    #[default]
    Pretty,
    Json,
}

/// Observability configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ObservabilityConfig {
    /// Log level (trace, debug, info, warn, error).
    pub log_level: String,

    /// Log output format.
    pub log_format: LogFormat,

    /// Enable metrics endpoint.
    pub metrics_enabled: bool,

    /// Metrics endpoint bind address.
    pub metrics_address: String,
}

impl Default for ObservabilityConfig {
    fn default() -> Self {
        Self {
            log_level: "info".to_string(),
            log_format: LogFormat::Pretty,
            metrics_enabled: false,
            metrics_address: "0.0.0.0:9090".to_string(),
        }
    }
}

/// Security hardening configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct SecurityConfig {
    /// Maximum body size in bytes.
    pub max_body_size: usize,
}

impl Default for SecurityConfig {
    fn default() -> Self {
        Self {
            max_body_size: 2 * 1024 * 1024, // 2MB
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cookie_name_derives_from_project_ref() {
        let auth = AuthConfig {
            url: "https://abcdefgh.supabase.co".into(),
            ..Default::default()
        };
        assert_eq!(auth.cookie_name(), "sb-abcdefgh-auth-token");

        let local = AuthConfig::default();
        assert_eq!(local.cookie_name(), "sb-127-auth-token");

        let explicit = AuthConfig {
            cookie_name: Some("session".into()),
            ..Default::default()
        };
        assert_eq!(explicit.cookie_name(), "session");
    }

    #[test]
    fn minimal_toml_uses_defaults() {
        let config: GateConfig = toml::from_str(
            r#"
            [upstream]
            address = "127.0.0.1:4000"

            [observability]
            log_format = "json"
            "#,
        )
        .unwrap();

        assert_eq!(config.upstream.base_url(), "http://127.0.0.1:4000");
        assert_eq!(config.observability.log_format, LogFormat::Json);
        assert_eq!(config.gate.auth_paths, vec!["/login", "/sign-up"]);
        assert_eq!(config.notes.fetch_newest_path, "/api/fetch-newest-note");
        assert_eq!(config.timeouts.request_secs, 30);
    }
}
