//! Configuration management subsystem.
//!
//! # Data Flow
//! ```text
//! config file (TOML)
//!     → loader.rs (parse, deserialize, env overrides)
//!     → validation.rs (semantic checks)
//!     → GateConfig (validated, immutable)
//!
//! On file change (--watch):
//!     watcher.rs detects change
//!     → loader.rs loads new config
//!     → server swaps its runtime state atomically
//! ```

pub mod loader;
pub mod schema;
pub mod validation;
pub mod watcher;

pub use loader::{load_config, ConfigError};
pub use schema::{
    AuthConfig, GateConfig, GateRulesConfig, ListenerConfig, LogFormat, NotesConfig,
    ObservabilityConfig, ScopeConfig, TimeoutConfig, UpstreamConfig,
};
