//! Routing subsystem.
//!
//! # Data Flow
//! ```text
//! Incoming request path
//!     → scope.rs (is the path gated?)
//!     → matcher.rs (evaluate exclusion conditions)
//!     → gated: run the gate / excluded: forward directly
//! ```
//!
//! # Design Decisions
//! - Scope compiled at startup (and on reload), immutable at runtime
//! - No regex in hot path

pub mod matcher;
pub mod scope;

pub use scope::GateScope;
