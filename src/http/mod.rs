//! HTTP protocol handling subsystem.
//!
//! # Data Flow
//! ```text
//! TCP connection
//!     → server.rs (Axum setup, middleware stack)
//!     → request.rs (request ID)
//!     → gate middleware (redirect or let through)
//!     → proxy.rs (forward to upstream)
//!     → response.rs (redirects, Set-Cookie)
//!     → Send to client
//! ```

pub mod proxy;
pub mod request;
pub mod response;
pub mod server;

pub use request::{RequestIdExt, X_REQUEST_ID};
pub use server::HttpServer;
