//! Sign-in gate for the notes web application.
//!
//! Sits in front of the app as a reverse proxy: resolves the visitor's
//! session with the auth service, redirects guests to login, lands signed-in
//! users on a note, and forwards everything else untouched.

pub mod auth;
pub mod config;
pub mod error;
pub mod gate;
pub mod http;
pub mod lifecycle;
pub mod notes;
pub mod observability;
pub mod routing;

pub use config::schema::GateConfig;
pub use error::GateError;
pub use http::HttpServer;
pub use lifecycle::Shutdown;
