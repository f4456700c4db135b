//! Auth collaborator subsystem.
//!
//! # Data Flow
//! ```text
//! Cookie header
//!     → session.rs (reassemble chunks, decode session JSON)
//!     → supabase.rs (refresh if expiring, look up user)
//!     → Resolution { user, cookie_updates }
//! ```
//!
//! # Design Decisions
//! - Any auth failure resolves to "no user"; the gate never errors on auth
//! - Refreshed sessions are written back as cookie updates, never stored

pub mod session;
pub mod supabase;

use async_trait::async_trait;
use axum::http::StatusCode;
use serde::Deserialize;

pub use session::{CookieUpdate, RequestCookies, Session};
pub use supabase::SupabaseAuth;

/// Identity resolved from the auth collaborator.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct AuthenticatedUser {
    pub id: String,
    #[serde(default)]
    pub email: Option<String>,
}

/// Outcome of resolving a request's session.
#[derive(Debug, Default)]
pub struct Resolution {
    pub user: Option<AuthenticatedUser>,
    /// Cookie changes to apply to the forwarded request and the response.
    pub cookie_updates: Vec<CookieUpdate>,
}

impl Resolution {
    pub fn anonymous() -> Self {
        Self::default()
    }

    pub fn user(user: AuthenticatedUser) -> Self {
        Self {
            user: Some(user),
            cookie_updates: Vec::new(),
        }
    }
}

/// Errors talking to the auth collaborator.
#[derive(Debug, thiserror::Error)]
pub enum AuthError {
    #[error("auth request failed: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("auth rejected the request with {0}")]
    Rejected(StatusCode),

    #[error("auth service answered {0}")]
    Unavailable(StatusCode),

    #[error("session cookie is malformed: {0}")]
    MalformedSession(String),
}

/// Resolves the current user from request cookies.
#[async_trait]
pub trait AuthProvider: Send + Sync {
    async fn resolve(&self, cookies: &RequestCookies) -> Resolution;
}
