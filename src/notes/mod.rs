//! Notes collaborator subsystem.
//!
//! The two API routes the gate calls on behalf of a signed-in user. They
//! are opaque: the gate only reads the ids they return.

pub mod client;
pub mod json;

use async_trait::async_trait;
use axum::http::StatusCode;

pub use client::HttpNotesApi;
pub use json::safe_json;

/// Errors from the notes collaborator.
#[derive(Debug, thiserror::Error)]
pub enum NotesError {
    #[error("request failed: {0}")]
    Transport(reqwest::Error),

    #[error("request timed out")]
    Timeout,

    #[error("Expected JSON, got {status} ({content_type}). Body: {body}")]
    NotJson {
        status: StatusCode,
        content_type: String,
        body: String,
    },

    #[error("unexpected JSON from {status}: {source}")]
    Decode {
        status: StatusCode,
        #[source]
        source: serde_json::Error,
    },
}

impl From<reqwest::Error> for NotesError {
    fn from(e: reqwest::Error) -> Self {
        if e.is_timeout() {
            NotesError::Timeout
        } else {
            NotesError::Transport(e)
        }
    }
}

/// Request context forwarded to the collaborator.
#[derive(Debug, Clone, Default)]
pub struct CallContext {
    /// The inbound `Cookie` header, after any session refresh.
    pub cookie: Option<String>,
    pub request_id: Option<String>,
}

#[async_trait]
pub trait NotesApi: Send + Sync {
    /// Id of the user's most recently created note, if any.
    async fn fetch_newest(&self, user_id: &str, ctx: &CallContext) -> Result<Option<String>, NotesError>;

    /// Create an empty note and return its id.
    async fn create(&self, user_id: &str, ctx: &CallContext) -> Result<String, NotesError>;
}
