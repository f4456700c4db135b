//! Crate error type and its HTTP mapping.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
};
use thiserror::Error;

use crate::config::ConfigError;
use crate::notes::NotesError;

pub type Result<T> = std::result::Result<T, GateError>;

#[derive(Debug, Error)]
pub enum GateError {
    #[error("Notes collaborator failed: {0}")]
    Notes(#[from] NotesError),

    #[error("Upstream request failed: {0}")]
    Upstream(String),

    #[error("HTTP client error: {0}")]
    HttpClient(#[from] reqwest::Error),

    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl IntoResponse for GateError {
    fn into_response(self) -> Response {
        let status = match &self {
            GateError::Upstream(_) => StatusCode::BAD_GATEWAY,
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        };

        tracing::error!(status = %status, error = %self, "Request failed");

        (status, self.to_string()).into_response()
    }
}
