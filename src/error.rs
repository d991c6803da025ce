// src/error.rs
// Error types shared by the resolver, recorder and HTTP layer

use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde_json::json;
use thiserror::Error;

/// Main error type for wafaq
#[derive(Error, Debug)]
pub enum WafaqError {
    #[error("{0}")]
    InvalidInput(String),

    #[error("{0}")]
    Upstream(String),

    /// The remote assistant no longer knows the session (HTTP 404).
    /// Only the resolver's retry loop should ever see this.
    #[error("session expired: {0}")]
    SessionExpired(String),

    #[error("configuration error: {0}")]
    Config(String),

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("JSON serialization error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Convenience type alias for Result using WafaqError
pub type Result<T> = std::result::Result<T, WafaqError>;

impl WafaqError {
    pub fn invalid_input(message: impl Into<String>) -> Self {
        Self::InvalidInput(message.into())
    }

    pub fn upstream(message: impl Into<String>) -> Self {
        Self::Upstream(message.into())
    }

    pub fn is_session_expired(&self) -> bool {
        matches!(self, Self::SessionExpired(_))
    }

    /// Collapse everything the caller cannot act on into `Upstream`.
    /// Input errors keep their identity.
    pub fn into_upstream(self) -> Self {
        match self {
            Self::InvalidInput(_) | Self::Upstream(_) => self,
            Self::SessionExpired(msg) => Self::Upstream(format!("session expired after retry: {msg}")),
            other => Self::Upstream(other.to_string()),
        }
    }

    pub fn status_code(&self) -> StatusCode {
        match self {
            Self::Io(_) | Self::Config(_) => StatusCode::INTERNAL_SERVER_ERROR,
            _ => StatusCode::BAD_REQUEST,
        }
    }
}

impl IntoResponse for WafaqError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        (status, Json(json!({ "error": self.to_string() }))).into_response()
    }
}
