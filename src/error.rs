//! Domain error types for the league portal.
//!
//! Uses thiserror for ergonomic error handling with automatic Display implementations.
//! The variants follow how remote failures are treated by callers: a `NotFound`
//! is an expected branch, a `Conflict` is usually resolved by reloading, and
//! everything else ends up as a user-visible notification.

use actix_web::{HttpResponse, ResponseError};
use std::fmt;

/// Application-level errors.
#[derive(Debug, thiserror::Error)]
pub enum AppError {
    /// Remote call did not complete (connection, timeout, malformed reply)
    #[error("Transport error: {0}")]
    Transport(String),

    /// Resource not found
    #[error("{0} not found")]
    NotFound(String),

    /// Uniqueness violation reported by the remote store
    #[error("Conflict: {0}")]
    Conflict(String),

    /// Remote store denied the operation
    #[error("Unauthorized: {0}")]
    Unauthorized(String),

    /// Any other failure reported by the remote store
    #[error("Remote store error ({status}): {message}")]
    Remote { status: u16, message: String },

    /// Invalid input data
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// Identity provider rejected a grant
    #[error("Authentication failed: {0}")]
    Auth(String),

    /// Local session storage failed
    #[error("Session storage error: {0}")]
    Storage(String),
}

impl AppError {
    /// True for the "expected absence" branch.
    pub fn is_not_found(&self) -> bool {
        matches!(self, AppError::NotFound(_))
    }

    /// True when the store rejected a duplicate key.
    pub fn is_conflict(&self) -> bool {
        matches!(self, AppError::Conflict(_))
    }
}

impl ResponseError for AppError {
    fn error_response(&self) -> HttpResponse {
        let (status, error_code) = match self {
            AppError::Transport(_) | AppError::Remote { .. } => {
                (actix_web::http::StatusCode::BAD_GATEWAY, "UPSTREAM_ERROR")
            }
            AppError::NotFound(_) => (actix_web::http::StatusCode::NOT_FOUND, "NOT_FOUND"),
            AppError::Conflict(_) => (actix_web::http::StatusCode::CONFLICT, "CONFLICT"),
            AppError::Unauthorized(_) | AppError::Auth(_) => {
                (actix_web::http::StatusCode::UNAUTHORIZED, "UNAUTHORIZED")
            }
            AppError::InvalidInput(_) => {
                (actix_web::http::StatusCode::BAD_REQUEST, "INVALID_INPUT")
            }
            AppError::Storage(err_str) => {
                tracing::error!("Session storage error: {}", err_str);
                (
                    actix_web::http::StatusCode::INTERNAL_SERVER_ERROR,
                    "STORAGE_ERROR",
                )
            }
        };

        HttpResponse::build(status).json(ErrorResponse {
            error: error_code.to_string(),
            message: self.to_string(),
        })
    }
}

/// Error response body returned by the callback listener.
#[derive(Debug, serde::Serialize)]
pub struct ErrorResponse {
    pub error: String,
    pub message: String,
}

impl fmt::Display for ErrorResponse {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.error, self.message)
    }
}

/// Convenience type alias for Results with AppError.
pub type AppResult<T> = Result<T, AppError>;

// Conversion implementations for common error types

impl From<serde_json::Error> for AppError {
    fn from(err: serde_json::Error) -> Self {
        AppError::InvalidInput(format!("JSON parsing error: {}", err))
    }
}

impl From<reqwest::Error> for AppError {
    fn from(err: reqwest::Error) -> Self {
        AppError::Transport(err.to_string())
    }
}

impl From<std::io::Error> for AppError {
    fn from(err: std::io::Error) -> Self {
        AppError::Storage(err.to_string())
    }
}
