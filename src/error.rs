/// Unified error types for the clinic backend
use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Main error type for the clinic backend
#[derive(Error, Debug)]
pub enum ClinicError {
    /// Database errors
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    /// Missing or malformed request fields
    #[error("{0}")]
    Validation(String),

    /// Missing, invalid or expired token, or bad credentials
    #[error("{0}")]
    Authentication(String),

    /// Role or ownership mismatch
    #[error("{0}")]
    Authorization(String),

    /// Referenced id does not exist
    #[error("{0}")]
    NotFound(String),

    /// Duplicate unique field or occupied appointment slot
    #[error("{0}")]
    Conflict(String),

    /// Rate limiting errors
    #[error("Rate limit exceeded")]
    RateLimitExceeded { retry_after: std::time::Duration },

    /// Internal server errors
    #[error("Internal error: {0}")]
    Internal(String),

    /// IO errors
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl ClinicError {
    /// True when a database error is a UNIQUE constraint violation
    pub fn is_unique_violation(err: &sqlx::Error) -> bool {
        matches!(err, sqlx::Error::Database(db) if db.is_unique_violation())
    }

    /// HTTP status this error maps to
    pub fn status_code(&self) -> StatusCode {
        match self {
            ClinicError::Validation(_) => StatusCode::BAD_REQUEST,
            ClinicError::Authentication(_) => StatusCode::UNAUTHORIZED,
            ClinicError::Authorization(_) => StatusCode::FORBIDDEN,
            ClinicError::NotFound(_) => StatusCode::NOT_FOUND,
            // Clients of the clinic API expect duplicates to be a plain 400
            ClinicError::Conflict(_) => StatusCode::BAD_REQUEST,
            ClinicError::RateLimitExceeded { .. } => StatusCode::TOO_MANY_REQUESTS,
            ClinicError::Database(_) | ClinicError::Internal(_) | ClinicError::Io(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }
}

/// Error response body
#[derive(Debug, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub error: String,
    pub message: String,
}

/// Convert ClinicError to HTTP response
impl IntoResponse for ClinicError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        let (error_code, message) = match &self {
            ClinicError::Validation(_) => ("InvalidRequest", self.to_string()),
            ClinicError::Authentication(_) => ("AuthenticationRequired", self.to_string()),
            ClinicError::Authorization(_) => ("Forbidden", self.to_string()),
            ClinicError::NotFound(_) => ("NotFound", self.to_string()),
            ClinicError::Conflict(_) => ("Conflict", self.to_string()),
            ClinicError::RateLimitExceeded { .. } => {
                ("RateLimitExceeded", "Rate limit exceeded".to_string())
            }
            ClinicError::Database(_) | ClinicError::Internal(_) | ClinicError::Io(_) => {
                tracing::error!("Unhandled server error: {}", self);
                (
                    "InternalServerError",
                    "Internal server error".to_string(), // Don't leak details
                )
            }
        };

        let body = Json(ErrorResponse {
            error: error_code.to_string(),
            message,
        });

        (status, body).into_response()
    }
}

/// Result type alias for clinic operations
pub type ClinicResult<T> = Result<T, ClinicError>;
