use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde_json::{Value, json};
use thiserror::Error as ThisError;

/// Message returned when either upload field is absent or empty.
pub const MISSING_UPLOAD_FIELDS: &str = "Missing fileName or fileContent";

#[derive(ThisError, Debug)]
pub enum Error {
    /// Invalid request data; the upstream is never contacted
    #[error("{message}")]
    BadRequest { message: String },

    /// Request body larger than the configured `max_body_bytes`
    #[error("Request body exceeds {limit} bytes")]
    PayloadTooLarge { limit: usize },

    /// The upstream answered with a non-success status. Its status and body are forwarded as-is.
    #[error("{message}: upstream responded with {status}")]
    Upstream { message: String, status: StatusCode, details: Value },

    /// Generic internal service error
    #[error("Failed to {operation}")]
    Internal { operation: String },

    /// Unexpected error with full context chain
    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

impl Error {
    pub fn status_code(&self) -> StatusCode {
        match self {
            Error::BadRequest { .. } => StatusCode::BAD_REQUEST,
            Error::PayloadTooLarge { .. } => StatusCode::PAYLOAD_TOO_LARGE,
            Error::Upstream { status, .. } => *status,
            Error::Internal { .. } | Error::Other(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Returns a user-safe error message, without leaking internal implementation details
    pub fn user_message(&self) -> String {
        match self {
            Error::BadRequest { message } | Error::Upstream { message, .. } => message.clone(),
            Error::PayloadTooLarge { .. } => self.to_string(),
            Error::Internal { .. } | Error::Other(_) => "Internal server error".to_string(),
        }
    }
}

impl IntoResponse for Error {
    fn into_response(self) -> Response {
        match &self {
            Error::Internal { .. } | Error::Other(_) => {
                tracing::error!("Internal service error: {:#}", self);
            }
            Error::Upstream { details, .. } => {
                tracing::warn!(details = %details, "Upstream error: {}", self);
            }
            Error::BadRequest { .. } | Error::PayloadTooLarge { .. } => {
                tracing::debug!("Client error: {}", self);
            }
        }

        let status = self.status_code();
        let body = match self {
            Error::Upstream { message, details, .. } => json!({
                "error": message,
                "details": details,
            }),
            other => json!({ "error": other.user_message() }),
        };

        (status, Json(body)).into_response()
    }
}

/// Type alias for service operation results
pub type Result<T> = std::result::Result<T, Error>;
