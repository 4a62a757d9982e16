//! # API Error Types
//!
//! Structured error type implementing `axum::response::IntoResponse`.
//! Maps action, lifecycle, and store errors to HTTP status codes. Server-side
//! failures are logged in full and surfaced only as `"Server error"`.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use grievance_state::LifecycleError;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use utoipa::ToSchema;

use crate::actions::ActionError;

/// JSON error response body.
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct ErrorBody {
    /// Human-readable message.
    pub error: String,
    /// Machine-readable code (e.g. `NOT_FOUND`, `VALIDATION_ERROR`).
    pub code: String,
}

/// Application-level error type that implements [`IntoResponse`] for Axum.
#[derive(Error, Debug)]
pub enum AppError {
    /// Business rule violation in the request (400).
    #[error("{0}")]
    Validation(String),

    /// Request could not be parsed (400).
    #[error("{0}")]
    BadRequest(String),

    /// Grievance does not exist (404).
    #[error("Grievance not found")]
    NotFound,

    /// Action not permitted on this record (403).
    #[error("{0}")]
    Forbidden(String),

    /// Lost a concurrent-update race (409).
    #[error("{0}")]
    Conflict(String),

    /// Store timed out (500). Message is logged, not returned.
    #[error("transient failure: {0}")]
    Transient(String),

    /// Internal server error (500). Message is logged, not returned.
    #[error("internal error: {0}")]
    Internal(String),
}

impl AppError {
    /// HTTP status and machine-readable code for this error.
    fn status_and_code(&self) -> (StatusCode, &'static str) {
        match self {
            Self::Validation(_) => (StatusCode::BAD_REQUEST, "VALIDATION_ERROR"),
            Self::BadRequest(_) => (StatusCode::BAD_REQUEST, "BAD_REQUEST"),
            Self::NotFound => (StatusCode::NOT_FOUND, "NOT_FOUND"),
            Self::Forbidden(_) => (StatusCode::FORBIDDEN, "FORBIDDEN"),
            Self::Conflict(_) => (StatusCode::CONFLICT, "CONFLICT"),
            Self::Transient(_) => (StatusCode::INTERNAL_SERVER_ERROR, "TRANSIENT_ERROR"),
            Self::Internal(_) => (StatusCode::INTERNAL_SERVER_ERROR, "INTERNAL_ERROR"),
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, code) = self.status_and_code();

        let message = match &self {
            Self::Transient(_) | Self::Internal(_) => {
                tracing::error!(error = %self, "request failed");
                "Server error".to_string()
            }
            other => other.to_string(),
        };

        let body = ErrorBody {
            error: message,
            code: code.to_string(),
        };
        (status, Json(body)).into_response()
    }
}

impl From<LifecycleError> for AppError {
    fn from(err: LifecycleError) -> Self {
        match err {
            LifecycleError::MissingField { .. }
            | LifecycleError::InvalidTimeLimit { .. }
            | LifecycleError::UnknownRole(_) => Self::Validation(err.to_string()),
            LifecycleError::DisputeThresholdReached { .. } | LifecycleError::AlreadyVerified => {
                Self::Forbidden(err.to_string())
            }
            LifecycleError::UnknownStatus(_) | LifecycleError::Core(_) => {
                Self::Internal(err.to_string())
            }
        }
    }
}

impl From<ActionError> for AppError {
    fn from(err: ActionError) -> Self {
        match err {
            ActionError::Lifecycle(e) => e.into(),
            ActionError::NotFound(_) => Self::NotFound,
            ActionError::Conflict(_) => Self::Conflict(err.to_string()),
            ActionError::Transient(_) => Self::Transient(err.to_string()),
            ActionError::Store(e) => Self::Internal(e.to_string()),
        }
    }
}
