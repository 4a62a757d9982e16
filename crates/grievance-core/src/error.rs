//! # Error Types
//!
//! Errors raised by the foundational types. All errors use `thiserror`.

use thiserror::Error;

/// Top-level error type for `grievance-core`.
#[derive(Error, Debug)]
pub enum CoreError {
    /// Canonicalization failed.
    #[error("canonicalization error: {0}")]
    Canonicalization(#[from] CanonicalizationError),

    /// A timestamp string or epoch value could not be interpreted.
    #[error("invalid timestamp: {0}")]
    InvalidTimestamp(String),

    /// A grievance identifier could not be parsed.
    #[error("invalid grievance id {0:?}")]
    InvalidId(String),

    /// Timestamp arithmetic left the representable range.
    #[error("timestamp overflow adding {0} seconds")]
    Overflow(i64),
}

/// Error during canonical serialization.
#[derive(Error, Debug)]
pub enum CanonicalizationError {
    /// Float values have no deterministic canonical form.
    #[error("float values are not permitted in canonical representations: {0}")]
    FloatRejected(f64),

    /// JSON serialization failed.
    #[error("serialization failed: {0}")]
    SerializationFailed(#[from] serde_json::Error),
}
