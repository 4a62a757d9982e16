//! # Custom Extractors
//!
//! JSON body extraction with error mapping, the acting role, and grievance
//! ids taken from the path.

use axum::extract::rejection::JsonRejection;
use axum::extract::{FromRequestParts, Path};
use axum::http::request::Parts;
use axum::Json;
use grievance_core::GrievanceId;
use grievance_state::Role;

use crate::error::AppError;

/// Header carrying the caller's role.
pub const ROLE_HEADER: &str = "x-grievance-role";

/// Extract a JSON body, mapping deserialization errors to [`AppError::BadRequest`].
///
/// ```ignore
/// async fn handler(body: Result<Json<T>, JsonRejection>) -> Result<..., AppError> {
///     let req = extract_json(body)?;
/// }
/// ```
pub fn extract_json<T>(result: Result<Json<T>, JsonRejection>) -> Result<T, AppError> {
    result
        .map(|Json(v)| v)
        .map_err(|err| AppError::BadRequest(err.body_text()))
}

/// The role the caller acts as, read from [`ROLE_HEADER`].
///
/// Authentication happens upstream; an absent header means `user`. The
/// `system` role is reserved for the sweeper and rejected here.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Actor(pub Role);

#[axum::async_trait]
impl<S: Send + Sync> FromRequestParts<S> for Actor {
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        let Some(value) = parts.headers.get(ROLE_HEADER) else {
            return Ok(Self(Role::default()));
        };
        let raw = value
            .to_str()
            .map_err(|_| AppError::BadRequest(format!("{ROLE_HEADER} must be ASCII")))?;
        raw.parse()
            .map(Self)
            .map_err(|e: grievance_state::LifecycleError| AppError::BadRequest(e.to_string()))
    }
}

/// A grievance id from the `:id` path segment.
///
/// An unparseable id cannot name a stored record, so it is reported as
/// not found rather than as a malformed request.
#[derive(Debug, Clone, Copy)]
pub struct GrievancePath(pub GrievanceId);

#[axum::async_trait]
impl<S: Send + Sync> FromRequestParts<S> for GrievancePath {
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let Path(raw) = Path::<String>::from_request_parts(parts, state)
            .await
            .map_err(|_| AppError::NotFound)?;
        raw.parse().map(Self).map_err(|_| AppError::NotFound)
    }
}
