//! HTTP handlers for the user endpoints.
//!
//! - `GET /user?id=` : single user by id
//! - `GET /users`    : all users plus a total
//! - `GET /health`   : liveness with the current user count

pub mod error;
pub mod health;
pub mod users;

pub use error::ApiError;

use axum::http::header;
use axum::response::{IntoResponse, Response};
use serde::Serialize;
use usersvc_core::UserError;

/// Serialize `value` as a JSON response, surfacing failures as encoding errors.
pub(crate) fn json_response<T: Serialize>(value: &T) -> Result<Response, UserError> {
    let body = serde_json::to_vec(value).map_err(|e| UserError::Encoding(e.to_string()))?;
    Ok(([(header::CONTENT_TYPE, "application/json")], body).into_response())
}
