//! HTTP mapping for `UserError`.

use axum::http::{header, StatusCode};
use axum::response::{IntoResponse, Response};
use usersvc_core::{ClientCode, UserError};

/// Handler error. Renders a short plain-text message; internal detail is
/// never sent to the client.
#[derive(Debug)]
pub struct ApiError(pub UserError);

impl From<UserError> for ApiError {
    fn from(e: UserError) -> Self {
        Self(e)
    }
}

pub fn status_for(code: ClientCode) -> StatusCode {
    match code {
        ClientCode::BadRequest => StatusCode::BAD_REQUEST,
        ClientCode::NotFound => StatusCode::NOT_FOUND,
        ClientCode::RateLimited => StatusCode::TOO_MANY_REQUESTS,
        ClientCode::Internal => StatusCode::INTERNAL_SERVER_ERROR,
    }
}

/// Plain-text error response with the given status.
pub fn plain_error(status: StatusCode, msg: &str) -> Response {
    (
        status,
        [(header::CONTENT_TYPE, "text/plain; charset=utf-8")],
        msg.to_string(),
    )
        .into_response()
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        plain_error(status_for(self.0.client_code()), &self.0.client_message())
    }
}
