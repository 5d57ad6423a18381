use axum::extract::{Request, State};
use axum::middleware::Next;
use axum::response::{IntoResponse, Response};
use usersvc_core::UserError;

use super::remote_addr;
use crate::api::ApiError;
use crate::app_state::AppState;

/// Reject with 429 when the shared bucket is empty. Never queues.
pub async fn rate_limit(State(state): State<AppState>, req: Request, next: Next) -> Response {
    if !state.limiter().allow() {
        tracing::warn!(remote_addr = %remote_addr(&req), path = %req.uri().path(), "rate limit exceeded");
        state.metrics().record_rate_limit_hit();
        return ApiError(UserError::RateLimited).into_response();
    }
    next.run(req).await
}
