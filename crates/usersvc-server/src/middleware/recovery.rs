use std::any::Any;
use std::panic::AssertUnwindSafe;

use axum::extract::{Request, State};
use axum::http::StatusCode;
use axum::middleware::Next;
use axum::response::Response;
use futures_util::FutureExt;

use super::request_context;
use crate::api::error::plain_error;
use crate::app_state::AppState;

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "non-string panic payload".to_string()
    }
}

/// Turn a panic anywhere below this layer into a 500.
pub async fn recover_panics(State(state): State<AppState>, req: Request, next: Next) -> Response {
    let path = req.uri().path().to_string();
    let ctx = request_context(&req);

    match AssertUnwindSafe(next.run(req)).catch_unwind().await {
        Ok(resp) => resp,
        Err(payload) => {
            let msg = panic_message(payload.as_ref());
            tracing::error!(request_id = %ctx, %path, panic = %msg, "panic recovered");

            let metrics = state.metrics();
            metrics.record_panic_recovery();
            metrics.record_error("panic", &path);

            plain_error(StatusCode::INTERNAL_SERVER_ERROR, "internal server error")
        }
    }
}
