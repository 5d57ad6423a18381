use std::time::Instant;

use axum::extract::{MatchedPath, Request, State};
use axum::middleware::Next;
use axum::response::Response;

use crate::app_state::AppState;

/// In-flight gauge, last-request time, request counter and duration histogram.
pub async fn track_metrics(State(state): State<AppState>, req: Request, next: Next) -> Response {
    let metrics = state.metrics();
    let _in_flight = metrics.track_in_flight();
    metrics.update_last_request_time();

    let method = req.method().to_string();
    // Route template keeps label cardinality bounded; raw path for unmatched.
    let endpoint = req
        .extensions()
        .get::<MatchedPath>()
        .map(|p| p.as_str().to_string())
        .unwrap_or_else(|| req.uri().path().to_string());

    let start = Instant::now();
    let resp = next.run(req).await;
    metrics.record_request(&method, &endpoint, resp.status().as_u16(), start.elapsed());
    resp
}
