use std::time::Instant;

use axum::extract::Request;
use axum::middleware::Next;
use axum::response::Response;

use super::{remote_addr, request_context};

/// One log event per completed request.
pub async fn access_log(req: Request, next: Next) -> Response {
    let method = req.method().clone();
    let path = req.uri().path().to_string();
    let remote = remote_addr(&req);
    let ctx = request_context(&req);

    let start = Instant::now();
    let resp = next.run(req).await;
    let elapsed = start.elapsed();

    tracing::info!(
        request_id = %ctx,
        %method,
        %path,
        status = resp.status().as_u16(),
        ?elapsed,
        remote_addr = %remote,
        "request completed"
    );
    resp
}
