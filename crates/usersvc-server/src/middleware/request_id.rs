use axum::extract::Request;
use axum::http::{HeaderName, HeaderValue};
use axum::middleware::Next;
use axum::response::Response;

use crate::context::RequestContext;

pub const X_REQUEST_ID: HeaderName = HeaderName::from_static("x-request-id");

/// Tag the request with a fresh id and echo it in `X-Request-ID`.
pub async fn request_id(mut req: Request, next: Next) -> Response {
    let ctx = RequestContext::generate();
    let value = HeaderValue::from_str(&ctx.request_id).ok();
    req.extensions_mut().insert(ctx);

    let mut resp = next.run(req).await;
    if let Some(v) = value {
        resp.headers_mut().insert(X_REQUEST_ID, v);
    }
    resp
}
