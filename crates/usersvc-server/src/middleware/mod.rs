//! Request middleware chain.
//!
//! Fixed order, outermost first:
//! request id -> panic recovery -> CORS -> rate limit -> metrics -> access log.
//! Each stage either forwards to the next one or short-circuits with its own
//! response (CORS preflight, rate-limit rejection, recovered panic). Status
//! codes are read from the `Response` the inner stage returns.

pub mod access_log;
pub mod cors;
pub mod metrics;
pub mod rate_limit;
pub mod recovery;
pub mod request_id;

use std::net::SocketAddr;

use axum::extract::{ConnectInfo, Request};
use axum::middleware::{from_fn, from_fn_with_state};
use axum::Router;

use crate::app_state::AppState;
use crate::context::RequestContext;

pub use request_id::X_REQUEST_ID;

/// Wrap `routes` in the full chain and attach state.
pub fn apply(routes: Router<AppState>, state: AppState) -> Router {
    // `Router::layer` wraps previously added layers; add innermost first.
    routes
        .layer(from_fn(access_log::access_log))
        .layer(from_fn_with_state(state.clone(), metrics::track_metrics))
        .layer(from_fn_with_state(state.clone(), rate_limit::rate_limit))
        .layer(from_fn(cors::cors))
        .layer(from_fn_with_state(state.clone(), recovery::recover_panics))
        .layer(from_fn(request_id::request_id))
        .with_state(state)
}

/// Peer address when the server was started with connect info.
pub(crate) fn remote_addr(req: &Request) -> String {
    req.extensions()
        .get::<ConnectInfo<SocketAddr>>()
        .map(|c| c.0.to_string())
        .unwrap_or_else(|| "unknown".to_string())
}

pub(crate) fn request_context(req: &Request) -> RequestContext {
    req.extensions()
        .get::<RequestContext>()
        .cloned()
        .unwrap_or_else(RequestContext::detached)
}
