//! Axum router wiring.
//!
//! Routes are registered on a bare `Router<AppState>` and then wrapped by the
//! middleware chain, so every endpoint (and the 404/405 fallbacks) sees the
//! same layers.

use axum::{routing::get, Router};

use crate::{api, app_state::AppState, middleware, ops};

/// Application routes without middleware.
pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/user", get(api::users::get_user))
        .route("/users", get(api::users::list_users))
        .route("/health", get(api::health::health))
        .route("/metrics", get(ops::metrics))
}

pub fn build_router(state: AppState) -> Router {
    middleware::apply(routes(), state)
}
