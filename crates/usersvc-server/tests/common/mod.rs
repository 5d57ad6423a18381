//! Shared helpers for driving the router in-process.

#![allow(clippy::unwrap_used)]
#![allow(clippy::expect_used)]
#![allow(dead_code)]

use std::sync::Arc;

use axum::body::Body;
use axum::http::{HeaderMap, Method, Request, StatusCode};
use axum::Router;
use tower::ServiceExt;

use usersvc_core::User;
use usersvc_server::app_state::AppState;
use usersvc_server::config::ServiceConfig;
use usersvc_server::obs::ServiceMetrics;
use usersvc_server::store::memory::seed_users;
use usersvc_server::store::{InMemoryUserStore, UserStore};

pub struct TestResponse {
    pub status: StatusCode,
    pub headers: HeaderMap,
    pub body: String,
}

impl TestResponse {
    pub fn json(&self) -> serde_json::Value {
        serde_json::from_str(&self.body).expect("body must be json")
    }

    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers.get(name).and_then(|v| v.to_str().ok())
    }
}

/// Config with a limiter wide enough to never interfere.
pub fn relaxed_config() -> ServiceConfig {
    limited_config(10_000.0, 10_000)
}

pub fn limited_config(rps: f64, burst: u32) -> ServiceConfig {
    let mut cfg = ServiceConfig::default();
    cfg.rate_limit.requests_per_second = rps;
    cfg.rate_limit.burst_size = burst;
    cfg
}

pub fn state_with_users(users: Vec<User>, cfg: ServiceConfig) -> AppState {
    let metrics = Arc::new(ServiceMetrics::new());
    let store = Arc::new(InMemoryUserStore::with_users(users, Arc::clone(&metrics)));
    AppState::new(cfg, store, metrics)
}

pub fn state_with_store(store: Arc<dyn UserStore>, cfg: ServiceConfig) -> AppState {
    AppState::new(cfg, store, Arc::new(ServiceMetrics::new()))
}

pub fn seeded_state() -> AppState {
    state_with_users(seed_users(), relaxed_config())
}

pub async fn call(app: &Router, method: Method, uri: &str) -> TestResponse {
    let req = Request::builder()
        .method(method)
        .uri(uri)
        .body(Body::empty())
        .unwrap();
    let resp = app.clone().oneshot(req).await.unwrap();

    let status = resp.status();
    let headers = resp.headers().clone();
    let bytes = axum::body::to_bytes(resp.into_body(), usize::MAX).await.unwrap();
    TestResponse {
        status,
        headers,
        body: String::from_utf8(bytes.to_vec()).unwrap(),
    }
}

pub async fn get(app: &Router, uri: &str) -> TestResponse {
    call(app, Method::GET, uri).await
}
