#![allow(clippy::unwrap_used)]
#![allow(clippy::expect_used)]
#![allow(clippy::panic)]

mod common;

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use axum::http::{Method, StatusCode};
use axum::routing::get as route_get;

use common::{call, get, limited_config, seeded_state, state_with_users};
use usersvc_server::middleware::{self, cors};
use usersvc_server::router::{build_router, routes};
use usersvc_server::store::memory::seed_users;

async fn boom() -> &'static str {
    panic!("handler exploded")
}

#[tokio::test]
async fn every_response_carries_a_request_id() {
    let app = build_router(seeded_state());
    let a = get(&app, "/health").await;
    let b = get(&app, "/user?id=abc").await;

    let id_a = a.header("x-request-id").expect("request id header");
    let id_b = b.header("x-request-id").expect("request id header");
    uuid::Uuid::parse_str(id_a).expect("uuid");
    assert_ne!(id_a, id_b);
}

#[tokio::test]
async fn cors_headers_on_normal_requests() {
    let app = build_router(seeded_state());
    let resp = get(&app, "/users").await;
    assert_eq!(resp.status, StatusCode::OK);
    assert_eq!(resp.header("access-control-allow-origin"), Some(cors::ALLOW_ORIGIN));
    assert_eq!(resp.header("access-control-allow-methods"), Some(cors::ALLOW_METHODS));
    assert_eq!(resp.header("access-control-allow-headers"), Some(cors::ALLOW_HEADERS));
}

#[tokio::test]
async fn preflight_short_circuits() {
    let hits = Arc::new(AtomicUsize::new(0));
    let counter = Arc::clone(&hits);
    let state = seeded_state();
    let app = middleware::apply(
        routes().route(
            "/count",
            route_get(move || {
                let counter = Arc::clone(&counter);
                async move {
                    counter.fetch_add(1, Ordering::SeqCst);
                    "counted"
                }
            }),
        ),
        state,
    );

    for uri in ["/count", "/user", "/users", "/health"] {
        let resp = call(&app, Method::OPTIONS, uri).await;
        assert_eq!(resp.status, StatusCode::OK, "{uri}");
        assert!(resp.body.is_empty());
        assert_eq!(resp.header("access-control-allow-origin"), Some("*"));
        assert_eq!(resp.header("access-control-allow-methods"), Some(cors::ALLOW_METHODS));
        assert_eq!(resp.header("access-control-allow-headers"), Some(cors::ALLOW_HEADERS));
    }
    assert_eq!(hits.load(Ordering::SeqCst), 0);

    let resp = get(&app, "/count").await;
    assert_eq!(resp.body, "counted");
    assert_eq!(hits.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn panics_become_500_and_are_counted_once() {
    let state = seeded_state();
    let app = middleware::apply(routes().route("/boom", route_get(boom)), state.clone());
    let metrics = state.metrics();

    let resp = get(&app, "/boom").await;
    assert_eq!(resp.status, StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(resp.body, "internal server error");
    assert!(resp.header("x-request-id").is_some());
    assert_eq!(metrics.panic_recovery_count(), 1);

    get(&app, "/boom").await;
    assert_eq!(metrics.panic_recovery_count(), 2);
    assert_eq!(metrics.errors.get(&[("type", "panic"), ("endpoint", "/boom")]), 2);

    // The in-flight guard unwinds with the panic.
    assert_eq!(metrics.in_flight(), 0);

    // The same router keeps serving.
    let resp = get(&app, "/health").await;
    assert_eq!(resp.status, StatusCode::OK);
}

#[tokio::test]
async fn over_budget_requests_get_429() {
    // Effectively no refill during the test: only the burst is available.
    let state = state_with_users(seed_users(), limited_config(0.001, 3));
    let app = build_router(state.clone());

    for _ in 0..3 {
        let resp = get(&app, "/user?id=1").await;
        assert_eq!(resp.status, StatusCode::OK);
    }
    for _ in 0..2 {
        let resp = get(&app, "/user?id=1").await;
        assert_eq!(resp.status, StatusCode::TOO_MANY_REQUESTS);
        assert_eq!(resp.body, "rate limit exceeded");
        assert!(resp.header("x-request-id").is_some());
        assert_eq!(resp.header("access-control-allow-origin"), Some("*"));
    }

    let metrics = state.metrics();
    assert_eq!(metrics.rate_limit_hits.get(&[]), 2);
    // Rejected requests never reach the metrics stage.
    assert_eq!(
        metrics.http_requests.get(&[
            ("method", "GET"),
            ("endpoint", "/user"),
            ("status_code", "200"),
        ]),
        3
    );
}

#[tokio::test]
async fn request_metrics_are_recorded() {
    let state = seeded_state();
    let app = build_router(state.clone());

    get(&app, "/user?id=1").await;
    get(&app, "/user?id=77").await;
    get(&app, "/users").await;

    let m = state.metrics();
    assert_eq!(
        m.http_requests.get(&[("method", "GET"), ("endpoint", "/user"), ("status_code", "200")]),
        1
    );
    assert_eq!(
        m.http_requests.get(&[("method", "GET"), ("endpoint", "/user"), ("status_code", "404")]),
        1
    );
    assert_eq!(
        m.http_request_duration.count(&[("method", "GET"), ("endpoint", "/user")]),
        2
    );
    assert_eq!(m.in_flight(), 0);
    assert!(m.last_request_time.get(&[]) > 0);

    let resp = get(&app, "/metrics").await;
    assert_eq!(resp.status, StatusCode::OK);
    assert!(resp
        .header("content-type")
        .unwrap()
        .starts_with("text/plain; version=0.0.4"));
    assert!(resp
        .body
        .contains("http_requests_total{endpoint=\"/user\",method=\"GET\",status_code=\"200\"} 1"));
    assert!(resp.body.contains("users_total 3"));
    assert!(resp.body.contains("user_lookups_total{result=\"found\"} 1"));
    assert!(resp.body.contains("# TYPE http_request_duration_seconds histogram"));
    assert!(resp.body.contains("uptime_seconds_total"));
}
