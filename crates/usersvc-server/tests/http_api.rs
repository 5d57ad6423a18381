#![allow(clippy::unwrap_used)]
#![allow(clippy::expect_used)]
#![allow(clippy::panic)]

mod common;

use std::sync::Arc;

use async_trait::async_trait;
use axum::http::StatusCode;
use chrono::DateTime;

use common::{get, relaxed_config, seeded_state, state_with_store, state_with_users};
use usersvc_core::{Result, User, UserError};
use usersvc_server::router::build_router;
use usersvc_server::store::UserStore;

#[tokio::test]
async fn get_existing_users() {
    let app = build_router(seeded_state());
    for (id, name) in [(1, "John Doe"), (2, "Jane Smith"), (3, "Bob Johnson")] {
        let resp = get(&app, &format!("/user?id={id}")).await;
        assert_eq!(resp.status, StatusCode::OK);
        assert_eq!(resp.header("content-type"), Some("application/json"));
        let v = resp.json();
        assert_eq!(v["id"], id);
        assert_eq!(v["name"], name);
    }
}

#[tokio::test]
async fn missing_id_is_bad_request() {
    let app = build_router(seeded_state());
    for uri in ["/user", "/user?id=", "/user?other=1"] {
        let resp = get(&app, uri).await;
        assert_eq!(resp.status, StatusCode::BAD_REQUEST, "{uri}");
        assert_eq!(resp.body, "id parameter is missing");
    }
}

#[tokio::test]
async fn repeated_id_uses_first_value() {
    let app = build_router(seeded_state());
    for uri in ["/user?id=1&id=2", "/user?other=x&id=1&id=3"] {
        let resp = get(&app, uri).await;
        assert_eq!(resp.status, StatusCode::OK, "{uri}");
        assert_eq!(resp.json()["id"], 1);
    }

    let resp = get(&app, "/user?id=&id=2").await;
    assert_eq!(resp.status, StatusCode::BAD_REQUEST);
    assert_eq!(resp.body, "id parameter is missing");
}

#[tokio::test]
async fn non_numeric_id_is_bad_request() {
    let app = build_router(seeded_state());
    for uri in ["/user?id=abc", "/user?id=1.5", "/user?id=%21%40%23", "/user?id=%ZZ"] {
        let resp = get(&app, uri).await;
        assert_eq!(resp.status, StatusCode::BAD_REQUEST, "{uri}");
        assert_eq!(resp.body, "id parameter is invalid");
    }
}

#[tokio::test]
async fn absent_integer_ids_are_not_found() {
    let app = build_router(seeded_state());
    for uri in ["/user?id=-1", "/user?id=0", "/user?id=4", "/user?id=9223372036854775807"] {
        let resp = get(&app, uri).await;
        assert_eq!(resp.status, StatusCode::NOT_FOUND, "{uri}");
        assert_eq!(resp.body, "user not found");
    }
}

#[tokio::test]
async fn lookups_are_counted_by_outcome() {
    let state = seeded_state();
    let app = build_router(state.clone());
    get(&app, "/user?id=1").await;
    get(&app, "/user?id=2").await;
    get(&app, "/user?id=100").await;
    get(&app, "/user?id=abc").await;

    let m = state.metrics();
    assert_eq!(m.user_lookups.get(&[("result", "found")]), 2);
    assert_eq!(m.user_lookups.get(&[("result", "not_found")]), 1);
}

#[tokio::test]
async fn list_total_matches_users() {
    for n in [0usize, 1, 3, 25] {
        let users = (1..=n as i64)
            .map(|i| User::new(i, format!("user {i}"), format!("u{i}@example.com")))
            .collect();
        let app = build_router(state_with_users(users, relaxed_config()));

        let resp = get(&app, "/users").await;
        assert_eq!(resp.status, StatusCode::OK);
        let v = resp.json();
        let listed = v["users"].as_array().expect("users array");
        assert_eq!(listed.len(), n);
        assert_eq!(v["total"], n);
    }
}

#[tokio::test]
async fn health_reports_count() {
    let app = build_router(seeded_state());
    let resp = get(&app, "/health").await;
    assert_eq!(resp.status, StatusCode::OK);

    let v = resp.json();
    assert_eq!(v["status"], "healthy");
    assert_eq!(v["service"], "user-service");
    assert_eq!(v["users_count"], 3);
    let ts = v["timestamp"].as_str().expect("timestamp string");
    DateTime::parse_from_rfc3339(ts).expect("rfc3339 timestamp");

    let empty = build_router(state_with_users(vec![], relaxed_config()));
    let v = get(&empty, "/health").await.json();
    assert_eq!(v["status"], "healthy");
    assert_eq!(v["users_count"], 0);
}

#[tokio::test]
async fn concurrent_lookups_do_not_mix() {
    let app = build_router(seeded_state());
    let names = ["John Doe", "Jane Smith", "Bob Johnson"];

    let mut tasks = Vec::new();
    for i in 0..60 {
        let app = app.clone();
        let id = i % 3 + 1;
        tasks.push(tokio::spawn(async move {
            let v = get(&app, &format!("/user?id={id}")).await.json();
            (id, v)
        }));
    }
    for t in tasks {
        let (id, v) = t.await.unwrap();
        assert_eq!(v["id"], id);
        assert_eq!(v["name"], names[(id - 1) as usize]);
    }
}

#[tokio::test]
async fn unknown_path_is_not_found() {
    let app = build_router(seeded_state());
    let resp = get(&app, "/nope").await;
    assert_eq!(resp.status, StatusCode::NOT_FOUND);
}

struct BrokenStore;

#[async_trait]
impl UserStore for BrokenStore {
    async fn get(&self, _id: i64) -> Result<Option<User>> {
        Err(UserError::Store("connection reset".into()))
    }
    async fn list(&self) -> Result<Vec<User>> {
        Err(UserError::Store("connection reset".into()))
    }
    async fn count(&self) -> Result<usize> {
        Err(UserError::Store("connection reset".into()))
    }
    async fn insert(&self, _user: User) -> Result<User> {
        Err(UserError::Store("connection reset".into()))
    }
}

#[tokio::test]
async fn store_failures_are_internal_errors() {
    let app = build_router(state_with_store(Arc::new(BrokenStore), relaxed_config()));
    for uri in ["/user?id=1", "/users", "/health"] {
        let resp = get(&app, uri).await;
        assert_eq!(resp.status, StatusCode::INTERNAL_SERVER_ERROR, "{uri}");
        assert_eq!(resp.body, "internal server error");
        assert!(!resp.body.contains("connection reset"));
    }
}
