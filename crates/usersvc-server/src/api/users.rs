use axum::extract::{Query, State};
use axum::response::Response;
use serde::Serialize;
use usersvc_core::{parse_user_id, User, UserError};

use super::{json_response, ApiError};
use crate::app_state::AppState;
use crate::context::RequestContext;

#[derive(Debug, Serialize)]
struct UserList {
    users: Vec<User>,
    total: usize,
}

/// `GET /user?id=`. A repeated `id` resolves to its first value.
pub async fn get_user(
    State(state): State<AppState>,
    ctx: RequestContext,
    Query(pairs): Query<Vec<(String, String)>>,
) -> Result<Response, ApiError> {
    let raw = pairs
        .into_iter()
        .find_map(|(k, v)| (k == "id").then_some(v))
        .unwrap_or_default();
    let id = parse_user_id(&raw).map_err(|e| {
        tracing::debug!(request_id = %ctx, id = %raw, error = %e, "rejected id parameter");
        e
    })?;

    let user = state.users().get_user(id).await.map_err(|e| {
        if let UserError::NotFound(_) = e {
            tracing::debug!(request_id = %ctx, id, "user not found");
        } else {
            tracing::error!(request_id = %ctx, id, error = %e, "user lookup failed");
        }
        e
    })?;

    let resp = json_response(&user).map_err(|e| {
        tracing::error!(request_id = %ctx, id, error = %e, "failed to encode user");
        e
    })?;
    tracing::debug!(request_id = %ctx, id, "returned user");
    Ok(resp)
}

/// `GET /users`
pub async fn list_users(
    State(state): State<AppState>,
    ctx: RequestContext,
) -> Result<Response, ApiError> {
    let users = state.users().list_users().await.map_err(|e| {
        tracing::error!(request_id = %ctx, error = %e, "failed to list users");
        e
    })?;

    let body = UserList {
        total: users.len(),
        users,
    };
    let resp = json_response(&body).map_err(|e| {
        tracing::error!(request_id = %ctx, error = %e, "failed to encode users list");
        e
    })?;
    tracing::debug!(request_id = %ctx, total = body.total, "returned users");
    Ok(resp)
}
