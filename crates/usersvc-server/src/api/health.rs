use axum::extract::State;
use axum::response::Response;
use chrono::{DateTime, Utc};
use serde::Serialize;

use super::{json_response, ApiError};
use crate::app_state::AppState;
use crate::context::RequestContext;

pub const SERVICE_NAME: &str = "user-service";

#[derive(Debug, Serialize)]
struct HealthBody {
    status: &'static str,
    timestamp: DateTime<Utc>,
    service: &'static str,
    users_count: usize,
}

/// `GET /health`
pub async fn health(
    State(state): State<AppState>,
    ctx: RequestContext,
) -> Result<Response, ApiError> {
    let users_count = state.users().users_count().await.map_err(|e| {
        tracing::error!(request_id = %ctx, error = %e, "failed to get users count for health check");
        e
    })?;

    let body = HealthBody {
        status: "healthy",
        timestamp: Utc::now(),
        service: SERVICE_NAME,
        users_count,
    };
    Ok(json_response(&body)?)
}
