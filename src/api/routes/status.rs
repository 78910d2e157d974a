//! Monitoring status and rate-limit status endpoints

use std::net::SocketAddr;

use axum::{
    Json,
    extract::{ConnectInfo, State},
    http::HeaderMap,
};
use serde_json::{Value, json};

use crate::api::middleware::client_id;
use crate::api::{error::ApiResult, state::ApiState};

/// GET /api/v1/status
///
/// Schedule state derived purely from wall clock and configuration.
pub async fn monitoring_status(State(state): State<ApiState>) -> ApiResult<Json<Value>> {
    let status = state.monitor.status().await?;
    Ok(Json(json!(status)))
}

/// GET /api/v1/limits
///
/// The caller's current rate-limit usage. Does not consume quota beyond the
/// admission already charged by the middleware.
pub async fn rate_limit_status(
    State(state): State<ApiState>,
    ConnectInfo(addr): ConnectInfo<SocketAddr>,
    headers: HeaderMap,
) -> ApiResult<Json<Value>> {
    let client = client_id(&headers, Some(addr));
    let status = state.limiter.status(&client);

    Ok(Json(json!({
        "client": client,
        "limits": status,
    })))
}
