//! Observation read endpoints

use axum::{
    Json,
    extract::{Query, State},
};
use serde::Deserialize;
use serde_json::{Value, json};

use crate::api::{error::ApiResult, state::ApiState};

#[derive(Debug, Deserialize)]
pub struct LatestQuery {
    /// Max results (default 100, clamped to 1..=1000)
    limit: Option<usize>,
}

/// GET /api/v1/observations/latest
///
/// Stored observations, newest first.
pub async fn latest_observations(
    State(state): State<ApiState>,
    Query(query): Query<LatestQuery>,
) -> ApiResult<Json<Value>> {
    let limit = query.limit.unwrap_or(100).clamp(1, 1000);

    let observations = state.storage.query_latest(limit).await?;

    Ok(Json(json!({
        "count": observations.len(),
        "observations": observations,
    })))
}

/// GET /api/v1/observations/current
///
/// A fresh fetch through the fallback chain, independent of the scheduler.
pub async fn current_observation(State(state): State<ApiState>) -> ApiResult<Json<Value>> {
    let observation = state.resolver.fetch_current(&state.location).await?;

    Ok(Json(json!({
        "observation": observation,
    })))
}
