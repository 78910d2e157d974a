//! Alert-threshold check endpoint

use axum::{Json, extract::State};
use serde_json::{Value, json};

use crate::alerts::evaluate;
use crate::api::{error::ApiResult, state::ApiState};

/// GET /api/v1/alerts/check
///
/// Fetch current conditions and run the threshold checks. Nothing is
/// dispatched to the alert transport; this is a read-only evaluation.
pub async fn check_alerts(State(state): State<ApiState>) -> ApiResult<Json<Value>> {
    let observation = state.resolver.fetch_current(&state.location).await?;
    let alerts = evaluate(&observation, &state.thresholds);

    Ok(Json(json!({
        "date": observation.date,
        "provider": observation.provider,
        "count": alerts.len(),
        "alerts": alerts,
    })))
}
