//! Aggregated summary endpoints
//!
//! Each endpoint fetches fresh daily records through the fallback chain,
//! filters them to the monitoring weekdays, and rolls them up. Nothing here
//! reads the database; summaries are recomputed on demand.

use axum::{
    Json,
    extract::{Query, State},
};
use chrono::Utc;
use serde::Deserialize;
use serde_json::{Value, json};

use crate::api::{error::ApiResult, state::ApiState};
use crate::sampling::{
    DateRange, SampleSet, long_term_window, seasonal_summaries, weekly_summaries, yearly_summaries,
};

#[derive(Debug, Deserialize)]
pub struct WeeklyQuery {
    /// Weeks of history to sample (default 4, clamped to 1..=52)
    weeks_back: Option<u32>,
}

#[derive(Debug, Deserialize)]
pub struct WindowQuery {
    /// Years of history to sample. Requests beyond the cap are rejected as
    /// invalid_date_range.
    years: Option<u32>,
}

async fn sampled_range(state: &ApiState, range: DateRange) -> ApiResult<SampleSet> {
    let sample = state.resolver.fetch_historical(&state.location, range).await?;
    Ok(sample.filter_monitoring_days(state.weekdays))
}

/// GET /api/v1/summary/weekly
pub async fn weekly_summary(
    State(state): State<ApiState>,
    Query(query): Query<WeeklyQuery>,
) -> ApiResult<Json<Value>> {
    let weeks_back = query.weeks_back.unwrap_or(4).clamp(1, 52);
    let range = DateRange::weeks_back(Utc::now().date_naive(), weeks_back)?;

    let sampled = sampled_range(&state, range).await?;
    let summaries = weekly_summaries(&sampled);

    Ok(Json(json!({
        "weeks_back": weeks_back,
        "record_count": sampled.len(),
        "summaries": summaries,
    })))
}

/// GET /api/v1/summary/seasonal
pub async fn seasonal_summary(
    State(state): State<ApiState>,
    Query(query): Query<WindowQuery>,
) -> ApiResult<Json<Value>> {
    let years = query.years.unwrap_or(1);
    let range = long_term_window(Utc::now().date_naive(), years)?;

    let sampled = sampled_range(&state, range).await?;
    let summaries = seasonal_summaries(&sampled);

    Ok(Json(json!({
        "years": years,
        "record_count": sampled.len(),
        "summaries": summaries,
    })))
}

/// GET /api/v1/summary/yearly
pub async fn yearly_summary(
    State(state): State<ApiState>,
    Query(query): Query<WindowQuery>,
) -> ApiResult<Json<Value>> {
    let years = query.years.unwrap_or(2);
    let range = long_term_window(Utc::now().date_naive(), years)?;

    let sampled = sampled_range(&state, range).await?;
    let summaries = yearly_summaries(&sampled);

    Ok(Json(json!({
        "years": years,
        "record_count": sampled.len(),
        "summaries": summaries,
    })))
}
