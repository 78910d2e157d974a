//! REST API for the monitoring hub
//!
//! Thin read layer over the core: every endpoint wraps exactly one core
//! operation plus the success/error envelope. The rate limiter runs as
//! middleware in front of all of them.
//!
//! ## Endpoints
//!
//! - `GET /api/v1/health` - Health check
//! - `GET /api/v1/observations/latest` - Stored observations, newest first
//! - `GET /api/v1/observations/current` - Fresh fetch through the fallback chain
//! - `GET /api/v1/summary/weekly` - ISO-week summaries over recent samples
//! - `GET /api/v1/summary/seasonal` - Seasonal summaries over the long-term window
//! - `GET /api/v1/summary/yearly` - Yearly summaries over the long-term window
//! - `GET /api/v1/alerts/check` - Threshold evaluation of current conditions
//! - `GET /api/v1/status` - Monitoring schedule status
//! - `GET /api/v1/limits` - Caller's rate-limit usage

pub mod error;
pub mod middleware;
pub mod routes;
pub mod state;

pub use error::{ApiError, ApiResult};
pub use state::ApiState;

use std::net::SocketAddr;

use axum::{Json, Router, routing::get};
use serde_json::json;
use tracing::info;

use crate::config::ApiServerConfig;

/// Build the router with all routes and middleware.
pub fn build_router(state: ApiState) -> Router {
    use tower_http::trace::TraceLayer;

    let limiter = state.limiter.clone();

    Router::new()
        .route("/api/v1/health", get(routes::health::health_check))
        .route(
            "/api/v1/observations/latest",
            get(routes::observations::latest_observations),
        )
        .route(
            "/api/v1/observations/current",
            get(routes::observations::current_observation),
        )
        .route("/api/v1/summary/weekly", get(routes::summaries::weekly_summary))
        .route(
            "/api/v1/summary/seasonal",
            get(routes::summaries::seasonal_summary),
        )
        .route("/api/v1/summary/yearly", get(routes::summaries::yearly_summary))
        .route("/api/v1/alerts/check", get(routes::alerts::check_alerts))
        .route("/api/v1/status", get(routes::status::monitoring_status))
        .route("/api/v1/limits", get(routes::status::rate_limit_status))
        .fallback(not_found)
        .layer(axum::middleware::from_fn_with_state(
            limiter,
            middleware::rate_limit,
        ))
        .with_state(state)
        .layer(TraceLayer::new_for_http())
}

/// Unknown paths share the structured error envelope.
async fn not_found() -> (axum::http::StatusCode, Json<serde_json::Value>) {
    (
        axum::http::StatusCode::NOT_FOUND,
        Json(json!({
            "error": {
                "code": "not_found",
                "message": "Endpoint not found",
            }
        })),
    )
}

/// Spawn the API server in a background task and return its local address.
pub async fn spawn_api_server(
    config: &ApiServerConfig,
    state: ApiState,
) -> anyhow::Result<SocketAddr> {
    use tower_http::cors::{Any, CorsLayer};

    info!("starting API server on {}", config.bind_addr);

    let mut app = build_router(state);

    if config.enable_cors {
        let cors = CorsLayer::new()
            .allow_origin(Any)
            .allow_methods(Any)
            .allow_headers(Any);
        app = app.layer(cors);
    }

    let listener = tokio::net::TcpListener::bind(config.bind_addr).await?;
    let addr = listener.local_addr()?;

    info!("API server listening on {}", addr);

    tokio::spawn(async move {
        if let Err(e) = axum::serve(
            listener,
            app.into_make_service_with_connect_info::<SocketAddr>(),
        )
        .await
        {
            tracing::error!("API server error: {}", e);
        }
    });

    Ok(addr)
}
