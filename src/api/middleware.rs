//! Request middleware: sliding-window rate limiting.
//!
//! The limiter sits in front of every read endpoint, independent of the
//! scheduler. Clients are keyed by source address (or `x-forwarded-for`
//! when a proxy sits in front).

use std::net::SocketAddr;
use std::sync::Arc;

use axum::{
    body::Body,
    extract::{ConnectInfo, Request, State},
    http::HeaderMap,
    middleware::Next,
    response::Response,
};
use tracing::debug;

use crate::ratelimit::RateLimiter;

use super::error::ApiError;

/// Derive the rate-limit key for a request.
pub fn client_id(headers: &HeaderMap, addr: Option<SocketAddr>) -> String {
    if let Some(forwarded) = headers
        .get("x-forwarded-for")
        .and_then(|value| value.to_str().ok())
    {
        // First hop is the original client.
        if let Some(first) = forwarded.split(',').next() {
            let first = first.trim();
            if !first.is_empty() {
                return first.to_string();
            }
        }
    }

    addr.map(|addr| addr.ip().to_string())
        .unwrap_or_else(|| "unknown".to_string())
}

pub async fn rate_limit(
    State(limiter): State<Arc<RateLimiter>>,
    request: Request<Body>,
    next: Next,
) -> Result<Response, ApiError> {
    let addr = request
        .extensions()
        .get::<ConnectInfo<SocketAddr>>()
        .map(|info| info.0);
    let client = client_id(request.headers(), addr);

    let decision = limiter.check(&client);
    if !decision.allowed {
        debug!("rate limit exceeded for {client}");
        return Err(ApiError::RateLimited {
            retry_after_secs: decision
                .retry_after_secs
                .unwrap_or(limiter.config().window_secs),
        });
    }

    Ok(next.run(request).await)
}
