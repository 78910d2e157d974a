//! API error types and conversions
//!
//! Every failure leaves the API as a structured envelope with a stable
//! error code:
//!
//! ```json
//! { "error": { "code": "rate_limit_exceeded", "message": "...", "retry_after": 41 } }
//! ```

use axum::{
    Json,
    http::{HeaderValue, StatusCode, header::RETRY_AFTER},
    response::{IntoResponse, Response},
};
use serde_json::json;

use crate::providers::ProvidersExhausted;
use crate::sampling::DateRangeError;
use crate::storage::StorageError;

/// API result type
pub type ApiResult<T> = Result<T, ApiError>;

/// API error types
#[derive(Debug)]
pub enum ApiError {
    /// Invalid request parameters
    InvalidRequest(String),

    /// A date-range request violated the bounds (reversed, or beyond the
    /// multi-year cap)
    InvalidDateRange(String),

    /// Resource not found
    NotFound(String),

    /// The client exceeded the sliding-window cap
    RateLimited { retry_after_secs: u64 },

    /// Every provider in the fallback chain failed
    ProvidersExhausted(String),

    /// Storage operation failed
    Storage(String),

    /// Internal server error
    Internal(String),
}

impl ApiError {
    fn status_code_and_kind(&self) -> (StatusCode, &'static str, String) {
        match self {
            ApiError::InvalidRequest(msg) => {
                (StatusCode::BAD_REQUEST, "invalid_request", msg.clone())
            }
            ApiError::InvalidDateRange(msg) => {
                (StatusCode::BAD_REQUEST, "invalid_date_range", msg.clone())
            }
            ApiError::NotFound(msg) => (StatusCode::NOT_FOUND, "not_found", msg.clone()),
            ApiError::RateLimited { retry_after_secs } => (
                StatusCode::TOO_MANY_REQUESTS,
                "rate_limit_exceeded",
                format!("Too many requests; retry after {retry_after_secs}s"),
            ),
            ApiError::ProvidersExhausted(msg) => {
                (StatusCode::BAD_GATEWAY, "providers_exhausted", msg.clone())
            }
            ApiError::Storage(msg) => {
                (StatusCode::INTERNAL_SERVER_ERROR, "storage_error", msg.clone())
            }
            ApiError::Internal(msg) => {
                (StatusCode::INTERNAL_SERVER_ERROR, "internal_error", msg.clone())
            }
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, code, message) = self.status_code_and_kind();

        let mut body = json!({
            "error": {
                "code": code,
                "message": message,
            }
        });

        if let ApiError::RateLimited { retry_after_secs } = &self {
            body["error"]["retry_after"] = json!(retry_after_secs);
        }

        let mut response = (status, Json(body)).into_response();

        if let ApiError::RateLimited { retry_after_secs } = &self {
            if let Ok(value) = HeaderValue::from_str(&retry_after_secs.to_string()) {
                response.headers_mut().insert(RETRY_AFTER, value);
            }
        }

        response
    }
}

impl From<ProvidersExhausted> for ApiError {
    fn from(err: ProvidersExhausted) -> Self {
        ApiError::ProvidersExhausted(err.to_string())
    }
}

impl From<DateRangeError> for ApiError {
    fn from(err: DateRangeError) -> Self {
        ApiError::InvalidDateRange(err.to_string())
    }
}

impl From<StorageError> for ApiError {
    fn from(err: StorageError) -> Self {
        ApiError::Storage(err.to_string())
    }
}

impl From<anyhow::Error> for ApiError {
    fn from(err: anyhow::Error) -> Self {
        ApiError::Internal(err.to_string())
    }
}
