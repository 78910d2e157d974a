//! Typed failures for the provider adapter layer.

use thiserror::Error;

use crate::ProviderId;

pub type ProviderResult<T> = Result<T, ProviderError>;

/// Why one adapter failed. Callers decide whether a failure is worth
/// retrying; adapters never convert a failure into an empty success.
#[derive(Debug, Error)]
pub enum ProviderError {
    /// Required credentials are missing. Not retryable until reconfigured.
    #[error("{provider} is not configured (missing credentials)")]
    Unconfigured { provider: ProviderId },

    /// Network-level failure or timeout. Retryable at the next scheduled
    /// attempt or the next provider in the fallback chain.
    #[error("{provider} is unreachable: {source}")]
    Unreachable {
        provider: ProviderId,
        #[source]
        source: reqwest::Error,
    },

    /// Non-2xx status or a payload that does not match the expected schema.
    /// Carries enough raw context to debug the mismatch from logs.
    #[error("{provider} returned a bad response: {context}")]
    BadResponse {
        provider: ProviderId,
        context: String,
    },
}

impl ProviderError {
    pub fn provider(&self) -> ProviderId {
        match self {
            ProviderError::Unconfigured { provider }
            | ProviderError::Unreachable { provider, .. }
            | ProviderError::BadResponse { provider, .. } => *provider,
        }
    }

    pub fn is_retryable(&self) -> bool {
        matches!(self, ProviderError::Unreachable { .. })
    }

    /// Classify a transport-layer error from reqwest.
    pub(crate) fn from_request(provider: ProviderId, source: reqwest::Error) -> Self {
        if source.is_decode() {
            ProviderError::BadResponse {
                provider,
                context: format!("failed to decode payload: {source}"),
            }
        } else {
            ProviderError::Unreachable { provider, source }
        }
    }
}

/// Aggregate failure after the whole fallback chain was tried. Only produced
/// once every adapter has failed; the last concrete error is preserved.
#[derive(Debug, Error)]
#[error("all {attempted} weather providers failed; last error: {last}")]
pub struct ProvidersExhausted {
    /// Number of adapters attempted.
    pub attempted: usize,

    #[source]
    pub last: ProviderError,
}
