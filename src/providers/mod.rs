//! Provider adapter layer.
//!
//! One uniform async interface over heterogeneous weather data providers.
//! Concrete adapters differ only in authentication and field mapping:
//!
//! - [`open_meteo::OpenMeteoProvider`] — free tier, no key
//! - [`weather_api::WeatherApiProvider`] — single API key
//! - [`aeris::AerisProvider`] — paired client id/secret
//!
//! Adapters hold no shared mutable state; their only side effect is the
//! outbound HTTP call. Failures are always typed ([`ProviderError`]), never
//! an empty success. The [`fallback::FallbackResolver`] tries adapters in
//! priority order and is the only place results enter the rest of the
//! system.

pub mod aeris;
pub mod error;
pub mod fallback;
pub mod open_meteo;
pub mod weather_api;

pub use error::{ProviderError, ProviderResult, ProvidersExhausted};
pub use fallback::FallbackResolver;

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;

use crate::config::Config;
use crate::sampling::{DateRange, SampleSet};
use crate::{Location, Observation, ProviderId};

/// Timeout applied to every provider request, so a hung provider cannot
/// stall a monitoring cycle indefinitely.
pub(crate) const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

pub(crate) fn http_client() -> reqwest::Client {
    reqwest::Client::builder()
        .timeout(REQUEST_TIMEOUT)
        .build()
        .expect("Failed to build HTTP client")
}

/// Clip a raw payload for inclusion in error context.
pub(crate) fn truncate_payload(text: &str) -> &str {
    const MAX_CONTEXT_CHARS: usize = 200;
    match text.char_indices().nth(MAX_CONTEXT_CHARS) {
        Some((offset, _)) => &text[..offset],
        None => text,
    }
}

/// The capability set every weather data provider implements.
#[async_trait]
pub trait WeatherProvider: Send + Sync {
    fn id(&self) -> ProviderId;

    /// Whether the adapter has the credentials it needs. Key-less providers
    /// are always configured.
    fn is_configured(&self) -> bool {
        true
    }

    /// Current conditions for a location.
    async fn fetch_current(&self, location: &Location) -> ProviderResult<Observation>;

    /// Daily records over an inclusive date range.
    async fn fetch_historical(
        &self,
        location: &Location,
        range: DateRange,
    ) -> ProviderResult<SampleSet>;

    /// Daily forecast for the next `days` days, in chronological order.
    async fn fetch_forecast(
        &self,
        location: &Location,
        days: u32,
    ) -> ProviderResult<Vec<Observation>>;
}

/// Build the fallback chain in priority order: the key-less provider first,
/// credentialed providers only as backups.
pub fn build_providers(config: &Config) -> Vec<Arc<dyn WeatherProvider>> {
    vec![
        Arc::new(open_meteo::OpenMeteoProvider::new(
            &config.providers.open_meteo,
            &config.location.timezone,
        )),
        Arc::new(weather_api::WeatherApiProvider::new(
            &config.providers.weather_api,
        )),
        Arc::new(aeris::AerisProvider::new(&config.providers.aeris)),
    ]
}
