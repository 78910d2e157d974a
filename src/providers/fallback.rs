//! Primary/backup resolution over the provider chain.
//!
//! Adapters are tried strictly in priority order. The first success is
//! returned as-is; partial results from different providers are never
//! merged. Each failure is logged and the next adapter is tried; only when
//! every adapter has failed does the caller see an aggregate error carrying
//! the last concrete failure and the attempt count.

use std::sync::Arc;

use tracing::{debug, instrument, warn};

use crate::sampling::{DateRange, SampleSet};
use crate::{Location, Observation};

use super::error::{ProviderError, ProvidersExhausted};
use super::WeatherProvider;

pub struct FallbackResolver {
    providers: Vec<Arc<dyn WeatherProvider>>,
}

impl FallbackResolver {
    pub fn new(providers: Vec<Arc<dyn WeatherProvider>>) -> Self {
        Self { providers }
    }

    /// Adapter names in priority order, for status reporting.
    pub fn provider_names(&self) -> Vec<String> {
        self.providers.iter().map(|p| p.id().to_string()).collect()
    }

    pub fn len(&self) -> usize {
        self.providers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.providers.is_empty()
    }

    fn exhausted(&self, last: Option<ProviderError>) -> ProvidersExhausted {
        ProvidersExhausted {
            attempted: self.providers.len(),
            // An empty chain is a configuration bug; surface it as a
            // synthetic unconfigured error rather than panicking.
            last: last.unwrap_or(ProviderError::Unconfigured {
                provider: crate::ProviderId::OpenMeteo,
            }),
        }
    }

    #[instrument(skip_all, fields(location = %location.name))]
    pub async fn fetch_current(
        &self,
        location: &Location,
    ) -> Result<Observation, ProvidersExhausted> {
        let mut last = None;
        for provider in &self.providers {
            match provider.fetch_current(location).await {
                Ok(observation) => {
                    debug!("current conditions resolved by {}", provider.id());
                    return Ok(observation);
                }
                Err(e) => {
                    warn!("{} failed to fetch current conditions: {e}", provider.id());
                    last = Some(e);
                }
            }
        }
        Err(self.exhausted(last))
    }

    #[instrument(skip_all, fields(location = %location.name, start = %range.start(), end = %range.end()))]
    pub async fn fetch_historical(
        &self,
        location: &Location,
        range: DateRange,
    ) -> Result<SampleSet, ProvidersExhausted> {
        let mut last = None;
        for provider in &self.providers {
            match provider.fetch_historical(location, range).await {
                Ok(set) => {
                    debug!(
                        "historical range resolved by {} ({} records)",
                        provider.id(),
                        set.len()
                    );
                    return Ok(set);
                }
                Err(e) => {
                    warn!("{} failed to fetch historical range: {e}", provider.id());
                    last = Some(e);
                }
            }
        }
        Err(self.exhausted(last))
    }

    #[instrument(skip_all, fields(location = %location.name, days))]
    pub async fn fetch_forecast(
        &self,
        location: &Location,
        days: u32,
    ) -> Result<Vec<Observation>, ProvidersExhausted> {
        let mut last = None;
        for provider in &self.providers {
            match provider.fetch_forecast(location, days).await {
                Ok(forecast) => {
                    debug!(
                        "forecast resolved by {} ({} days)",
                        provider.id(),
                        forecast.len()
                    );
                    return Ok(forecast);
                }
                Err(e) => {
                    warn!("{} failed to fetch forecast: {e}", provider.id());
                    last = Some(e);
                }
            }
        }
        Err(self.exhausted(last))
    }
}
