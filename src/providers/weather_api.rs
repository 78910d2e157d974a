//! WeatherAPI adapter: keyed backup provider.
//!
//! Uses `current.json`, `forecast.json`, and `history.json` (with a
//! `dt`/`end_dt` range). The key comes from the config file or the
//! `WEATHERAPI_KEY` environment variable; without it every call fails as
//! `Unconfigured` before any request is made.

use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, Utc};
use serde::Deserialize;
use tracing::{debug, instrument, trace};

use crate::config::WeatherApiConfig;
use crate::sampling::{DateRange, SampleSet};
use crate::{Location, Observation, ProviderId, Reading, WindReading};

use super::error::{ProviderError, ProviderResult};
use super::{WeatherProvider, http_client};

pub struct WeatherApiProvider {
    client: reqwest::Client,
    base_url: String,
    api_key: Option<String>,
}

#[derive(Debug, Deserialize)]
struct CurrentResponse {
    current: CurrentBlock,
}

#[derive(Debug, Deserialize)]
struct CurrentBlock {
    #[serde(default)]
    temp_c: Option<f64>,
    #[serde(default)]
    feelslike_c: Option<f64>,
    #[serde(default)]
    humidity: Option<f64>,
    #[serde(default)]
    wind_kph: Option<f64>,
    #[serde(default)]
    pressure_mb: Option<f64>,
    #[serde(default)]
    last_updated_epoch: Option<i64>,
}

/// `forecast.json` and `history.json` share this shape.
#[derive(Debug, Deserialize)]
struct ForecastResponse {
    forecast: ForecastBlock,
}

#[derive(Debug, Deserialize)]
struct ForecastBlock {
    forecastday: Vec<ForecastDay>,
}

#[derive(Debug, Deserialize)]
struct ForecastDay {
    date: NaiveDate,
    day: DayBlock,
}

#[derive(Debug, Deserialize)]
struct DayBlock {
    #[serde(default)]
    avgtemp_c: Option<f64>,
    #[serde(default)]
    mintemp_c: Option<f64>,
    #[serde(default)]
    maxtemp_c: Option<f64>,
    #[serde(default)]
    totalprecip_mm: Option<f64>,
    #[serde(default)]
    avghumidity: Option<f64>,
    #[serde(default)]
    maxwind_kph: Option<f64>,
}

impl WeatherApiProvider {
    pub fn new(config: &WeatherApiConfig) -> Self {
        Self {
            client: http_client(),
            base_url: config.base_url.clone(),
            api_key: config.api_key.clone(),
        }
    }

    fn key(&self) -> ProviderResult<&str> {
        self.api_key
            .as_deref()
            .ok_or(ProviderError::Unconfigured { provider: self.id() })
    }

    fn bad_response(&self, context: impl Into<String>) -> ProviderError {
        ProviderError::BadResponse {
            provider: self.id(),
            context: context.into(),
        }
    }

    /// WeatherAPI accepts either "lat,lon" or a free-text place name.
    fn query_location(location: &Location) -> String {
        match (location.latitude, location.longitude) {
            (Some(latitude), Some(longitude)) => format!("{latitude},{longitude}"),
            _ => location.name.clone(),
        }
    }

    async fn get_json<T: serde::de::DeserializeOwned>(
        &self,
        endpoint: &str,
        query: &[(&str, String)],
    ) -> ProviderResult<T> {
        let key = self.key()?.to_string();
        let url = format!("{}/{endpoint}", self.base_url);
        trace!("requesting {url}");

        let mut params = vec![("key", key)];
        params.extend(query.iter().map(|(k, v)| (*k, v.clone())));

        let response = self
            .client
            .get(&url)
            .query(&params)
            .send()
            .await
            .map_err(|e| ProviderError::from_request(self.id(), e))?;

        let status = response.status();
        let body = response
            .text()
            .await
            .map_err(|e| ProviderError::from_request(self.id(), e))?;

        if !status.is_success() {
            return Err(self.bad_response(format!("HTTP {status}: {}", super::truncate_payload(&body))));
        }

        serde_json::from_str(&body)
            .map_err(|e| self.bad_response(format!("{e}; payload: {}", super::truncate_payload(&body))))
    }

    fn day_to_observation(&self, location: &Location, day: &ForecastDay) -> ProviderResult<Observation> {
        let mut obs = Observation::empty(location.clone(), day.date, self.id());
        obs.temperature = Reading {
            mean: day.day.avgtemp_c,
            min: day.day.mintemp_c,
            max: day.day.maxtemp_c,
        };
        obs.humidity = day.day.avghumidity.map(Reading::mean_only).unwrap_or_default();
        obs.precipitation_total = day.day.totalprecip_mm;
        obs.wind = WindReading {
            mean: None,
            max: day.day.maxwind_kph,
        };

        obs.validate().map_err(|violation| {
            self.bad_response(format!("invalid record for {}: {violation}", day.date))
        })?;
        Ok(obs)
    }
}

#[async_trait]
impl WeatherProvider for WeatherApiProvider {
    fn id(&self) -> ProviderId {
        ProviderId::WeatherApi
    }

    fn is_configured(&self) -> bool {
        self.api_key.is_some()
    }

    #[instrument(skip_all, fields(location = %location.name))]
    async fn fetch_current(&self, location: &Location) -> ProviderResult<Observation> {
        let response: CurrentResponse = self
            .get_json(
                "current.json",
                &[("q", Self::query_location(location))],
            )
            .await?;

        let current = response.current;
        let timestamp = current
            .last_updated_epoch
            .and_then(|epoch| DateTime::from_timestamp(epoch, 0))
            .unwrap_or_else(Utc::now);

        let mut obs = Observation::empty(location.clone(), timestamp.date_naive(), self.id());
        obs.timestamp = Some(timestamp);
        obs.temperature = current.temp_c.map(Reading::mean_only).unwrap_or_default();
        obs.feels_like = current.feelslike_c.map(Reading::mean_only).unwrap_or_default();
        obs.humidity = current.humidity.map(Reading::mean_only).unwrap_or_default();
        obs.wind = WindReading {
            mean: current.wind_kph,
            max: None,
        };
        obs.pressure_mean = current.pressure_mb;

        obs.validate()
            .map_err(|violation| self.bad_response(format!("invalid current record: {violation}")))?;

        debug!("fetched current conditions from WeatherAPI");
        Ok(obs)
    }

    #[instrument(skip_all, fields(location = %location.name, start = %range.start(), end = %range.end()))]
    async fn fetch_historical(
        &self,
        location: &Location,
        range: DateRange,
    ) -> ProviderResult<SampleSet> {
        let response: ForecastResponse = self
            .get_json(
                "history.json",
                &[
                    ("q", Self::query_location(location)),
                    ("dt", range.start().to_string()),
                    ("end_dt", range.end().to_string()),
                ],
            )
            .await?;

        let observations = response
            .forecast
            .forecastday
            .iter()
            .map(|day| self.day_to_observation(location, day))
            .collect::<ProviderResult<Vec<_>>>()?;

        debug!("fetched {} historical records from WeatherAPI", observations.len());

        SampleSet::new(range, observations)
            .map_err(|e| self.bad_response(format!("inconsistent history payload: {e}")))
    }

    #[instrument(skip_all, fields(location = %location.name, days))]
    async fn fetch_forecast(
        &self,
        location: &Location,
        days: u32,
    ) -> ProviderResult<Vec<Observation>> {
        let response: ForecastResponse = self
            .get_json(
                "forecast.json",
                &[
                    ("q", Self::query_location(location)),
                    ("days", days.to_string()),
                ],
            )
            .await?;

        let observations = response
            .forecast
            .forecastday
            .iter()
            .map(|day| self.day_to_observation(location, day))
            .collect::<ProviderResult<Vec<_>>>()?;

        debug!("fetched {}-day forecast from WeatherAPI", observations.len());
        Ok(observations)
    }
}
