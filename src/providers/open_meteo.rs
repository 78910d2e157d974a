//! Open-Meteo adapter: the free, key-less primary provider.
//!
//! Daily history comes from the archive API, current conditions and the
//! daily forecast from the forecast API. Field names follow the Open-Meteo
//! daily/current variable catalogue.

use async_trait::async_trait;
use chrono::{NaiveDate, Utc};
use serde::Deserialize;
use tracing::{debug, instrument, trace};

use crate::config::OpenMeteoConfig;
use crate::sampling::{DateRange, SampleSet};
use crate::{Location, Observation, ProviderId, Reading, WindReading};

use super::error::{ProviderError, ProviderResult};
use super::{WeatherProvider, http_client};

/// Daily variables requested from both the archive and the forecast API.
const DAILY_FIELDS: &str = "temperature_2m_max,temperature_2m_min,temperature_2m_mean,\
apparent_temperature_max,apparent_temperature_min,apparent_temperature_mean,\
precipitation_sum,relative_humidity_2m_max,relative_humidity_2m_min,\
relative_humidity_2m_mean,wind_speed_10m_max,wind_speed_10m_mean,surface_pressure_mean";

/// Current-conditions variables requested from the forecast API.
const CURRENT_FIELDS: &str = "temperature_2m,apparent_temperature,relative_humidity_2m,\
precipitation,wind_speed_10m,surface_pressure";

pub struct OpenMeteoProvider {
    client: reqwest::Client,
    archive_url: String,
    forecast_url: String,
    timezone: String,
}

#[derive(Debug, Deserialize)]
struct ArchiveResponse {
    daily: DailySeries,
}

/// Parallel arrays keyed by `time`; any variable may be missing entirely or
/// hold nulls for individual days.
#[derive(Debug, Deserialize)]
struct DailySeries {
    time: Vec<NaiveDate>,
    #[serde(default)]
    temperature_2m_max: Option<Vec<Option<f64>>>,
    #[serde(default)]
    temperature_2m_min: Option<Vec<Option<f64>>>,
    #[serde(default)]
    temperature_2m_mean: Option<Vec<Option<f64>>>,
    #[serde(default)]
    apparent_temperature_max: Option<Vec<Option<f64>>>,
    #[serde(default)]
    apparent_temperature_min: Option<Vec<Option<f64>>>,
    #[serde(default)]
    apparent_temperature_mean: Option<Vec<Option<f64>>>,
    #[serde(default)]
    precipitation_sum: Option<Vec<Option<f64>>>,
    #[serde(default)]
    relative_humidity_2m_max: Option<Vec<Option<f64>>>,
    #[serde(default)]
    relative_humidity_2m_min: Option<Vec<Option<f64>>>,
    #[serde(default)]
    relative_humidity_2m_mean: Option<Vec<Option<f64>>>,
    #[serde(default)]
    wind_speed_10m_max: Option<Vec<Option<f64>>>,
    #[serde(default)]
    wind_speed_10m_mean: Option<Vec<Option<f64>>>,
    #[serde(default)]
    surface_pressure_mean: Option<Vec<Option<f64>>>,
}

impl DailySeries {
    fn value(series: &Option<Vec<Option<f64>>>, index: usize) -> Option<f64> {
        series.as_ref().and_then(|values| values.get(index).copied().flatten())
    }

    /// Every present series must line up with the time axis.
    fn check_lengths(&self) -> Result<(), String> {
        let expected = self.time.len();
        let series = [
            ("temperature_2m_max", &self.temperature_2m_max),
            ("temperature_2m_min", &self.temperature_2m_min),
            ("temperature_2m_mean", &self.temperature_2m_mean),
            ("apparent_temperature_max", &self.apparent_temperature_max),
            ("apparent_temperature_min", &self.apparent_temperature_min),
            ("apparent_temperature_mean", &self.apparent_temperature_mean),
            ("precipitation_sum", &self.precipitation_sum),
            ("relative_humidity_2m_max", &self.relative_humidity_2m_max),
            ("relative_humidity_2m_min", &self.relative_humidity_2m_min),
            ("relative_humidity_2m_mean", &self.relative_humidity_2m_mean),
            ("wind_speed_10m_max", &self.wind_speed_10m_max),
            ("wind_speed_10m_mean", &self.wind_speed_10m_mean),
            ("surface_pressure_mean", &self.surface_pressure_mean),
        ];
        for (name, values) in series {
            if let Some(values) = values {
                if values.len() != expected {
                    return Err(format!(
                        "series {name} has {} entries, expected {expected}",
                        values.len()
                    ));
                }
            }
        }
        Ok(())
    }
}

#[derive(Debug, Deserialize)]
struct CurrentResponse {
    current: CurrentBlock,
}

#[derive(Debug, Deserialize)]
struct CurrentBlock {
    #[serde(default)]
    temperature_2m: Option<f64>,
    #[serde(default)]
    apparent_temperature: Option<f64>,
    #[serde(default)]
    relative_humidity_2m: Option<f64>,
    #[serde(default)]
    precipitation: Option<f64>,
    #[serde(default)]
    wind_speed_10m: Option<f64>,
    #[serde(default)]
    surface_pressure: Option<f64>,
}

impl OpenMeteoProvider {
    pub fn new(config: &OpenMeteoConfig, timezone: &str) -> Self {
        Self {
            client: http_client(),
            archive_url: config.archive_url.clone(),
            forecast_url: config.forecast_url.clone(),
            timezone: timezone.to_string(),
        }
    }

    fn bad_response(&self, context: impl Into<String>) -> ProviderError {
        ProviderError::BadResponse {
            provider: self.id(),
            context: context.into(),
        }
    }

    fn coordinates(&self, location: &Location) -> ProviderResult<(f64, f64)> {
        match (location.latitude, location.longitude) {
            (Some(latitude), Some(longitude)) => Ok((latitude, longitude)),
            _ => Err(self.bad_response(format!(
                "location '{}' has no coordinates, which Open-Meteo requires",
                location.name
            ))),
        }
    }

    /// Send a GET and parse the JSON body, surfacing non-2xx statuses and
    /// schema mismatches with raw payload context.
    async fn get_json<T: serde::de::DeserializeOwned>(
        &self,
        url: &str,
        query: &[(&str, String)],
    ) -> ProviderResult<T> {
        trace!("requesting {url}");
        let response = self
            .client
            .get(url)
            .query(query)
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

    fn daily_to_observations(
        &self,
        location: &Location,
        daily: &DailySeries,
    ) -> ProviderResult<Vec<Observation>> {
        daily.check_lengths().map_err(|context| self.bad_response(context))?;

        let mut observations = Vec::with_capacity(daily.time.len());
        for (index, date) in daily.time.iter().enumerate() {
            let mut obs = Observation::empty(location.clone(), *date, self.id());
            obs.temperature = Reading {
                mean: DailySeries::value(&daily.temperature_2m_mean, index),
                min: DailySeries::value(&daily.temperature_2m_min, index),
                max: DailySeries::value(&daily.temperature_2m_max, index),
            };
            obs.feels_like = Reading {
                mean: DailySeries::value(&daily.apparent_temperature_mean, index),
                min: DailySeries::value(&daily.apparent_temperature_min, index),
                max: DailySeries::value(&daily.apparent_temperature_max, index),
            };
            obs.humidity = Reading {
                mean: DailySeries::value(&daily.relative_humidity_2m_mean, index),
                min: DailySeries::value(&daily.relative_humidity_2m_min, index),
                max: DailySeries::value(&daily.relative_humidity_2m_max, index),
            };
            obs.precipitation_total = DailySeries::value(&daily.precipitation_sum, index);
            obs.wind = WindReading {
                mean: DailySeries::value(&daily.wind_speed_10m_mean, index),
                max: DailySeries::value(&daily.wind_speed_10m_max, index),
            };
            obs.pressure_mean = DailySeries::value(&daily.surface_pressure_mean, index);

            obs.validate().map_err(|violation| {
                self.bad_response(format!("invalid record for {date}: {violation}"))
            })?;
            observations.push(obs);
        }
        Ok(observations)
    }
}

#[async_trait]
impl WeatherProvider for OpenMeteoProvider {
    fn id(&self) -> ProviderId {
        ProviderId::OpenMeteo
    }

    #[instrument(skip_all, fields(location = %location.name))]
    async fn fetch_current(&self, location: &Location) -> ProviderResult<Observation> {
        let (latitude, longitude) = self.coordinates(location)?;

        let response: CurrentResponse = self
            .get_json(
                &self.forecast_url,
                &[
                    ("latitude", latitude.to_string()),
                    ("longitude", longitude.to_string()),
                    ("current", CURRENT_FIELDS.to_string()),
                    ("timezone", self.timezone.clone()),
                ],
            )
            .await?;

        let now = Utc::now();
        let current = response.current;
        let mut obs = Observation::empty(location.clone(), now.date_naive(), self.id());
        obs.timestamp = Some(now);
        obs.temperature = current.temperature_2m.map(Reading::mean_only).unwrap_or_default();
        obs.feels_like = current
            .apparent_temperature
            .map(Reading::mean_only)
            .unwrap_or_default();
        obs.humidity = current
            .relative_humidity_2m
            .map(Reading::mean_only)
            .unwrap_or_default();
        obs.precipitation_total = current.precipitation;
        obs.wind = WindReading {
            mean: current.wind_speed_10m,
            max: None,
        };
        obs.pressure_mean = current.surface_pressure;

        obs.validate()
            .map_err(|violation| self.bad_response(format!("invalid current record: {violation}")))?;

        debug!("fetched current conditions from Open-Meteo");
        Ok(obs)
    }

    #[instrument(skip_all, fields(location = %location.name, start = %range.start(), end = %range.end()))]
    async fn fetch_historical(
        &self,
        location: &Location,
        range: DateRange,
    ) -> ProviderResult<SampleSet> {
        let (latitude, longitude) = self.coordinates(location)?;

        let response: ArchiveResponse = self
            .get_json(
                &self.archive_url,
                &[
                    ("latitude", latitude.to_string()),
                    ("longitude", longitude.to_string()),
                    ("start_date", range.start().to_string()),
                    ("end_date", range.end().to_string()),
                    ("daily", DAILY_FIELDS.to_string()),
                    ("timezone", self.timezone.clone()),
                ],
            )
            .await?;

        let observations = self.daily_to_observations(location, &response.daily)?;
        debug!("fetched {} historical records from Open-Meteo", observations.len());

        SampleSet::new(range, observations)
            .map_err(|e| self.bad_response(format!("inconsistent archive payload: {e}")))
    }

    #[instrument(skip_all, fields(location = %location.name, days))]
    async fn fetch_forecast(
        &self,
        location: &Location,
        days: u32,
    ) -> ProviderResult<Vec<Observation>> {
        let (latitude, longitude) = self.coordinates(location)?;

        let response: ArchiveResponse = self
            .get_json(
                &self.forecast_url,
                &[
                    ("latitude", latitude.to_string()),
                    ("longitude", longitude.to_string()),
                    ("daily", DAILY_FIELDS.to_string()),
                    ("forecast_days", days.to_string()),
                    ("timezone", self.timezone.clone()),
                ],
            )
            .await?;

        let observations = self.daily_to_observations(location, &response.daily)?;
        debug!("fetched {}-day forecast from Open-Meteo", observations.len());
        Ok(observations)
    }
}
