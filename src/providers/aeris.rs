//! AerisWeather adapter: last resort in the fallback chain.
//!
//! Authenticates with a paired client id/secret on every request. Aeris
//! wraps results in a `success`/`error`/`response` envelope, so a 200 status
//! alone does not mean data; the envelope is checked before field mapping.

use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, Utc};
use serde::Deserialize;
use tracing::{debug, instrument, trace};

use crate::config::AerisConfig;
use crate::sampling::{DateRange, SampleSet};
use crate::{Location, Observation, ProviderId, Reading, WindReading};

use super::error::{ProviderError, ProviderResult};
use super::{WeatherProvider, http_client};

pub struct AerisProvider {
    client: reqwest::Client,
    base_url: String,
    client_id: Option<String>,
    client_secret: Option<String>,
}

#[derive(Debug, Deserialize)]
struct AerisEnvelope {
    success: bool,
    #[serde(default)]
    error: Option<AerisError>,
    #[serde(default)]
    response: Vec<AerisEntry>,
}

#[derive(Debug, Deserialize)]
struct AerisError {
    #[serde(default)]
    code: Option<String>,
    #[serde(default)]
    description: Option<String>,
}

#[derive(Debug, Deserialize)]
struct AerisEntry {
    #[serde(default)]
    periods: Vec<AerisPeriod>,
}

/// Flattened period record; conditions, archive observations, and daily
/// forecasts all map onto this subset of fields.
#[derive(Debug, Deserialize)]
struct AerisPeriod {
    #[serde(default)]
    timestamp: Option<i64>,
    #[serde(default, rename = "dateTimeISO")]
    date_time_iso: Option<String>,
    #[serde(default, rename = "tempC")]
    temp_c: Option<f64>,
    #[serde(default, rename = "avgTempC")]
    avg_temp_c: Option<f64>,
    #[serde(default, rename = "minTempC")]
    min_temp_c: Option<f64>,
    #[serde(default, rename = "maxTempC")]
    max_temp_c: Option<f64>,
    #[serde(default, rename = "feelslikeC")]
    feelslike_c: Option<f64>,
    #[serde(default)]
    humidity: Option<f64>,
    #[serde(default, rename = "windSpeedKPH")]
    wind_speed_kph: Option<f64>,
    #[serde(default, rename = "windSpeedMaxKPH")]
    wind_speed_max_kph: Option<f64>,
    #[serde(default, rename = "precipMM")]
    precip_mm: Option<f64>,
    #[serde(default, rename = "pressureMB")]
    pressure_mb: Option<f64>,
}

impl AerisPeriod {
    fn civil_date(&self) -> Option<NaiveDate> {
        if let Some(iso) = &self.date_time_iso {
            // dateTimeISO looks like "2025-01-06T09:00:00-05:00"; the civil
            // date is the first ten characters.
            if let Ok(date) = iso.get(..10).unwrap_or_default().parse() {
                return Some(date);
            }
        }
        self.timestamp
            .and_then(|epoch| DateTime::from_timestamp(epoch, 0))
            .map(|dt| dt.date_naive())
    }
}

impl AerisProvider {
    pub fn new(config: &AerisConfig) -> Self {
        Self {
            client: http_client(),
            base_url: config.base_url.clone(),
            client_id: config.client_id.clone(),
            client_secret: config.client_secret.clone(),
        }
    }

    fn credentials(&self) -> ProviderResult<(&str, &str)> {
        match (self.client_id.as_deref(), self.client_secret.as_deref()) {
            (Some(id), Some(secret)) => Ok((id, secret)),
            _ => Err(ProviderError::Unconfigured { provider: self.id() }),
        }
    }

    fn bad_response(&self, context: impl Into<String>) -> ProviderError {
        ProviderError::BadResponse {
            provider: self.id(),
            context: context.into(),
        }
    }

    /// Aeris location queries are "name,country" or "lat,lon".
    fn query_location(location: &Location) -> String {
        match (location.latitude, location.longitude) {
            (Some(latitude), Some(longitude)) => format!("{latitude},{longitude}"),
            _ => location.name.to_lowercase(),
        }
    }

    async fn get_periods(
        &self,
        endpoint: &str,
        location: &Location,
        extra: &[(&str, String)],
    ) -> ProviderResult<Vec<AerisPeriod>> {
        let (client_id, client_secret) = self.credentials()?;
        let url = format!(
            "{}/{endpoint}/{}",
            self.base_url,
            Self::query_location(location)
        );
        trace!("requesting {url}");

        let mut params = vec![
            ("client_id", client_id.to_string()),
            ("client_secret", client_secret.to_string()),
        ];
        params.extend(extra.iter().map(|(k, v)| (*k, v.clone())));

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

        let envelope: AerisEnvelope = serde_json::from_str(&body)
            .map_err(|e| self.bad_response(format!("{e}; payload: {}", super::truncate_payload(&body))))?;

        if !envelope.success {
            let error = envelope.error.as_ref();
            return Err(self.bad_response(format!(
                "API error {}: {}",
                error.and_then(|e| e.code.as_deref()).unwrap_or("unknown"),
                error
                    .and_then(|e| e.description.as_deref())
                    .unwrap_or("no description"),
            )));
        }

        Ok(envelope.response.into_iter().flat_map(|e| e.periods).collect())
    }

    fn period_to_observation(
        &self,
        location: &Location,
        period: &AerisPeriod,
        fallback_date: Option<NaiveDate>,
    ) -> ProviderResult<Observation> {
        let date = period
            .civil_date()
            .or(fallback_date)
            .ok_or_else(|| self.bad_response("period carries no timestamp or dateTimeISO"))?;

        let mut obs = Observation::empty(location.clone(), date, self.id());
        obs.timestamp = period
            .timestamp
            .and_then(|epoch| DateTime::from_timestamp(epoch, 0));
        obs.temperature = Reading {
            mean: period.avg_temp_c.or(period.temp_c),
            min: period.min_temp_c,
            max: period.max_temp_c,
        };
        obs.feels_like = period.feelslike_c.map(Reading::mean_only).unwrap_or_default();
        obs.humidity = period.humidity.map(Reading::mean_only).unwrap_or_default();
        obs.precipitation_total = period.precip_mm;
        obs.wind = WindReading {
            mean: period.wind_speed_kph,
            max: period.wind_speed_max_kph,
        };
        obs.pressure_mean = period.pressure_mb;

        obs.validate().map_err(|violation| {
            self.bad_response(format!("invalid record for {date}: {violation}"))
        })?;
        Ok(obs)
    }
}

#[async_trait]
impl WeatherProvider for AerisProvider {
    fn id(&self) -> ProviderId {
        ProviderId::Aeris
    }

    fn is_configured(&self) -> bool {
        self.client_id.is_some() && self.client_secret.is_some()
    }

    #[instrument(skip_all, fields(location = %location.name))]
    async fn fetch_current(&self, location: &Location) -> ProviderResult<Observation> {
        let periods = self.get_periods("conditions", location, &[]).await?;

        let period = periods
            .first()
            .ok_or_else(|| self.bad_response("conditions response contained no periods"))?;

        let obs = self.period_to_observation(location, period, Some(Utc::now().date_naive()))?;
        debug!("fetched current conditions from Aeris");
        Ok(obs)
    }

    #[instrument(skip_all, fields(location = %location.name, start = %range.start(), end = %range.end()))]
    async fn fetch_historical(
        &self,
        location: &Location,
        range: DateRange,
    ) -> ProviderResult<SampleSet> {
        let periods = self
            .get_periods(
                "observations/archive",
                location,
                &[
                    ("from", range.start().to_string()),
                    ("to", range.end().to_string()),
                    ("filter", "daily".to_string()),
                ],
            )
            .await?;

        let observations = periods
            .iter()
            .map(|period| self.period_to_observation(location, period, None))
            .collect::<ProviderResult<Vec<_>>>()?;

        debug!("fetched {} historical records from Aeris", observations.len());

        SampleSet::new(range, observations)
            .map_err(|e| self.bad_response(format!("inconsistent archive payload: {e}")))
    }

    #[instrument(skip_all, fields(location = %location.name, days))]
    async fn fetch_forecast(
        &self,
        location: &Location,
        days: u32,
    ) -> ProviderResult<Vec<Observation>> {
        let periods = self
            .get_periods(
                "forecasts",
                location,
                &[
                    ("filter", "day".to_string()),
                    ("limit", days.to_string()),
                ],
            )
            .await?;

        let observations = periods
            .iter()
            .map(|period| self.period_to_observation(location, period, None))
            .collect::<ProviderResult<Vec<_>>>()?;

        debug!("fetched {}-day forecast from Aeris", observations.len());
        Ok(observations)
    }
}
