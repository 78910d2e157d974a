pub mod actors;
pub mod alerts;
pub mod api;
pub mod config;
pub mod providers;
pub mod ratelimit;
pub mod reports;
pub mod sampling;
pub mod schedule;
pub mod storage;
pub mod telegram;

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

/// The place an observation was taken for.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Location {
    pub name: String,
    pub latitude: Option<f64>,
    pub longitude: Option<f64>,
}

impl Location {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            latitude: None,
            longitude: None,
        }
    }

    pub fn with_coordinates(name: impl Into<String>, latitude: f64, longitude: f64) -> Self {
        Self {
            name: name.into(),
            latitude: Some(latitude),
            longitude: Some(longitude),
        }
    }
}

/// Which adapter produced an observation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ProviderId {
    OpenMeteo,
    WeatherApi,
    Aeris,
}

impl std::fmt::Display for ProviderId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ProviderId::OpenMeteo => write!(f, "open-meteo"),
            ProviderId::WeatherApi => write!(f, "weatherapi"),
            ProviderId::Aeris => write!(f, "aeris"),
        }
    }
}

/// A mean/min/max triple for one metric. Providers may report any subset.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Reading {
    pub mean: Option<f64>,
    pub min: Option<f64>,
    pub max: Option<f64>,
}

impl Reading {
    pub fn mean_only(value: f64) -> Self {
        Self {
            mean: Some(value),
            min: None,
            max: None,
        }
    }

    pub fn full(mean: f64, min: f64, max: f64) -> Self {
        Self {
            mean: Some(mean),
            min: Some(min),
            max: Some(max),
        }
    }

    /// min ≤ mean ≤ max holds for whichever pairs are present.
    pub fn is_ordered(&self) -> bool {
        if let (Some(min), Some(mean)) = (self.min, self.mean) {
            if min > mean {
                return false;
            }
        }
        if let (Some(mean), Some(max)) = (self.mean, self.max) {
            if mean > max {
                return false;
            }
        }
        if let (Some(min), Some(max)) = (self.min, self.max) {
            if min > max {
                return false;
            }
        }
        true
    }

    pub fn is_empty(&self) -> bool {
        self.mean.is_none() && self.min.is_none() && self.max.is_none()
    }
}

/// Wind readings carry no meaningful minimum.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct WindReading {
    pub mean: Option<f64>,
    pub max: Option<f64>,
}

/// One climate reading for one location at one civil date (daily records)
/// or instant (current conditions).
///
/// Every metric is optional: providers differ in which fields they report,
/// and an absent field must stay distinguishable from a zero value all the
/// way through aggregation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Observation {
    pub location: Location,

    /// Civil date of the reading (in the location's timezone).
    pub date: NaiveDate,

    /// Instant of the reading, present for current conditions only.
    pub timestamp: Option<DateTime<Utc>>,

    /// Air temperature in °C.
    pub temperature: Reading,

    /// Apparent ("feels like") temperature in °C.
    pub feels_like: Reading,

    /// Relative humidity in percent.
    pub humidity: Reading,

    /// Total precipitation in mm.
    pub precipitation_total: Option<f64>,

    /// Wind speed in km/h.
    pub wind: WindReading,

    /// Surface pressure in hPa.
    pub pressure_mean: Option<f64>,

    /// Which adapter produced this record.
    pub provider: ProviderId,
}

impl Observation {
    /// An observation with every metric absent, as a base for field mapping.
    pub fn empty(location: Location, date: NaiveDate, provider: ProviderId) -> Self {
        Self {
            location,
            date,
            timestamp: None,
            temperature: Reading::default(),
            feels_like: Reading::default(),
            humidity: Reading::default(),
            precipitation_total: None,
            wind: WindReading::default(),
            pressure_mean: None,
            provider,
        }
    }

    /// Check the data-model invariants. Adapters call this before handing an
    /// observation to the rest of the system; a violation means the payload
    /// was malformed, not that the weather is strange.
    pub fn validate(&self) -> Result<(), String> {
        if !self.temperature.is_ordered() {
            return Err(format!("temperature not ordered: {:?}", self.temperature));
        }
        if !self.feels_like.is_ordered() {
            return Err(format!("feels_like not ordered: {:?}", self.feels_like));
        }
        if !self.humidity.is_ordered() {
            return Err(format!("humidity not ordered: {:?}", self.humidity));
        }
        for value in [self.humidity.mean, self.humidity.min, self.humidity.max]
            .into_iter()
            .flatten()
        {
            if !(0.0..=100.0).contains(&value) {
                return Err(format!("humidity out of range: {value}"));
            }
        }
        if let Some(precipitation) = self.precipitation_total {
            if precipitation < 0.0 {
                return Err(format!("negative precipitation: {precipitation}"));
            }
        }
        Ok(())
    }
}
