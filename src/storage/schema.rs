//! Stored observation rows.
//!
//! The hybrid layout mirrors the query patterns: frequently-filtered values
//! (date, provider, temperature aggregates) live in typed columns, while the
//! complete [`Observation`] rides along as JSON so nothing is lost and new
//! fields need no migration.

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

use crate::Observation;

/// One persisted observation, as written by the storage actor.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ObservationRow {
    /// When this row was fetched from a provider (always UTC).
    pub fetched_at: DateTime<Utc>,

    /// Civil date of the reading.
    pub date: NaiveDate,

    /// Location name, for filtering once multiple cities exist.
    pub location: String,

    /// Adapter that produced the reading.
    pub provider: String,

    // === Aggregate columns (frequently queried) ===
    pub temperature_mean: Option<f64>,
    pub temperature_min: Option<f64>,
    pub temperature_max: Option<f64>,
    pub humidity_mean: Option<f64>,
    pub precipitation_total: Option<f64>,
    pub wind_speed_mean: Option<f64>,

    // === Full record ===
    /// The complete observation. Kept as the typed struct in memory and
    /// serialized to JSON only at the database boundary.
    pub observation: Observation,
}

impl ObservationRow {
    pub fn from_observation(observation: &Observation, fetched_at: DateTime<Utc>) -> Self {
        Self {
            fetched_at,
            date: observation.date,
            location: observation.location.name.clone(),
            provider: observation.provider.to_string(),
            temperature_mean: observation.temperature.mean,
            temperature_min: observation.temperature.min,
            temperature_max: observation.temperature.max,
            humidity_mean: observation.humidity.mean,
            precipitation_total: observation.precipitation_total,
            wind_speed_mean: observation.wind.mean,
            observation: observation.clone(),
        }
    }
}
