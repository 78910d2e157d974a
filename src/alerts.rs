//! Threshold checks over a single observation, and alert dispatch.
//!
//! Evaluation is a stateless function: it never looks at history, and a
//! missing field simply skips its check. Dispatch is best-effort; a failed
//! send is logged and never escalated.

use serde::{Deserialize, Serialize};
use tracing::{info, instrument, warn};

use crate::Observation;
use crate::telegram::TelegramManager;

/// How loud an alert should be at the transport.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Info,
    Warning,
}

/// A transient alert value. Handed to the transport, never persisted.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Alert {
    pub severity: Severity,
    /// Which metric tripped the check.
    pub metric: &'static str,
    /// The offending value.
    pub value: f64,
    pub message: String,
}

/// Alert thresholds, tuned for a temperate-climate city. Configuration, not
/// business logic: every bound can be overridden in the config file.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct AlertThresholds {
    /// Mean temperature at or above this fires "high temperature" (°C).
    #[serde(default = "default_high_temperature")]
    pub high_temperature: f64,

    /// Mean temperature at or below this fires "low temperature" (°C).
    #[serde(default = "default_low_temperature")]
    pub low_temperature: f64,

    /// Mean wind speed at or above this fires "strong wind" (km/h).
    #[serde(default = "default_strong_wind")]
    pub strong_wind: f64,

    /// Mean humidity at or above this fires "high humidity" (%).
    #[serde(default = "default_high_humidity")]
    pub high_humidity: f64,
}

fn default_high_temperature() -> f64 {
    30.0
}

fn default_low_temperature() -> f64 {
    -20.0
}

fn default_strong_wind() -> f64 {
    50.0
}

fn default_high_humidity() -> f64 {
    90.0
}

impl Default for AlertThresholds {
    fn default() -> Self {
        Self {
            high_temperature: default_high_temperature(),
            low_temperature: default_low_temperature(),
            strong_wind: default_strong_wind(),
            high_humidity: default_high_humidity(),
        }
    }
}

/// Run every threshold check against one observation.
///
/// Checks run in a fixed order (high temperature, low temperature, strong
/// wind, high humidity) and more than one may fire. Absent fields skip their
/// check without producing an alert or an error.
pub fn evaluate(observation: &Observation, thresholds: &AlertThresholds) -> Vec<Alert> {
    let mut alerts = Vec::new();

    if let Some(temperature) = observation.temperature.mean {
        if temperature >= thresholds.high_temperature {
            alerts.push(Alert {
                severity: Severity::Warning,
                metric: "temperature_mean",
                value: temperature,
                message: format!("High temperature: {temperature:.1}°C"),
            });
        }
        if temperature <= thresholds.low_temperature {
            alerts.push(Alert {
                severity: Severity::Warning,
                metric: "temperature_mean",
                value: temperature,
                message: format!("Low temperature: {temperature:.1}°C"),
            });
        }
    }

    if let Some(wind) = observation.wind.mean {
        if wind >= thresholds.strong_wind {
            alerts.push(Alert {
                severity: Severity::Warning,
                metric: "wind_speed_mean",
                value: wind,
                message: format!("Strong wind: {wind:.1} km/h"),
            });
        }
    }

    if let Some(humidity) = observation.humidity.mean {
        if humidity >= thresholds.high_humidity {
            alerts.push(Alert {
                severity: Severity::Warning,
                metric: "humidity_mean",
                value: humidity,
                message: format!("High humidity: {humidity:.1}%"),
            });
        }
    }

    alerts
}

/// Evaluates observations and pushes the resulting alerts out through the
/// configured transport.
#[derive(Debug, Clone)]
pub struct AlertManager {
    thresholds: AlertThresholds,
    location_name: String,
    telegram: Option<TelegramManager>,
}

impl AlertManager {
    pub fn new(
        thresholds: AlertThresholds,
        location_name: impl Into<String>,
        telegram: Option<TelegramManager>,
    ) -> Self {
        Self {
            thresholds,
            location_name: location_name.into(),
            telegram,
        }
    }

    pub fn thresholds(&self) -> &AlertThresholds {
        &self.thresholds
    }

    /// Evaluate one observation and dispatch whatever fires.
    ///
    /// Returns the alerts so the caller can log or expose them regardless of
    /// transport availability.
    #[instrument(skip_all, fields(location = %self.location_name))]
    pub async fn process(&self, observation: &Observation) -> Vec<Alert> {
        let alerts = evaluate(observation, &self.thresholds);

        for alert in &alerts {
            warn!("{}: {}", self.location_name, alert.message);
        }

        if alerts.is_empty() {
            info!("no alert thresholds exceeded");
            return alerts;
        }

        if let Some(telegram) = &self.telegram {
            for alert in &alerts {
                let text = format!("{} — {}", self.location_name, alert.message);
                telegram.send_message(&text, alert.severity).await;
            }
        }

        alerts
    }
}
