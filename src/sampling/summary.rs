//! Period statistics over a sample set.
//!
//! Every aggregate skips absent values instead of substituting zero; an empty
//! input produces a summary whose statistics blocks are all `None`, so "no
//! data" stays distinguishable from a genuinely zero reading.

use serde::Serialize;

use super::Season;
use super::sample_set::SampleSet;

/// Human-meaningful key of a summary period.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case", tag = "kind")]
pub enum PeriodLabel {
    /// ISO week (the ISO year can differ from the calendar year at the
    /// boundaries).
    Week { iso_year: i32, week: u32 },
    Season { year: i32, season: Season },
    Year { year: i32 },
    /// A whole date range summarised as one period.
    Range {
        start: chrono::NaiveDate,
        end: chrono::NaiveDate,
    },
}

impl std::fmt::Display for PeriodLabel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            PeriodLabel::Week { iso_year, week } => write!(f, "{iso_year}-W{week:02}"),
            PeriodLabel::Season { year, season } => write!(f, "{season} {year}"),
            PeriodLabel::Year { year } => write!(f, "{year}"),
            PeriodLabel::Range { start, end } => write!(f, "{start}..{end}"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct TemperatureStats {
    /// Lowest daily minimum.
    pub min: Option<f64>,
    /// Highest daily maximum.
    pub max: Option<f64>,
    /// Mean of daily means.
    pub mean: Option<f64>,
    /// Population standard deviation of daily means; absent with fewer than
    /// two values.
    pub stddev: Option<f64>,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct HumidityStats {
    pub min: Option<f64>,
    pub max: Option<f64>,
    pub mean: Option<f64>,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct PrecipitationStats {
    /// Sum over days that reported precipitation.
    pub total: f64,
    /// Total divided by the number of reporting days (not the record count).
    pub mean_daily: f64,
    /// Reporting days with strictly positive precipitation.
    pub days_with_precipitation: usize,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct WindStats {
    pub max: Option<f64>,
    pub mean: Option<f64>,
}

/// Aggregated statistics for one period, derived from a sample set and never
/// mutated afterwards.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PeriodSummary {
    pub label: PeriodLabel,

    /// Number of observations in the source set. Per-field bases can be
    /// smaller when providers omitted fields.
    pub record_count: usize,

    pub temperature: Option<TemperatureStats>,
    pub humidity: Option<HumidityStats>,
    pub precipitation: Option<PrecipitationStats>,
    pub wind: Option<WindStats>,
}

/// Mean of a slice, absent for empty input.
pub fn mean(values: &[f64]) -> Option<f64> {
    if values.is_empty() {
        return None;
    }
    Some(values.iter().sum::<f64>() / values.len() as f64)
}

/// Population standard deviation, absent with fewer than two values.
pub fn population_stddev(values: &[f64]) -> Option<f64> {
    if values.len() < 2 {
        return None;
    }
    let mean = values.iter().sum::<f64>() / values.len() as f64;
    let variance =
        values.iter().map(|v| (v - mean).powi(2)).sum::<f64>() / values.len() as f64;
    Some(variance.sqrt())
}

fn fold_min(values: impl Iterator<Item = f64>) -> Option<f64> {
    values.reduce(f64::min)
}

fn fold_max(values: impl Iterator<Item = f64>) -> Option<f64> {
    values.reduce(f64::max)
}

/// Roll a sample set into one summary with a single linear pass per field.
pub fn summarize(set: &SampleSet, label: PeriodLabel) -> PeriodSummary {
    let temp_means: Vec<f64> = set.iter().filter_map(|o| o.temperature.mean).collect();
    let temp_min = fold_min(set.iter().filter_map(|o| o.temperature.min));
    let temp_max = fold_max(set.iter().filter_map(|o| o.temperature.max));
    let temp_mean = mean(&temp_means);
    let temperature = match (temp_min, temp_max, temp_mean) {
        (None, None, None) => None,
        _ => Some(TemperatureStats {
            min: temp_min,
            max: temp_max,
            mean: temp_mean,
            stddev: population_stddev(&temp_means),
        }),
    };

    let humidity_means: Vec<f64> = set.iter().filter_map(|o| o.humidity.mean).collect();
    let humidity_min = fold_min(set.iter().filter_map(|o| o.humidity.min));
    let humidity_max = fold_max(set.iter().filter_map(|o| o.humidity.max));
    let humidity_mean = mean(&humidity_means);
    let humidity = match (humidity_min, humidity_max, humidity_mean) {
        (None, None, None) => None,
        _ => Some(HumidityStats {
            min: humidity_min,
            max: humidity_max,
            mean: humidity_mean,
        }),
    };

    let precipitation_values: Vec<f64> =
        set.iter().filter_map(|o| o.precipitation_total).collect();
    let precipitation = if precipitation_values.is_empty() {
        None
    } else {
        let total: f64 = precipitation_values.iter().sum();
        Some(PrecipitationStats {
            total,
            mean_daily: total / precipitation_values.len() as f64,
            days_with_precipitation: precipitation_values.iter().filter(|v| **v > 0.0).count(),
        })
    };

    let wind_max = fold_max(set.iter().filter_map(|o| o.wind.max));
    let wind_mean = mean(&set.iter().filter_map(|o| o.wind.mean).collect::<Vec<_>>());
    let wind = match (wind_max, wind_mean) {
        (None, None) => None,
        _ => Some(WindStats {
            max: wind_max,
            mean: wind_mean,
        }),
    };

    PeriodSummary {
        label,
        record_count: set.len(),
        temperature,
        humidity,
        precipitation,
        wind,
    }
}
