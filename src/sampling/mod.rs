//! Sampling and aggregation engine.
//!
//! Raw daily records come in as a [`SampleSet`], get filtered down to the
//! configured monitoring weekdays, and roll up into weekly, seasonal, and
//! yearly [`PeriodSummary`] values. All of it is plain single-pass code over
//! typed observations: field absence is an `Option`, not a NaN, and grouping
//! is an explicit key function, not a tabular object.

pub mod sample_set;
pub mod summary;

pub use sample_set::{
    DateRange, DateRangeError, MAX_WINDOW_YEARS, SampleSet, SampleSetError, long_term_window,
};
pub use summary::{
    HumidityStats, PeriodLabel, PeriodSummary, PrecipitationStats, TemperatureStats, WindStats,
    summarize,
};

use chrono::{Datelike, NaiveDate};
use serde::Serialize;

use crate::Observation;

/// Meteorological season, Northern-Hemisphere convention.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum Season {
    Winter,
    Spring,
    Summer,
    Fall,
}

impl std::fmt::Display for Season {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Season::Winter => write!(f, "Winter"),
            Season::Spring => write!(f, "Spring"),
            Season::Summer => write!(f, "Summer"),
            Season::Fall => write!(f, "Fall"),
        }
    }
}

/// Fixed month-to-season mapping. Pure, no state.
pub fn classify_season(date: NaiveDate) -> Season {
    match date.month() {
        12 | 1 | 2 => Season::Winter,
        3 | 4 | 5 => Season::Spring,
        6 | 7 | 8 => Season::Summer,
        _ => Season::Fall,
    }
}

/// Group a sample set by an arbitrary key, preserving the insertion order of
/// first-seen keys. Flattening the groups back together reproduces the input.
pub fn group_by<K, F>(set: &SampleSet, key_fn: F) -> Vec<(K, SampleSet)>
where
    K: PartialEq + Clone,
    F: Fn(&Observation) -> K,
{
    let mut groups: Vec<(K, Vec<Observation>)> = Vec::new();

    for obs in set.iter() {
        let key = key_fn(obs);
        match groups.iter().position(|(k, _)| *k == key) {
            Some(index) => groups[index].1.push(obs.clone()),
            None => groups.push((key, vec![obs.clone()])),
        }
    }

    groups
        .into_iter()
        .map(|(key, members)| {
            (
                key,
                SampleSet::from_parts(set.range(), set.weekday_filter(), members),
            )
        })
        .collect()
}

/// One summary per ISO week, in chronological order of the input.
pub fn weekly_summaries(set: &SampleSet) -> Vec<PeriodSummary> {
    group_by(set, |obs| {
        let week = obs.date.iso_week();
        (week.year(), week.week())
    })
    .into_iter()
    .map(|((iso_year, week), group)| summarize(&group, PeriodLabel::Week { iso_year, week }))
    .collect()
}

/// One summary per (calendar year, season) pair.
pub fn seasonal_summaries(set: &SampleSet) -> Vec<PeriodSummary> {
    group_by(set, |obs| (obs.date.year(), classify_season(obs.date)))
        .into_iter()
        .map(|((year, season), group)| summarize(&group, PeriodLabel::Season { year, season }))
        .collect()
}

/// One summary per calendar year.
pub fn yearly_summaries(set: &SampleSet) -> Vec<PeriodSummary> {
    group_by(set, |obs| obs.date.year())
        .into_iter()
        .map(|(year, group)| summarize(&group, PeriodLabel::Year { year }))
        .collect()
}

/// Mean temperature per calendar month, for the yearly report breakdown.
/// Months without any reported mean are omitted.
pub fn monthly_mean_temperatures(set: &SampleSet) -> Vec<(u32, f64)> {
    group_by(set, |obs| obs.date.month())
        .into_iter()
        .filter_map(|(month, group)| {
            let means: Vec<f64> = group.iter().filter_map(|o| o.temperature.mean).collect();
            summary::mean(&means).map(|m| (month, m))
        })
        .collect()
}
