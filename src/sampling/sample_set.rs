//! Date ranges and ordered observation sequences.

use chrono::{Duration, NaiveDate};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::Observation;
use crate::schedule::WeekdaySet;

/// Longest backward-looking window the system will serve, in years.
///
/// The mandate is a bounded multi-year horizon, not indefinite history.
pub const MAX_WINDOW_YEARS: u32 = 3;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum DateRangeError {
    #[error("invalid date range: start {start} is not before end {end}")]
    Reversed { start: NaiveDate, end: NaiveDate },

    #[error("requested horizon of {years} years exceeds the {MAX_WINDOW_YEARS}-year cap")]
    HorizonExceeded { years: u32 },

    #[error("requested horizon of zero years")]
    EmptyHorizon,
}

/// An inclusive range of civil dates.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct DateRange {
    start: NaiveDate,
    end: NaiveDate,
}

impl DateRange {
    /// Build a range, rejecting `start >= end` before anything downstream
    /// (network calls included) gets to see it.
    pub fn new(start: NaiveDate, end: NaiveDate) -> Result<Self, DateRangeError> {
        if start >= end {
            return Err(DateRangeError::Reversed { start, end });
        }
        Ok(Self { start, end })
    }

    pub fn start(&self) -> NaiveDate {
        self.start
    }

    pub fn end(&self) -> NaiveDate {
        self.end
    }

    pub fn contains(&self, date: NaiveDate) -> bool {
        date >= self.start && date <= self.end
    }

    /// Width of the range in days (end minus start).
    pub fn width_days(&self) -> i64 {
        (self.end - self.start).num_days()
    }

    /// The last `weeks` weeks ending at `end`.
    pub fn weeks_back(end: NaiveDate, weeks: u32) -> Result<Self, DateRangeError> {
        Self::new(end - Duration::weeks(weeks as i64), end)
    }
}

/// The bounded long-term window: `years * 365` days ending at `today`.
///
/// Requests beyond [`MAX_WINDOW_YEARS`] are rejected here, before any
/// provider is contacted.
pub fn long_term_window(today: NaiveDate, years: u32) -> Result<DateRange, DateRangeError> {
    if years == 0 {
        return Err(DateRangeError::EmptyHorizon);
    }
    if years > MAX_WINDOW_YEARS {
        return Err(DateRangeError::HorizonExceeded { years });
    }
    DateRange::new(today - Duration::days(years as i64 * 365), today)
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum SampleSetError {
    #[error("observation date {date} lies outside the range {start}..={end}")]
    OutOfRange {
        date: NaiveDate,
        start: NaiveDate,
        end: NaiveDate,
    },

    #[error("duplicate observation for {date}")]
    DuplicateDate { date: NaiveDate },
}

/// A chronologically ordered sequence of observations for a contiguous date
/// range, optionally tagged with the weekday filter that produced it.
///
/// Construction enforces the invariants (dates unique and within range); the
/// sequence is sorted on entry so iteration order always equals chronological
/// order.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SampleSet {
    range: DateRange,
    weekday_filter: Option<WeekdaySet>,
    observations: Vec<Observation>,
}

impl SampleSet {
    pub fn new(
        range: DateRange,
        mut observations: Vec<Observation>,
    ) -> Result<Self, SampleSetError> {
        observations.sort_by_key(|obs| obs.date);

        for window in observations.windows(2) {
            if window[0].date == window[1].date {
                return Err(SampleSetError::DuplicateDate {
                    date: window[0].date,
                });
            }
        }
        for obs in &observations {
            if !range.contains(obs.date) {
                return Err(SampleSetError::OutOfRange {
                    date: obs.date,
                    start: range.start(),
                    end: range.end(),
                });
            }
        }

        Ok(Self {
            range,
            weekday_filter: None,
            observations,
        })
    }

    pub fn empty(range: DateRange) -> Self {
        Self {
            range,
            weekday_filter: None,
            observations: Vec::new(),
        }
    }

    /// Internal constructor for subsets whose members already satisfied the
    /// invariants in their parent set.
    pub(crate) fn from_parts(
        range: DateRange,
        weekday_filter: Option<WeekdaySet>,
        observations: Vec<Observation>,
    ) -> Self {
        debug_assert!(observations.windows(2).all(|w| w[0].date < w[1].date));
        Self {
            range,
            weekday_filter,
            observations,
        }
    }

    pub fn range(&self) -> DateRange {
        self.range
    }

    pub fn weekday_filter(&self) -> Option<WeekdaySet> {
        self.weekday_filter
    }

    pub fn len(&self) -> usize {
        self.observations.len()
    }

    pub fn is_empty(&self) -> bool {
        self.observations.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Observation> {
        self.observations.iter()
    }

    pub fn observations(&self) -> &[Observation] {
        &self.observations
    }

    pub fn latest(&self) -> Option<&Observation> {
        self.observations.last()
    }

    /// Keep only observations whose weekday is in `weekdays`.
    ///
    /// Order is preserved, no missing day is interpolated, and filtering an
    /// already-filtered set with the same weekdays returns an equal set.
    pub fn filter_monitoring_days(&self, weekdays: WeekdaySet) -> SampleSet {
        use chrono::Datelike;

        let observations = self
            .observations
            .iter()
            .filter(|obs| weekdays.contains(obs.date.weekday()))
            .cloned()
            .collect();

        SampleSet {
            range: self.range,
            weekday_filter: Some(weekdays),
            observations,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{Location, ProviderId};
    use assert_matches::assert_matches;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn obs(d: NaiveDate) -> Observation {
        Observation::empty(Location::new("Montreal"), d, ProviderId::OpenMeteo)
    }

    #[test]
    fn test_date_range_rejects_reversed() {
        assert_matches!(
            DateRange::new(date(2025, 2, 1), date(2025, 1, 1)),
            Err(DateRangeError::Reversed { .. })
        );
        assert_matches!(
            DateRange::new(date(2025, 1, 1), date(2025, 1, 1)),
            Err(DateRangeError::Reversed { .. })
        );
    }

    #[test]
    fn test_long_term_window_cap() {
        let today = date(2025, 6, 1);

        assert_matches!(
            long_term_window(today, 4),
            Err(DateRangeError::HorizonExceeded { years: 4 })
        );
        assert_matches!(long_term_window(today, 0), Err(DateRangeError::EmptyHorizon));

        let window = long_term_window(today, 2).unwrap();
        assert_eq!(window.end(), today);
        assert_eq!(window.width_days(), 730);
    }

    #[test]
    fn test_sample_set_sorts_and_validates() {
        let range = DateRange::new(date(2025, 1, 1), date(2025, 1, 31)).unwrap();
        let set = SampleSet::new(
            range,
            vec![obs(date(2025, 1, 10)), obs(date(2025, 1, 2))],
        )
        .unwrap();

        let dates: Vec<NaiveDate> = set.iter().map(|o| o.date).collect();
        assert_eq!(dates, vec![date(2025, 1, 2), date(2025, 1, 10)]);
    }

    #[test]
    fn test_sample_set_rejects_duplicates() {
        let range = DateRange::new(date(2025, 1, 1), date(2025, 1, 31)).unwrap();
        assert_matches!(
            SampleSet::new(range, vec![obs(date(2025, 1, 2)), obs(date(2025, 1, 2))]),
            Err(SampleSetError::DuplicateDate { .. })
        );
    }

    #[test]
    fn test_sample_set_rejects_out_of_range() {
        let range = DateRange::new(date(2025, 1, 1), date(2025, 1, 31)).unwrap();
        assert_matches!(
            SampleSet::new(range, vec![obs(date(2025, 2, 2))]),
            Err(SampleSetError::OutOfRange { .. })
        );
    }

    #[test]
    fn test_filter_keeps_only_configured_weekdays() {
        let range = DateRange::new(date(2025, 1, 1), date(2025, 1, 12)).unwrap();
        let set = SampleSet::new(
            range,
            (1..=12).map(|d| obs(date(2025, 1, d))).collect(),
        )
        .unwrap();

        let filtered = set.filter_monitoring_days(WeekdaySet::MON_WED_FRI);

        // Jan 2025: Wed 1, Fri 3, Mon 6, Wed 8, Fri 10 fall in 1..=12
        let dates: Vec<u32> = filtered
            .iter()
            .map(|o| chrono::Datelike::day(&o.date))
            .collect();
        assert_eq!(dates, vec![1, 3, 6, 8, 10]);
        assert_eq!(filtered.weekday_filter(), Some(WeekdaySet::MON_WED_FRI));
    }

    #[test]
    fn test_filter_is_idempotent() {
        let range = DateRange::new(date(2025, 1, 1), date(2025, 1, 31)).unwrap();
        let set = SampleSet::new(
            range,
            (1..=31).map(|d| obs(date(2025, 1, d))).collect(),
        )
        .unwrap();

        let once = set.filter_monitoring_days(WeekdaySet::MON_WED_FRI);
        let twice = once.filter_monitoring_days(WeekdaySet::MON_WED_FRI);
        assert_eq!(once, twice);
    }
}
