//! Monitoring calendar logic.
//!
//! Everything here is a pure function of a date (or date-time) and the static
//! schedule configuration, so the scheduler loop stays a thin timer around
//! [`ScheduleSpec::is_due`] and tests never have to touch the wall clock.

use chrono::{Datelike, Duration, NaiveDate, NaiveDateTime, Timelike, Weekday};
use serde::{Deserialize, Serialize};

/// A set of weekdays, stored as a bitmask indexed from Monday.
///
/// Configs spell weekdays as indices (0 = Monday .. 6 = Sunday), matching the
/// common convention of weekly schedules.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "Vec<u8>", into = "Vec<u8>")]
pub struct WeekdaySet(u8);

impl WeekdaySet {
    /// Monday / Wednesday / Friday, the reference sampling cadence.
    pub const MON_WED_FRI: WeekdaySet = WeekdaySet(0b0010101);

    pub fn from_weekdays(days: &[Weekday]) -> Self {
        let mut mask = 0u8;
        for day in days {
            mask |= 1 << day.num_days_from_monday();
        }
        WeekdaySet(mask)
    }

    pub fn contains(&self, day: Weekday) -> bool {
        self.0 & (1 << day.num_days_from_monday()) != 0
    }

    pub fn is_empty(&self) -> bool {
        self.0 == 0
    }

    pub fn len(&self) -> usize {
        self.0.count_ones() as usize
    }
}

impl TryFrom<Vec<u8>> for WeekdaySet {
    type Error = String;

    fn try_from(indices: Vec<u8>) -> Result<Self, Self::Error> {
        let mut mask = 0u8;
        for index in indices {
            if index > 6 {
                return Err(format!("weekday index out of range: {index} (expected 0-6)"));
            }
            mask |= 1 << index;
        }
        Ok(WeekdaySet(mask))
    }
}

impl From<WeekdaySet> for Vec<u8> {
    fn from(set: WeekdaySet) -> Self {
        (0u8..7).filter(|i| set.0 & (1 << i) != 0).collect()
    }
}

impl Default for WeekdaySet {
    fn default() -> Self {
        WeekdaySet::MON_WED_FRI
    }
}

/// Static description of when monitoring cycles run.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ScheduleSpec {
    /// Weekdays on which a cycle runs.
    #[serde(default)]
    pub weekdays: WeekdaySet,

    /// Local hour (0-23) at which a cycle becomes due.
    #[serde(default = "default_hour")]
    pub hour: u32,

    /// First calendar year of the monitoring horizon.
    #[serde(default = "default_start_year")]
    pub start_year: i32,

    /// Last calendar year of the monitoring horizon (inclusive).
    #[serde(default = "default_end_year")]
    pub end_year: i32,
}

fn default_hour() -> u32 {
    9
}

fn default_start_year() -> i32 {
    2024
}

fn default_end_year() -> i32 {
    2026
}

impl Default for ScheduleSpec {
    fn default() -> Self {
        Self {
            weekdays: WeekdaySet::default(),
            hour: default_hour(),
            start_year: default_start_year(),
            end_year: default_end_year(),
        }
    }
}

/// Status snapshot derived from the wall clock and static configuration.
#[derive(Debug, Clone, Serialize)]
pub struct MonitoringStatus {
    pub is_monitoring_day: bool,
    pub next_monitoring_date: Option<NaiveDate>,
    pub progress_percentage: f64,
    pub data_sources: Vec<String>,
}

impl ScheduleSpec {
    pub fn is_monitoring_day(&self, date: NaiveDate) -> bool {
        self.weekdays.contains(date.weekday())
    }

    /// Whether a date falls inside the configured multi-year horizon.
    pub fn in_horizon(&self, date: NaiveDate) -> bool {
        (self.start_year..=self.end_year).contains(&date.year())
    }

    /// Decide whether a cycle should run right now.
    ///
    /// A cycle is due on a monitoring weekday inside the horizon, once the
    /// configured hour has been reached, and only if no cycle has run today
    /// yet. A delayed check later the same day still fires (the ticker may
    /// have been blocked by a long cycle); a skipped day is never caught up.
    pub fn is_due(&self, now: NaiveDateTime, last_run: Option<NaiveDate>) -> bool {
        let today = now.date();
        if !self.is_monitoring_day(today) || !self.in_horizon(today) {
            return false;
        }
        if now.hour() < self.hour {
            return false;
        }
        last_run != Some(today)
    }

    /// The next monitoring day strictly after `today`, if any remains within
    /// the horizon.
    pub fn next_monitoring_date(&self, today: NaiveDate) -> Option<NaiveDate> {
        if self.weekdays.is_empty() {
            return None;
        }
        (1..=7)
            .map(|offset| today + Duration::days(offset))
            .find(|date| self.is_monitoring_day(*date))
            .filter(|date| self.in_horizon(*date))
    }

    /// Position of `today` within the horizon, as a percentage clamped to
    /// [0, 100].
    pub fn progress_percentage(&self, today: NaiveDate) -> f64 {
        let start = NaiveDate::from_ymd_opt(self.start_year, 1, 1).expect("valid start of year");
        let end = NaiveDate::from_ymd_opt(self.end_year, 12, 31).expect("valid end of year");
        let total = (end - start).num_days();
        if total <= 0 {
            return 100.0;
        }
        let elapsed = (today - start).num_days();
        (elapsed as f64 / total as f64 * 100.0).clamp(0.0, 100.0)
    }

    pub fn status(&self, today: NaiveDate, data_sources: Vec<String>) -> MonitoringStatus {
        MonitoringStatus {
            is_monitoring_day: self.is_monitoring_day(today),
            next_monitoring_date: self.next_monitoring_date(today),
            progress_percentage: self.progress_percentage(today),
            data_sources,
        }
    }
}

/// First day of a month triggers the monthly report.
pub fn is_monthly_report_day(date: NaiveDate) -> bool {
    date.day() == 1
}

/// January 1st triggers the yearly report.
pub fn is_yearly_report_day(date: NaiveDate) -> bool {
    date.month() == 1 && date.day() == 1
}
