//! Property-based tests for core invariants using proptest
//!
//! - Monitoring-day filtering is idempotent and only keeps configured days
//! - Grouping round-trips: flattening groups reproduces the input
//! - Empty or field-less input never produces zero-valued statistics
//! - The rate limiter admits exactly the cap per window per client

use chrono::{Datelike, Duration, NaiveDate};
use proptest::prelude::*;

use climate_monitoring::ratelimit::{RateLimitConfig, RateLimiter};
use climate_monitoring::sampling::{
    DateRange, PeriodLabel, SampleSet, group_by, summarize, weekly_summaries,
};
use climate_monitoring::schedule::WeekdaySet;
use climate_monitoring::{Location, Observation, ProviderId, Reading};

fn base_date() -> NaiveDate {
    NaiveDate::from_ymd_opt(2025, 1, 1).unwrap()
}

fn make_set(offsets: &std::collections::BTreeSet<i64>, means: bool) -> SampleSet {
    let range = DateRange::new(base_date(), base_date() + Duration::days(90)).unwrap();
    let observations: Vec<Observation> = offsets
        .iter()
        .map(|offset| {
            let mut obs = Observation::empty(
                Location::new("Montreal"),
                base_date() + Duration::days(*offset),
                ProviderId::OpenMeteo,
            );
            if means {
                obs.temperature = Reading::mean_only(*offset as f64 / 2.0 - 10.0);
            }
            obs
        })
        .collect();
    SampleSet::new(range, observations).unwrap()
}

proptest! {
    #[test]
    fn prop_filter_is_idempotent(
        offsets in proptest::collection::btree_set(0i64..=90, 0..40),
        day_indices in proptest::collection::btree_set(0u8..7, 0..7),
    ) {
        let weekdays = WeekdaySet::try_from(day_indices.into_iter().collect::<Vec<_>>()).unwrap();
        let set = make_set(&offsets, false);

        let once = set.filter_monitoring_days(weekdays);
        let twice = once.filter_monitoring_days(weekdays);

        prop_assert_eq!(once, twice);
    }
}

proptest! {
    #[test]
    fn prop_filter_keeps_only_configured_weekdays(
        offsets in proptest::collection::btree_set(0i64..=90, 0..40),
        day_indices in proptest::collection::btree_set(0u8..7, 0..7),
    ) {
        let weekdays = WeekdaySet::try_from(day_indices.into_iter().collect::<Vec<_>>()).unwrap();
        let set = make_set(&offsets, false);

        let filtered = set.filter_monitoring_days(weekdays);

        prop_assert!(filtered.len() <= set.len());
        for obs in filtered.iter() {
            prop_assert!(weekdays.contains(obs.date.weekday()));
        }
    }
}

proptest! {
    #[test]
    fn prop_group_by_roundtrips(
        offsets in proptest::collection::btree_set(0i64..=90, 0..40),
    ) {
        let set = make_set(&offsets, true);

        let groups = group_by(&set, |obs| obs.date.iso_week().week());

        let flattened: Vec<Observation> = groups
            .iter()
            .flat_map(|(_, group)| group.iter().cloned())
            .collect();

        // Same elements, same count; only the grouping order differs.
        prop_assert_eq!(flattened.len(), set.len());
        for obs in set.iter() {
            prop_assert!(flattened.contains(obs));
        }
    }
}

proptest! {
    #[test]
    fn prop_summary_counts_match_and_stats_are_sane(
        offsets in proptest::collection::btree_set(0i64..=90, 1..40),
    ) {
        let set = make_set(&offsets, true);
        let summary = summarize(
            &set,
            PeriodLabel::Range {
                start: set.range().start(),
                end: set.range().end(),
            },
        );

        prop_assert_eq!(summary.record_count, set.len());

        let temperature = summary.temperature.unwrap();
        let mean = temperature.mean.unwrap();
        // The mean of values lies within their extremes.
        let lo = set.iter().filter_map(|o| o.temperature.mean).fold(f64::MAX, f64::min);
        let hi = set.iter().filter_map(|o| o.temperature.mean).fold(f64::MIN, f64::max);
        prop_assert!(mean >= lo - 1e-9 && mean <= hi + 1e-9);

        if let Some(stddev) = temperature.stddev {
            prop_assert!(stddev >= 0.0);
            prop_assert!(set.len() >= 2);
        } else {
            prop_assert!(set.len() < 2);
        }
    }
}

proptest! {
    #[test]
    fn prop_field_less_records_produce_no_statistics(
        offsets in proptest::collection::btree_set(0i64..=90, 0..40),
    ) {
        // Observations with every metric absent: record_count reflects them,
        // but no statistic is ever fabricated from defaults.
        let set = make_set(&offsets, false);
        let summary = summarize(
            &set,
            PeriodLabel::Range {
                start: set.range().start(),
                end: set.range().end(),
            },
        );

        prop_assert_eq!(summary.record_count, set.len());
        prop_assert!(summary.temperature.is_none());
        prop_assert!(summary.humidity.is_none());
        prop_assert!(summary.precipitation.is_none());
        prop_assert!(summary.wind.is_none());
    }
}

proptest! {
    #[test]
    fn prop_weekly_rollup_preserves_record_count(
        offsets in proptest::collection::btree_set(0i64..=90, 0..40),
    ) {
        let set = make_set(&offsets, true);
        let total: usize = weekly_summaries(&set).iter().map(|s| s.record_count).sum();
        prop_assert_eq!(total, set.len());
    }
}

proptest! {
    #[test]
    fn prop_rate_limiter_admits_exactly_the_cap(
        cap in 1usize..20,
        extra in 1usize..10,
    ) {
        let limiter = RateLimiter::new(RateLimitConfig {
            window_secs: 60,
            max_requests: cap,
        });
        let now = chrono::DateTime::from_timestamp(1_735_000_000, 0).unwrap();

        let mut admitted = 0;
        for _ in 0..cap + extra {
            if limiter.check_at("client", now).allowed {
                admitted += 1;
            }
        }
        prop_assert_eq!(admitted, cap);

        // An unrelated client is untouched by the exhaustion.
        prop_assert!(limiter.check_at("other", now).allowed);
    }
}

proptest! {
    #[test]
    fn prop_ordered_reading_is_always_valid(
        a in -50.0f64..50.0,
        b in -50.0f64..50.0,
        c in -50.0f64..50.0,
    ) {
        let mut values = [a, b, c];
        values.sort_by(f64::total_cmp);
        let reading = Reading::full(values[1], values[0], values[2]);
        prop_assert!(reading.is_ordered());
    }
}
