//! Plain-text report and CSV writers.
//!
//! These are the boring edge of the system: they take finished summaries and
//! put them on disk. Absent statistics are printed as "n/a", never as a fake
//! zero.

use std::fmt::Write as _;
use std::path::{Path, PathBuf};

use chrono::{Datelike, NaiveDate};
use tracing::info;

use crate::config::ReportsConfig;
use crate::sampling::{
    PeriodLabel, SampleSet, monthly_mean_temperatures, summarize, weekly_summaries,
    yearly_summaries,
};

fn fmt_opt(value: Option<f64>, unit: &str) -> String {
    match value {
        Some(value) => format!("{value:.1}{unit}"),
        None => "n/a".to_string(),
    }
}

const MONTH_NAMES: [&str; 12] = [
    "January",
    "February",
    "March",
    "April",
    "May",
    "June",
    "July",
    "August",
    "September",
    "October",
    "November",
    "December",
];

#[derive(Debug, Clone)]
pub struct ReportWriter {
    reports_dir: PathBuf,
    data_dir: PathBuf,
}

impl ReportWriter {
    pub fn new(config: &ReportsConfig) -> Self {
        Self {
            reports_dir: config.reports_dir.clone(),
            data_dir: config.data_dir.clone(),
        }
    }

    fn write_file(path: &Path, content: &str) -> std::io::Result<PathBuf> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        std::fs::write(path, content)?;
        Ok(path.to_path_buf())
    }

    /// Monthly report: overall statistics for the sampled month plus a
    /// per-ISO-week breakdown.
    pub fn write_monthly_report(
        &self,
        city: &str,
        month: NaiveDate,
        set: &SampleSet,
    ) -> std::io::Result<PathBuf> {
        let label = format!("{}-{:02}", month.year(), month.month());
        let overall = summarize(
            set,
            PeriodLabel::Range {
                start: set.range().start(),
                end: set.range().end(),
            },
        );

        let mut content = String::new();
        let _ = writeln!(content, "Monthly Climate Report - {city} {label}");
        let _ = writeln!(content, "{}", "=".repeat(50));
        let _ = writeln!(content);
        let _ = writeln!(content, "OVERALL STATISTICS:");

        let temperature = overall.temperature;
        let _ = writeln!(
            content,
            "Mean temperature: {}",
            fmt_opt(temperature.and_then(|t| t.mean), "°C")
        );
        let _ = writeln!(
            content,
            "Maximum temperature: {}",
            fmt_opt(temperature.and_then(|t| t.max), "°C")
        );
        let _ = writeln!(
            content,
            "Minimum temperature: {}",
            fmt_opt(temperature.and_then(|t| t.min), "°C")
        );
        let _ = writeln!(
            content,
            "Mean humidity: {}",
            fmt_opt(overall.humidity.and_then(|h| h.mean), "%")
        );
        let _ = writeln!(
            content,
            "Total precipitation: {}",
            fmt_opt(overall.precipitation.map(|p| p.total), " mm")
        );
        let _ = writeln!(
            content,
            "Mean wind speed: {}",
            fmt_opt(overall.wind.and_then(|w| w.mean), " km/h")
        );
        let _ = writeln!(content, "Records collected: {}", overall.record_count);
        let _ = writeln!(content);
        let _ = writeln!(content, "WEEKLY BREAKDOWN:");

        for week in weekly_summaries(set) {
            let _ = writeln!(
                content,
                "{}: {} records, mean temperature {}",
                week.label,
                week.record_count,
                fmt_opt(week.temperature.and_then(|t| t.mean), "°C"),
            );
        }

        let path = self.reports_dir.join(format!("monthly_report_{label}.txt"));
        let written = Self::write_file(&path, &content)?;
        info!("monthly report written to {}", written.display());
        Ok(written)
    }

    /// Yearly report over a multi-year sample: per-year statistics plus
    /// monthly mean temperatures.
    pub fn write_yearly_report(
        &self,
        city: &str,
        year: i32,
        set: &SampleSet,
    ) -> std::io::Result<PathBuf> {
        let mut content = String::new();
        let _ = writeln!(content, "Yearly Climate Report - {city} {year}");
        let _ = writeln!(content, "{}", "=".repeat(50));
        let _ = writeln!(content);

        for (report_year, group) in
            crate::sampling::group_by(set, |obs| obs.date.year())
        {
            let summary = &yearly_summaries(&group)[0];
            let temperature = summary.temperature;

            let _ = writeln!(content, "YEAR {report_year}:");
            let _ = writeln!(
                content,
                "  Mean annual temperature: {}",
                fmt_opt(temperature.and_then(|t| t.mean), "°C")
            );
            let _ = writeln!(
                content,
                "  Maximum temperature: {}",
                fmt_opt(temperature.and_then(|t| t.max), "°C")
            );
            let _ = writeln!(
                content,
                "  Minimum temperature: {}",
                fmt_opt(temperature.and_then(|t| t.min), "°C")
            );
            let _ = writeln!(
                content,
                "  Total precipitation: {}",
                fmt_opt(summary.precipitation.map(|p| p.total), " mm")
            );
            let _ = writeln!(
                content,
                "  Mean humidity: {}",
                fmt_opt(summary.humidity.and_then(|h| h.mean), "%")
            );
            let _ = writeln!(content, "  Records collected: {}", summary.record_count);
            let _ = writeln!(content);
            let _ = writeln!(content, "  MONTHLY MEANS:");
            for (month, mean) in monthly_mean_temperatures(&group) {
                let _ = writeln!(
                    content,
                    "    {}: {mean:.1}°C",
                    MONTH_NAMES[(month - 1) as usize]
                );
            }
            let _ = writeln!(content);
        }

        let path = self.reports_dir.join(format!("yearly_report_{year}.txt"));
        let written = Self::write_file(&path, &content)?;
        info!("yearly report written to {}", written.display());
        Ok(written)
    }

    /// Export the sampled monitoring records for one cycle as CSV.
    pub fn write_samples_csv(
        &self,
        tag: NaiveDate,
        set: &SampleSet,
    ) -> std::io::Result<PathBuf> {
        let mut content = String::from(
            "date,provider,temperature_mean,temperature_min,temperature_max,\
feels_like_mean,humidity_mean,precipitation_total,wind_speed_mean,wind_speed_max,pressure_mean\n",
        );

        for obs in set.iter() {
            let _ = writeln!(
                content,
                "{},{},{},{},{},{},{},{},{},{},{}",
                obs.date,
                obs.provider,
                csv_opt(obs.temperature.mean),
                csv_opt(obs.temperature.min),
                csv_opt(obs.temperature.max),
                csv_opt(obs.feels_like.mean),
                csv_opt(obs.humidity.mean),
                csv_opt(obs.precipitation_total),
                csv_opt(obs.wind.mean),
                csv_opt(obs.wind.max),
                csv_opt(obs.pressure_mean),
            );
        }

        let path = self
            .data_dir
            .join(format!("monitoring_{}.csv", tag.format("%Y%m%d")));
        let written = Self::write_file(&path, &content)?;
        info!("sampled data written to {}", written.display());
        Ok(written)
    }
}

/// Absent values become empty CSV cells, not zeroes.
fn csv_opt(value: Option<f64>) -> String {
    value.map(|v| v.to_string()).unwrap_or_default()
}
