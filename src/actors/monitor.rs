//! MonitorActor - drives the monitoring cycle
//!
//! The actor is Idle between cycles. A 60-second ticker asks the pure
//! schedule function whether a cycle is due; manual triggers arrive as
//! commands. Both paths run the same cycle:
//!
//! ```text
//! fetch current → fetch recent sample (filtered to monitoring days, CSV)
//!   → evaluate & dispatch alerts → (Mondays) fetch forecast
//!   → (1st of month) monthly report
//!   → (Jan 1) yearly report over the 2-year window
//! ```
//!
//! A failing cycle is caught at the cycle boundary, logged, and the actor
//! returns to Idle; the next attempt happens at the next scheduled slot,
//! never earlier, and skipped slots are not caught up.

use std::sync::Arc;
use std::time::Duration;

use anyhow::Context;
use chrono::{Datelike, Local, NaiveDate, Utc};
use tokio::sync::{broadcast, mpsc, oneshot};
use tokio::time::interval;
use tracing::{debug, error, info, instrument, warn};

use crate::Location;
use crate::alerts::AlertManager;
use crate::providers::FallbackResolver;
use crate::reports::ReportWriter;
use crate::sampling::{DateRange, long_term_window};
use crate::schedule::{MonitoringStatus, ScheduleSpec, is_monthly_report_day, is_yearly_report_day};

use super::messages::{MonitorCommand, ObservationEvent};

/// How often the schedule is checked.
const SCHEDULE_TICK: Duration = Duration::from_secs(60);

/// Days of forecast fetched on Mondays.
const FORECAST_DAYS: u32 = 7;

/// Years covered by the New Year report.
const YEARLY_REPORT_YEARS: u32 = 2;

pub struct MonitorActor {
    location: Location,
    schedule: ScheduleSpec,
    sample_weeks_back: u32,
    resolver: Arc<FallbackResolver>,
    alert_manager: AlertManager,
    report_writer: ReportWriter,

    /// Broadcast sender for fresh observations.
    observation_tx: broadcast::Sender<ObservationEvent>,

    /// Command receiver for control messages.
    command_rx: mpsc::Receiver<MonitorCommand>,

    /// Date of the last cycle (successful or not), to keep one slot from
    /// firing twice.
    last_cycle: Option<NaiveDate>,
}

impl MonitorActor {
    #[allow(clippy::too_many_arguments)]
    fn new(
        location: Location,
        schedule: ScheduleSpec,
        sample_weeks_back: u32,
        resolver: Arc<FallbackResolver>,
        alert_manager: AlertManager,
        report_writer: ReportWriter,
        observation_tx: broadcast::Sender<ObservationEvent>,
        command_rx: mpsc::Receiver<MonitorCommand>,
    ) -> Self {
        Self {
            location,
            schedule,
            sample_weeks_back,
            resolver,
            alert_manager,
            report_writer,
            observation_tx,
            command_rx,
            last_cycle: None,
        }
    }

    /// Run the actor's main loop until shutdown.
    #[instrument(skip(self), fields(location = %self.location.name))]
    pub async fn run(mut self) {
        debug!("starting monitor actor");

        let mut ticker = interval(SCHEDULE_TICK);
        ticker.tick().await; // First tick is immediate, skip it

        loop {
            tokio::select! {
                _ = ticker.tick() => {
                    let now = Local::now().naive_local();
                    if self.schedule.is_due(now, self.last_cycle) {
                        info!("schedule slot reached, running monitoring cycle");
                        self.run_cycle().await;
                    }
                }

                Some(cmd) = self.command_rx.recv() => {
                    match cmd {
                        MonitorCommand::RunCycle { respond_to } => {
                            debug!("received manual RunCycle command");
                            let success = self.run_cycle().await;
                            let _ = respond_to.send(success);
                        }

                        MonitorCommand::GetStatus { respond_to } => {
                            let status = self.status();
                            let _ = respond_to.send(status);
                        }

                        MonitorCommand::Shutdown => {
                            debug!("received shutdown command");
                            break;
                        }
                    }
                }

                else => {
                    warn!("command channel closed, shutting down");
                    break;
                }
            }
        }

        debug!("monitor actor stopped");
    }

    fn status(&self) -> MonitoringStatus {
        self.schedule
            .status(Local::now().date_naive(), self.resolver.provider_names())
    }

    /// Run one cycle, catching every failure at this boundary.
    ///
    /// The cycle date is recorded even on failure: retry happens at the next
    /// scheduled slot, not on the next ticker tick.
    async fn run_cycle(&mut self) -> bool {
        let today = Local::now().date_naive();
        self.last_cycle = Some(today);

        match self.cycle(today).await {
            Ok(()) => {
                info!("monitoring cycle completed successfully");
                true
            }
            Err(e) => {
                error!("monitoring cycle failed: {e:#}");
                false
            }
        }
    }

    /// The cycle body. Steps run in fixed order; any error aborts the rest
    /// of the cycle and is reported by the caller.
    async fn cycle(&mut self, today: NaiveDate) -> anyhow::Result<()> {
        // 1. Current conditions, through the fallback chain.
        let current = self
            .resolver
            .fetch_current(&self.location)
            .await
            .context("failed to fetch current conditions")?;

        let event = ObservationEvent {
            observation: current.clone(),
            fetched_at: Utc::now(),
        };
        // No subscribers is fine; storage may be configured off.
        let _ = self.observation_tx.send(event);

        // 2. Recent monitoring sample, filtered to the configured weekdays.
        let range = DateRange::weeks_back(today, self.sample_weeks_back)
            .context("invalid sampling range")?;
        let sample = self
            .resolver
            .fetch_historical(&self.location, range)
            .await
            .context("failed to fetch monitoring sample")?;
        let sampled = sample.filter_monitoring_days(self.schedule.weekdays);
        info!(
            "sampled {} of {} records on monitoring days",
            sampled.len(),
            sample.len()
        );

        self.report_writer
            .write_samples_csv(today, &sampled)
            .context("failed to export sampled data")?;

        // 3. Threshold alerts on the fresh observation.
        let alerts = self.alert_manager.process(&current).await;
        debug!("{} alert(s) raised", alerts.len());

        // 4. Weekly forecast, Mondays only. Best-effort.
        if today.weekday() == chrono::Weekday::Mon {
            match self.resolver.fetch_forecast(&self.location, FORECAST_DAYS).await {
                Ok(forecast) => info!("fetched {}-day forecast", forecast.len()),
                Err(e) => warn!("forecast fetch failed: {e}"),
            }
        }

        // 5. Monthly report on the first of the month.
        if is_monthly_report_day(today) {
            self.report_writer
                .write_monthly_report(&self.location.name, today, &sampled)
                .context("failed to write monthly report")?;
        }

        // 6. Yearly report on January 1st, over the bounded long-term window.
        if is_yearly_report_day(today) {
            let window = long_term_window(today, YEARLY_REPORT_YEARS)
                .context("invalid long-term window")?;
            let yearly_sample = self
                .resolver
                .fetch_historical(&self.location, window)
                .await
                .context("failed to fetch long-term sample")?;
            let yearly_sampled = yearly_sample.filter_monitoring_days(self.schedule.weekdays);

            self.report_writer
                .write_yearly_report(&self.location.name, today.year(), &yearly_sampled)
                .context("failed to write yearly report")?;
        }

        Ok(())
    }
}

/// Handle for controlling a MonitorActor.
///
/// Cloneable; the API layer and the CLI both hold one.
#[derive(Clone)]
pub struct MonitorHandle {
    sender: mpsc::Sender<MonitorCommand>,
}

impl MonitorHandle {
    /// Spawn the monitor actor and return a handle to it.
    #[allow(clippy::too_many_arguments)]
    pub fn spawn(
        location: Location,
        schedule: ScheduleSpec,
        sample_weeks_back: u32,
        resolver: Arc<FallbackResolver>,
        alert_manager: AlertManager,
        report_writer: ReportWriter,
        observation_tx: broadcast::Sender<ObservationEvent>,
    ) -> Self {
        let (cmd_tx, cmd_rx) = mpsc::channel(32);

        let actor = MonitorActor::new(
            location,
            schedule,
            sample_weeks_back,
            resolver,
            alert_manager,
            report_writer,
            observation_tx,
            cmd_rx,
        );

        tokio::spawn(actor.run());

        Self { sender: cmd_tx }
    }

    /// Run one cycle immediately, bypassing the schedule.
    ///
    /// Returns the cycle's success flag. Used by the manual CLI trigger and
    /// by tests.
    pub async fn run_cycle(&self) -> anyhow::Result<bool> {
        let (tx, rx) = oneshot::channel();
        self.sender
            .send(MonitorCommand::RunCycle { respond_to: tx })
            .await
            .context("failed to send RunCycle command")?;

        rx.await.context("failed to receive cycle result")
    }

    /// Current monitoring status, derived from wall clock and configuration.
    pub async fn status(&self) -> anyhow::Result<MonitoringStatus> {
        let (tx, rx) = oneshot::channel();
        self.sender
            .send(MonitorCommand::GetStatus { respond_to: tx })
            .await
            .context("failed to send GetStatus command")?;

        rx.await.context("failed to receive status")
    }

    /// Gracefully shut down the monitor.
    pub async fn shutdown(&self) -> anyhow::Result<()> {
        self.sender
            .send(MonitorCommand::Shutdown)
            .await
            .context("failed to send Shutdown command")?;
        Ok(())
    }
}
