//! StorageActor - persists observations
//!
//! Subscribes to the observation broadcast and batches writes to the
//! configured backend. Batching is sized for the system's cadence (a few
//! observations per week plus manual triggers), so the triggers are small:
//!
//! - **Size trigger**: flush after 8 buffered observations
//! - **Time trigger**: flush after 5 seconds
//!
//! Read queries go through commands so the API never touches the backend
//! directly.

use std::sync::Arc;
use std::time::Duration;

use chrono::{Duration as ChronoDuration, Utc};
use tokio::sync::{broadcast, mpsc, oneshot};
use tokio::time;
use tracing::{debug, error, instrument, trace, warn};

use crate::storage::{ObservationRow, ObservationStore, StorageResult};

use super::messages::{ObservationEvent, StorageCommand, StorageStats};

/// Batch size trigger - flush after this many observations
const BATCH_SIZE_TRIGGER: usize = 8;

/// Batch time trigger - flush after this duration
const BATCH_TIME_TRIGGER: Duration = Duration::from_secs(5);

/// Retention cleanup cadence
const CLEANUP_INTERVAL: Duration = Duration::from_secs(24 * 60 * 60);

pub struct StorageActor {
    store: Arc<dyn ObservationStore>,
    buffer: Vec<ObservationRow>,
    observation_rx: broadcast::Receiver<ObservationEvent>,
    command_rx: mpsc::Receiver<StorageCommand>,
    retention_days: Option<u32>,
    total_stored: u64,
    flush_count: u64,
}

impl StorageActor {
    fn new(
        store: Arc<dyn ObservationStore>,
        observation_rx: broadcast::Receiver<ObservationEvent>,
        command_rx: mpsc::Receiver<StorageCommand>,
        retention_days: Option<u32>,
    ) -> Self {
        Self {
            store,
            buffer: Vec::with_capacity(BATCH_SIZE_TRIGGER),
            observation_rx,
            command_rx,
            retention_days,
            total_stored: 0,
            flush_count: 0,
        }
    }

    #[instrument(skip(self))]
    pub async fn run(mut self) {
        debug!("starting storage actor");

        let mut flush_interval = time::interval(BATCH_TIME_TRIGGER);
        let mut cleanup_interval = time::interval(CLEANUP_INTERVAL);
        let has_retention = self.retention_days.is_some();

        loop {
            tokio::select! {
                result = self.observation_rx.recv() => {
                    match result {
                        Ok(event) => {
                            self.buffer.push(ObservationRow::from_observation(
                                &event.observation,
                                event.fetched_at,
                            ));
                            if self.buffer.len() >= BATCH_SIZE_TRIGGER {
                                trace!("size-based flush triggered");
                                self.flush().await;
                            }
                        }
                        Err(broadcast::error::RecvError::Lagged(skipped)) => {
                            warn!("storage actor lagged, skipped {skipped} observations");
                        }
                        Err(broadcast::error::RecvError::Closed) => {
                            warn!("observation channel closed, shutting down");
                            break;
                        }
                    }
                }

                _ = flush_interval.tick() => {
                    if !self.buffer.is_empty() {
                        trace!("time-based flush triggered ({} observations)", self.buffer.len());
                        self.flush().await;
                    }
                }

                _ = cleanup_interval.tick(), if has_retention => {
                    self.run_cleanup().await;
                }

                Some(cmd) = self.command_rx.recv() => {
                    match cmd {
                        StorageCommand::Flush { respond_to } => {
                            self.flush().await;
                            let _ = respond_to.send(Ok(()));
                        }

                        StorageCommand::QueryLatest { limit, respond_to } => {
                            let result = self.store.query_latest(limit).await;
                            let _ = respond_to.send(result);
                        }

                        StorageCommand::GetStats { respond_to } => {
                            let _ = respond_to.send(StorageStats {
                                total_stored: self.total_stored,
                                buffer_size: self.buffer.len(),
                                flush_count: self.flush_count,
                            });
                        }

                        StorageCommand::Shutdown => {
                            debug!("received shutdown command, flushing");
                            self.flush().await;
                            if let Err(e) = self.store.close().await {
                                error!("failed to close storage backend: {e}");
                            }
                            break;
                        }
                    }
                }

                else => {
                    warn!("command channel closed, shutting down");
                    self.flush().await;
                    break;
                }
            }
        }

        debug!("storage actor stopped");
    }

    async fn flush(&mut self) {
        if self.buffer.is_empty() {
            return;
        }

        let batch = std::mem::take(&mut self.buffer);
        let count = batch.len();

        match self.store.insert_batch(batch).await {
            Ok(()) => {
                self.total_stored += count as u64;
                self.flush_count += 1;
                debug!("flushed {count} observations to storage");
            }
            Err(e) => {
                // The batch is dropped: observations are re-fetched on the
                // next cycle, so losing a batch beats unbounded buffering.
                error!("failed to flush {count} observations: {e}");
            }
        }
    }

    async fn run_cleanup(&self) {
        let Some(days) = self.retention_days else {
            return;
        };
        let before = Utc::now().date_naive() - ChronoDuration::days(days as i64);

        match self.store.cleanup_older_than(before).await {
            Ok(deleted) if deleted > 0 => {
                debug!("retention cleanup deleted {deleted} observations older than {before}");
            }
            Ok(_) => {}
            Err(e) => error!("retention cleanup failed: {e}"),
        }
    }
}

/// Handle for controlling the StorageActor.
#[derive(Clone)]
pub struct StorageHandle {
    sender: mpsc::Sender<StorageCommand>,
}

impl StorageHandle {
    pub fn spawn(
        store: Arc<dyn ObservationStore>,
        observation_rx: broadcast::Receiver<ObservationEvent>,
        retention_days: Option<u32>,
    ) -> Self {
        let (cmd_tx, cmd_rx) = mpsc::channel(32);

        let actor = StorageActor::new(store, observation_rx, cmd_rx, retention_days);
        tokio::spawn(actor.run());

        Self { sender: cmd_tx }
    }

    /// Flush the write buffer and wait for completion.
    pub async fn flush(&self) -> anyhow::Result<()> {
        let (tx, rx) = oneshot::channel();
        self.sender
            .send(StorageCommand::Flush { respond_to: tx })
            .await?;
        rx.await?
    }

    /// The N most recently fetched observations, newest first.
    pub async fn query_latest(&self, limit: usize) -> anyhow::Result<Vec<ObservationRow>> {
        let (tx, rx) = oneshot::channel();
        self.sender
            .send(StorageCommand::QueryLatest {
                limit,
                respond_to: tx,
            })
            .await?;
        Ok(rx.await??)
    }

    pub async fn stats(&self) -> anyhow::Result<StorageStats> {
        let (tx, rx) = oneshot::channel();
        self.sender
            .send(StorageCommand::GetStats { respond_to: tx })
            .await?;
        Ok(rx.await?)
    }

    pub async fn shutdown(&self) -> anyhow::Result<()> {
        self.sender.send(StorageCommand::Shutdown).await?;
        Ok(())
    }
}
