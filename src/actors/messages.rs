//! Message types for actor communication
//!
//! Commands go to a specific actor over its mpsc channel and answer through
//! a oneshot; events fan out over broadcast channels to whoever subscribes.

use chrono::{DateTime, Utc};
use tokio::sync::oneshot;

use crate::Observation;
use crate::schedule::MonitoringStatus;
use crate::storage::{ObservationRow, StorageResult};

/// Event published when a fresh observation has been fetched.
///
/// Broadcast to all interested actors (storage, API streaming). The channel
/// may drop events for slow subscribers; observations are re-fetched on the
/// next cycle, so gaps are acceptable.
#[derive(Debug, Clone)]
pub struct ObservationEvent {
    pub observation: Observation,
    pub fetched_at: DateTime<Utc>,
}

/// Commands understood by the monitor actor.
#[derive(Debug)]
pub enum MonitorCommand {
    /// Run one monitoring cycle immediately, bypassing the schedule.
    ///
    /// Both the manual CLI trigger and the timer funnel through this.
    RunCycle { respond_to: oneshot::Sender<bool> },

    /// Snapshot of the monitoring schedule state.
    GetStatus {
        respond_to: oneshot::Sender<MonitoringStatus>,
    },

    /// Gracefully shut down the monitor.
    Shutdown,
}

/// Commands understood by the storage actor.
#[derive(Debug)]
pub enum StorageCommand {
    /// Flush the write buffer to the backend.
    Flush {
        respond_to: oneshot::Sender<anyhow::Result<()>>,
    },

    /// The N most recently fetched observations, newest first.
    QueryLatest {
        limit: usize,
        respond_to: oneshot::Sender<StorageResult<Vec<ObservationRow>>>,
    },

    /// Storage statistics.
    GetStats {
        respond_to: oneshot::Sender<StorageStats>,
    },

    /// Gracefully shut down the storage actor (flushes first).
    Shutdown,
}

/// Storage statistics
#[derive(Debug, Clone, Default)]
pub struct StorageStats {
    /// Observations handed to the backend since startup.
    pub total_stored: u64,

    /// Observations waiting in the write buffer.
    pub buffer_size: usize,

    /// Number of flush operations performed.
    pub flush_count: u64,
}
