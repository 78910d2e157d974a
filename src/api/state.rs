//! API shared state containing actor handles

use std::sync::Arc;

use crate::Location;
use crate::actors::monitor::MonitorHandle;
use crate::actors::storage::StorageHandle;
use crate::alerts::AlertThresholds;
use crate::providers::FallbackResolver;
use crate::ratelimit::RateLimiter;
use crate::schedule::WeekdaySet;

/// Shared state passed to all API handlers
#[derive(Clone)]
pub struct ApiState {
    /// Handle to the monitor actor for status and manual cycles
    pub monitor: MonitorHandle,

    /// Handle to the storage actor for querying stored observations
    pub storage: StorageHandle,

    /// Fallback chain for fresh, independent fetches
    pub resolver: Arc<FallbackResolver>,

    /// Sliding-window admission control for inbound requests
    pub limiter: Arc<RateLimiter>,

    /// The monitored city
    pub location: Location,

    /// Alert thresholds applied by the check endpoint
    pub thresholds: AlertThresholds,

    /// Monitoring weekdays used when sampling summaries
    pub weekdays: WeekdaySet,
}
