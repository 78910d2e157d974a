//! Storage backend trait definition
//!
//! The core never touches a backend directly: the web-facing read endpoints
//! query through the storage actor, and the monitoring cycle only inserts.
//! Aggregation always works on freshly fetched provider data.

use async_trait::async_trait;
use chrono::NaiveDate;

use super::error::StorageResult;
use super::schema::ObservationRow;

/// Query parameters for fetching observations within a date window.
#[derive(Debug, Clone)]
pub struct QueryWindow {
    /// Start of the civil-date window (inclusive).
    pub start: NaiveDate,

    /// End of the civil-date window (inclusive).
    pub end: NaiveDate,

    /// Maximum number of results to return.
    pub limit: Option<usize>,
}

/// Health status of the storage backend
#[derive(Debug, Clone)]
pub struct HealthStatus {
    pub healthy: bool,
    pub message: String,
}

/// Trait for observation stores.
///
/// Implementations must be `Send + Sync`; they are shared across async
/// tasks. All failures come back as `StorageResult`, never as panics.
#[async_trait]
pub trait ObservationStore: Send + Sync {
    /// Insert a batch of observations.
    ///
    /// The storage actor batches writes, so this is the only write path.
    /// Implementations should be atomic per batch.
    async fn insert_batch(&self, rows: Vec<ObservationRow>) -> StorageResult<()>;

    /// Query observations within a civil-date window, oldest first.
    async fn query_range(&self, query: QueryWindow) -> StorageResult<Vec<ObservationRow>>;

    /// The N most recently fetched observations, newest first.
    async fn query_latest(&self, limit: usize) -> StorageResult<Vec<ObservationRow>>;

    /// Delete observations with a civil date before `before`. Returns the
    /// number of rows deleted. Used for retention enforcement.
    async fn cleanup_older_than(&self, before: NaiveDate) -> StorageResult<usize>;

    /// Lightweight check that the backend is operational.
    async fn health_check(&self) -> StorageResult<HealthStatus>;

    /// Human-readable backend statistics for the stats endpoint.
    async fn get_stats(&self) -> StorageResult<String>;

    /// Flush and release resources.
    async fn close(&self) -> StorageResult<()>;
}
