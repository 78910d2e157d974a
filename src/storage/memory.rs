//! In-memory observation store (no persistence).
//!
//! A ring buffer behind an async lock. Used when storage is configured off,
//! and by tests that do not want a database file.

use std::collections::VecDeque;

use async_trait::async_trait;
use chrono::NaiveDate;
use tokio::sync::RwLock;
use tracing::debug;

use super::backend::{HealthStatus, ObservationStore, QueryWindow};
use super::error::StorageResult;
use super::schema::ObservationRow;

/// Maximum observations kept in memory.
const DEFAULT_CAPACITY: usize = 1000;

pub struct MemoryStore {
    rows: RwLock<VecDeque<ObservationRow>>,
    capacity: usize,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::with_capacity(DEFAULT_CAPACITY)
    }

    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            rows: RwLock::new(VecDeque::with_capacity(capacity.min(DEFAULT_CAPACITY))),
            capacity,
        }
    }
}

impl Default for MemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl ObservationStore for MemoryStore {
    async fn insert_batch(&self, batch: Vec<ObservationRow>) -> StorageResult<()> {
        let mut rows = self.rows.write().await;
        for row in batch {
            if rows.len() == self.capacity {
                rows.pop_front();
            }
            rows.push_back(row);
        }
        Ok(())
    }

    async fn query_range(&self, query: QueryWindow) -> StorageResult<Vec<ObservationRow>> {
        let rows = self.rows.read().await;
        let mut matching: Vec<ObservationRow> = rows
            .iter()
            .filter(|row| row.date >= query.start && row.date <= query.end)
            .cloned()
            .collect();
        matching.sort_by_key(|row| row.date);
        matching.truncate(query.limit.unwrap_or(usize::MAX));
        Ok(matching)
    }

    async fn query_latest(&self, limit: usize) -> StorageResult<Vec<ObservationRow>> {
        let rows = self.rows.read().await;
        let mut latest: Vec<ObservationRow> = rows.iter().cloned().collect();
        latest.sort_by_key(|row| std::cmp::Reverse(row.fetched_at));
        latest.truncate(limit);
        Ok(latest)
    }

    async fn cleanup_older_than(&self, before: NaiveDate) -> StorageResult<usize> {
        let mut rows = self.rows.write().await;
        let initial = rows.len();
        rows.retain(|row| row.date >= before);
        Ok(initial - rows.len())
    }

    async fn health_check(&self) -> StorageResult<HealthStatus> {
        Ok(HealthStatus {
            healthy: true,
            message: "in-memory storage operational".to_string(),
        })
    }

    async fn get_stats(&self) -> StorageResult<String> {
        let rows = self.rows.read().await;
        Ok(format!(
            "In-Memory: {} observations (capacity {})",
            rows.len(),
            self.capacity
        ))
    }

    async fn close(&self) -> StorageResult<()> {
        debug!("closing in-memory store (no-op)");
        Ok(())
    }
}
