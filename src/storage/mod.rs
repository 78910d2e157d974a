//! Persistence for observation history.
//!
//! The persistence layer is a collaborator behind the [`ObservationStore`]
//! trait: the monitoring cycle inserts what it fetched, the read API queries
//! stored history, and the aggregation engine never depends on either.
//!
//! ## Backends
//!
//! - **SQLite** (default): embedded file database
//! - **In-memory**: ring buffer, for tests and storage-less deployments

pub mod backend;
pub mod error;
pub mod memory;
pub mod schema;
pub mod sqlite;

pub use backend::{HealthStatus, ObservationStore, QueryWindow};
pub use error::{StorageError, StorageResult};
pub use memory::MemoryStore;
pub use schema::ObservationRow;
pub use sqlite::SqliteStore;

use std::sync::Arc;

use crate::config::StorageConfig;

/// Build the configured backend. `None` storage maps to the in-memory ring
/// buffer so the read API keeps working without a database file.
pub async fn build_store(config: &StorageConfig) -> StorageResult<Arc<dyn ObservationStore>> {
    Ok(match config {
        StorageConfig::None => Arc::new(MemoryStore::new()),
        StorageConfig::Sqlite { path, .. } => Arc::new(SqliteStore::new(path).await?),
    })
}
