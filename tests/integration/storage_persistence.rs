//! SQLite persistence through the storage actor.

use std::sync::Arc;

use chrono::{NaiveDate, Utc};
use tempfile::TempDir;
use tokio::sync::broadcast;

use climate_monitoring::actors::messages::ObservationEvent;
use climate_monitoring::actors::storage::StorageHandle;
use climate_monitoring::storage::{ObservationStore, SqliteStore};
use climate_monitoring::{Location, Observation, ProviderId, Reading};

fn event(day: u32, mean: f64) -> ObservationEvent {
    let mut obs = Observation::empty(
        Location::with_coordinates("Montreal", 45.5019, -73.5673),
        NaiveDate::from_ymd_opt(2025, 1, day).unwrap(),
        ProviderId::OpenMeteo,
    );
    obs.temperature = Reading::full(mean, mean - 5.0, mean + 5.0);
    ObservationEvent {
        observation: obs,
        // Distinct instants: (provider, fetched_at) is the upsert key.
        fetched_at: Utc::now() - chrono::Duration::seconds(day as i64),
    }
}

#[tokio::test]
async fn test_observations_survive_actor_restart() {
    let dir = TempDir::new().unwrap();
    let db_path = dir.path().join("observations.db");

    // First run: store two observations through the actor.
    {
        let store = Arc::new(SqliteStore::new(&db_path).await.unwrap());
        let (tx, rx) = broadcast::channel(16);
        let handle = StorageHandle::spawn(store, rx, None);

        tx.send(event(6, -7.0)).unwrap();
        tx.send(event(8, -3.0)).unwrap();
        tokio::time::sleep(std::time::Duration::from_millis(50)).await;

        handle.flush().await.unwrap();
        handle.shutdown().await.unwrap();
        tokio::time::sleep(std::time::Duration::from_millis(50)).await;
    }

    // Second run: a fresh store over the same file sees the data.
    let store = SqliteStore::new(&db_path).await.unwrap();
    let rows = store.query_latest(10).await.unwrap();
    assert_eq!(rows.len(), 2);

    // The full observation round-trips through the JSON column.
    assert_eq!(rows[0].observation.location.name, "Montreal");
    assert_eq!(rows[0].observation.location.latitude, Some(45.5019));
}

#[tokio::test]
async fn test_retention_config_prunes_old_rows() {
    let dir = TempDir::new().unwrap();
    let db_path = dir.path().join("observations.db");

    let store = SqliteStore::new(&db_path).await.unwrap();
    store
        .insert_batch(vec![
            climate_monitoring::storage::ObservationRow::from_observation(
                &event(6, -7.0).observation,
                Utc::now(),
            ),
        ])
        .await
        .unwrap();

    // Everything before 2026 goes.
    let deleted = store
        .cleanup_older_than(NaiveDate::from_ymd_opt(2026, 1, 1).unwrap())
        .await
        .unwrap();
    assert_eq!(deleted, 1);
    assert!(store.query_latest(10).await.unwrap().is_empty());
}
