//! SQLite observation store.
//!
//! An embedded database is plenty for a single city sampled a few times per
//! week: the hot path is the read API's "latest observations" query, served
//! from the `fetched_at` index.

use std::path::Path;

use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, Utc};
use sqlx::sqlite::{SqliteConnectOptions, SqliteJournalMode, SqlitePoolOptions, SqliteSynchronous};
use sqlx::{Pool, Row, Sqlite};
use tracing::{debug, info, instrument};

use crate::Observation;

use super::backend::{HealthStatus, ObservationStore, QueryWindow};
use super::error::{StorageError, StorageResult};
use super::schema::ObservationRow;

pub struct SqliteStore {
    pool: Pool<Sqlite>,
    db_path: String,
}

impl SqliteStore {
    /// Open (or create) the database file and run migrations.
    #[instrument(skip_all)]
    pub async fn new(db_path: impl AsRef<Path>) -> StorageResult<Self> {
        let db_path_str = db_path.as_ref().to_string_lossy().to_string();

        info!("initializing SQLite store at: {}", db_path_str);

        let options = SqliteConnectOptions::new()
            .filename(&db_path_str)
            .create_if_missing(true)
            .journal_mode(SqliteJournalMode::Wal)
            .synchronous(SqliteSynchronous::Normal)
            .busy_timeout(std::time::Duration::from_secs(30));

        let pool = SqlitePoolOptions::new()
            .max_connections(5)
            .connect_with(options)
            .await
            .map_err(|e| StorageError::ConnectionFailed(e.to_string()))?;

        sqlx::migrate!("./migrations").run(&pool).await?;

        debug!("database migrations complete");

        Ok(Self {
            pool,
            db_path: db_path_str,
        })
    }

    fn decode_row(row: &sqlx::sqlite::SqliteRow) -> StorageResult<ObservationRow> {
        let fetched_at_millis: i64 = row.try_get("fetched_at")?;
        let fetched_at = DateTime::from_timestamp_millis(fetched_at_millis)
            .ok_or_else(|| StorageError::QueryFailed(format!(
                "unrepresentable fetched_at: {fetched_at_millis}"
            )))?;

        let date_str: String = row.try_get("date")?;
        let date: NaiveDate = date_str
            .parse()
            .map_err(|e| StorageError::QueryFailed(format!("bad date column '{date_str}': {e}")))?;

        let observation_json: String = row.try_get("observation")?;
        let observation: Observation = serde_json::from_str(&observation_json)?;

        Ok(ObservationRow {
            fetched_at,
            date,
            location: row.try_get("location")?,
            provider: row.try_get("provider")?,
            temperature_mean: row.try_get("temperature_mean")?,
            temperature_min: row.try_get("temperature_min")?,
            temperature_max: row.try_get("temperature_max")?,
            humidity_mean: row.try_get("humidity_mean")?,
            precipitation_total: row.try_get("precipitation_total")?,
            wind_speed_mean: row.try_get("wind_speed_mean")?,
            observation,
        })
    }
}

#[async_trait]
impl ObservationStore for SqliteStore {
    #[instrument(skip(self, rows), fields(count = rows.len()))]
    async fn insert_batch(&self, rows: Vec<ObservationRow>) -> StorageResult<()> {
        if rows.is_empty() {
            return Ok(());
        }

        debug!("inserting {} observations into SQLite", rows.len());

        let mut tx = self.pool.begin().await?;

        for row in rows {
            let observation_json = serde_json::to_string(&row.observation)?;

            sqlx::query(
                r#"
                INSERT INTO observations (
                    fetched_at, date, location, provider,
                    temperature_mean, temperature_min, temperature_max,
                    humidity_mean, precipitation_total, wind_speed_mean,
                    observation
                )
                VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
                ON CONFLICT (provider, fetched_at) DO UPDATE SET
                    temperature_mean = excluded.temperature_mean,
                    temperature_min = excluded.temperature_min,
                    temperature_max = excluded.temperature_max,
                    humidity_mean = excluded.humidity_mean,
                    precipitation_total = excluded.precipitation_total,
                    wind_speed_mean = excluded.wind_speed_mean,
                    observation = excluded.observation
                "#,
            )
            .bind(row.fetched_at.timestamp_millis())
            .bind(row.date.to_string())
            .bind(&row.location)
            .bind(&row.provider)
            .bind(row.temperature_mean)
            .bind(row.temperature_min)
            .bind(row.temperature_max)
            .bind(row.humidity_mean)
            .bind(row.precipitation_total)
            .bind(row.wind_speed_mean)
            .bind(observation_json)
            .execute(&mut *tx)
            .await?;
        }

        tx.commit().await?;
        Ok(())
    }

    #[instrument(skip(self))]
    async fn query_range(&self, query: QueryWindow) -> StorageResult<Vec<ObservationRow>> {
        let limit = query.limit.unwrap_or(10_000) as i64;

        // ISO dates in TEXT columns sort chronologically.
        let rows = sqlx::query(
            r#"
            SELECT * FROM observations
            WHERE date >= ? AND date <= ?
            ORDER BY date ASC, fetched_at ASC
            LIMIT ?
            "#,
        )
        .bind(query.start.to_string())
        .bind(query.end.to_string())
        .bind(limit)
        .fetch_all(&self.pool)
        .await?;

        rows.iter().map(Self::decode_row).collect()
    }

    #[instrument(skip(self))]
    async fn query_latest(&self, limit: usize) -> StorageResult<Vec<ObservationRow>> {
        let rows = sqlx::query(
            r#"
            SELECT * FROM observations
            ORDER BY fetched_at DESC
            LIMIT ?
            "#,
        )
        .bind(limit as i64)
        .fetch_all(&self.pool)
        .await?;

        rows.iter().map(Self::decode_row).collect()
    }

    #[instrument(skip(self))]
    async fn cleanup_older_than(&self, before: NaiveDate) -> StorageResult<usize> {
        let result = sqlx::query("DELETE FROM observations WHERE date < ?")
            .bind(before.to_string())
            .execute(&self.pool)
            .await?;

        let deleted = result.rows_affected() as usize;
        if deleted > 0 {
            debug!("retention cleanup deleted {deleted} observations");
        }
        Ok(deleted)
    }

    async fn health_check(&self) -> StorageResult<HealthStatus> {
        match sqlx::query("SELECT 1").fetch_one(&self.pool).await {
            Ok(_) => Ok(HealthStatus {
                healthy: true,
                message: format!("SQLite operational at {}", self.db_path),
            }),
            Err(e) => Ok(HealthStatus {
                healthy: false,
                message: format!("SQLite ping failed: {e}"),
            }),
        }
    }

    async fn get_stats(&self) -> StorageResult<String> {
        let (count,): (i64,) = sqlx::query_as("SELECT COUNT(*) FROM observations")
            .fetch_one(&self.pool)
            .await?;

        let oldest: (Option<String>,) = sqlx::query_as("SELECT MIN(date) FROM observations")
            .fetch_one(&self.pool)
            .await?;

        Ok(match oldest.0 {
            Some(oldest) => format!("SQLite: {count} observations since {oldest}"),
            None => format!("SQLite: {count} observations"),
        })
    }

    async fn close(&self) -> StorageResult<()> {
        self.pool.close().await;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{Location, ProviderId, Reading};
    use chrono::TimeZone;
    use tempfile::TempDir;

    fn row(day: u32, mean: f64) -> ObservationRow {
        let date = NaiveDate::from_ymd_opt(2025, 1, day).unwrap();
        let mut obs = Observation::empty(Location::new("Montreal"), date, ProviderId::OpenMeteo);
        obs.temperature = Reading::mean_only(mean);
        let fetched_at = Utc.with_ymd_and_hms(2025, 1, day, 9, 0, 0).unwrap();
        ObservationRow::from_observation(&obs, fetched_at)
    }

    async fn store(dir: &TempDir) -> SqliteStore {
        SqliteStore::new(dir.path().join("test.db")).await.unwrap()
    }

    #[tokio::test]
    async fn test_insert_and_query_roundtrip() {
        let dir = TempDir::new().unwrap();
        let store = store(&dir).await;

        store
            .insert_batch(vec![row(6, -7.0), row(8, -3.5)])
            .await
            .unwrap();

        let latest = store.query_latest(10).await.unwrap();
        assert_eq!(latest.len(), 2);
        // Newest first
        assert_eq!(latest[0].date, NaiveDate::from_ymd_opt(2025, 1, 8).unwrap());
        assert_eq!(latest[0].temperature_mean, Some(-3.5));
        // The JSON round-trip preserves the full observation.
        assert_eq!(latest[0].observation.temperature.mean, Some(-3.5));
    }

    #[tokio::test]
    async fn test_query_range_window() {
        let dir = TempDir::new().unwrap();
        let store = store(&dir).await;

        store
            .insert_batch(vec![row(6, -7.0), row(8, -3.5), row(20, 1.0)])
            .await
            .unwrap();

        let rows = store
            .query_range(QueryWindow {
                start: NaiveDate::from_ymd_opt(2025, 1, 6).unwrap(),
                end: NaiveDate::from_ymd_opt(2025, 1, 10).unwrap(),
                limit: None,
            })
            .await
            .unwrap();

        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0].date, NaiveDate::from_ymd_opt(2025, 1, 6).unwrap());
    }

    #[tokio::test]
    async fn test_conflict_updates_instead_of_duplicating() {
        let dir = TempDir::new().unwrap();
        let store = store(&dir).await;

        store.insert_batch(vec![row(6, -7.0)]).await.unwrap();
        // Same provider + fetched_at: the reading was re-fetched.
        store.insert_batch(vec![row(6, -6.0)]).await.unwrap();

        let latest = store.query_latest(10).await.unwrap();
        assert_eq!(latest.len(), 1);
        assert_eq!(latest[0].temperature_mean, Some(-6.0));
    }

    #[tokio::test]
    async fn test_cleanup_and_stats() {
        let dir = TempDir::new().unwrap();
        let store = store(&dir).await;

        store
            .insert_batch(vec![row(6, -7.0), row(20, 1.0)])
            .await
            .unwrap();

        let deleted = store
            .cleanup_older_than(NaiveDate::from_ymd_opt(2025, 1, 10).unwrap())
            .await
            .unwrap();
        assert_eq!(deleted, 1);

        let stats = store.get_stats().await.unwrap();
        assert!(stats.contains("1 observations"), "stats was: {stats}");

        let health = store.health_check().await.unwrap();
        assert!(health.healthy);
    }
}
