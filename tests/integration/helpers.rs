//! Helper functions for integration tests

use std::net::SocketAddr;
use std::sync::Arc;

use chrono::{Duration, NaiveDate, Utc};
use tempfile::TempDir;
use tokio::sync::broadcast;
use wiremock::matchers::{method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

use climate_monitoring::actors::messages::ObservationEvent;
use climate_monitoring::actors::monitor::MonitorHandle;
use climate_monitoring::actors::storage::StorageHandle;
use climate_monitoring::alerts::AlertManager;
use climate_monitoring::api::{ApiState, spawn_api_server};
use climate_monitoring::config::{ApiServerConfig, Config, ReportsConfig};
use climate_monitoring::providers::{FallbackResolver, build_providers};
use climate_monitoring::ratelimit::{RateLimitConfig, RateLimiter};
use climate_monitoring::reports::ReportWriter;
use climate_monitoring::storage::MemoryStore;

/// Dates for the last `days` days ending today, oldest first.
pub fn recent_dates(days: u32) -> Vec<NaiveDate> {
    let today = Utc::now().date_naive();
    (0..days)
        .rev()
        .map(|offset| today - Duration::days(offset as i64))
        .collect()
}

/// An Open-Meteo archive payload covering the last `days` days with simple
/// deterministic values.
pub fn archive_body(days: u32) -> serde_json::Value {
    let dates = recent_dates(days);
    let n = dates.len();

    serde_json::json!({
        "daily": {
            "time": dates,
            "temperature_2m_mean": (0..n).map(|i| -5.0 + i as f64 * 0.5).collect::<Vec<f64>>(),
            "temperature_2m_min": (0..n).map(|i| -11.0 + i as f64 * 0.5).collect::<Vec<f64>>(),
            "temperature_2m_max": (0..n).map(|i| 1.0 + i as f64 * 0.5).collect::<Vec<f64>>(),
            "precipitation_sum": (0..n).map(|i| if i % 3 == 0 { 1.5 } else { 0.0 }).collect::<Vec<f64>>(),
            "relative_humidity_2m_mean": vec![75.0; n],
            "wind_speed_10m_mean": vec![18.0; n],
            "wind_speed_10m_max": vec![35.0; n],
        }
    })
}

pub fn current_body(temperature: f64) -> serde_json::Value {
    serde_json::json!({
        "current": {
            "temperature_2m": temperature,
            "apparent_temperature": temperature - 4.0,
            "relative_humidity_2m": 70.0,
            "precipitation": 0.0,
            "wind_speed_10m": 15.0,
            "surface_pressure": 1015.0
        }
    })
}

/// Mount healthy Open-Meteo mocks: archive history, current conditions, and
/// the daily forecast.
pub async fn mount_open_meteo(server: &MockServer, current_temperature: f64) {
    // 28 days ending today: inside every window the endpoints request
    // (the shortest is the 4-week monitoring sample).
    Mock::given(method("GET"))
        .and(path("/v1/archive"))
        .respond_with(ResponseTemplate::new(200).set_body_json(archive_body(28)))
        .mount(server)
        .await;

    Mock::given(method("GET"))
        .and(path("/v1/forecast"))
        .and(query_param("current", "temperature_2m,apparent_temperature,relative_humidity_2m,precipitation,wind_speed_10m,surface_pressure"))
        .respond_with(ResponseTemplate::new(200).set_body_json(current_body(current_temperature)))
        .mount(server)
        .await;

    Mock::given(method("GET"))
        .and(path("/v1/forecast"))
        .and(query_param("forecast_days", "7"))
        .respond_with(ResponseTemplate::new(200).set_body_json(archive_body(7)))
        .mount(server)
        .await;
}

/// Config pointed at a mock Open-Meteo server, with reports under a temp dir.
pub fn test_config(server: &MockServer, dir: &TempDir) -> Config {
    let mut config = Config::default();
    config.providers.open_meteo.archive_url = format!("{}/v1/archive", server.uri());
    config.providers.open_meteo.forecast_url = format!("{}/v1/forecast", server.uri());
    config.reports = ReportsConfig {
        reports_dir: dir.path().join("reports"),
        data_dir: dir.path().join("data"),
    };
    config
}

pub struct TestHub {
    pub monitor: MonitorHandle,
    pub storage: StorageHandle,
    pub observation_tx: broadcast::Sender<ObservationEvent>,
    pub resolver: Arc<FallbackResolver>,
}

/// Spawn the actor pair against a config, using in-memory storage.
pub fn spawn_hub(config: &Config) -> TestHub {
    let location = config.location.to_location();
    let resolver = Arc::new(FallbackResolver::new(build_providers(config)));
    let (observation_tx, _) = broadcast::channel(32);

    let storage = StorageHandle::spawn(
        Arc::new(MemoryStore::new()),
        observation_tx.subscribe(),
        None,
    );
    let monitor = MonitorHandle::spawn(
        location.clone(),
        config.schedule,
        config.sample_weeks_back,
        resolver.clone(),
        AlertManager::new(config.thresholds, location.name.clone(), None),
        ReportWriter::new(&config.reports),
        observation_tx.clone(),
    );

    TestHub {
        monitor,
        storage,
        observation_tx,
        resolver,
    }
}

/// Spawn a full API server on an ephemeral port. Returns its address.
pub async fn spawn_test_api(config: &Config, hub: &TestHub, max_requests: usize) -> SocketAddr {
    let limiter = Arc::new(RateLimiter::new(RateLimitConfig {
        window_secs: 60,
        max_requests,
    }));

    let state = ApiState {
        monitor: hub.monitor.clone(),
        storage: hub.storage.clone(),
        resolver: hub.resolver.clone(),
        limiter,
        location: config.location.to_location(),
        thresholds: config.thresholds,
        weekdays: config.schedule.weekdays,
    };

    let api_config = ApiServerConfig {
        bind_addr: "127.0.0.1:0".parse().unwrap(),
        enable_cors: false,
    };

    spawn_api_server(&api_config, state).await.unwrap()
}
