//! End-to-end monitoring cycle tests against mocked providers.

use tempfile::TempDir;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

use climate_monitoring::ProviderId;

use super::helpers::{current_body, mount_open_meteo, recent_dates, spawn_hub, test_config};

#[tokio::test]
async fn test_cycle_fetches_evaluates_and_exports() {
    let server = MockServer::start().await;
    mount_open_meteo(&server, -3.0).await;

    let dir = TempDir::new().unwrap();
    let config = test_config(&server, &dir);
    let hub = spawn_hub(&config);

    let mut events = hub.observation_tx.subscribe();

    let success = hub.monitor.run_cycle().await.unwrap();
    assert!(success);

    // The fresh observation was broadcast.
    let event = tokio::time::timeout(std::time::Duration::from_millis(500), events.recv())
        .await
        .unwrap()
        .unwrap();
    assert_eq!(event.observation.temperature.mean, Some(-3.0));
    assert_eq!(event.observation.provider, ProviderId::OpenMeteo);

    // The sampled monitoring days were exported as CSV.
    let data_dir = dir.path().join("data");
    let entries: Vec<_> = std::fs::read_dir(&data_dir).unwrap().collect();
    assert_eq!(entries.len(), 1);

    hub.monitor.shutdown().await.unwrap();
    hub.storage.shutdown().await.unwrap();
}

#[tokio::test]
async fn test_cycle_stores_observation() {
    let server = MockServer::start().await;
    mount_open_meteo(&server, 8.5).await;

    let dir = TempDir::new().unwrap();
    let config = test_config(&server, &dir);
    let hub = spawn_hub(&config);

    assert!(hub.monitor.run_cycle().await.unwrap());

    // Give the storage actor a moment to consume the broadcast, then flush.
    tokio::time::sleep(std::time::Duration::from_millis(50)).await;
    hub.storage.flush().await.unwrap();

    let rows = hub.storage.query_latest(10).await.unwrap();
    assert_eq!(rows.len(), 1);
    assert_eq!(rows[0].temperature_mean, Some(8.5));

    hub.monitor.shutdown().await.unwrap();
    hub.storage.shutdown().await.unwrap();
}

#[tokio::test]
async fn test_cycle_fails_cleanly_when_all_providers_fail() {
    // A server with no mocks answers 404 to everything; the backup
    // providers are unconfigured. The whole chain fails.
    let server = MockServer::start().await;

    let dir = TempDir::new().unwrap();
    let config = test_config(&server, &dir);
    let hub = spawn_hub(&config);

    let success = hub.monitor.run_cycle().await.unwrap();
    assert!(!success);

    // A failed cycle never crashes the actor.
    let status = hub.monitor.status().await.unwrap();
    assert_eq!(status.data_sources.len(), 3);

    hub.monitor.shutdown().await.unwrap();
    hub.storage.shutdown().await.unwrap();
}

#[tokio::test]
async fn test_cycle_falls_back_to_keyed_provider() {
    // Open-Meteo is down; WeatherAPI (keyed) carries the cycle.
    let open_meteo = MockServer::start().await;
    let weather_api = MockServer::start().await;

    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(500))
        .mount(&open_meteo)
        .await;

    Mock::given(method("GET"))
        .and(path("/current.json"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "current": {
                "temp_c": -1.0,
                "feelslike_c": -6.0,
                "humidity": 80,
                "wind_kph": 20.0,
                "pressure_mb": 1010.0
            }
        })))
        .mount(&weather_api)
        .await;

    // history.json serves the same daily shape as forecast.json. 28 days
    // fit inside the 4-week sampling window.
    let dates = recent_dates(28);
    let forecastday: Vec<serde_json::Value> = dates
        .iter()
        .map(|date| {
            serde_json::json!({
                "date": date,
                "day": {
                    "avgtemp_c": -2.0,
                    "mintemp_c": -8.0,
                    "maxtemp_c": 2.0,
                    "totalprecip_mm": 0.6,
                    "avghumidity": 74,
                    "maxwind_kph": 28.0
                }
            })
        })
        .collect();

    Mock::given(method("GET"))
        .and(path("/history.json"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "forecast": { "forecastday": forecastday }
        })))
        .mount(&weather_api)
        .await;

    let dir = TempDir::new().unwrap();
    let mut config = test_config(&open_meteo, &dir);
    config.providers.weather_api.api_key = Some("test-key".to_string());
    config.providers.weather_api.base_url = weather_api.uri();

    let hub = spawn_hub(&config);
    let mut events = hub.observation_tx.subscribe();

    let success = hub.monitor.run_cycle().await.unwrap();
    assert!(success);

    let event = tokio::time::timeout(std::time::Duration::from_millis(500), events.recv())
        .await
        .unwrap()
        .unwrap();
    // Exactly one adapter's result was used, and it was the backup.
    assert_eq!(event.observation.provider, ProviderId::WeatherApi);

    hub.monitor.shutdown().await.unwrap();
    hub.storage.shutdown().await.unwrap();
}

#[tokio::test]
async fn test_archive_outage_fails_cycle_even_with_current_data() {
    // Current conditions resolve, but the historical sample cannot. The
    // cycle reports failure; steps after the sampling stage never ran.
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/v1/forecast"))
        .respond_with(ResponseTemplate::new(200).set_body_json(current_body(4.0)))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/v1/archive"))
        .respond_with(ResponseTemplate::new(503).set_body_string("maintenance"))
        .mount(&server)
        .await;

    let dir = TempDir::new().unwrap();
    let config = test_config(&server, &dir);
    let hub = spawn_hub(&config);

    let success = hub.monitor.run_cycle().await.unwrap();
    assert!(!success);

    // No CSV was produced.
    assert!(!dir.path().join("data").exists());

    hub.monitor.shutdown().await.unwrap();
    hub.storage.shutdown().await.unwrap();
}
