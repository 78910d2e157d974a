//! Read API tests against a live server on an ephemeral port.

use tempfile::TempDir;
use wiremock::MockServer;

use super::helpers::{mount_open_meteo, spawn_hub, spawn_test_api, test_config};

async fn get(addr: std::net::SocketAddr, path_and_query: &str) -> reqwest::Response {
    reqwest::Client::new()
        .get(format!("http://{addr}{path_and_query}"))
        .send()
        .await
        .unwrap()
}

#[tokio::test]
async fn test_health_endpoint() {
    let server = MockServer::start().await;
    mount_open_meteo(&server, 1.0).await;
    let dir = TempDir::new().unwrap();
    let config = test_config(&server, &dir);
    let hub = spawn_hub(&config);
    let addr = spawn_test_api(&config, &hub, 100).await;

    let response = get(addr, "/api/v1/health").await;
    assert_eq!(response.status(), 200);

    let body: serde_json::Value = response.json().await.unwrap();
    assert_eq!(body["status"], "ok");
    assert!(body["timestamp"].is_string());
}

#[tokio::test]
async fn test_current_observation_endpoint() {
    let server = MockServer::start().await;
    mount_open_meteo(&server, -12.5).await;
    let dir = TempDir::new().unwrap();
    let config = test_config(&server, &dir);
    let hub = spawn_hub(&config);
    let addr = spawn_test_api(&config, &hub, 100).await;

    let response = get(addr, "/api/v1/observations/current").await;
    assert_eq!(response.status(), 200);

    let body: serde_json::Value = response.json().await.unwrap();
    assert_eq!(body["observation"]["temperature"]["mean"], -12.5);
    assert_eq!(body["observation"]["provider"], "open_meteo");
}

#[tokio::test]
async fn test_latest_observations_after_a_cycle() {
    let server = MockServer::start().await;
    mount_open_meteo(&server, 3.0).await;
    let dir = TempDir::new().unwrap();
    let config = test_config(&server, &dir);
    let hub = spawn_hub(&config);
    let addr = spawn_test_api(&config, &hub, 100).await;

    assert!(hub.monitor.run_cycle().await.unwrap());
    tokio::time::sleep(std::time::Duration::from_millis(50)).await;
    hub.storage.flush().await.unwrap();

    let response = get(addr, "/api/v1/observations/latest?limit=5").await;
    assert_eq!(response.status(), 200);

    let body: serde_json::Value = response.json().await.unwrap();
    assert_eq!(body["count"], 1);
    assert_eq!(body["observations"][0]["temperature_mean"], 3.0);
}

#[tokio::test]
async fn test_weekly_summary_endpoint() {
    let server = MockServer::start().await;
    mount_open_meteo(&server, 0.0).await;
    let dir = TempDir::new().unwrap();
    let config = test_config(&server, &dir);
    let hub = spawn_hub(&config);
    let addr = spawn_test_api(&config, &hub, 100).await;

    let response = get(addr, "/api/v1/summary/weekly?weeks_back=4").await;
    assert_eq!(response.status(), 200);

    let body: serde_json::Value = response.json().await.unwrap();
    assert_eq!(body["weeks_back"], 4);
    let summaries = body["summaries"].as_array().unwrap();
    assert!(!summaries.is_empty());
    // Monitoring-day filtering keeps roughly 3 of 7 days.
    assert!(body["record_count"].as_u64().unwrap() <= 4 * 7);
    // Summaries carry real statistics, not zero-defaults.
    assert!(summaries[0]["temperature"]["mean"].is_number());
}

#[tokio::test]
async fn test_yearly_summary_rejects_horizon_beyond_cap() {
    let server = MockServer::start().await;
    mount_open_meteo(&server, 0.0).await;
    let dir = TempDir::new().unwrap();
    let config = test_config(&server, &dir);
    let hub = spawn_hub(&config);
    let addr = spawn_test_api(&config, &hub, 100).await;

    let response = get(addr, "/api/v1/summary/yearly?years=4").await;
    assert_eq!(response.status(), 400);

    let body: serde_json::Value = response.json().await.unwrap();
    assert_eq!(body["error"]["code"], "invalid_date_range");

    // Two years is within the cap.
    let response = get(addr, "/api/v1/summary/yearly?years=2").await;
    assert_eq!(response.status(), 200);
}

#[tokio::test]
async fn test_alert_check_endpoint() {
    let server = MockServer::start().await;
    // 31°C fires the high-temperature check.
    mount_open_meteo(&server, 31.0).await;
    let dir = TempDir::new().unwrap();
    let config = test_config(&server, &dir);
    let hub = spawn_hub(&config);
    let addr = spawn_test_api(&config, &hub, 100).await;

    let response = get(addr, "/api/v1/alerts/check").await;
    assert_eq!(response.status(), 200);

    let body: serde_json::Value = response.json().await.unwrap();
    assert_eq!(body["count"], 1);
    assert_eq!(body["alerts"][0]["metric"], "temperature_mean");
}

#[tokio::test]
async fn test_status_endpoint() {
    let server = MockServer::start().await;
    mount_open_meteo(&server, 0.0).await;
    let dir = TempDir::new().unwrap();
    let config = test_config(&server, &dir);
    let hub = spawn_hub(&config);
    let addr = spawn_test_api(&config, &hub, 100).await;

    let response = get(addr, "/api/v1/status").await;
    assert_eq!(response.status(), 200);

    let body: serde_json::Value = response.json().await.unwrap();
    assert!(body["is_monitoring_day"].is_boolean());
    assert!(body["progress_percentage"].is_number());
    assert_eq!(body["data_sources"].as_array().unwrap().len(), 3);
}

#[tokio::test]
async fn test_provider_outage_maps_to_bad_gateway() {
    // No mocks: every provider call 404s, the chain exhausts.
    let server = MockServer::start().await;
    let dir = TempDir::new().unwrap();
    let config = test_config(&server, &dir);
    let hub = spawn_hub(&config);
    let addr = spawn_test_api(&config, &hub, 100).await;

    let response = get(addr, "/api/v1/observations/current").await;
    assert_eq!(response.status(), 502);

    let body: serde_json::Value = response.json().await.unwrap();
    assert_eq!(body["error"]["code"], "providers_exhausted");
}

#[tokio::test]
async fn test_rate_limit_denies_after_cap_and_sets_retry_after() {
    let server = MockServer::start().await;
    mount_open_meteo(&server, 0.0).await;
    let dir = TempDir::new().unwrap();
    let config = test_config(&server, &dir);
    let hub = spawn_hub(&config);
    let addr = spawn_test_api(&config, &hub, 3).await;

    for _ in 0..3 {
        assert_eq!(get(addr, "/api/v1/health").await.status(), 200);
    }

    let denied = get(addr, "/api/v1/health").await;
    assert_eq!(denied.status(), 429);
    assert!(denied.headers().contains_key("retry-after"));

    let body: serde_json::Value = denied.json().await.unwrap();
    assert_eq!(body["error"]["code"], "rate_limit_exceeded");
    assert!(body["error"]["retry_after"].is_number());
}

#[tokio::test]
async fn test_rate_limit_tracks_clients_separately() {
    let server = MockServer::start().await;
    mount_open_meteo(&server, 0.0).await;
    let dir = TempDir::new().unwrap();
    let config = test_config(&server, &dir);
    let hub = spawn_hub(&config);
    let addr = spawn_test_api(&config, &hub, 2).await;

    let client = reqwest::Client::new();
    let url = format!("http://{addr}/api/v1/health");

    // Exhaust the quota for one forwarded client.
    for _ in 0..2 {
        let response = client
            .get(&url)
            .header("x-forwarded-for", "203.0.113.7")
            .send()
            .await
            .unwrap();
        assert_eq!(response.status(), 200);
    }
    let denied = client
        .get(&url)
        .header("x-forwarded-for", "203.0.113.7")
        .send()
        .await
        .unwrap();
    assert_eq!(denied.status(), 429);

    // A different client is still admitted in the same instant.
    let other = client
        .get(&url)
        .header("x-forwarded-for", "203.0.113.8")
        .send()
        .await
        .unwrap();
    assert_eq!(other.status(), 200);
}

#[tokio::test]
async fn test_limits_endpoint_reports_usage() {
    let server = MockServer::start().await;
    mount_open_meteo(&server, 0.0).await;
    let dir = TempDir::new().unwrap();
    let config = test_config(&server, &dir);
    let hub = spawn_hub(&config);
    let addr = spawn_test_api(&config, &hub, 10).await;

    let response = get(addr, "/api/v1/limits").await;
    assert_eq!(response.status(), 200);

    let body: serde_json::Value = response.json().await.unwrap();
    // The admission charged by the middleware is already visible.
    assert_eq!(body["limits"]["used"], 1);
    assert_eq!(body["limits"]["max_requests"], 10);
}

#[tokio::test]
async fn test_unknown_endpoint_uses_error_envelope() {
    let server = MockServer::start().await;
    mount_open_meteo(&server, 0.0).await;
    let dir = TempDir::new().unwrap();
    let config = test_config(&server, &dir);
    let hub = spawn_hub(&config);
    let addr = spawn_test_api(&config, &hub, 100).await;

    let response = get(addr, "/api/v1/does-not-exist").await;
    assert_eq!(response.status(), 404);

    let body: serde_json::Value = response.json().await.unwrap();
    assert_eq!(body["error"]["code"], "not_found");
}
