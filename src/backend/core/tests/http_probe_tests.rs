//! HTTP probes against a mock server.

use std::sync::Arc;
use std::time::Duration;

use sentinel_core::config::{HealthEngineConfig, HttpCheckConfig};
use sentinel_core::health::{
    ComponentType, HealthMonitor, HealthStatus, HttpProbe, Probe, StaticMetricsSource,
};
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

// ============================================================================
// Test Utilities
// ============================================================================

async fn server_returning(status: u16) -> MockServer {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/status"))
        .respond_with(ResponseTemplate::new(status))
        .mount(&server)
        .await;
    server
}

fn http_check(value: serde_json::Value) -> HttpCheckConfig {
    serde_json::from_value(value).unwrap()
}

fn monitor_with(checks: Vec<HttpCheckConfig>) -> HealthMonitor {
    let config = HealthEngineConfig {
        default_checks: false,
        retry_backoff: Duration::from_millis(10),
        http_checks: checks,
        ..Default::default()
    };
    HealthMonitor::with_metrics_source(config, Arc::new(StaticMetricsSource::default()))
}

// ============================================================================
// Probe
// ============================================================================

#[tokio::test]
async fn test_expected_status_is_healthy() {
    let server = server_returning(204).await;
    let probe = HttpProbe::new(format!("{}/status", server.uri()));

    let outcome = probe.check().await.unwrap();

    assert!(outcome.healthy);
    assert_eq!(outcome.details["http_status"], 204);
}

#[tokio::test]
async fn test_unexpected_status_is_unhealthy() {
    let server = server_returning(500).await;
    let probe = HttpProbe::new(format!("{}/status", server.uri()));

    let outcome = probe.check().await.unwrap();

    assert!(!outcome.healthy);
    assert_eq!(
        outcome.message.as_deref(),
        Some("Unexpected status: 500 (expected [200, 204])")
    );
}

#[tokio::test]
async fn test_custom_expected_status() {
    let server = server_returning(401).await;
    let probe =
        HttpProbe::new(format!("{}/status", server.uri())).with_expected_status(vec![200, 401]);

    assert!(probe.check().await.unwrap().healthy);
}

#[tokio::test]
async fn test_unreachable_endpoint_is_an_error() {
    let server = MockServer::builder().start().await;
    let url = format!("{}/status", server.uri());
    drop(server);

    assert!(HttpProbe::new(url).check().await.is_err());
}

// ============================================================================
// Configured checks
// ============================================================================

#[tokio::test]
async fn test_configured_http_check_runs() {
    let server = server_returning(200).await;
    let monitor = monitor_with(vec![http_check(serde_json::json!({
        "name": "billing",
        "name_ro": "Facturare",
        "url": format!("{}/status", server.uri()),
        "critical": true,
    }))]);
    monitor.register_defaults().unwrap();

    let checks = monitor.get_all_checks();
    assert_eq!(checks.len(), 1);
    assert_eq!(checks[0].component_type, ComponentType::ExternalApi);
    assert_eq!(checks[0].retries, 2);
    assert!(checks[0].critical);

    let result = monitor.run_check("billing").await.unwrap();
    assert_eq!(result.status, HealthStatus::Healthy);
    assert_eq!(result.name_ro, "Facturare");
    assert!(monitor.get_readiness().ready);
}

#[tokio::test]
async fn test_failing_endpoint_raises_alert() {
    let server = server_returning(503).await;
    let monitor = monitor_with(vec![http_check(serde_json::json!({
        "name": "payments",
        "url": format!("{}/status", server.uri()),
        "retries": 3,
    }))]);
    monitor.register_defaults().unwrap();

    let result = monitor.run_check("payments").await.unwrap();

    // A status mismatch is a definitive answer, not a transport failure.
    assert_eq!(result.attempts, 1);
    assert_eq!(result.status, HealthStatus::Unhealthy);
    let alerts = monitor.get_alerts(false);
    assert_eq!(alerts.len(), 1);
    assert_eq!(alerts[0].message_ro, "payments nu funcționează corect");
}

#[tokio::test]
async fn test_transport_failure_is_retried() {
    let server = MockServer::builder().start().await;
    let url = format!("{}/status", server.uri());
    drop(server);

    let monitor = monitor_with(vec![http_check(serde_json::json!({
        "name": "gone",
        "url": url,
        "retries": 3,
        "timeout": "2s",
    }))]);
    monitor.register_defaults().unwrap();

    let result = monitor.run_check("gone").await.unwrap();

    assert_eq!(result.attempts, 3);
    assert_eq!(result.status, HealthStatus::Unhealthy);
    assert!(result.message.is_some());
}
