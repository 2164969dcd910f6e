//! Prometheus metrics for health checks, alerts and tracked requests.
//!
//! # Example
//!
//! ```rust,no_run
//! use sentinel_core::telemetry::metrics::HealthMetrics;
//!
//! HealthMetrics::record_check("database", "healthy", 0.012);
//! HealthMetrics::record_request(true, 0.045);
//! ```

use metrics::{counter, describe_counter, describe_gauge, describe_histogram, gauge, histogram};
use metrics_exporter_prometheus::{PrometheusBuilder, PrometheusHandle};
use serde::Deserialize;
use std::collections::HashMap;

/// Metrics configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct MetricsConfig {
    /// Whether metrics collection is enabled
    #[serde(default = "default_metrics_enabled")]
    pub enabled: bool,

    /// Histogram buckets for durations (in seconds)
    #[serde(default = "default_duration_buckets")]
    pub duration_buckets: Vec<f64>,

    /// Global labels to add to all metrics
    #[serde(default)]
    pub global_labels: HashMap<String, String>,
}

impl Default for MetricsConfig {
    fn default() -> Self {
        Self {
            enabled: default_metrics_enabled(),
            duration_buckets: default_duration_buckets(),
            global_labels: HashMap::new(),
        }
    }
}

fn default_metrics_enabled() -> bool {
    true
}

fn default_duration_buckets() -> Vec<f64> {
    vec![
        0.005, 0.01, 0.025, 0.05, 0.1, 0.25, 0.5, 1.0, 2.5, 5.0, 10.0, 30.0,
    ]
}

/// Handle to the installed Prometheus recorder.
#[derive(Clone, Default)]
pub struct MetricsRegistry {
    prometheus_handle: Option<PrometheusHandle>,
}

impl std::fmt::Debug for MetricsRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MetricsRegistry")
            .field("prometheus_handle", &self.prometheus_handle.is_some())
            .finish()
    }
}

impl MetricsRegistry {
    /// Registry that renders nothing, for when no recorder is installed.
    pub fn disabled() -> Self {
        Self::default()
    }

    pub fn is_enabled(&self) -> bool {
        self.prometheus_handle.is_some()
    }

    /// Render all metrics in Prometheus text format.
    pub fn render(&self) -> String {
        self.prometheus_handle
            .as_ref()
            .map(|h| h.render())
            .unwrap_or_default()
    }
}

/// Install the global Prometheus recorder.
///
/// # Errors
///
/// Returns an error if the buckets are invalid or a recorder is already installed.
pub fn init_metrics(config: &MetricsConfig, service_name: &str) -> anyhow::Result<MetricsRegistry> {
    if !config.enabled {
        return Ok(MetricsRegistry::disabled());
    }

    let mut builder = PrometheusBuilder::new().add_global_label("service", service_name);
    for (key, value) in &config.global_labels {
        builder = builder.add_global_label(key, value);
    }
    builder = builder.set_buckets(&config.duration_buckets)?;

    let handle = builder.install_recorder()?;
    register_metric_descriptions();

    tracing::info!(service_name = %service_name, "Metrics initialized");

    Ok(MetricsRegistry {
        prometheus_handle: Some(handle),
    })
}

fn register_metric_descriptions() {
    describe_histogram!(
        "sentinel_check_duration_seconds",
        "Health check execution time including retries"
    );
    describe_counter!("sentinel_checks_total", "Health check executions by outcome");
    describe_gauge!(
        "sentinel_check_status",
        "Last status per check (1=healthy, 0=unhealthy, -1=unknown)"
    );
    describe_gauge!(
        "sentinel_system_health",
        "Aggregate status (1=healthy, 0.5=degraded, 0=unhealthy)"
    );

    describe_counter!("sentinel_alerts_total", "Alerts raised by severity");
    describe_gauge!("sentinel_active_alerts", "Unresolved alerts");

    describe_counter!("sentinel_requests_total", "Tracked requests by outcome");
    describe_histogram!(
        "sentinel_request_duration_seconds",
        "Tracked request duration in seconds"
    );

    describe_counter!("sentinel_errors_total", "Errors by code and category");
}

/// Recording helpers for the health engine.
pub struct HealthMetrics;

impl HealthMetrics {
    /// Record one completed check execution.
    pub fn record_check(check: &str, status: &str, duration_seconds: f64) {
        histogram!(
            "sentinel_check_duration_seconds",
            "check" => check.to_string(),
            "status" => status.to_string(),
        )
        .record(duration_seconds);

        counter!(
            "sentinel_checks_total",
            "check" => check.to_string(),
            "status" => status.to_string(),
        )
        .increment(1);
    }

    pub fn set_check_status(check: &str, score: f64) {
        gauge!("sentinel_check_status", "check" => check.to_string()).set(score);
    }

    pub fn set_system_health(score: f64) {
        gauge!("sentinel_system_health").set(score);
    }

    pub fn record_alert(severity: &str) {
        counter!("sentinel_alerts_total", "severity" => severity.to_string()).increment(1);
    }

    pub fn set_active_alerts(count: usize) {
        gauge!("sentinel_active_alerts").set(count as f64);
    }

    pub fn record_request(success: bool, duration_seconds: f64) {
        let outcome = if success { "success" } else { "failure" };
        counter!("sentinel_requests_total", "outcome" => outcome).increment(1);
        histogram!("sentinel_request_duration_seconds").record(duration_seconds);
    }
}
