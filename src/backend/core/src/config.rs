//! Configuration management.
//!
//! Values come from an optional file plus `SENTINEL__*` environment
//! variables, e.g. `SENTINEL__SERVER__PORT=9000` or
//! `SENTINEL__HEALTH__RETRY_BACKOFF=250ms`.

use std::time::Duration;

use serde::Deserialize;

use crate::error::{Result, SentinelError};
use crate::health::ComponentType;
use crate::telemetry::TelemetryConfig;

const ENV_PREFIX: &str = "SENTINEL";

/// Main application configuration.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub server: ServerConfig,

    #[serde(default)]
    pub telemetry: TelemetryConfig,

    #[serde(default)]
    pub health: HealthEngineConfig,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ServerConfig {
    /// HTTP server host
    #[serde(default = "default_host")]
    pub host: String,

    /// HTTP server port
    #[serde(default = "default_port")]
    pub port: u16,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
        }
    }
}

/// Health engine settings.
#[derive(Debug, Clone, Deserialize)]
pub struct HealthEngineConfig {
    #[serde(default = "default_service_name")]
    pub service_name: String,

    #[serde(default = "default_version")]
    pub version: String,

    #[serde(default = "default_environment")]
    pub environment: String,

    /// Wait between failed probe attempts
    #[serde(default = "default_retry_backoff", with = "humantime_serde")]
    pub retry_backoff: Duration,

    #[serde(default = "default_history_capacity")]
    pub history_capacity: usize,

    #[serde(default = "default_request_sample_capacity")]
    pub request_sample_capacity: usize,

    /// Trailing window for throughput and latency
    #[serde(default = "default_request_window", with = "humantime_serde")]
    pub request_window: Duration,

    /// Register the built-in api/memory/disk checks at start-up
    #[serde(default = "default_true")]
    pub default_checks: bool,

    #[serde(default = "default_threshold")]
    pub memory_threshold_percent: f64,

    #[serde(default = "default_threshold")]
    pub disk_threshold_percent: f64,

    /// Filesystem path sampled for disk usage
    #[serde(default = "default_disk_path")]
    pub disk_path: String,

    #[serde(default)]
    pub http_checks: Vec<HttpCheckConfig>,
}

impl Default for HealthEngineConfig {
    fn default() -> Self {
        Self {
            service_name: default_service_name(),
            version: default_version(),
            environment: default_environment(),
            retry_backoff: default_retry_backoff(),
            history_capacity: default_history_capacity(),
            request_sample_capacity: default_request_sample_capacity(),
            request_window: default_request_window(),
            default_checks: true,
            memory_threshold_percent: default_threshold(),
            disk_threshold_percent: default_threshold(),
            disk_path: default_disk_path(),
            http_checks: Vec::new(),
        }
    }
}

/// A declarative HTTP check against an external endpoint.
#[derive(Debug, Clone, Deserialize)]
pub struct HttpCheckConfig {
    pub name: String,

    /// Localized display name, defaults to `name`
    #[serde(default)]
    pub name_ro: Option<String>,

    #[serde(default = "default_http_component_type", rename = "type")]
    pub component_type: ComponentType,

    pub url: String,

    #[serde(default = "default_expected_status")]
    pub expected_status: Vec<u16>,

    #[serde(default = "default_http_interval", with = "humantime_serde")]
    pub interval: Duration,

    #[serde(default = "default_http_timeout", with = "humantime_serde")]
    pub timeout: Duration,

    #[serde(default = "default_http_retries")]
    pub retries: u32,

    #[serde(default)]
    pub critical: bool,

    #[serde(default = "default_true")]
    pub enabled: bool,
}

fn default_host() -> String { "0.0.0.0".to_string() }
fn default_port() -> u16 { 8080 }
fn default_service_name() -> String { "sentinel".to_string() }
fn default_version() -> String { env!("CARGO_PKG_VERSION").to_string() }
fn default_environment() -> String { "development".to_string() }
fn default_retry_backoff() -> Duration { Duration::from_millis(500) }
fn default_history_capacity() -> usize { 1000 }
fn default_request_sample_capacity() -> usize { 10_000 }
fn default_request_window() -> Duration { Duration::from_secs(60) }
fn default_true() -> bool { true }
fn default_threshold() -> f64 { 90.0 }
fn default_disk_path() -> String { "/".to_string() }
fn default_http_component_type() -> ComponentType { ComponentType::ExternalApi }
fn default_expected_status() -> Vec<u16> { vec![200, 204] }
fn default_http_interval() -> Duration { Duration::from_secs(60) }
fn default_http_timeout() -> Duration { Duration::from_secs(5) }
fn default_http_retries() -> u32 { 2 }

impl Config {
    /// Load configuration from the environment.
    pub fn load() -> Result<Self> {
        let config = config::Config::builder()
            .add_source(config::Environment::with_prefix(ENV_PREFIX).separator("__"))
            .build()?;

        let cfg: Config = config.try_deserialize()?;
        cfg.validate()?;
        Ok(cfg)
    }

    /// Load from a specific file path, with environment overrides.
    pub fn from_file(path: &str) -> Result<Self> {
        let config = config::Config::builder()
            .add_source(config::File::with_name(path))
            .add_source(config::Environment::with_prefix(ENV_PREFIX).separator("__"))
            .build()?;

        let cfg: Config = config.try_deserialize()?;
        cfg.validate()?;
        Ok(cfg)
    }

    pub fn validate(&self) -> Result<()> {
        let health = &self.health;
        if health.history_capacity == 0 {
            return Err(SentinelError::configuration("health.history_capacity must be positive"));
        }
        if health.request_sample_capacity == 0 {
            return Err(SentinelError::configuration(
                "health.request_sample_capacity must be positive",
            ));
        }
        if health.request_window.is_zero() {
            return Err(SentinelError::configuration("health.request_window must be positive"));
        }

        for check in &health.http_checks {
            if check.interval.is_zero() || check.timeout.is_zero() {
                return Err(SentinelError::configuration(format!(
                    "http check '{}' needs a positive interval and timeout",
                    check.name
                )));
            }
            if check.retries == 0 {
                return Err(SentinelError::configuration(format!(
                    "http check '{}' needs at least one attempt",
                    check.name
                )));
            }
        }
        Ok(())
    }
}
