//! Probes: the operations a health check runs.
//!
//! A probe resolves to an [`Outcome`] or fails with an error. Errors (and
//! timeouts enforced by the executor) consume retry attempts; an explicit
//! unhealthy outcome does not.

use std::future::Future;
use std::sync::Arc;
use std::time::{Duration, Instant};

use async_trait::async_trait;
use tracing::warn;

use super::check::Outcome;
use super::system::MetricsSource;

/// Trait for health probes.
#[async_trait]
pub trait Probe: Send + Sync {
    /// Run the probe once.
    async fn check(&self) -> anyhow::Result<Outcome>;
}

// ═══════════════════════════════════════════════════════════════════════════════
// Closure Probes
// ═══════════════════════════════════════════════════════════════════════════════

/// Probe backed by an async closure.
pub struct FnProbe<F> {
    f: F,
}

impl<F> FnProbe<F> {
    pub fn new(f: F) -> Self {
        Self { f }
    }
}

#[async_trait]
impl<F, Fut> Probe for FnProbe<F>
where
    F: Fn() -> Fut + Send + Sync,
    Fut: Future<Output = anyhow::Result<Outcome>> + Send,
{
    async fn check(&self) -> anyhow::Result<Outcome> {
        (self.f)().await
    }
}

/// Wrap an async closure as a shareable probe.
pub fn probe_fn<F, Fut>(f: F) -> Arc<dyn Probe>
where
    F: Fn() -> Fut + Send + Sync + 'static,
    Fut: Future<Output = anyhow::Result<Outcome>> + Send + 'static,
{
    Arc::new(FnProbe::new(f))
}

/// Probe that always returns the same outcome.
#[derive(Debug, Clone)]
pub struct StaticProbe {
    outcome: Outcome,
}

impl StaticProbe {
    pub fn healthy() -> Self {
        Self {
            outcome: Outcome::healthy(),
        }
    }

    pub fn unhealthy(message: impl Into<String>) -> Self {
        Self {
            outcome: Outcome::unhealthy(message),
        }
    }
}

#[async_trait]
impl Probe for StaticProbe {
    async fn check(&self) -> anyhow::Result<Outcome> {
        Ok(self.outcome.clone())
    }
}

// ═══════════════════════════════════════════════════════════════════════════════
// HTTP Probe
// ═══════════════════════════════════════════════════════════════════════════════

/// Probe that issues a GET request and compares the response status.
///
/// Connection failures are returned as errors so they are retried. An
/// unexpected status code is an unhealthy outcome.
pub struct HttpProbe {
    client: reqwest::Client,
    url: String,
    expected_status: Vec<u16>,
}

impl HttpProbe {
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            client: reqwest::Client::new(),
            url: url.into(),
            expected_status: vec![200, 204],
        }
    }

    /// Set expected status codes.
    pub fn with_expected_status(mut self, codes: Vec<u16>) -> Self {
        if !codes.is_empty() {
            self.expected_status = codes;
        }
        self
    }

    /// Set custom HTTP client.
    pub fn with_client(mut self, client: reqwest::Client) -> Self {
        self.client = client;
        self
    }

    pub fn url(&self) -> &str {
        &self.url
    }
}

#[async_trait]
impl Probe for HttpProbe {
    async fn check(&self) -> anyhow::Result<Outcome> {
        let response = self.client.get(&self.url).send().await.map_err(|e| {
            warn!(url = %self.url, error = %e, "HTTP probe request failed");
            e
        })?;
        let status = response.status().as_u16();

        let outcome = if self.expected_status.contains(&status) {
            Outcome::healthy().with_message(format!("{} is reachable", self.url))
        } else {
            Outcome::unhealthy(format!(
                "Unexpected status: {} (expected {:?})",
                status, self.expected_status
            ))
        };

        Ok(outcome
            .with_detail("http_status", status)
            .with_detail("url", &self.url))
    }
}

// ═══════════════════════════════════════════════════════════════════════════════
// Resource Probes
// ═══════════════════════════════════════════════════════════════════════════════

/// Unhealthy when host memory usage exceeds a threshold.
pub struct MemoryProbe {
    source: Arc<dyn MetricsSource>,
    threshold_percent: f64,
}

impl MemoryProbe {
    pub fn new(source: Arc<dyn MetricsSource>, threshold_percent: f64) -> Self {
        Self {
            source,
            threshold_percent,
        }
    }
}

#[async_trait]
impl Probe for MemoryProbe {
    async fn check(&self) -> anyhow::Result<Outcome> {
        let memory = self.source.snapshot().memory;
        let outcome = if memory.usage_percent > self.threshold_percent {
            Outcome::unhealthy(format!(
                "Memory usage high: {:.1}% (threshold: {:.1}%)",
                memory.usage_percent, self.threshold_percent
            ))
        } else {
            Outcome::healthy()
        };

        Ok(outcome
            .with_detail("usage_percent", memory.usage_percent)
            .with_detail("used", memory.used)
            .with_detail("total", memory.total))
    }
}

/// Unhealthy when disk usage exceeds a threshold.
pub struct DiskProbe {
    source: Arc<dyn MetricsSource>,
    threshold_percent: f64,
}

impl DiskProbe {
    pub fn new(source: Arc<dyn MetricsSource>, threshold_percent: f64) -> Self {
        Self {
            source,
            threshold_percent,
        }
    }
}

#[async_trait]
impl Probe for DiskProbe {
    async fn check(&self) -> anyhow::Result<Outcome> {
        let disk = self.source.snapshot().disk;
        let outcome = if disk.usage_percent > self.threshold_percent {
            Outcome::unhealthy(format!(
                "Disk usage high: {:.1}% (threshold: {:.1}%)",
                disk.usage_percent, self.threshold_percent
            ))
        } else {
            Outcome::healthy()
        };

        Ok(outcome
            .with_detail("usage_percent", disk.usage_percent)
            .with_detail("free", disk.free)
            .with_detail("total", disk.total))
    }
}

/// Always healthy while the process can schedule work; reports pid and uptime.
pub struct ProcessProbe {
    started_at: Instant,
}

impl ProcessProbe {
    pub fn new() -> Self {
        Self {
            started_at: Instant::now(),
        }
    }

    pub fn uptime(&self) -> Duration {
        self.started_at.elapsed()
    }
}

impl Default for ProcessProbe {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Probe for ProcessProbe {
    async fn check(&self) -> anyhow::Result<Outcome> {
        Ok(Outcome::healthy()
            .with_message("API is running")
            .with_detail("pid", std::process::id())
            .with_detail("uptime_secs", self.uptime().as_secs()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::health::system::StaticMetricsSource;

    #[tokio::test]
    async fn test_fn_probe() {
        let probe = probe_fn(|| async { Ok::<_, anyhow::Error>(Outcome::unhealthy("nope")) });
        let outcome = probe.check().await.unwrap();
        assert!(!outcome.healthy);
        assert_eq!(outcome.message.as_deref(), Some("nope"));
    }

    #[tokio::test]
    async fn test_fn_probe_error() {
        let probe = probe_fn(|| async { Err::<Outcome, _>(anyhow::anyhow!("connection refused")) });
        assert!(probe.check().await.is_err());
    }

    #[tokio::test]
    async fn test_memory_probe_threshold() {
        let source = Arc::new(StaticMetricsSource::with_usage(95.0, 10.0));
        let outcome = MemoryProbe::new(source.clone(), 90.0).check().await.unwrap();
        assert!(!outcome.healthy);
        assert!(outcome.message.unwrap().contains("95.0%"));

        let outcome = MemoryProbe::new(source, 99.0).check().await.unwrap();
        assert!(outcome.healthy);
    }

    #[tokio::test]
    async fn test_disk_probe_threshold() {
        let source = Arc::new(StaticMetricsSource::with_usage(10.0, 92.5));
        let outcome = DiskProbe::new(source, 90.0).check().await.unwrap();
        assert!(!outcome.healthy);
        assert_eq!(outcome.details["usage_percent"], serde_json::json!(92.5));
    }

    #[tokio::test]
    async fn test_process_probe() {
        let outcome = ProcessProbe::new().check().await.unwrap();
        assert!(outcome.healthy);
        assert_eq!(outcome.details["pid"], serde_json::json!(std::process::id()));
    }
}
