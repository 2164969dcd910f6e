//! The health monitor: one owned engine instance composing the registry,
//! scheduler, executor, tracker, alert manager, metrics aggregator and
//! history store.
//!
//! # Example
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use sentinel_core::config::HealthEngineConfig;
//! use sentinel_core::health::{CheckDefinition, ComponentType, HealthMonitor, StaticProbe};
//!
//! # async fn run() -> sentinel_core::error::Result<()> {
//! let monitor = HealthMonitor::new(HealthEngineConfig::default());
//! monitor.register_check(CheckDefinition::new(
//!     "database",
//!     "Bază de date",
//!     ComponentType::Database,
//!     Arc::new(StaticProbe::healthy()),
//! ).critical())?;
//! monitor.start();
//!
//! let health = monitor.get_health().await;
//! println!("{}", health.status);
//!
//! monitor.stop();
//! # Ok(())
//! # }
//! ```

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Weak};
use std::time::{Duration, Instant};

use chrono::{DateTime, Utc};
use futures::future::join_all;
use parking_lot::Mutex;
use tokio::sync::broadcast;
use tracing::{debug, info, warn};

use super::alerts::{Alert, AlertManager, AlertSummary};
use super::check::{
    CheckResult, ComponentType, HealthStatus, LivenessResponse, ReadinessResponse, SystemHealth,
};
use super::defaults;
use super::events::{EventBus, HealthEvent};
use super::executor::{Execution, Executor};
use super::history::{HistoryEntry, HistoryStore, UptimeStats};
use super::registry::{CheckDefinition, CheckRegistry};
use super::scheduler::Scheduler;
use super::system::{
    ConnectionGuard, MetricsAggregator, MetricsSource, OsMetricsSource, SystemMetrics,
};
use super::tracker::{overall_status, Recorded, StatusTracker};
use crate::config::HealthEngineConfig;
use crate::error::{Result, SentinelError};
use crate::telemetry::metrics::HealthMetrics;

const EVENT_CAPACITY: usize = 1024;

struct MonitorInner {
    config: HealthEngineConfig,
    registry: CheckRegistry,
    scheduler: Scheduler,
    executor: Executor,
    tracker: StatusTracker,
    alerts: AlertManager,
    metrics: Arc<MetricsAggregator>,
    history: HistoryStore,
    events: EventBus,
    started_at: Instant,
    running: AtomicBool,
    /// Serializes result recording, transition detection and alerting.
    completion: Mutex<()>,
}

/// Cloneable handle to the health engine.
#[derive(Clone)]
pub struct HealthMonitor {
    inner: Arc<MonitorInner>,
}

impl HealthMonitor {
    /// Create a monitor sampling the local host.
    pub fn new(config: HealthEngineConfig) -> Self {
        let source = Arc::new(OsMetricsSource::new(config.disk_path.clone()));
        Self::with_metrics_source(config, source)
    }

    pub fn with_metrics_source(config: HealthEngineConfig, source: Arc<dyn MetricsSource>) -> Self {
        let events = EventBus::new(EVENT_CAPACITY);
        let inner = MonitorInner {
            registry: CheckRegistry::new(),
            scheduler: Scheduler::new(),
            executor: Executor::new(config.retry_backoff),
            tracker: StatusTracker::new(),
            alerts: AlertManager::new(events.clone()),
            metrics: Arc::new(MetricsAggregator::new(
                source,
                config.request_sample_capacity,
                config.request_window,
            )),
            history: HistoryStore::new(config.history_capacity),
            events,
            started_at: Instant::now(),
            running: AtomicBool::new(false),
            completion: Mutex::new(()),
            config,
        };
        Self {
            inner: Arc::new(inner),
        }
    }

    pub fn config(&self) -> &HealthEngineConfig {
        &self.inner.config
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Lifecycle
    // ─────────────────────────────────────────────────────────────────────────

    /// Register the built-in checks and every configured HTTP check.
    pub fn register_defaults(&self) -> Result<()> {
        let config = &self.inner.config;
        if config.default_checks {
            for definition in defaults::default_checks(config, self.inner.metrics.source()) {
                self.register_check(definition)?;
            }
        }
        for definition in defaults::http_checks(&config.http_checks)? {
            self.register_check(definition)?;
        }
        Ok(())
    }

    /// Start a timer for every enabled check. Must be called within a Tokio runtime.
    pub fn start(&self) {
        if self.inner.running.swap(true, Ordering::SeqCst) {
            return;
        }
        let enabled = self.inner.registry.enabled();
        for definition in &enabled {
            self.schedule(&definition.name, definition.interval);
        }
        info!(checks = enabled.len(), "Health monitor started");
    }

    /// Cancel every timer. In-flight executions finish on their own.
    pub fn stop(&self) {
        self.inner.running.store(false, Ordering::SeqCst);
        let stopped = self.inner.scheduler.cancel_all();
        info!(timers = stopped, "Health monitor stopped");
    }

    /// Alias of [`stop`](Self::stop).
    pub fn stop_all_checks(&self) {
        self.stop();
    }

    pub fn is_running(&self) -> bool {
        self.inner.running.load(Ordering::SeqCst)
    }

    pub fn is_scheduled(&self, name: &str) -> bool {
        self.inner.scheduler.is_scheduled(name)
    }

    fn schedule(&self, name: &str, interval: Duration) {
        let weak: Weak<MonitorInner> = Arc::downgrade(&self.inner);
        let check = name.to_string();

        self.inner.scheduler.schedule(name, interval, move || {
            let weak = weak.clone();
            let check = check.clone();
            async move {
                let Some(inner) = weak.upgrade() else {
                    return false;
                };
                let monitor = HealthMonitor { inner };
                match monitor.run_check(&check).await {
                    Ok(_) => true,
                    Err(e) => {
                        debug!(check = %check, error = %e, "Stopping timer for removed check");
                        false
                    }
                }
            }
        });
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Registry
    // ─────────────────────────────────────────────────────────────────────────

    /// Insert or replace a check. The cached result of a replaced check is kept.
    pub fn register_check(&self, definition: CheckDefinition) -> Result<()> {
        let name = definition.name.clone();
        let (enabled, interval) = (definition.enabled, definition.interval);
        let replaced = self.inner.registry.insert(definition)?.is_some();

        if self.is_running() {
            if enabled {
                self.schedule(&name, interval);
            } else {
                self.inner.scheduler.cancel(&name);
            }
        }
        info!(check = %name, replaced, enabled, "Health check registered");
        Ok(())
    }

    /// Remove a check, its timer and its cached result. Returns whether it existed.
    pub fn unregister_check(&self, name: &str) -> bool {
        self.inner.scheduler.cancel(name);
        let _guard = self.inner.completion.lock();
        let removed = self.inner.registry.remove(name).is_some();
        self.inner.tracker.remove(name);
        if removed {
            info!(check = %name, "Health check unregistered");
        }
        removed
    }

    pub fn enable_check(&self, name: &str) -> Result<()> {
        if !self.inner.registry.set_enabled(name, true)? {
            return Ok(());
        }
        if self.is_running() {
            if let Some(definition) = self.inner.registry.get(name) {
                self.schedule(name, definition.interval);
            }
        }
        info!(check = %name, "Health check enabled");
        self.inner.events.publish(HealthEvent::CheckEnabled {
            name: name.to_string(),
        });
        Ok(())
    }

    pub fn disable_check(&self, name: &str) -> Result<()> {
        if !self.inner.registry.set_enabled(name, false)? {
            return Ok(());
        }
        self.inner.scheduler.cancel(name);
        info!(check = %name, "Health check disabled");
        self.inner.events.publish(HealthEvent::CheckDisabled {
            name: name.to_string(),
        });
        Ok(())
    }

    pub fn update_check_interval(&self, name: &str, interval: Duration) -> Result<()> {
        let definition = self.inner.registry.set_interval(name, interval)?;
        if definition.enabled && self.is_running() {
            self.schedule(name, interval);
        }
        info!(
            check = %name,
            interval_ms = interval.as_millis() as u64,
            "Health check interval updated"
        );
        self.inner.events.publish(HealthEvent::CheckUpdated {
            name: name.to_string(),
            interval_ms: interval.as_millis() as u64,
        });
        Ok(())
    }

    /// Snapshot of every definition, in name order.
    pub fn get_all_checks(&self) -> Vec<CheckDefinition> {
        self.inner.registry.list()
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Execution
    // ─────────────────────────────────────────────────────────────────────────

    /// Execute one check now, whether or not it is enabled.
    pub async fn run_check(&self, name: &str) -> Result<CheckResult> {
        let definition = self
            .inner
            .registry
            .get(name)
            .ok_or_else(|| SentinelError::check_not_found(name))?;
        let execution = self.inner.executor.execute(&definition).await;
        Ok(self.complete(&definition, execution))
    }

    /// Execute every enabled check concurrently.
    pub async fn run_all_checks(&self) -> Vec<CheckResult> {
        let definitions = self.inner.registry.enabled();
        let executions = join_all(definitions.iter().map(|d| self.inner.executor.execute(d))).await;

        definitions
            .iter()
            .zip(executions)
            .map(|(definition, execution)| self.complete(definition, execution))
            .collect()
    }

    fn complete(&self, definition: &CheckDefinition, execution: Execution) -> CheckResult {
        let Execution { result, generation } = execution;
        let _guard = self.inner.completion.lock();

        if !self.inner.registry.contains(&definition.name) {
            debug!(check = %definition.name, "Discarding result of unregistered check");
            return result;
        }

        match self.inner.tracker.record(result.clone(), generation) {
            Recorded::Stale => {
                debug!(check = %definition.name, generation, "Discarding stale check result");
                return result;
            }
            Recorded::Stored { previous } if previous != result.status => {
                info!(
                    check = %definition.name,
                    from = %previous,
                    to = %result.status,
                    "Health check status changed"
                );
                self.inner.alerts.handle_transition(definition, previous, &result);
            }
            Recorded::Stored { .. } => {}
        }

        debug!(
            check = %result.name,
            status = %result.status,
            response_time_ms = result.response_time_ms,
            attempts = result.attempts,
            "Health check completed"
        );
        HealthMetrics::record_check(
            &result.name,
            result.status.as_str(),
            result.response_time_ms as f64 / 1000.0,
        );
        HealthMetrics::set_check_status(&result.name, result.status.score());
        self.inner.events.publish(HealthEvent::Checked {
            name: result.name.clone(),
            status: result.status,
            response_time_ms: result.response_time_ms,
            timestamp: result.last_checked,
        });
        result
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Health queries
    // ─────────────────────────────────────────────────────────────────────────

    /// Run every enabled check and aggregate. Each call appends a history entry.
    pub async fn get_health(&self) -> SystemHealth {
        let components = self.run_all_checks().await;
        let registry = &self.inner.registry;
        let status = overall_status(&components, |name| registry.is_critical(name));

        let health = SystemHealth {
            status,
            uptime_secs: self.inner.started_at.elapsed().as_secs(),
            version: self.inner.config.version.clone(),
            environment: self.inner.config.environment.clone(),
            timestamp: Utc::now(),
            components,
            metrics: self.inner.metrics.get_metrics(),
        };

        self.inner.history.append(HistoryEntry::from(&health));
        HealthMetrics::set_system_health(status.score());
        if status != HealthStatus::Healthy {
            warn!(status = %status, "System health is not healthy");
        }
        health
    }

    pub fn get_liveness(&self) -> LivenessResponse {
        LivenessResponse::alive()
    }

    /// Ready when every enabled critical check has a cached healthy result.
    pub fn get_readiness(&self) -> ReadinessResponse {
        let down = self
            .inner
            .registry
            .enabled()
            .into_iter()
            .filter(|d| d.critical)
            .find(|d| self.inner.tracker.status(&d.name) != HealthStatus::Healthy);

        match down {
            Some(definition) => ReadinessResponse::critical_component_down(&definition.name),
            None => ReadinessResponse::ready(),
        }
    }

    /// Cached last result, never triggers execution.
    pub fn get_component_health(&self, name: &str) -> Option<CheckResult> {
        self.inner.tracker.get(name)
    }

    pub fn get_components_by_type(&self, component_type: ComponentType) -> Vec<CheckResult> {
        self.inner.tracker.by_type(component_type)
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Metrics
    // ─────────────────────────────────────────────────────────────────────────

    pub fn get_metrics(&self) -> SystemMetrics {
        self.inner.metrics.get_metrics()
    }

    pub fn record_request(&self, success: bool, response_time_ms: f64) {
        self.inner.metrics.record_request(success, response_time_ms);
        HealthMetrics::record_request(success, response_time_ms / 1000.0);
    }

    pub fn track_connection(&self) -> ConnectionGuard {
        self.inner.metrics.connection_guard()
    }

    pub fn metrics_source(&self) -> Arc<dyn MetricsSource> {
        self.inner.metrics.source()
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Alerts
    // ─────────────────────────────────────────────────────────────────────────

    pub fn get_alerts(&self, include_resolved: bool) -> Vec<Alert> {
        self.inner.alerts.list(include_resolved)
    }

    pub fn acknowledge_alert(&self, id: &str) -> Result<Alert> {
        self.inner.alerts.acknowledge(id)
    }

    pub fn clear_resolved_alerts(&self) -> usize {
        let removed = self.inner.alerts.clear_resolved();
        if removed > 0 {
            info!(removed, "Cleared resolved alerts");
        }
        removed
    }

    pub fn alert_summary(&self) -> AlertSummary {
        self.inner.alerts.summary()
    }

    // ─────────────────────────────────────────────────────────────────────────
    // History
    // ─────────────────────────────────────────────────────────────────────────

    /// Newest first. `limit` defaults to 100.
    pub fn get_history(
        &self,
        since: Option<DateTime<Utc>>,
        limit: Option<usize>,
    ) -> Vec<HistoryEntry> {
        self.inner
            .history
            .query(since, limit.unwrap_or(HistoryStore::DEFAULT_LIMIT))
    }

    pub fn get_uptime_stats(&self, since: Option<DateTime<Utc>>) -> UptimeStats {
        self.inner.history.uptime(since)
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Events
    // ─────────────────────────────────────────────────────────────────────────

    pub fn subscribe(&self) -> broadcast::Receiver<HealthEvent> {
        self.inner.events.subscribe()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::health::check::Outcome;
    use crate::health::probe::{probe_fn, StaticProbe};
    use crate::health::system::StaticMetricsSource;

    fn monitor() -> HealthMonitor {
        HealthMonitor::with_metrics_source(
            HealthEngineConfig::default(),
            Arc::new(StaticMetricsSource::with_usage(30.0, 30.0)),
        )
    }

    fn check(name: &str, healthy: bool) -> CheckDefinition {
        let probe = if healthy {
            StaticProbe::healthy()
        } else {
            StaticProbe::unhealthy(format!("{name} down"))
        };
        CheckDefinition::new(name, name, ComponentType::Database, Arc::new(probe))
    }

    #[tokio::test]
    async fn test_run_unknown_check_fails() {
        let err = monitor().run_check("nope").await.unwrap_err();
        assert!(err.is_not_found());
        assert_eq!(err.user_message(), "Health check not found: nope");
    }

    #[tokio::test]
    async fn test_aggregate_status() {
        let monitor = monitor();
        monitor.register_check(check("db", true).critical()).unwrap();
        monitor.register_check(check("cache", false)).unwrap();

        let health = monitor.get_health().await;
        assert_eq!(health.status, HealthStatus::Degraded);
        assert_eq!(health.components.len(), 2);
        assert_eq!(monitor.get_history(None, None).len(), 1);

        monitor.register_check(check("db", false).critical()).unwrap();
        assert_eq!(monitor.get_health().await.status, HealthStatus::Unhealthy);
    }

    #[tokio::test]
    async fn test_disabled_checks_excluded_from_run_all() {
        let monitor = monitor();
        monitor.register_check(check("db", true)).unwrap();
        monitor.register_check(check("cache", false).disabled()).unwrap();

        let results = monitor.run_all_checks().await;
        assert_eq!(results.len(), 1);
        assert_eq!(results[0].name, "db");
    }

    #[tokio::test]
    async fn test_readiness_reads_cache() {
        let monitor = monitor();
        monitor.register_check(check("db", true).critical()).unwrap();

        let readiness = monitor.get_readiness();
        assert!(!readiness.ready);
        assert_eq!(
            readiness.reason.as_deref(),
            Some("Critical component db is not healthy")
        );

        monitor.run_check("db").await.unwrap();
        assert!(monitor.get_readiness().ready);
    }

    #[tokio::test]
    async fn test_unregister_removes_cached_result() {
        let monitor = monitor();
        monitor.register_check(check("db", true)).unwrap();
        monitor.run_check("db").await.unwrap();

        assert!(monitor.unregister_check("db"));
        assert!(!monitor.unregister_check("db"));
        assert!(monitor.get_component_health("db").is_none());
    }

    #[tokio::test]
    async fn test_enable_disable_emit_events_once() {
        let monitor = monitor();
        let mut events = monitor.subscribe();
        monitor.register_check(check("db", true)).unwrap();

        monitor.disable_check("db").unwrap();
        monitor.disable_check("db").unwrap();
        monitor.enable_check("db").unwrap();

        assert_eq!(events.try_recv().unwrap().name(), "health.check.disabled");
        assert_eq!(events.try_recv().unwrap().name(), "health.check.enabled");
        assert!(events.try_recv().is_err());

        assert!(monitor.enable_check("missing").unwrap_err().is_not_found());
    }

    #[tokio::test]
    async fn test_result_for_check_unregistered_mid_flight_is_discarded() {
        let monitor = monitor();
        let (release_tx, release_rx) = tokio::sync::oneshot::channel::<()>();
        let release = Arc::new(Mutex::new(Some(release_rx)));
        let probe = probe_fn(move || {
            let release = release.clone();
            async move {
                let rx = release.lock().take();
                if let Some(rx) = rx {
                    let _ = rx.await;
                }
                Ok::<_, anyhow::Error>(Outcome::healthy())
            }
        });
        monitor
            .register_check(CheckDefinition::new("slow", "slow", ComponentType::Queue, probe))
            .unwrap();

        let running = tokio::spawn({
            let monitor = monitor.clone();
            async move { monitor.run_check("slow").await }
        });
        tokio::task::yield_now().await;
        monitor.unregister_check("slow");
        let _ = release_tx.send(());

        assert!(running.await.unwrap().is_ok());
        assert!(monitor.get_component_health("slow").is_none());
    }

    #[tokio::test(start_paused = true)]
    async fn test_start_schedules_enabled_checks() {
        let monitor = monitor();
        monitor.register_check(check("db", true)).unwrap();
        monitor.register_check(check("cache", true).disabled()).unwrap();
        assert!(!monitor.is_scheduled("db"));

        monitor.start();
        tokio::time::sleep(Duration::from_millis(10)).await;

        assert!(monitor.is_scheduled("db"));
        assert!(!monitor.is_scheduled("cache"));
        assert!(monitor.get_component_health("db").is_some());

        monitor.stop();
        assert!(!monitor.is_scheduled("db"));
    }

    #[tokio::test]
    async fn test_register_defaults() {
        let monitor = monitor();
        monitor.register_defaults().unwrap();
        let names: Vec<_> = monitor.get_all_checks().into_iter().map(|c| c.name).collect();
        assert_eq!(names, vec!["api", "disk", "memory"]);
    }
}
