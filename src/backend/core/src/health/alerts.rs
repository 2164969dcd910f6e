//! Alert manager: alerts raised and resolved by status transitions.

use chrono::{DateTime, Utc};
use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use tracing::{info, warn};
use uuid::Uuid;

use super::check::{CheckResult, HealthStatus};
use super::events::{EventBus, HealthEvent};
use super::registry::CheckDefinition;
use crate::error::{Result, SentinelError};
use crate::telemetry::metrics::HealthMetrics;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AlertSeverity {
    Warning,
    Critical,
}

impl AlertSeverity {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Warning => "warning",
            Self::Critical => "critical",
        }
    }
}

impl std::fmt::Display for AlertSeverity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A component's transition into an unhealthy state, open until resolved.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Alert {
    pub id: String,

    /// Name of the check that raised the alert
    pub component: String,

    pub severity: AlertSeverity,

    pub message: String,

    pub message_ro: String,

    pub status: HealthStatus,

    pub previous_status: HealthStatus,

    pub created_at: DateTime<Utc>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub acknowledged_at: Option<DateTime<Utc>>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub resolved_at: Option<DateTime<Utc>>,
}

impl Alert {
    pub fn is_resolved(&self) -> bool {
        self.resolved_at.is_some()
    }

    pub fn is_acknowledged(&self) -> bool {
        self.acknowledged_at.is_some()
    }
}

/// Counts over the current alert set.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AlertSummary {
    /// Unresolved alerts
    pub active: usize,
    pub critical: usize,
    pub warning: usize,
    /// Unresolved alerts that have been acknowledged
    pub acknowledged: usize,
    /// Up to five most recent unresolved alerts
    pub recent: Vec<Alert>,
}

/// Stores alerts in creation order.
pub struct AlertManager {
    alerts: RwLock<Vec<Alert>>,
    events: EventBus,
}

impl AlertManager {
    pub fn new(events: EventBus) -> Self {
        Self {
            alerts: RwLock::new(Vec::new()),
            events,
        }
    }

    /// React to a status change of one check.
    ///
    /// Entering `Unhealthy` opens an alert unless one is already open for the
    /// component. Going from `Unhealthy` to `Healthy` resolves every open alert
    /// of the component.
    pub fn handle_transition(
        &self,
        definition: &CheckDefinition,
        previous: HealthStatus,
        result: &CheckResult,
    ) {
        match (previous, result.status) {
            (prev, HealthStatus::Unhealthy) if prev != HealthStatus::Unhealthy => {
                self.raise(definition, prev, result)
            }
            (HealthStatus::Unhealthy, HealthStatus::Healthy) => self.resolve(&definition.name),
            _ => {}
        }
    }

    fn raise(&self, definition: &CheckDefinition, previous: HealthStatus, result: &CheckResult) {
        let alert = {
            let mut alerts = self.alerts.write();
            if alerts
                .iter()
                .any(|a| a.component == definition.name && !a.is_resolved())
            {
                return;
            }

            let severity = if definition.critical {
                AlertSeverity::Critical
            } else {
                AlertSeverity::Warning
            };
            let alert = Alert {
                id: Uuid::new_v4().to_string(),
                component: definition.name.clone(),
                severity,
                message: result
                    .message
                    .clone()
                    .unwrap_or_else(|| format!("{} is unhealthy", definition.name)),
                message_ro: format!("{} nu funcționează corect", definition.name_ro),
                status: result.status,
                previous_status: previous,
                created_at: Utc::now(),
                acknowledged_at: None,
                resolved_at: None,
            };
            alerts.push(alert.clone());
            alert
        };

        warn!(
            alert_id = %alert.id,
            component = %alert.component,
            severity = %alert.severity,
            message = %alert.message,
            "Health alert raised"
        );
        HealthMetrics::record_alert(alert.severity.as_str());
        HealthMetrics::set_active_alerts(self.active_count());
        self.events.publish(HealthEvent::AlertRaised(alert));
    }

    fn resolve(&self, component: &str) {
        let now = Utc::now();
        let resolved: Vec<String> = {
            let mut alerts = self.alerts.write();
            alerts
                .iter_mut()
                .filter(|a| a.component == component && !a.is_resolved())
                .map(|a| {
                    a.resolved_at = Some(now);
                    a.id.clone()
                })
                .collect()
        };

        for alert_id in resolved {
            info!(alert_id = %alert_id, component = %component, "Health alert resolved");
            self.events.publish(HealthEvent::AlertResolved {
                alert_id,
                component: component.to_string(),
            });
        }
        HealthMetrics::set_active_alerts(self.active_count());
    }

    pub fn acknowledge(&self, id: &str) -> Result<Alert> {
        let alert = {
            let mut alerts = self.alerts.write();
            let alert = alerts
                .iter_mut()
                .find(|a| a.id == id)
                .ok_or_else(|| SentinelError::alert_not_found(id))?;
            alert.acknowledged_at = Some(Utc::now());
            alert.clone()
        };

        info!(alert_id = %id, component = %alert.component, "Health alert acknowledged");
        self.events.publish(HealthEvent::AlertAcknowledged {
            alert_id: id.to_string(),
        });
        Ok(alert)
    }

    /// Alerts newest first, resolved ones only when requested.
    pub fn list(&self, include_resolved: bool) -> Vec<Alert> {
        let mut alerts: Vec<Alert> = self
            .alerts
            .read()
            .iter()
            .rev()
            .filter(|a| include_resolved || !a.is_resolved())
            .cloned()
            .collect();
        // Stable, so equal timestamps keep newest-inserted first.
        alerts.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        alerts
    }

    /// Remove every resolved alert. Returns how many were removed.
    pub fn clear_resolved(&self) -> usize {
        let mut alerts = self.alerts.write();
        let before = alerts.len();
        alerts.retain(|a| !a.is_resolved());
        before - alerts.len()
    }

    pub fn active_count(&self) -> usize {
        self.alerts.read().iter().filter(|a| !a.is_resolved()).count()
    }

    pub fn summary(&self) -> AlertSummary {
        let active = self.list(false);
        AlertSummary {
            active: active.len(),
            critical: active
                .iter()
                .filter(|a| a.severity == AlertSeverity::Critical)
                .count(),
            warning: active
                .iter()
                .filter(|a| a.severity == AlertSeverity::Warning)
                .count(),
            acknowledged: active.iter().filter(|a| a.is_acknowledged()).count(),
            recent: active.into_iter().take(5).collect(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::health::check::ComponentType;
    use crate::health::probe::StaticProbe;
    use std::collections::HashMap;
    use std::sync::Arc;

    fn definition(name: &str, critical: bool) -> CheckDefinition {
        let probe = Arc::new(StaticProbe::healthy());
        let def = CheckDefinition::new(name, name, ComponentType::Custom, probe);
        if critical {
            def.critical()
        } else {
            def
        }
    }

    fn result(name: &str, status: HealthStatus, message: Option<&str>) -> CheckResult {
        CheckResult {
            name: name.to_string(),
            name_ro: name.to_string(),
            component_type: ComponentType::Custom,
            status,
            response_time_ms: 0,
            message: message.map(String::from),
            details: HashMap::new(),
            attempts: 1,
            last_checked: Utc::now(),
        }
    }

    #[test]
    fn test_transition_into_unhealthy_raises_alert() {
        let manager = AlertManager::new(EventBus::default());
        let def = definition("db", true);
        manager.handle_transition(
            &def,
            HealthStatus::Healthy,
            &result("db", HealthStatus::Unhealthy, Some("connection refused")),
        );

        let alerts = manager.list(false);
        assert_eq!(alerts.len(), 1);
        assert_eq!(alerts[0].severity, AlertSeverity::Critical);
        assert_eq!(alerts[0].message, "connection refused");
        assert_eq!(alerts[0].previous_status, HealthStatus::Healthy);
        assert_eq!(alerts[0].status, HealthStatus::Unhealthy);
    }

    #[test]
    fn test_default_message_and_warning_severity() {
        let manager = AlertManager::new(EventBus::default());
        manager.handle_transition(
            &definition("cache", false),
            HealthStatus::Unknown,
            &result("cache", HealthStatus::Unhealthy, None),
        );

        let alert = &manager.list(false)[0];
        assert_eq!(alert.severity, AlertSeverity::Warning);
        assert_eq!(alert.message, "cache is unhealthy");
    }

    #[test]
    fn test_at_most_one_open_alert_per_component() {
        let manager = AlertManager::new(EventBus::default());
        let def = definition("db", false);
        let unhealthy = result("db", HealthStatus::Unhealthy, None);
        manager.handle_transition(&def, HealthStatus::Healthy, &unhealthy);
        manager.handle_transition(&def, HealthStatus::Unknown, &unhealthy);

        assert_eq!(manager.active_count(), 1);
    }

    #[test]
    fn test_recovery_resolves_alert() {
        let manager = AlertManager::new(EventBus::default());
        let mut rx = manager.events.subscribe();
        let def = definition("db", false);
        let down = result("db", HealthStatus::Unhealthy, None);
        manager.handle_transition(&def, HealthStatus::Healthy, &down);
        let up = result("db", HealthStatus::Healthy, None);
        manager.handle_transition(&def, HealthStatus::Unhealthy, &up);

        assert!(manager.list(false).is_empty());
        let all = manager.list(true);
        assert_eq!(all.len(), 1);
        assert!(all[0].resolved_at.is_some());

        assert_eq!(rx.try_recv().unwrap().name(), "health.alert");
        assert_eq!(rx.try_recv().unwrap().name(), "health.resolved");
    }

    #[test]
    fn test_acknowledge() {
        let manager = AlertManager::new(EventBus::default());
        manager.handle_transition(
            &definition("db", false),
            HealthStatus::Healthy,
            &result("db", HealthStatus::Unhealthy, None),
        );
        let id = manager.list(false)[0].id.clone();

        let alert = manager.acknowledge(&id).unwrap();
        assert!(alert.acknowledged_at.is_some());
        assert_eq!(manager.summary().acknowledged, 1);

        let err = manager.acknowledge("does-not-exist").unwrap_err();
        assert_eq!(err.user_message(), "Alert not found");
    }

    #[test]
    fn test_clear_resolved() {
        let manager = AlertManager::new(EventBus::default());
        for name in ["a", "b"] {
            manager.handle_transition(
                &definition(name, false),
                HealthStatus::Healthy,
                &result(name, HealthStatus::Unhealthy, None),
            );
        }
        manager.handle_transition(
            &definition("a", false),
            HealthStatus::Unhealthy,
            &result("a", HealthStatus::Healthy, None),
        );

        assert_eq!(manager.clear_resolved(), 1);
        assert_eq!(manager.list(true).len(), 1);
        assert_eq!(manager.clear_resolved(), 0);
    }

    #[test]
    fn test_summary_counts() {
        let manager = AlertManager::new(EventBus::default());
        for (name, critical) in [("a", true), ("b", false)] {
            manager.handle_transition(
                &definition(name, critical),
                HealthStatus::Healthy,
                &result(name, HealthStatus::Unhealthy, None),
            );
        }

        let summary = manager.summary();
        assert_eq!(summary.active, 2);
        assert_eq!(summary.critical, 1);
        assert_eq!(summary.warning, 1);
        assert_eq!(summary.recent.len(), 2);
        assert_eq!(summary.recent[0].component, "b");
    }

    #[test]
    fn test_unknown_to_healthy_is_noop() {
        let manager = AlertManager::new(EventBus::default());
        manager.handle_transition(
            &definition("a", false),
            HealthStatus::Unknown,
            &result("a", HealthStatus::Healthy, None),
        );
        assert!(manager.list(true).is_empty());
    }
}
