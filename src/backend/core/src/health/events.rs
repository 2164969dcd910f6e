//! Health event stream.

use chrono::{DateTime, Utc};
use serde::Serialize;
use tokio::sync::broadcast;

use super::alerts::Alert;
use super::check::HealthStatus;

/// Events emitted by the health monitor.
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "event", content = "data")]
pub enum HealthEvent {
    /// A check finished executing.
    #[serde(rename = "health.checked")]
    Checked {
        name: String,
        status: HealthStatus,
        response_time_ms: u64,
        timestamp: DateTime<Utc>,
    },

    #[serde(rename = "health.alert")]
    AlertRaised(Alert),

    #[serde(rename = "health.resolved")]
    AlertResolved { alert_id: String, component: String },

    #[serde(rename = "health.alert.acknowledged")]
    AlertAcknowledged { alert_id: String },

    #[serde(rename = "health.check.enabled")]
    CheckEnabled { name: String },

    #[serde(rename = "health.check.disabled")]
    CheckDisabled { name: String },

    #[serde(rename = "health.check.updated")]
    CheckUpdated { name: String, interval_ms: u64 },
}

impl HealthEvent {
    /// Wire name of the event.
    pub fn name(&self) -> &'static str {
        match self {
            Self::Checked { .. } => "health.checked",
            Self::AlertRaised(_) => "health.alert",
            Self::AlertResolved { .. } => "health.resolved",
            Self::AlertAcknowledged { .. } => "health.alert.acknowledged",
            Self::CheckEnabled { .. } => "health.check.enabled",
            Self::CheckDisabled { .. } => "health.check.disabled",
            Self::CheckUpdated { .. } => "health.check.updated",
        }
    }
}

/// Broadcast fan-out for [`HealthEvent`]s. Publishing never blocks; slow
/// subscribers observe a lag error and skip ahead.
#[derive(Debug, Clone)]
pub struct EventBus {
    sender: broadcast::Sender<HealthEvent>,
}

impl EventBus {
    pub fn new(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity.max(1));
        Self { sender }
    }

    pub fn publish(&self, event: HealthEvent) {
        // No subscribers is not an error.
        let _ = self.sender.send(event);
    }

    pub fn subscribe(&self) -> broadcast::Receiver<HealthEvent> {
        self.sender.subscribe()
    }

    pub fn subscriber_count(&self) -> usize {
        self.sender.receiver_count()
    }
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new(256)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_publish_without_subscribers() {
        let bus = EventBus::default();
        bus.publish(HealthEvent::CheckEnabled { name: "db".into() });
        assert_eq!(bus.subscriber_count(), 0);
    }

    #[tokio::test]
    async fn test_subscriber_receives_events() {
        let bus = EventBus::default();
        let mut rx = bus.subscribe();
        bus.publish(HealthEvent::CheckDisabled { name: "db".into() });

        let event = rx.recv().await.unwrap();
        assert_eq!(event.name(), "health.check.disabled");
    }

    #[test]
    fn test_event_serialization() {
        let event = HealthEvent::CheckUpdated {
            name: "disk".into(),
            interval_ms: 1000,
        };
        let json = serde_json::to_value(&event).unwrap();
        assert_eq!(json["event"], "health.check.updated");
        assert_eq!(json["data"]["interval_ms"], 1000);
    }
}
