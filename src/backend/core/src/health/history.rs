//! History store: snapshots appended by every aggregate health evaluation.

use std::collections::VecDeque;

use chrono::{DateTime, Utc};
use parking_lot::RwLock;
use serde::{Deserialize, Serialize};

use super::buffer::CompactingPush;
use super::check::{HealthStatus, SystemHealth};
use super::system::SystemMetrics;

/// Per-check status inside a history entry.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CheckSnapshot {
    pub name: String,
    pub status: HealthStatus,
    pub response_time_ms: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HistoryEntry {
    pub timestamp: DateTime<Utc>,
    pub status: HealthStatus,
    pub checks: Vec<CheckSnapshot>,
    pub metrics: SystemMetrics,
}

impl From<&SystemHealth> for HistoryEntry {
    fn from(health: &SystemHealth) -> Self {
        Self {
            timestamp: health.timestamp,
            status: health.status,
            checks: health
                .components
                .iter()
                .map(|c| CheckSnapshot {
                    name: c.name.clone(),
                    status: c.status,
                    response_time_ms: c.response_time_ms,
                })
                .collect(),
            metrics: health.metrics.clone(),
        }
    }
}

/// Uptime over the entries since a point in time.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UptimeStats {
    /// Percentage of evaluations whose aggregate status was healthy
    pub uptime: f64,
    pub total_checks: usize,
    pub healthy_checks: usize,
    pub degraded_checks: usize,
    pub unhealthy_checks: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub since: Option<DateTime<Utc>>,
}

/// Bounded, append-only list of [`HistoryEntry`].
pub struct HistoryStore {
    entries: RwLock<VecDeque<HistoryEntry>>,
    capacity: usize,
}

impl HistoryStore {
    pub const DEFAULT_LIMIT: usize = 100;

    pub fn new(capacity: usize) -> Self {
        Self {
            entries: RwLock::new(VecDeque::new()),
            capacity,
        }
    }

    pub fn append(&self, entry: HistoryEntry) {
        let discarded = self.entries.write().push_compacting(entry, self.capacity);
        if discarded > 0 {
            tracing::debug!(discarded, "Compacted health history");
        }
    }

    /// Entries newer than or equal to `since`, newest first, at most `limit`.
    pub fn query(&self, since: Option<DateTime<Utc>>, limit: usize) -> Vec<HistoryEntry> {
        self.entries
            .read()
            .iter()
            .rev()
            .filter(|e| since.map_or(true, |s| e.timestamp >= s))
            .take(limit)
            .cloned()
            .collect()
    }

    /// Only healthy evaluations count as up. With no entries the uptime is 100%.
    pub fn uptime(&self, since: Option<DateTime<Utc>>) -> UptimeStats {
        let entries = self.entries.read();
        let mut stats = UptimeStats {
            uptime: 100.0,
            total_checks: 0,
            healthy_checks: 0,
            degraded_checks: 0,
            unhealthy_checks: 0,
            since,
        };

        for entry in entries
            .iter()
            .filter(|e| since.map_or(true, |s| e.timestamp >= s))
        {
            stats.total_checks += 1;
            match entry.status {
                HealthStatus::Healthy => stats.healthy_checks += 1,
                HealthStatus::Degraded => stats.degraded_checks += 1,
                HealthStatus::Unhealthy => stats.unhealthy_checks += 1,
                HealthStatus::Unknown => {}
            }
        }

        if stats.total_checks > 0 {
            stats.uptime = stats.healthy_checks as f64 / stats.total_checks as f64 * 100.0;
        }
        stats
    }

    pub fn len(&self) -> usize {
        self.entries.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.read().is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    fn entry(status: HealthStatus, timestamp: DateTime<Utc>) -> HistoryEntry {
        HistoryEntry {
            timestamp,
            status,
            checks: Vec::new(),
            metrics: SystemMetrics::default(),
        }
    }

    #[test]
    fn test_empty_uptime_is_full() {
        let store = HistoryStore::new(1000);
        let stats = store.uptime(None);
        assert_eq!(stats.uptime, 100.0);
        assert_eq!(stats.total_checks, 0);
    }

    #[test]
    fn test_uptime_counts_only_healthy() {
        let store = HistoryStore::new(1000);
        let now = Utc::now();
        store.append(entry(HealthStatus::Healthy, now));
        store.append(entry(HealthStatus::Degraded, now));
        store.append(entry(HealthStatus::Unhealthy, now));
        store.append(entry(HealthStatus::Healthy, now));

        let stats = store.uptime(None);
        assert_eq!(stats.total_checks, 4);
        assert_eq!(stats.unhealthy_checks, 1);
        assert_eq!(stats.degraded_checks, 1);
        assert_eq!(stats.uptime, 50.0);
    }

    #[test]
    fn test_query_newest_first_with_since_and_limit() {
        let store = HistoryStore::new(1000);
        let now = Utc::now();
        for i in (0..5).rev() {
            store.append(entry(HealthStatus::Healthy, now - Duration::minutes(i)));
        }

        assert!(store.query(Some(now + Duration::days(1)), 100).is_empty());

        let recent = store.query(Some(now - Duration::seconds(150)), 10);
        assert_eq!(recent.len(), 3);
        assert_eq!(recent[0].timestamp, now);

        assert_eq!(store.query(None, 2).len(), 2);
        let since_stats = store.uptime(Some(now - Duration::seconds(90)));
        assert_eq!(since_stats.total_checks, 2);
    }

    #[test]
    fn test_bounded_at_capacity() {
        let store = HistoryStore::new(1000);
        let now = Utc::now();
        for _ in 0..1001 {
            store.append(entry(HealthStatus::Healthy, now));
        }
        assert_eq!(store.len(), 500);
    }

    #[test]
    fn test_single_slot_store_always_holds_latest() {
        let store = HistoryStore::new(1);
        let now = Utc::now();
        store.append(entry(HealthStatus::Healthy, now));
        store.append(entry(HealthStatus::Unhealthy, now));

        let entries = store.query(None, 10);
        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].status, HealthStatus::Unhealthy);
    }
}
