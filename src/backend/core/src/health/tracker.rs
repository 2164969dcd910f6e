//! Status tracker: the cached last result per check.

use dashmap::DashMap;

use super::check::{CheckResult, ComponentType, HealthStatus};

#[derive(Debug, Clone)]
struct Tracked {
    result: CheckResult,
    generation: u64,
}

/// Outcome of [`StatusTracker::record`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Recorded {
    /// The result replaced the cache. `previous` is `Unknown` for the first one.
    Stored { previous: HealthStatus },
    /// An execution that started later already wrote a result.
    Stale,
}

/// Last-result cache keyed by check name.
#[derive(Debug, Default)]
pub struct StatusTracker {
    results: DashMap<String, Tracked>,
}

impl StatusTracker {
    pub fn new() -> Self {
        Self::default()
    }

    /// Store a result unless a newer execution already did.
    pub fn record(&self, result: CheckResult, generation: u64) -> Recorded {
        use dashmap::mapref::entry::Entry;

        match self.results.entry(result.name.clone()) {
            Entry::Occupied(mut entry) => {
                if entry.get().generation > generation {
                    return Recorded::Stale;
                }
                let previous = entry.get().result.status;
                entry.insert(Tracked { result, generation });
                Recorded::Stored { previous }
            }
            Entry::Vacant(entry) => {
                entry.insert(Tracked { result, generation });
                Recorded::Stored {
                    previous: HealthStatus::Unknown,
                }
            }
        }
    }

    pub fn get(&self, name: &str) -> Option<CheckResult> {
        self.results.get(name).map(|t| t.result.clone())
    }

    pub fn status(&self, name: &str) -> HealthStatus {
        self.results
            .get(name)
            .map(|t| t.result.status)
            .unwrap_or_default()
    }

    pub fn by_type(&self, component_type: ComponentType) -> Vec<CheckResult> {
        let mut results: Vec<_> = self
            .results
            .iter()
            .filter(|t| t.result.component_type == component_type)
            .map(|t| t.result.clone())
            .collect();
        results.sort_by(|a, b| a.name.cmp(&b.name));
        results
    }

    pub fn all(&self) -> Vec<CheckResult> {
        let mut results: Vec<_> = self.results.iter().map(|t| t.result.clone()).collect();
        results.sort_by(|a, b| a.name.cmp(&b.name));
        results
    }

    pub fn remove(&self, name: &str) -> Option<CheckResult> {
        self.results.remove(name).map(|(_, t)| t.result)
    }
}

/// Overall status for a set of results.
///
/// Unhealthy if any critical check is unhealthy, degraded if any other check
/// is unhealthy, healthy otherwise (including the empty set).
pub fn overall_status<'a>(
    results: impl IntoIterator<Item = &'a CheckResult>,
    is_critical: impl Fn(&str) -> bool,
) -> HealthStatus {
    let mut status = HealthStatus::Healthy;
    for result in results {
        if result.status == HealthStatus::Unhealthy {
            if is_critical(&result.name) {
                return HealthStatus::Unhealthy;
            }
            status = HealthStatus::Degraded;
        }
    }
    status
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use std::collections::HashMap;

    fn result(name: &str, status: HealthStatus) -> CheckResult {
        CheckResult {
            name: name.to_string(),
            name_ro: name.to_string(),
            component_type: ComponentType::Database,
            status,
            response_time_ms: 1,
            message: None,
            details: HashMap::new(),
            attempts: 1,
            last_checked: Utc::now(),
        }
    }

    #[test]
    fn test_first_record_has_unknown_previous() {
        let tracker = StatusTracker::new();
        let recorded = tracker.record(result("db", HealthStatus::Healthy), 1);
        assert_eq!(
            recorded,
            Recorded::Stored {
                previous: HealthStatus::Unknown
            }
        );
        assert_eq!(tracker.status("db"), HealthStatus::Healthy);
    }

    #[test]
    fn test_stale_generation_rejected() {
        let tracker = StatusTracker::new();
        tracker.record(result("db", HealthStatus::Unhealthy), 5);

        assert_eq!(tracker.record(result("db", HealthStatus::Healthy), 4), Recorded::Stale);
        assert_eq!(tracker.status("db"), HealthStatus::Unhealthy);

        assert_eq!(
            tracker.record(result("db", HealthStatus::Healthy), 6),
            Recorded::Stored {
                previous: HealthStatus::Unhealthy
            }
        );
    }

    #[test]
    fn test_overall_status() {
        let critical = |name: &str| name == "db";

        assert_eq!(overall_status(&[] as &[CheckResult], critical), HealthStatus::Healthy);

        let degraded = [
            result("db", HealthStatus::Healthy),
            result("cache", HealthStatus::Unhealthy),
        ];
        assert_eq!(overall_status(&degraded, critical), HealthStatus::Degraded);

        let unhealthy = [
            result("cache", HealthStatus::Unhealthy),
            result("db", HealthStatus::Unhealthy),
        ];
        assert_eq!(overall_status(&unhealthy, critical), HealthStatus::Unhealthy);
    }

    #[test]
    fn test_remove() {
        let tracker = StatusTracker::new();
        tracker.record(result("db", HealthStatus::Healthy), 1);
        assert!(tracker.remove("db").is_some());
        assert!(tracker.get("db").is_none());
        assert_eq!(tracker.status("db"), HealthStatus::Unknown);
    }
}
