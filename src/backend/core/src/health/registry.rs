//! Check registry: the set of named check definitions.

use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use parking_lot::RwLock;
use serde::Serialize;

use super::check::ComponentType;
use super::probe::Probe;
use crate::error::{Result, SentinelError};

/// A registered health check.
#[derive(Clone, Serialize)]
pub struct CheckDefinition {
    /// Unique key
    pub name: String,

    /// Localized (Romanian) display name
    pub name_ro: String,

    #[serde(rename = "type")]
    pub component_type: ComponentType,

    #[serde(skip)]
    pub probe: Arc<dyn Probe>,

    #[serde(with = "humantime_serde")]
    pub interval: Duration,

    #[serde(with = "humantime_serde")]
    pub timeout: Duration,

    /// Total attempts per execution, at least 1
    pub retries: u32,

    /// An unhealthy critical check makes the whole system unhealthy
    pub critical: bool,

    pub enabled: bool,
}

impl CheckDefinition {
    pub const DEFAULT_INTERVAL: Duration = Duration::from_secs(30);
    pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(5);

    pub fn new(
        name: impl Into<String>,
        name_ro: impl Into<String>,
        component_type: ComponentType,
        probe: Arc<dyn Probe>,
    ) -> Self {
        Self {
            name: name.into(),
            name_ro: name_ro.into(),
            component_type,
            probe,
            interval: Self::DEFAULT_INTERVAL,
            timeout: Self::DEFAULT_TIMEOUT,
            retries: 1,
            critical: false,
            enabled: true,
        }
    }

    pub fn with_interval(mut self, interval: Duration) -> Self {
        self.interval = interval;
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn with_retries(mut self, retries: u32) -> Self {
        self.retries = retries;
        self
    }

    pub fn critical(mut self) -> Self {
        self.critical = true;
        self
    }

    pub fn disabled(mut self) -> Self {
        self.enabled = false;
        self
    }

    /// Reject definitions the scheduler and executor cannot run.
    pub fn validate(&self) -> Result<()> {
        if self.name.trim().is_empty() {
            return Err(SentinelError::invalid_check(&self.name, "name must not be empty"));
        }
        if self.interval.is_zero() {
            return Err(SentinelError::invalid_check(&self.name, "interval must be positive"));
        }
        if self.timeout.is_zero() {
            return Err(SentinelError::invalid_check(&self.name, "timeout must be positive"));
        }
        if self.retries == 0 {
            return Err(SentinelError::invalid_check(&self.name, "retries must be at least 1"));
        }
        Ok(())
    }
}

impl fmt::Debug for CheckDefinition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CheckDefinition")
            .field("name", &self.name)
            .field("component_type", &self.component_type)
            .field("interval", &self.interval)
            .field("timeout", &self.timeout)
            .field("retries", &self.retries)
            .field("critical", &self.critical)
            .field("enabled", &self.enabled)
            .finish_non_exhaustive()
    }
}

/// Name-keyed store of check definitions, iterated in name order.
#[derive(Default)]
pub struct CheckRegistry {
    checks: RwLock<BTreeMap<String, CheckDefinition>>,
}

impl CheckRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert or replace a definition. Returns the replaced one.
    pub fn insert(&self, definition: CheckDefinition) -> Result<Option<CheckDefinition>> {
        definition.validate()?;
        Ok(self
            .checks
            .write()
            .insert(definition.name.clone(), definition))
    }

    pub fn remove(&self, name: &str) -> Option<CheckDefinition> {
        self.checks.write().remove(name)
    }

    pub fn get(&self, name: &str) -> Option<CheckDefinition> {
        self.checks.read().get(name).cloned()
    }

    pub fn contains(&self, name: &str) -> bool {
        self.checks.read().contains_key(name)
    }

    pub fn is_critical(&self, name: &str) -> bool {
        self.checks
            .read()
            .get(name)
            .map(|d| d.critical)
            .unwrap_or(false)
    }

    /// Snapshot of all definitions in name order.
    pub fn list(&self) -> Vec<CheckDefinition> {
        self.checks.read().values().cloned().collect()
    }

    pub fn enabled(&self) -> Vec<CheckDefinition> {
        self.checks
            .read()
            .values()
            .filter(|d| d.enabled)
            .cloned()
            .collect()
    }

    /// Set the enabled flag. Returns whether it changed.
    pub fn set_enabled(&self, name: &str, enabled: bool) -> Result<bool> {
        let mut checks = self.checks.write();
        let definition = checks
            .get_mut(name)
            .ok_or_else(|| SentinelError::check_not_found(name))?;
        let changed = definition.enabled != enabled;
        definition.enabled = enabled;
        Ok(changed)
    }

    pub fn set_interval(&self, name: &str, interval: Duration) -> Result<CheckDefinition> {
        if interval.is_zero() {
            return Err(SentinelError::invalid_check(name, "interval must be positive"));
        }
        let mut checks = self.checks.write();
        let definition = checks
            .get_mut(name)
            .ok_or_else(|| SentinelError::check_not_found(name))?;
        definition.interval = interval;
        Ok(definition.clone())
    }

    pub fn len(&self) -> usize {
        self.checks.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.checks.read().is_empty()
    }
}
