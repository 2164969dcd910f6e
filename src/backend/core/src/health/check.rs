//! Health check definitions and status types.
//!
//! This module provides:
//! - `HealthStatus` enum representing component and aggregate health states
//! - `ComponentType` classifying what a check watches
//! - `Outcome`, the verdict a probe returns
//! - `CheckResult`, the cached last result for one check
//! - `SystemHealth`, the aggregate report produced by `get_health`
//! - Liveness and readiness probe responses
//!
//! # Health Status Semantics
//!
//! - **Healthy**: Component is fully operational
//! - **Degraded**: Only ever an aggregate state; a non-critical check is unhealthy
//! - **Unhealthy**: Component is not operational
//! - **Unknown**: The check has not produced a result yet

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::time::Duration;

use super::system::SystemMetrics;

// ═══════════════════════════════════════════════════════════════════════════════
// Health Status
// ═══════════════════════════════════════════════════════════════════════════════

/// Health status of a component or the entire system.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum HealthStatus {
    /// Component is fully operational
    Healthy,
    /// System is operational but a non-critical component is failing
    Degraded,
    /// Component is not operational
    Unhealthy,
    /// No result has been recorded yet
    #[default]
    Unknown,
}

impl HealthStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Healthy => "healthy",
            Self::Degraded => "degraded",
            Self::Unhealthy => "unhealthy",
            Self::Unknown => "unknown",
        }
    }

    /// Check if the status is healthy.
    pub fn is_healthy(&self) -> bool {
        matches!(self, Self::Healthy)
    }

    /// Convert to HTTP status code.
    pub fn to_http_status(&self) -> u16 {
        match self {
            Self::Healthy | Self::Degraded | Self::Unknown => 200,
            Self::Unhealthy => 503,
        }
    }

    /// Numeric score exported as a gauge.
    pub fn score(&self) -> f64 {
        match self {
            Self::Healthy => 1.0,
            Self::Degraded => 0.5,
            Self::Unhealthy => 0.0,
            Self::Unknown => -1.0,
        }
    }
}

impl std::fmt::Display for HealthStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

// ═══════════════════════════════════════════════════════════════════════════════
// Component Type
// ═══════════════════════════════════════════════════════════════════════════════

/// What kind of dependency a check watches.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ComponentType {
    Database,
    Cache,
    Queue,
    Storage,
    Email,
    /// ANAF tax-authority API
    Anaf,
    /// e-Factura submission endpoint
    EFactura,
    /// SAF-T D406 reporting endpoint
    Saft,
    /// Bank / payment provider API
    Banking,
    /// Any other external HTTP API
    ExternalApi,
    /// Host resources (memory, CPU)
    System,
    Custom,
}

impl ComponentType {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Database => "database",
            Self::Cache => "cache",
            Self::Queue => "queue",
            Self::Storage => "storage",
            Self::Email => "email",
            Self::Anaf => "anaf",
            Self::EFactura => "e_factura",
            Self::Saft => "saft",
            Self::Banking => "banking",
            Self::ExternalApi => "external_api",
            Self::System => "system",
            Self::Custom => "custom",
        }
    }

    /// Whether this type is one of the external API variants.
    pub fn is_external(&self) -> bool {
        matches!(
            self,
            Self::Anaf | Self::EFactura | Self::Saft | Self::Banking | Self::ExternalApi
        )
    }
}

impl std::fmt::Display for ComponentType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for ComponentType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let ty = match s.to_ascii_lowercase().replace('-', "_").as_str() {
            "database" => Self::Database,
            "cache" => Self::Cache,
            "queue" => Self::Queue,
            "storage" => Self::Storage,
            "email" => Self::Email,
            "anaf" => Self::Anaf,
            "e_factura" | "efactura" => Self::EFactura,
            "saft" => Self::Saft,
            "banking" => Self::Banking,
            "external_api" => Self::ExternalApi,
            "system" => Self::System,
            "custom" => Self::Custom,
            other => return Err(format!("unknown component type: {}", other)),
        };
        Ok(ty)
    }
}

// ═══════════════════════════════════════════════════════════════════════════════
// Probe Outcome
// ═══════════════════════════════════════════════════════════════════════════════

/// The verdict a probe returns when it completes.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Outcome {
    pub healthy: bool,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,

    #[serde(default, skip_serializing_if = "HashMap::is_empty")]
    pub details: HashMap<String, serde_json::Value>,
}

impl Outcome {
    pub fn healthy() -> Self {
        Self {
            healthy: true,
            ..Default::default()
        }
    }

    pub fn unhealthy(message: impl Into<String>) -> Self {
        Self {
            healthy: false,
            message: Some(message.into()),
            details: HashMap::new(),
        }
    }

    pub fn with_message(mut self, message: impl Into<String>) -> Self {
        self.message = Some(message.into());
        self
    }

    pub fn with_detail(mut self, key: impl Into<String>, value: impl Serialize) -> Self {
        if let Ok(v) = serde_json::to_value(value) {
            self.details.insert(key.into(), v);
        }
        self
    }
}

// ═══════════════════════════════════════════════════════════════════════════════
// Check Result
// ═══════════════════════════════════════════════════════════════════════════════

/// The last result of one check. Exactly one is cached per check name.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CheckResult {
    pub name: String,

    /// Localized (Romanian) display name
    pub name_ro: String,

    #[serde(rename = "type")]
    pub component_type: ComponentType,

    pub status: HealthStatus,

    /// Wall-clock duration of all attempts and backoffs, in milliseconds
    pub response_time_ms: u64,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,

    #[serde(default, skip_serializing_if = "HashMap::is_empty")]
    pub details: HashMap<String, serde_json::Value>,

    /// Number of probe attempts this result took
    pub attempts: u32,

    pub last_checked: DateTime<Utc>,
}

impl CheckResult {
    pub fn is_healthy(&self) -> bool {
        self.status.is_healthy()
    }

    pub fn response_time(&self) -> Duration {
        Duration::from_millis(self.response_time_ms)
    }
}

// ═══════════════════════════════════════════════════════════════════════════════
// System Health
// ═══════════════════════════════════════════════════════════════════════════════

/// Aggregated health report for the entire system.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SystemHealth {
    /// Overall system status
    pub status: HealthStatus,

    /// Seconds since the monitor was created
    pub uptime_secs: u64,

    pub version: String,

    pub environment: String,

    pub timestamp: DateTime<Utc>,

    /// Results of the checks run for this report
    pub components: Vec<CheckResult>,

    pub metrics: SystemMetrics,
}

impl SystemHealth {
    /// Get the HTTP status code for this report.
    pub fn http_status(&self) -> u16 {
        self.status.to_http_status()
    }

    /// Get a specific component by name.
    pub fn get_component(&self, name: &str) -> Option<&CheckResult> {
        self.components.iter().find(|c| c.name == name)
    }
}

// ═══════════════════════════════════════════════════════════════════════════════
// Readiness and Liveness
// ═══════════════════════════════════════════════════════════════════════════════

/// Liveness probe response.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LivenessResponse {
    /// Whether the service is alive
    pub alive: bool,
    /// Timestamp
    pub timestamp: DateTime<Utc>,
}

impl LivenessResponse {
    /// Create a healthy liveness response.
    pub fn alive() -> Self {
        Self {
            alive: true,
            timestamp: Utc::now(),
        }
    }
}

impl Default for LivenessResponse {
    fn default() -> Self {
        Self::alive()
    }
}

/// Readiness probe response.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReadinessResponse {
    /// Whether the service is ready to accept traffic
    pub ready: bool,
    /// Timestamp
    pub timestamp: DateTime<Utc>,
    /// Reason if not ready
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
}

impl ReadinessResponse {
    /// Create a ready response.
    pub fn ready() -> Self {
        Self {
            ready: true,
            timestamp: Utc::now(),
            reason: None,
        }
    }

    /// Create a not ready response.
    pub fn not_ready(reason: impl Into<String>) -> Self {
        Self {
            ready: false,
            timestamp: Utc::now(),
            reason: Some(reason.into()),
        }
    }

    /// Not ready because a critical component is missing or failing.
    pub fn critical_component_down(name: &str) -> Self {
        Self::not_ready(format!("Critical component {} is not healthy", name))
    }
}

// ═══════════════════════════════════════════════════════════════════════════════
// Tests
// ═══════════════════════════════════════════════════════════════════════════════
