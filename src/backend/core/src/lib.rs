#![allow(clippy::result_large_err)]
//! # Sentinel Core
//!
//! In-process health monitoring for the ERP backend.
//!
//! ## Architecture
//!
//! - **Check Registry**: Named check definitions with interval, timeout, retries and criticality
//! - **Scheduler**: One Tokio timer task per enabled check
//! - **Executor**: Timeout race and retry loop around each probe
//! - **Status Tracker**: Last result per check and aggregate status
//! - **Alert Manager**: Alerts opened and resolved by status transitions
//! - **Metrics Aggregator**: Host resources plus request samples
//! - **History Store**: Bounded snapshots and uptime statistics
//! - **Telemetry**: Structured logging and Prometheus metrics

pub mod config;
pub mod error;
pub mod health;
pub mod middleware;
pub mod telemetry;

pub use error::{ErrorCode, ErrorDetails, ErrorSeverity, Result, SentinelError};

/// Re-export commonly used types
pub mod prelude {
    pub use crate::config::{Config, HealthEngineConfig};
    pub use crate::error::{ErrorCode, Result, SentinelError};
    pub use crate::health::{
        Alert, CheckDefinition, CheckResult, ComponentType, HealthEvent, HealthMonitor,
        HealthStatus, Outcome, Probe, SystemHealth,
    };
}
