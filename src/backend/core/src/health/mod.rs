//! Health monitoring engine.
//!
//! Checks are registered in a [`CheckRegistry`], fired by per-check timers,
//! executed with timeout and retry, cached in a [`StatusTracker`], and turned
//! into alerts on status transitions. [`HealthMonitor`] owns all of it and
//! exposes the query and mutation surface; [`routes`] binds it to HTTP.

mod alerts;
mod buffer;
mod check;
pub mod defaults;
mod events;
mod executor;
mod history;
mod monitor;
mod probe;
mod registry;
pub mod routes;
mod scheduler;
mod system;
mod tracker;

pub use alerts::{Alert, AlertManager, AlertSeverity, AlertSummary};
pub use check::*;
pub use events::{EventBus, HealthEvent};
pub use executor::{Execution, Executor};
pub use history::{CheckSnapshot, HistoryEntry, HistoryStore, UptimeStats};
pub use monitor::HealthMonitor;
pub use probe::{
    probe_fn, DiskProbe, FnProbe, HttpProbe, MemoryProbe, ProcessProbe, Probe, StaticProbe,
};
pub use registry::{CheckDefinition, CheckRegistry};
pub use routes::{build_router, health_routes, ApiResponse, AppState};
pub use scheduler::Scheduler;
pub use system::{
    ConnectionGuard, CpuMetrics, DiskMetrics, LatencyPercentiles, MemoryMetrics, MetricsAggregator,
    MetricsSource, NetworkMetrics, OsMetricsSource, RequestMetrics, ResourceSnapshot,
    StaticMetricsSource, SystemMetrics,
};
pub use tracker::{overall_status, Recorded, StatusTracker};
