//! System resource sampling and request metrics aggregation.

use std::collections::VecDeque;
use std::path::PathBuf;
use std::sync::atomic::{AtomicI64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use sysinfo::{Disks, Networks, ProcessRefreshKind, ProcessesToUpdate, System};

use super::buffer::CompactingPush;

// ============================================================================
// Metric snapshots
// ============================================================================

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CpuMetrics {
    /// Global utilisation across all cores, in percent.
    pub usage: f64,
    pub cores: usize,
    pub load_average: [f64; 3],
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct MemoryMetrics {
    pub used: u64,
    pub total: u64,
    pub free: u64,
    pub usage_percent: f64,
    /// Resident set size of this process.
    pub heap_used: u64,
    /// Virtual size of this process.
    pub heap_total: u64,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DiskMetrics {
    pub used: u64,
    pub total: u64,
    pub free: u64,
    pub usage_percent: f64,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct NetworkMetrics {
    pub bytes_in: u64,
    pub bytes_out: u64,
    pub connections_active: u64,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct LatencyPercentiles {
    pub p50_ms: f64,
    pub p95_ms: f64,
    pub p99_ms: f64,
    pub max_ms: f64,
}

/// Request statistics.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RequestMetrics {
    pub total: u64,
    pub successful: u64,
    pub failed: u64,
    pub average_response_time_ms: f64,
    pub requests_per_minute: u64,
    /// Failed / total as a percentage, 0 when there are no requests.
    pub error_rate: f64,
    pub latency: LatencyPercentiles,
}

/// Host resources as seen by a [`MetricsSource`].
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ResourceSnapshot {
    pub cpu: CpuMetrics,
    pub memory: MemoryMetrics,
    pub disk: DiskMetrics,
    pub network: NetworkMetrics,
}

/// Full metrics document returned by the health API.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SystemMetrics {
    pub cpu: CpuMetrics,
    pub memory: MemoryMetrics,
    pub disk: DiskMetrics,
    pub network: NetworkMetrics,
    pub requests: RequestMetrics,
}

fn percent(part: u64, whole: u64) -> f64 {
    if whole == 0 {
        0.0
    } else {
        part as f64 / whole as f64 * 100.0
    }
}

// ============================================================================
// Metrics sources
// ============================================================================

/// Provider of host resource figures.
pub trait MetricsSource: Send + Sync {
    fn snapshot(&self) -> ResourceSnapshot;
}

/// Fixed snapshot, used on hosts without OS sampling and in tests.
#[derive(Debug, Clone, Default)]
pub struct StaticMetricsSource {
    snapshot: Arc<Mutex<ResourceSnapshot>>,
}

impl StaticMetricsSource {
    pub fn new(snapshot: ResourceSnapshot) -> Self {
        Self {
            snapshot: Arc::new(Mutex::new(snapshot)),
        }
    }

    /// Snapshot with the given memory and disk usage percentages.
    pub fn with_usage(memory_percent: f64, disk_percent: f64) -> Self {
        const TOTAL: u64 = 1_000_000;
        let used = |p: f64| (TOTAL as f64 * p / 100.0) as u64;
        Self::new(ResourceSnapshot {
            memory: MemoryMetrics {
                used: used(memory_percent),
                total: TOTAL,
                free: TOTAL - used(memory_percent),
                usage_percent: memory_percent,
                ..Default::default()
            },
            disk: DiskMetrics {
                used: used(disk_percent),
                total: TOTAL,
                free: TOTAL - used(disk_percent),
                usage_percent: disk_percent,
            },
            ..Default::default()
        })
    }

    pub fn set(&self, snapshot: ResourceSnapshot) {
        *self.snapshot.lock() = snapshot;
    }
}

impl MetricsSource for StaticMetricsSource {
    fn snapshot(&self) -> ResourceSnapshot {
        self.snapshot.lock().clone()
    }
}

/// Samples the running host through `sysinfo`.
#[derive(Debug)]
pub struct OsMetricsSource {
    disk_path: PathBuf,
    system: Mutex<System>,
    disks: Mutex<Disks>,
    networks: Mutex<Networks>,
}

impl Default for OsMetricsSource {
    fn default() -> Self {
        Self::new("/")
    }
}

impl OsMetricsSource {
    pub fn new(disk_path: impl Into<PathBuf>) -> Self {
        Self {
            disk_path: disk_path.into(),
            system: Mutex::new(System::new_all()),
            disks: Mutex::new(Disks::new_with_refreshed_list()),
            networks: Mutex::new(Networks::new_with_refreshed_list()),
        }
    }

    fn cpu_and_memory(&self) -> (CpuMetrics, MemoryMetrics) {
        let mut sys = self.system.lock();
        sys.refresh_cpu_usage();
        sys.refresh_memory();

        let (heap_used, heap_total) = match sysinfo::get_current_pid() {
            Ok(pid) => {
                sys.refresh_processes_specifics(
                    ProcessesToUpdate::Some(&[pid]),
                    true,
                    ProcessRefreshKind::new().with_memory(),
                );
                sys.process(pid)
                    .map(|p| (p.memory(), p.virtual_memory()))
                    .unwrap_or_default()
            }
            Err(_) => (0, 0),
        };

        let load = System::load_average();
        let cores = match sys.cpus().len() {
            0 => std::thread::available_parallelism().map(|n| n.get()).unwrap_or(1),
            n => n,
        };
        let cpu = CpuMetrics {
            usage: f64::from(sys.global_cpu_usage()),
            cores,
            load_average: [load.one, load.five, load.fifteen],
        };

        let total = sys.total_memory();
        let used = sys.used_memory();
        let memory = MemoryMetrics {
            used,
            total,
            free: total.saturating_sub(used),
            usage_percent: percent(used, total),
            heap_used,
            heap_total,
        };
        (cpu, memory)
    }

    /// Figures for the disk mounted closest to `disk_path`.
    fn disk(&self) -> DiskMetrics {
        let mut disks = self.disks.lock();
        disks.refresh_list();
        let Some(disk) = disks
            .iter()
            .filter(|d| self.disk_path.starts_with(d.mount_point()))
            .max_by_key(|d| d.mount_point().as_os_str().len())
        else {
            return DiskMetrics::default();
        };

        let total = disk.total_space();
        let free = disk.available_space();
        let used = total.saturating_sub(free);
        DiskMetrics {
            used,
            total,
            free,
            usage_percent: percent(used, total),
        }
    }

    fn network(&self) -> NetworkMetrics {
        let mut networks = self.networks.lock();
        networks.refresh();
        networks
            .iter()
            .filter(|(iface, _)| iface.as_str() != "lo")
            .fold(NetworkMetrics::default(), |mut acc, (_, data)| {
                acc.bytes_in += data.total_received();
                acc.bytes_out += data.total_transmitted();
                acc
            })
    }
}

impl MetricsSource for OsMetricsSource {
    fn snapshot(&self) -> ResourceSnapshot {
        let (cpu, memory) = self.cpu_and_memory();
        ResourceSnapshot {
            cpu,
            memory,
            disk: self.disk(),
            network: self.network(),
        }
    }
}

// ============================================================================
// Aggregator
// ============================================================================

#[derive(Debug, Clone, Copy)]
struct RequestSample {
    timestamp: DateTime<Utc>,
    success: bool,
    response_time_ms: f64,
}

/// Collects request samples and combines them with host resources.
pub struct MetricsAggregator {
    source: Arc<dyn MetricsSource>,
    samples: Mutex<VecDeque<RequestSample>>,
    capacity: usize,
    window: Duration,
    connections: AtomicI64,
}

impl MetricsAggregator {
    pub fn new(source: Arc<dyn MetricsSource>, capacity: usize, window: Duration) -> Self {
        Self {
            source,
            samples: Mutex::new(VecDeque::with_capacity(capacity.min(1024))),
            capacity,
            window,
            connections: AtomicI64::new(0),
        }
    }

    pub fn source(&self) -> Arc<dyn MetricsSource> {
        Arc::clone(&self.source)
    }

    pub fn record_request(&self, success: bool, response_time_ms: f64) {
        self.record_request_at(Utc::now(), success, response_time_ms);
    }

    pub fn record_request_at(
        &self,
        timestamp: DateTime<Utc>,
        success: bool,
        response_time_ms: f64,
    ) {
        let discarded = self.samples.lock().push_compacting(
            RequestSample {
                timestamp,
                success,
                response_time_ms,
            },
            self.capacity,
        );
        if discarded > 0 {
            tracing::trace!(discarded, "Compacted request samples");
        }
    }

    /// Track an in-flight connection until the guard is dropped.
    pub fn connection_guard(self: &Arc<Self>) -> ConnectionGuard {
        self.connections.fetch_add(1, Ordering::Relaxed);
        ConnectionGuard {
            aggregator: Arc::clone(self),
        }
    }

    pub fn sample_count(&self) -> usize {
        self.samples.lock().len()
    }

    pub fn get_metrics(&self) -> SystemMetrics {
        self.get_metrics_at(Utc::now())
    }

    pub fn get_metrics_at(&self, now: DateTime<Utc>) -> SystemMetrics {
        let resources = self.source.snapshot();
        let mut network = resources.network;
        network.connections_active = self.connections.load(Ordering::Relaxed).max(0) as u64;

        SystemMetrics {
            cpu: resources.cpu,
            memory: resources.memory,
            disk: resources.disk,
            network,
            requests: self.request_metrics_at(now),
        }
    }

    /// Totals and error rate cover every retained sample; throughput, average
    /// and latency percentiles cover the trailing window only.
    pub fn request_metrics_at(&self, now: DateTime<Utc>) -> RequestMetrics {
        let window =
            chrono::Duration::from_std(self.window).unwrap_or(chrono::Duration::seconds(60));
        let cutoff = now - window;

        let samples = self.samples.lock();
        let total = samples.len() as u64;
        let successful = samples.iter().filter(|s| s.success).count() as u64;
        let mut recent: Vec<f64> = samples
            .iter()
            .filter(|s| s.timestamp > cutoff)
            .map(|s| s.response_time_ms)
            .collect();
        drop(samples);

        let failed = total - successful;
        let average = if recent.is_empty() {
            0.0
        } else {
            recent.iter().sum::<f64>() / recent.len() as f64
        };

        recent.sort_by(|a, b| a.total_cmp(b));
        let latency = LatencyPercentiles {
            p50_ms: percentile(&recent, 50.0),
            p95_ms: percentile(&recent, 95.0),
            p99_ms: percentile(&recent, 99.0),
            max_ms: recent.last().copied().unwrap_or(0.0),
        };

        RequestMetrics {
            total,
            successful,
            failed,
            average_response_time_ms: average,
            requests_per_minute: (recent.len() as f64 * 60.0 / self.window.as_secs_f64().max(1.0))
                .round() as u64,
            error_rate: percent(failed, total),
            latency,
        }
    }
}

/// Nearest-rank percentile over sorted values.
fn percentile(sorted: &[f64], p: f64) -> f64 {
    if sorted.is_empty() {
        return 0.0;
    }
    let rank = (p / 100.0 * sorted.len() as f64).ceil() as usize;
    sorted[rank.clamp(1, sorted.len()) - 1]
}

pub struct ConnectionGuard {
    aggregator: Arc<MetricsAggregator>,
}

impl Drop for ConnectionGuard {
    fn drop(&mut self) {
        self.aggregator.connections.fetch_sub(1, Ordering::Relaxed);
    }
}
