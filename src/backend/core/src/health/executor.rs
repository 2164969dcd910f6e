//! Check executor: timeout race and retry loop around a probe.

use std::any::Any;
use std::panic::AssertUnwindSafe;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use futures::FutureExt;
use tokio::time::Instant;
use tracing::{instrument, warn};

use super::check::{CheckResult, HealthStatus, Outcome};
use super::registry::CheckDefinition;

/// Result of one execution, tagged with the generation it started in.
#[derive(Debug, Clone)]
pub struct Execution {
    pub result: CheckResult,
    pub generation: u64,
}

/// Runs probes with a per-attempt timeout and a fixed backoff between
/// failed attempts.
pub struct Executor {
    backoff: Duration,
    generation: AtomicU64,
}

impl Executor {
    pub const DEFAULT_BACKOFF: Duration = Duration::from_millis(500);

    pub fn new(backoff: Duration) -> Self {
        Self {
            backoff,
            generation: AtomicU64::new(0),
        }
    }

    /// Execute a check.
    ///
    /// Only a probe error or a timeout consumes an attempt. A probe that
    /// resolves, healthy or not, ends the loop. The response time spans every
    /// attempt and backoff.
    #[instrument(skip(self, definition), fields(check = %definition.name))]
    pub async fn execute(&self, definition: &CheckDefinition) -> Execution {
        let generation = self.generation.fetch_add(1, Ordering::SeqCst) + 1;
        let started = Instant::now();
        let max_attempts = definition.retries.max(1);

        let mut attempts = 0;
        let verdict = loop {
            attempts += 1;
            match attempt(definition).await {
                Ok(outcome) => break Ok(outcome),
                Err(error) => {
                    warn!(attempt = attempts, error = %error, "Health probe attempt failed");
                    if attempts >= max_attempts {
                        break Err(error);
                    }
                    tokio::time::sleep(self.backoff).await;
                }
            }
        };

        let response_time_ms = started.elapsed().as_millis() as u64;
        let (status, message, details) = match verdict {
            Ok(Outcome {
                healthy,
                message,
                details,
            }) => {
                let status = if healthy {
                    HealthStatus::Healthy
                } else {
                    HealthStatus::Unhealthy
                };
                (status, message, details)
            }
            Err(error) => (HealthStatus::Unhealthy, Some(error), Default::default()),
        };

        Execution {
            result: CheckResult {
                name: definition.name.clone(),
                name_ro: definition.name_ro.clone(),
                component_type: definition.component_type,
                status,
                response_time_ms,
                message,
                details,
                attempts,
                last_checked: Utc::now(),
            },
            generation,
        }
    }
}

impl Default for Executor {
    fn default() -> Self {
        Self::new(Self::DEFAULT_BACKOFF)
    }
}

/// One probe call raced against the check timeout. The probe future is
/// dropped when the timeout wins.
async fn attempt(definition: &CheckDefinition) -> Result<Outcome, String> {
    let probe = Arc::clone(&definition.probe);
    let call = AssertUnwindSafe(async move { probe.check().await }).catch_unwind();

    match tokio::time::timeout(definition.timeout, call).await {
        Err(_) => Err(format!(
            "Health check timed out after {}ms",
            definition.timeout.as_millis()
        )),
        Ok(Err(panic)) => Err(format!("Health probe panicked: {}", panic_message(&*panic))),
        Ok(Ok(Err(error))) => Err(format!("{error:#}")),
        Ok(Ok(Ok(outcome))) => Ok(outcome),
    }
}

fn panic_message(panic: &(dyn Any + Send)) -> &str {
    if let Some(s) = panic.downcast_ref::<&'static str>() {
        s
    } else if let Some(s) = panic.downcast_ref::<String>() {
        s.as_str()
    } else {
        "unknown panic"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::health::check::ComponentType;
    use crate::health::probe::{probe_fn, Probe, StaticProbe};
    use std::sync::atomic::AtomicU32;

    fn definition(probe: Arc<dyn Probe>) -> CheckDefinition {
        CheckDefinition::new("probe", "Probe", ComponentType::Custom, probe)
    }

    /// Fails until `succeed_on`, counting calls.
    fn flaky(succeed_on: u32, calls: Arc<AtomicU32>) -> Arc<dyn Probe> {
        probe_fn(move || {
            let calls = Arc::clone(&calls);
            async move {
                let n = calls.fetch_add(1, Ordering::SeqCst) + 1;
                if n >= succeed_on {
                    Ok(Outcome::healthy())
                } else {
                    Err(anyhow::anyhow!("attempt {n} failed"))
                }
            }
        })
    }

    #[tokio::test(start_paused = true)]
    async fn test_retry_after_error_then_success() {
        let calls = Arc::new(AtomicU32::new(0));
        let def = definition(flaky(2, calls.clone())).with_retries(2);

        let execution = Executor::default().execute(&def).await;

        assert_eq!(execution.result.status, HealthStatus::Healthy);
        assert_eq!(execution.result.attempts, 2);
        assert_eq!(calls.load(Ordering::SeqCst), 2);
        assert!(execution.result.response_time_ms >= 500);
    }

    #[tokio::test(start_paused = true)]
    async fn test_explicit_unhealthy_is_not_retried() {
        let calls = Arc::new(AtomicU32::new(0));
        let counter = calls.clone();
        let probe = probe_fn(move || {
            let counter = Arc::clone(&counter);
            async move {
                counter.fetch_add(1, Ordering::SeqCst);
                Ok::<_, anyhow::Error>(Outcome::unhealthy("disk full"))
            }
        });
        let def = definition(probe).with_retries(3);

        let execution = Executor::default().execute(&def).await;

        assert_eq!(execution.result.status, HealthStatus::Unhealthy);
        assert_eq!(execution.result.message.as_deref(), Some("disk full"));
        assert_eq!(execution.result.attempts, 1);
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_timeout_consumes_attempts() {
        let probe = probe_fn(|| async {
            tokio::time::sleep(Duration::from_secs(10)).await;
            Ok::<_, anyhow::Error>(Outcome::healthy())
        });
        let def = definition(probe)
            .with_timeout(Duration::from_millis(100))
            .with_retries(2);

        let execution = Executor::default().execute(&def).await;

        assert_eq!(execution.result.status, HealthStatus::Unhealthy);
        assert_eq!(execution.result.attempts, 2);
        assert_eq!(
            execution.result.message.as_deref(),
            Some("Health check timed out after 100ms")
        );
        // two timeouts plus one backoff
        assert!(execution.result.response_time_ms >= 700);
        assert!(execution.result.response_time_ms < 1000);
    }

    #[tokio::test(start_paused = true)]
    async fn test_all_attempts_fail() {
        let calls = Arc::new(AtomicU32::new(0));
        let def = definition(flaky(u32::MAX, calls.clone())).with_retries(3);

        let execution = Executor::default().execute(&def).await;

        assert_eq!(execution.result.status, HealthStatus::Unhealthy);
        assert_eq!(execution.result.message.as_deref(), Some("attempt 3 failed"));
        assert_eq!(calls.load(Ordering::SeqCst), 3);
        assert!(execution.result.response_time_ms >= 1000);
    }

    #[tokio::test]
    async fn test_panicking_probe_is_unhealthy() {
        let probe = probe_fn(|| async {
            if true {
                panic!("probe exploded");
            }
            Ok::<_, anyhow::Error>(Outcome::healthy())
        });
        let execution = Executor::new(Duration::ZERO).execute(&definition(probe)).await;

        assert_eq!(execution.result.status, HealthStatus::Unhealthy);
        assert_eq!(
            execution.result.message.as_deref(),
            Some("Health probe panicked: probe exploded")
        );
    }

    #[tokio::test]
    async fn test_generations_increase() {
        let executor = Executor::default();
        let def = definition(Arc::new(StaticProbe::healthy()));

        let first = executor.execute(&def).await;
        let second = executor.execute(&def).await;
        assert!(second.generation > first.generation);
        assert_eq!(first.result.attempts, 1);
    }
}
