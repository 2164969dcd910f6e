//! Per-check periodic timers.

use std::collections::HashMap;
use std::future::Future;
use std::time::Duration;

use parking_lot::Mutex;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tokio_util::sync::CancellationToken;
use tracing::{debug, trace};

struct ScheduledTask {
    interval: Duration,
    token: CancellationToken,
    handle: JoinHandle<()>,
}

/// Owns one timer task per scheduled check.
///
/// A task fires immediately, then every `interval`. Each tick awaits the job
/// before the next one can fire, so runs of one check never overlap; ticks
/// missed while a run was in flight are skipped. Cancelling a timer stops
/// future ticks and lets a run in flight finish.
#[derive(Default)]
pub struct Scheduler {
    tasks: Mutex<HashMap<String, ScheduledTask>>,
}

impl Scheduler {
    pub fn new() -> Self {
        Self::default()
    }

    /// Start (or restart) the timer for `name`.
    ///
    /// The job returns `false` to stop its own timer. Must be called from
    /// within a Tokio runtime.
    pub fn schedule<F, Fut>(&self, name: &str, interval: Duration, mut job: F)
    where
        F: FnMut() -> Fut + Send + 'static,
        Fut: Future<Output = bool> + Send + 'static,
    {
        let token = CancellationToken::new();
        let task_token = token.clone();
        let check = name.to_string();

        let handle = tokio::spawn(async move {
            let mut ticker = tokio::time::interval(interval);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);

            loop {
                tokio::select! {
                    biased;
                    _ = task_token.cancelled() => break,
                    _ = ticker.tick() => {
                        trace!(check = %check, "Scheduled health check tick");
                        // A run that already started is never aborted.
                        if !job().await || task_token.is_cancelled() {
                            break;
                        }
                    }
                }
            }
            debug!(check = %check, "Health check timer stopped");
        });

        let previous = self.tasks.lock().insert(
            name.to_string(),
            ScheduledTask {
                interval,
                token,
                handle,
            },
        );
        if let Some(previous) = previous {
            previous.token.cancel();
        }
        debug!(check = %name, interval_ms = interval.as_millis() as u64, "Health check scheduled");
    }

    /// Stop the timer for `name`. Returns whether one was running.
    pub fn cancel(&self, name: &str) -> bool {
        match self.tasks.lock().remove(name) {
            Some(task) => {
                task.token.cancel();
                true
            }
            None => false,
        }
    }

    /// Stop every timer.
    pub fn cancel_all(&self) -> usize {
        let tasks: Vec<_> = self.tasks.lock().drain().collect();
        for (_, task) in &tasks {
            task.token.cancel();
        }
        tasks.len()
    }

    pub fn is_scheduled(&self, name: &str) -> bool {
        self.tasks
            .lock()
            .get(name)
            .map(|t| !t.handle.is_finished())
            .unwrap_or(false)
    }

    pub fn interval_of(&self, name: &str) -> Option<Duration> {
        self.tasks.lock().get(name).map(|t| t.interval)
    }

    pub fn scheduled_count(&self) -> usize {
        self.tasks
            .lock()
            .values()
            .filter(|t| !t.handle.is_finished())
            .count()
    }
}

impl Drop for Scheduler {
    fn drop(&mut self) {
        for task in self.tasks.get_mut().values() {
            task.token.cancel();
        }
    }
}
