//! Recurring background checks.

use std::future::Future;
use std::time::Duration;
use tokio::task::JoinHandle;
use tokio::time::{Instant, MissedTickBehavior, interval_at};
use tracing::debug;

/// Handle to a background task that runs a job at a fixed interval.
///
/// Ticks are serialized: the next tick is not awaited until the job of the
/// previous one has finished, and missed ticks are not replayed. The first run
/// happens one interval after spawning. Dropping the handle stops the task.
#[derive(Debug)]
pub struct Scheduler {
    handle: JoinHandle<()>,
    interval: Duration,
}

impl Scheduler {
    /// Spawn `job` on the current tokio runtime every `interval`.
    pub fn spawn<F, Fut>(interval: Duration, mut job: F) -> Self
    where
        F: FnMut() -> Fut + Send + 'static,
        Fut: Future<Output = ()> + Send + 'static,
    {
        let handle = tokio::spawn(async move {
            let mut ticker = interval_at(Instant::now() + interval, interval);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
            loop {
                ticker.tick().await;
                debug!("Scheduled update check firing");
                job().await;
            }
        });

        Self {
            handle,
            interval,
        }
    }

    /// Interval between runs.
    pub fn interval(&self) -> Duration {
        self.interval
    }

    /// Whether the background task is still alive.
    pub fn is_running(&self) -> bool {
        !self.handle.is_finished()
    }

    /// Stop the background task.
    pub fn stop(self) {
        self.handle.abort();
    }
}

impl Drop for Scheduler {
    fn drop(&mut self) {
        self.handle.abort();
    }
}
