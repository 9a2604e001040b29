//! Fixed-rate execution of a single job

use async_trait::async_trait;
use std::time::Duration;
use tokio::time::{Instant, MissedTickBehavior};
use tokio_util::sync::CancellationToken;

pub const DEFAULT_INTERVAL: Duration = Duration::from_secs(30);
pub const DEFAULT_DEADLINE: Duration = Duration::from_secs(10);

/// Unit of work driven by the [`Scheduler`]
#[async_trait]
pub trait Job: Send + Sync {
    async fn run(&self) -> anyhow::Result<()>;
}

/// How one cycle ended
#[derive(Debug, Clone, Copy, PartialEq, Eq, strum::Display)]
pub enum CycleOutcome {
    Completed,
    Failed,
    DeadlineExceeded,
    Cancelled,
}

#[derive(Debug, Clone)]
pub struct Scheduler {
    interval: Duration,
    deadline: Duration,
}

impl Default for Scheduler {
    fn default() -> Self {
        Scheduler {
            interval: DEFAULT_INTERVAL,
            deadline: DEFAULT_DEADLINE,
        }
    }
}

impl Scheduler {
    pub fn new(interval: Duration, deadline: Duration) -> anyhow::Result<Self> {
        if interval.is_zero() {
            anyhow::bail!("scheduler interval must be positive");
        }
        if deadline.is_zero() {
            anyhow::bail!("cycle deadline must be positive");
        }
        if deadline > interval {
            tracing::warn!(
                interval_secs = interval.as_secs_f64(),
                deadline_secs = deadline.as_secs_f64(),
                "cycle deadline is longer than the interval, ticks will be skipped"
            );
        }
        Ok(Scheduler { interval, deadline })
    }

    pub fn interval(&self) -> Duration {
        self.interval
    }

    pub fn deadline(&self) -> Duration {
        self.deadline
    }

    /// Runs `job` on every tick until `cancel` fires.
    ///
    /// The first tick fires immediately. Cycles never overlap: a tick that
    /// arrives while a cycle is still running is delayed until it ends.
    #[tracing::instrument(skip(self, job, cancel), fields(interval_secs = self.interval.as_secs()))]
    pub async fn run<J: Job + ?Sized>(&self, job: &J, cancel: CancellationToken) {
        tracing::info!("Starting scheduler");
        let mut ticker = tokio::time::interval(self.interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);
        loop {
            tokio::select! {
                biased;
                _ = cancel.cancelled() => break,
                _ = ticker.tick() => {}
            }
            if self.run_cycle(job, &cancel).await == CycleOutcome::Cancelled {
                break;
            }
        }
        tracing::info!("Scheduler stopped");
    }

    /// Runs `job` once under a fresh deadline
    pub async fn run_cycle<J: Job + ?Sized>(
        &self,
        job: &J,
        cancel: &CancellationToken,
    ) -> CycleOutcome {
        let started = Instant::now();
        let outcome = tokio::select! {
            biased;
            _ = cancel.cancelled() => {
                tracing::info!("Shutdown requested, abandoning in-flight cycle");
                CycleOutcome::Cancelled
            }
            res = tokio::time::timeout(self.deadline, job.run()) => match res {
                Ok(Ok(())) => CycleOutcome::Completed,
                Ok(Err(err)) => {
                    tracing::error!(error = %format!("{:#}", err), "cycle failed");
                    CycleOutcome::Failed
                }
                Err(_) => {
                    tracing::error!(
                        error = "deadline exceeded",
                        deadline_secs = self.deadline.as_secs_f64(),
                        "cycle failed"
                    );
                    CycleOutcome::DeadlineExceeded
                }
            }
        };
        tracing::debug!(%outcome, elapsed_ms = started.elapsed().as_millis() as u64, "cycle finished");
        outcome
    }
}
