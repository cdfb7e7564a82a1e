//! Periodic driver for the poll cycle

use anyhow::{Context, Result};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::time::sleep;
use tracing::{debug, info};

use crate::cycle::{CycleReport, PollCycle};

/// Runs the poll cycle, then waits `interval`, until stopped
pub struct PollScheduler {
    cycle: Arc<PollCycle>,
    interval: Duration,
}

impl PollScheduler {
    pub fn new(cycle: PollCycle, interval: Duration) -> Self {
        Self {
            cycle: Arc::new(cycle),
            interval,
        }
    }

    pub fn interval(&self) -> Duration {
        self.interval
    }

    /// Drive exactly one cycle on the caller's task
    pub async fn run_cycle(&self) -> CycleReport {
        self.cycle.run_once().await
    }

    /// Spawn the polling loop. A stop request takes effect between cycles,
    /// never in the middle of one.
    pub fn start(self) -> SchedulerHandle {
        let (stop_tx, mut stop_rx) = watch::channel(false);
        let cycle = Arc::clone(&self.cycle);
        let interval = self.interval;

        let task = tokio::spawn(async move {
            info!("Scheduler started");
            info!("Poll interval: {}s", interval.as_secs_f64());

            let mut cycles = 0u64;
            loop {
                if *stop_rx.borrow() {
                    break;
                }

                let report = cycle.run_once().await;
                cycles += 1;
                debug!(cycles, ?report, "Cycle complete");

                tokio::select! {
                    _ = sleep(interval) => {}
                    changed = stop_rx.changed() => {
                        if changed.is_err() || *stop_rx.borrow() {
                            break;
                        }
                    }
                }
            }

            info!(cycles, "Scheduler stopped");
            cycles
        });

        SchedulerHandle { stop_tx, task }
    }
}

/// Handle to a running scheduler
pub struct SchedulerHandle {
    stop_tx: watch::Sender<bool>,
    task: JoinHandle<u64>,
}

impl SchedulerHandle {
    /// Check if the polling loop is still alive
    pub fn is_running(&self) -> bool {
        !self.task.is_finished()
    }

    /// Request a stop and wait for the in-flight cycle to finish.
    /// Returns the number of cycles run.
    pub async fn stop(self) -> Result<u64> {
        info!("Stopping scheduler...");
        let _ = self.stop_tx.send(true);
        self.task.await.context("Scheduler task failed")
    }
}

