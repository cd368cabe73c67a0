use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use tokio::time::{interval_at, Instant, MissedTickBehavior};
use tokio_util::sync::CancellationToken;

use crate::background::metrics::{EVENTS_PRUNED, PRUNE_FAILURES, PRUNE_RUNS};
use crate::storage::error::StorageError;
use crate::supervisor::SupervisorError;

use super::types::{Clock, Pruner, SystemClock};

/// Periodically drops data older than the retention period.
#[derive(Clone)]
pub struct PruneWorker {
    pruner: Arc<dyn Pruner>,
    clock: Arc<dyn Clock>,
    retention: Duration,
    frequency: Duration,
}

impl PruneWorker {
    pub fn new(pruner: Arc<dyn Pruner>, retention: Duration, frequency: Duration) -> Self {
        Self {
            pruner,
            clock: Arc::new(SystemClock),
            retention,
            frequency,
        }
    }

    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    /// `now - retention`, evaluated at call time. A retention too large to
    /// represent keeps everything.
    pub fn cutoff(&self) -> DateTime<Utc> {
        let now = self.clock.now();
        chrono::Duration::from_std(self.retention)
            .ok()
            .and_then(|retention| now.checked_sub_signed(retention))
            .unwrap_or(DateTime::<Utc>::MIN_UTC)
    }

    /// Runs one prune trigger.
    pub fn prune_now(&self) -> Result<usize, StorageError> {
        let cutoff = self.cutoff();
        PRUNE_RUNS.inc();

        match self.pruner.prune(cutoff) {
            Ok(removed) => {
                EVENTS_PRUNED.inc_by(removed as u64);
                tracing::debug!(cutoff = %cutoff, removed, "Prune completed");
                Ok(removed)
            }
            Err(e) => {
                PRUNE_FAILURES.inc();
                Err(e)
            }
        }
    }

    /// Triggers a prune every `frequency` until `token` is cancelled. The first
    /// periodic trigger fires one full period after the call.
    pub async fn run(&self, token: CancellationToken) -> Result<(), SupervisorError> {
        let mut ticker = interval_at(Instant::now() + self.frequency, self.frequency);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);

        loop {
            tokio::select! {
                biased;
                _ = token.cancelled() => {
                    tracing::info!("Prune worker shutting down");
                    return Ok(());
                }
                _ = ticker.tick() => {
                    // Pruning rewrites the state file; keep it off the reactor.
                    let worker = self.clone();
                    match tokio::task::spawn_blocking(move || worker.prune_now()).await {
                        Ok(Ok(_)) => {}
                        Ok(Err(e)) => tracing::error!(error = %e, "prune failed"),
                        Err(e) => tracing::error!(error = %e, "prune failed"),
                    }
                }
            }
        }
    }
}
