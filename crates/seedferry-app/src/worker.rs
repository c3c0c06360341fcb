//! Cycle scheduling: run a cycle, sleep, repeat until cancelled.

use std::time::Duration;

use tokio_util::sync::CancellationToken;
use tracing::{error, info};

use crate::reconcile::Reconciler;

/// When a worker runs its cycles.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Schedule {
    /// Sleep between the end of one cycle and the start of the next.
    pub interval: Duration,
    /// Stop after the first cycle.
    pub once: bool,
}

/// Run cycles until `cancel` fires (or once, for a one-shot schedule).
///
/// A failed cycle is logged and the worker keeps going. Returns the number of
/// cycles started.
pub async fn run_worker(
    reconciler: Reconciler,
    schedule: Schedule,
    cancel: CancellationToken,
) -> u64 {
    let mode = reconciler.mode().as_str();
    info!(mode, interval_secs = schedule.interval.as_secs(), once = schedule.once, "worker started");

    let mut cycle = 0;
    while !cancel.is_cancelled() {
        cycle += 1;
        if let Err(err) = reconciler.run_cycle(cycle, &cancel).await {
            error!(mode, cycle, error = %err, "cycle failed");
        }
        if schedule.once {
            break;
        }
        info!(mode, sleep_secs = schedule.interval.as_secs(), "sleeping until next cycle");
        tokio::select! {
            () = cancel.cancelled() => break,
            () = tokio::time::sleep(schedule.interval) => {}
        }
    }

    info!(mode, cycles = cycle, "worker stopped");
    cycle
}
