//! Reconciliation between the remote and local instances.
//!
//! # Design
//! - One cycle: snapshot local, repair local, snapshot remote, plan, transfer, recover.
//! - Decisions (`plan_repair`, `plan_transfers`) are pure; executors own the side effects.
//! - In dry-run mode executors log what they would do and never mutate anything.

pub mod cycle;
pub mod plan;
pub mod recovery;
pub mod repair;
pub mod transfer;

pub use cycle::{CycleReport, Reconciler};
pub use plan::{PathLayout, RemotePlan, Restart, TransferTask, plan_transfers};
pub use recovery::RecoveryTally;
pub use repair::{RepairAction, RepairTally, plan_repair};
pub use transfer::{TransferOutcome, TransferPipeline};

/// Whether a worker applies its decisions or only logs them.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunMode {
    /// Mutate instances and the filesystem.
    Apply,
    /// Read-only pass.
    DryRun,
}

impl RunMode {
    /// Label used in spans and log fields.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Apply => "apply",
            Self::DryRun => "dry-run",
        }
    }

    /// Whether mutations are suppressed.
    #[must_use]
    pub const fn is_dry_run(self) -> bool {
        matches!(self, Self::DryRun)
    }
}

#[cfg(all(test, unix))]
pub(crate) mod testkit;
