//! One reconciliation cycle over both instances.

use std::sync::Arc;

use seedferry_arr::ArrClient;
use seedferry_config::SyncConfig;
use seedferry_fsops::{CopyRunner, Extractor, LocationResolver};
use seedferry_torrent_core::TorrentClient;
use tokio_util::sync::CancellationToken;
use tracing::{Instrument, error, info, info_span, warn};

use super::RunMode;
use super::plan::{PathLayout, Restart, plan_transfers};
use super::recovery::{RecoveryTally, collect_missing};
use super::repair::{RepairTally, repair_local};
use super::transfer::{TransferOutcome, TransferPipeline};
use crate::error::{AppError, AppResult};

/// Summary of one cycle.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CycleReport {
    /// Local repair decisions.
    pub repairs: RepairTally,
    /// Remote torrents restarted.
    pub restarts: usize,
    /// Transfers planned.
    pub planned: usize,
    /// Transfers whose copy succeeded.
    pub transferred: usize,
    /// Transfers whose copy failed.
    pub copy_failed: usize,
    /// Successful copies the local instance did not accept.
    pub unregistered: usize,
    /// Missing-path recovery, when queues are configured.
    pub recovery: Option<RecoveryTally>,
}

/// Everything one worker needs to run cycles; owns its own client handles.
pub struct Reconciler {
    mode: RunMode,
    local: Arc<dyn TorrentClient>,
    remote: Arc<dyn TorrentClient>,
    layout: PathLayout,
    resolver: LocationResolver,
    pipeline: TransferPipeline,
    queues: Vec<ArrClient>,
}

impl std::fmt::Debug for Reconciler {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Reconciler")
            .field("mode", &self.mode)
            .field("local", &self.local.label())
            .field("remote", &self.remote.label())
            .field("layout", &self.layout)
            .field("queues", &self.queues.len())
            .finish_non_exhaustive()
    }
}

impl Reconciler {
    /// Reconciler for `config` driving the given instances.
    #[must_use]
    pub fn new(
        mode: RunMode,
        config: &SyncConfig,
        local: Arc<dyn TorrentClient>,
        remote: Arc<dyn TorrentClient>,
    ) -> Self {
        Self {
            mode,
            local,
            remote,
            layout: PathLayout::new(&config.remote_root, &config.local_root),
            resolver: LocationResolver::new(&config.local_root),
            pipeline: TransferPipeline::new(
                CopyRunner::new(&config.tools, &config.progress, config.ownership),
                Extractor::new(&config.tools),
            ),
            queues: Vec::new(),
        }
    }

    /// Poll these queues for missing-path reports after the transfers.
    #[must_use]
    pub fn with_queues(mut self, queues: Vec<ArrClient>) -> Self {
        self.queues = queues;
        self
    }

    /// Worker mode.
    #[must_use]
    pub const fn mode(&self) -> RunMode {
        self.mode
    }

    /// Run one cycle.
    ///
    /// Failures of single records, tasks or calls are logged and counted.
    ///
    /// # Errors
    ///
    /// Returns an error only when an instance cannot be listed.
    pub async fn run_cycle(&self, cycle: u64, cancel: &CancellationToken) -> AppResult<CycleReport> {
        let span = info_span!("cycle", mode = self.mode.as_str(), cycle);
        self.cycle(cancel).instrument(span).await
    }

    async fn cycle(&self, cancel: &CancellationToken) -> AppResult<CycleReport> {
        let mut report = CycleReport::default();

        let local = self
            .local
            .list()
            .await
            .map_err(|source| AppError::torrent("cycle.list_local", self.local.label(), source))?;
        info!(instance = self.local.label(), torrents = local.len(), "local snapshot taken");
        report.repairs = repair_local(&local, &*self.local, &self.resolver, self.mode).await;

        let remote = self
            .remote
            .list()
            .await
            .map_err(|source| AppError::torrent("cycle.list_remote", self.remote.label(), source))?;
        info!(instance = self.remote.label(), torrents = remote.len(), "remote snapshot taken");

        let plan = plan_transfers(&remote, &local, &self.layout);
        report.restarts = self.restart_remote(&plan.restarts).await;
        report.planned = plan.tasks.len();

        for task in &plan.tasks {
            if cancel.is_cancelled() {
                warn!("cycle interrupted before all transfers ran");
                break;
            }
            if self.mode.is_dry_run() {
                info!(
                    torrent = %task.name,
                    source = %task.source_path.display(),
                    destination = %task.dest_path.display(),
                    "would transfer"
                );
                continue;
            }
            match self.pipeline.run(task, &*self.local, cancel).await {
                TransferOutcome::Completed { registered } => {
                    report.transferred += 1;
                    if !registered {
                        report.unregistered += 1;
                    }
                }
                TransferOutcome::CopyFailed => report.copy_failed += 1,
                TransferOutcome::Cancelled => break,
            }
        }

        if !self.queues.is_empty() && !cancel.is_cancelled() {
            let missing = collect_missing(&self.queues).await;
            report.recovery = Some(
                self.pipeline
                    .recover(&missing, &self.layout, self.mode, cancel)
                    .await,
            );
        }

        info!(
            resumed = report.repairs.resumed,
            stopped = report.repairs.stopped,
            relocated = report.repairs.relocated,
            deferred = report.repairs.deferred,
            restarts = report.restarts,
            planned = report.planned,
            transferred = report.transferred,
            copy_failed = report.copy_failed,
            unregistered = report.unregistered,
            "cycle finished"
        );
        Ok(report)
    }

    async fn restart_remote(&self, restarts: &[Restart]) -> usize {
        let mut restarted = 0;
        for restart in restarts {
            if self.mode.is_dry_run() {
                info!(torrent = %restart.name, "would restart remote torrent to clear open-file error");
                restarted += 1;
                continue;
            }
            match self.remote.restart(&restart.info_hash).await {
                Ok(()) => {
                    info!(torrent = %restart.name, "restarted remote torrent to clear open-file error");
                    restarted += 1;
                }
                Err(err) => error!(torrent = %restart.name, error = %err, "failed to restart remote torrent"),
            }
        }
        restarted
    }
}

#[cfg(all(test, unix))]
mod tests {
    use super::*;
    use crate::reconcile::testkit::Sandbox;
    use seedferry_test_support::{FakeCall, FakeClient, RecordBuilder};
    use seedferry_torrent_core::{TorrentRecord, TorrentState};

    struct Harness {
        sandbox: Sandbox,
        local: Arc<FakeClient>,
        remote: Arc<FakeClient>,
    }

    impl Harness {
        fn new(sandbox: Sandbox, remote: Vec<TorrentRecord>) -> Self {
            Self {
                sandbox,
                local: Arc::new(FakeClient::new("local", Vec::new())),
                remote: Arc::new(FakeClient::new("remote", remote)),
            }
        }

        fn reconciler(&self, mode: RunMode) -> anyhow::Result<Reconciler> {
            let local: Arc<dyn TorrentClient> = self.local.clone();
            let remote: Arc<dyn TorrentClient> = self.remote.clone();
            Ok(Reconciler::new(mode, &self.sandbox.config()?, local, remote))
        }
    }

    /// Remote seeding torrent whose metadata registers as `hash` on the local fake.
    fn transferable(sandbox: &Sandbox, local: &FakeClient, hash: &str) -> anyhow::Result<TorrentRecord> {
        let metainfo = format!("d4:name{}:{hash}e", hash.len());
        let record = sandbox.seeding_record(hash, "tv", &format!("{hash}.mkv"), metainfo.as_bytes())?;
        local.register_metainfo(
            metainfo.as_bytes(),
            RecordBuilder::new(hash)
                .name(&record.name)
                .percent(100.0)
                .file(&record.name, 10)
                .torrent_file(&format!("/var/lib/transmission/torrents/{hash}.torrent"))
                .build(),
        );
        Ok(record)
    }

    #[tokio::test]
    async fn cycles_converge_and_then_stay_quiet() -> anyhow::Result<()> {
        let sandbox = Sandbox::new()?;
        let local = Arc::new(FakeClient::new("local", Vec::new()));
        let record = transferable(&sandbox, &local, "a")?;
        let harness = Harness {
            sandbox,
            local,
            remote: Arc::new(FakeClient::new("remote", vec![record])),
        };
        let reconciler = harness.reconciler(RunMode::Apply)?;
        let cancel = CancellationToken::new();

        let first = reconciler.run_cycle(1, &cancel).await?;
        assert_eq!(first.transferred, 1);
        assert!(matches!(harness.local.calls().as_slice(), [FakeCall::Add { paused: true, .. }]));
        assert_eq!(
            harness.local.torrent("a").map(|record| record.state),
            Some(TorrentState::Stopped)
        );

        harness.local.clear_calls();
        let second = reconciler.run_cycle(2, &cancel).await?;
        assert_eq!(second.repairs.resumed, 1);
        assert_eq!(second.planned, 0);
        assert_eq!(harness.local.calls(), vec![FakeCall::Start("a".into())]);

        harness.local.clear_calls();
        harness.remote.clear_calls();
        let third = reconciler.run_cycle(3, &cancel).await?;
        assert_eq!(third, CycleReport::default());
        assert!(harness.local.calls().is_empty());
        assert!(harness.remote.calls().is_empty());
        Ok(())
    }

    #[tokio::test]
    async fn a_failed_copy_does_not_block_the_next_task() -> anyhow::Result<()> {
        let sandbox = Sandbox::scripted(r#"test -e "$5""#)?;
        let local = Arc::new(FakeClient::new("local", Vec::new()));
        let first = transferable(&sandbox, &local, "a")?;
        let second = transferable(&sandbox, &local, "b")?;
        sandbox.remote_payload("tv/b.mkv", b"episode")?;
        let download_dir = sandbox.local_root().join("tv");
        let harness = Harness {
            sandbox,
            local,
            remote: Arc::new(FakeClient::new("remote", vec![first, second])),
        };

        let report = harness
            .reconciler(RunMode::Apply)?
            .run_cycle(1, &CancellationToken::new())
            .await?;

        assert_eq!(report.planned, 2);
        assert_eq!(report.copy_failed, 1);
        assert_eq!(report.transferred, 1);
        assert_eq!(
            harness.local.calls(),
            vec![FakeCall::Add {
                download_dir: download_dir.to_string_lossy().into_owned(),
                paused: true,
                metainfo_len: "d4:name1:be".len(),
            }]
        );
        assert!(harness.local.torrent("a").is_none());
        assert!(harness.local.torrent("b").is_some());
        Ok(())
    }

    #[tokio::test]
    async fn a_timed_out_copy_fails_and_the_next_task_runs() -> anyhow::Result<()> {
        let sandbox = Sandbox::scripted(
            r#"case "$5" in */slow.mkv) exec sleep 30 ;; esac
exit 0"#,
        )?
        .transfer_timeout(1);
        let local = Arc::new(FakeClient::new("local", Vec::new()));
        let first = transferable(&sandbox, &local, "slow")?;
        let second = transferable(&sandbox, &local, "b")?;
        let harness = Harness {
            sandbox,
            local,
            remote: Arc::new(FakeClient::new("remote", vec![first, second])),
        };

        let report = tokio::time::timeout(
            std::time::Duration::from_secs(20),
            harness
                .reconciler(RunMode::Apply)?
                .run_cycle(1, &CancellationToken::new()),
        )
        .await??;

        assert_eq!(report.copy_failed, 1);
        assert_eq!(report.transferred, 1);
        assert!(harness.local.torrent("slow").is_none());
        assert!(harness.local.torrent("b").is_some());
        Ok(())
    }

    #[tokio::test]
    async fn dry_run_makes_no_mutating_calls() -> anyhow::Result<()> {
        let sandbox = Sandbox::new()?;
        let remote = vec![
            sandbox.seeding_record("a", "tv", "a.mkv", b"meta")?,
            RecordBuilder::new("busy")
                .state(TorrentState::Downloading)
                .percent(10.0)
                .error("Too many open save files")
                .build(),
        ];
        let harness = Harness::new(sandbox, remote);
        harness.local.set_torrents(vec![
            RecordBuilder::new("paused").state(TorrentState::Stopped).percent(100.0).build(),
        ]);

        let report = harness
            .reconciler(RunMode::DryRun)?
            .run_cycle(1, &CancellationToken::new())
            .await?;

        assert_eq!(report.planned, 1);
        assert_eq!(report.transferred, 0);
        assert_eq!(report.restarts, 1);
        assert_eq!(report.repairs.resumed, 1);
        assert!(harness.local.calls().is_empty());
        assert!(harness.remote.calls().is_empty());
        assert!(!harness.sandbox.local_root().join("tv").exists());
        Ok(())
    }

    #[tokio::test]
    async fn remote_errors_are_restarted_before_transfers() -> anyhow::Result<()> {
        let sandbox = Sandbox::new()?;
        let remote = vec![
            RecordBuilder::new("busy")
                .state(TorrentState::Downloading)
                .percent(10.0)
                .error("Too many open save files")
                .build(),
        ];
        let harness = Harness::new(sandbox, remote);

        let report = harness
            .reconciler(RunMode::Apply)?
            .run_cycle(1, &CancellationToken::new())
            .await?;

        assert_eq!(report.restarts, 1);
        assert_eq!(
            harness.remote.calls(),
            vec![FakeCall::Stop("busy".into()), FakeCall::Start("busy".into())]
        );
        Ok(())
    }

    #[tokio::test]
    async fn listing_failure_ends_the_cycle_with_an_error() -> anyhow::Result<()> {
        let harness = Harness::new(Sandbox::new()?, Vec::new());
        harness.remote.fail("list");

        let result = harness
            .reconciler(RunMode::Apply)?
            .run_cycle(1, &CancellationToken::new())
            .await;

        assert!(matches!(
            result,
            Err(AppError::Torrent { operation: "cycle.list_remote", .. })
        ));
        assert_eq!(harness.local.list_calls(), 1);
        Ok(())
    }
}
