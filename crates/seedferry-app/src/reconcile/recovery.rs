//! Re-copy payloads that a queue application reports as missing locally.

use std::collections::HashSet;
use std::path::{Path, PathBuf};

use seedferry_arr::{ArrClient, MissingPath};
use seedferry_fsops::{ArchiveLayout, is_rar};
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

use super::RunMode;
use super::plan::PathLayout;
use super::transfer::TransferPipeline;

/// Counts for one recovery pass.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RecoveryTally {
    /// Paths copied back (or that would have been, in dry-run mode).
    pub recovered: usize,
    /// Paths ignored: outside the local root, already present, or without a remote source.
    pub skipped: usize,
    /// Copies that failed.
    pub failed: usize,
}

/// Missing-path reports from every queue, in queue order.
///
/// A queue that cannot be read is logged and skipped.
pub(crate) async fn collect_missing(queues: &[ArrClient]) -> Vec<MissingPath> {
    let mut missing = Vec::new();
    for queue in queues {
        match queue.queue().await {
            Ok(page) => {
                for record in &page.records {
                    for path in record.missing_paths() {
                        debug!(
                            instance = queue.name(),
                            title = %record.title,
                            path = %path.path,
                            "queue reports missing path"
                        );
                        missing.push(path);
                    }
                }
            }
            Err(err) => error!(instance = queue.name(), error = %err, "failed to read queue"),
        }
    }
    missing
}

impl TransferPipeline {
    /// Copy each reported path back from the remote root, at most once per call.
    pub(crate) async fn recover(
        &self,
        missing: &[MissingPath],
        layout: &PathLayout,
        mode: RunMode,
        cancel: &CancellationToken,
    ) -> RecoveryTally {
        let mut tally = RecoveryTally::default();
        let mut attempted = HashSet::new();
        for report in missing {
            if cancel.is_cancelled() {
                break;
            }
            let local = PathBuf::from(&report.path);
            if !attempted.insert(local.clone()) {
                continue;
            }
            let Some(source) = layout.local_to_remote(&local) else {
                warn!(path = %report.path, program = %report.program, "missing path is outside the local root");
                tally.skipped += 1;
                continue;
            };
            if local.exists() {
                debug!(path = %report.path, "missing path is present again");
                tally.skipped += 1;
                continue;
            }
            if !source.exists() {
                warn!(path = %report.path, source = %source.display(), "no remote copy of missing path");
                tally.skipped += 1;
                continue;
            }
            if mode.is_dry_run() {
                info!(source = %source.display(), destination = %report.path, "would recover missing path");
                tally.recovered += 1;
                continue;
            }
            if self.recover_one(&source, &local, cancel).await {
                tally.recovered += 1;
            } else {
                tally.failed += 1;
            }
        }
        tally
    }

    async fn recover_one(&self, source: &Path, local: &Path, cancel: &CancellationToken) -> bool {
        match self.copier.copy(source, local, cancel).await {
            Ok(outcome) if outcome.success() => {
                info!(path = %local.display(), "recovered missing path");
            }
            Ok(outcome) => {
                error!(code = ?outcome.exit.code, command = %outcome.command, "recovery copy failed");
                return false;
            }
            Err(err) => {
                error!(path = %local.display(), error = %err, "recovery copy failed");
                return false;
            }
        }

        if is_rar(local)
            && let Some(dir) = local.parent()
        {
            match self.extractor.extract(local, dir, ArchiveLayout::KeepPaths, cancel).await {
                Ok(exit) if exit.success() => info!(archive = %local.display(), "archive extracted"),
                Ok(exit) => error!(archive = %local.display(), code = ?exit.code, "archive extraction failed"),
                Err(err) => error!(archive = %local.display(), error = %err, "archive extraction failed"),
            }
        }
        true
    }
}

#[cfg(all(test, unix))]
mod tests {
    use super::*;
    use crate::reconcile::testkit::Sandbox;
    use seedferry_test_support::write_file;

    fn report(path: &Path) -> MissingPath {
        MissingPath {
            program: "sonarr".into(),
            path: path.to_string_lossy().into_owned(),
        }
    }

    #[tokio::test]
    async fn reported_paths_are_recovered_once() -> anyhow::Result<()> {
        let sandbox = Sandbox::new()?;
        sandbox.remote_payload("tv/Show/ep1.rar", b"rar")?;
        let missing = sandbox.local_root().join("tv/Show/ep1.rar");

        let tally = sandbox
            .pipeline()?
            .recover(
                &[report(&missing), report(&missing)],
                &sandbox.layout(),
                RunMode::Apply,
                &CancellationToken::new(),
            )
            .await;

        assert_eq!(
            tally,
            RecoveryTally {
                recovered: 1,
                skipped: 0,
                failed: 0
            }
        );
        assert!(sandbox.local_root().join("tv/Show").is_dir());
        Ok(())
    }

    #[tokio::test]
    async fn unusable_reports_are_skipped() -> anyhow::Result<()> {
        let sandbox = Sandbox::new()?;
        let present = sandbox.local_root().join("tv/present.mkv");
        write_file(&present, b"x")?;
        let reports = [
            report(Path::new("/mnt/elsewhere/ep.mkv")),
            report(&present),
            report(&sandbox.local_root().join("tv/nowhere.mkv")),
        ];

        let tally = sandbox
            .pipeline()?
            .recover(
                &reports,
                &sandbox.layout(),
                RunMode::Apply,
                &CancellationToken::new(),
            )
            .await;

        assert_eq!(tally.skipped, 3);
        assert_eq!(tally.recovered, 0);
        Ok(())
    }

    #[tokio::test]
    async fn failed_copies_are_counted() -> anyhow::Result<()> {
        let sandbox = Sandbox::failing()?;
        sandbox.remote_payload("movies/film.mkv", b"film")?;
        let missing = sandbox.local_root().join("movies/film.mkv");

        let tally = sandbox
            .pipeline()?
            .recover(
                &[report(&missing)],
                &sandbox.layout(),
                RunMode::Apply,
                &CancellationToken::new(),
            )
            .await;

        assert_eq!(tally.failed, 1);
        Ok(())
    }

    #[tokio::test]
    async fn dry_run_touches_nothing() -> anyhow::Result<()> {
        let sandbox = Sandbox::new()?;
        sandbox.remote_payload("tv/Show/ep1.mkv", b"x")?;
        let missing = sandbox.local_root().join("tv/Show/ep1.mkv");

        let tally = sandbox
            .pipeline()?
            .recover(
                &[report(&missing)],
                &sandbox.layout(),
                RunMode::DryRun,
                &CancellationToken::new(),
            )
            .await;

        assert_eq!(tally.recovered, 1);
        assert!(!sandbox.local_root().join("tv").exists());
        Ok(())
    }
}
