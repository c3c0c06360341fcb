//! Copy one planned payload, register it with the local instance and unpack archives.
//!
//! # Design
//! - Copy, registration and extraction fail independently; only the current task is abandoned.
//! - The torrent is registered paused so local repair resumes it once verified complete.
//! - Extraction runs only after a successful copy into a directory.

use std::path::Path;

use seedferry_fsops::{CopyRunner, Extractor, ensure_dir_owned};
use seedferry_torrent_core::{AddTorrent, TorrentClient};
use tokio_util::sync::CancellationToken;
use tracing::{Instrument, debug, error, info, info_span, warn};

use super::plan::TransferTask;

/// How one transfer ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransferOutcome {
    /// Payload copied.
    Completed {
        /// Whether the local instance accepted the metadata.
        registered: bool,
    },
    /// The copy tool failed, timed out or could not start.
    CopyFailed,
    /// Shutdown was requested mid-copy.
    Cancelled,
}

/// External tools used to move payloads.
#[derive(Debug, Clone)]
pub struct TransferPipeline {
    pub(super) copier: CopyRunner,
    pub(super) extractor: Extractor,
}

impl TransferPipeline {
    /// Pipeline using the given copy and extraction runners.
    #[must_use]
    pub const fn new(copier: CopyRunner, extractor: Extractor) -> Self {
        Self { copier, extractor }
    }

    /// Run `task` to completion, registering the result with `local`.
    pub async fn run(
        &self,
        task: &TransferTask,
        local: &dyn TorrentClient,
        cancel: &CancellationToken,
    ) -> TransferOutcome {
        let span = info_span!("transfer", task_id = %task.id, torrent = %task.name);
        self.run_task(task, local, cancel).instrument(span).await
    }

    async fn run_task(
        &self,
        task: &TransferTask,
        local: &dyn TorrentClient,
        cancel: &CancellationToken,
    ) -> TransferOutcome {
        info!(
            source = %task.source_path.display(),
            destination = %task.dest_path.display(),
            "starting transfer"
        );
        match self
            .copier
            .copy(&task.source_path, &task.dest_path, cancel)
            .await
        {
            Ok(outcome) if outcome.success() => {
                info!(files_transferred = ?outcome.files_transferred, "copy finished");
            }
            Ok(outcome) => {
                error!(code = ?outcome.exit.code, command = %outcome.command, "copy failed");
                return TransferOutcome::CopyFailed;
            }
            Err(err) if err.is_cancelled() => {
                warn!("transfer cancelled");
                return TransferOutcome::Cancelled;
            }
            Err(err) => {
                let command = self.copier.command(&task.source_path, &task.dest_path);
                error!(error = %err, command = %command.display(), "copy failed");
                return TransferOutcome::CopyFailed;
            }
        }

        let registered = self.register(task, local).await;
        if task.dest_path.is_dir() {
            self.extract_archives(&task.dest_path, cancel).await;
        } else {
            debug!(destination = %task.dest_path.display(), "destination is not a directory; no archive scan");
        }
        TransferOutcome::Completed { registered }
    }

    async fn register(&self, task: &TransferTask, local: &dyn TorrentClient) -> bool {
        let metainfo = match tokio::fs::read(&task.torrent_file_path).await {
            Ok(bytes) => bytes,
            Err(err) => {
                error!(
                    torrent_file = %task.torrent_file_path.display(),
                    error = %err,
                    "failed to read torrent metadata"
                );
                return false;
            }
        };
        if let Err(err) = ensure_dir_owned(&task.local_download_dir, self.copier.owner()) {
            error!(
                download_dir = %task.local_download_dir.display(),
                error = %err,
                "failed to prepare local download directory"
            );
            return false;
        }

        let request = AddTorrent {
            metainfo,
            paused: true,
            download_dir: task.local_download_dir.to_string_lossy().into_owned(),
        };
        match local.add(request).await {
            Ok(()) => {
                info!(
                    torrent_file = %task.torrent_file_name,
                    download_dir = %task.local_download_dir.display(),
                    "registered torrent with the local instance"
                );
                true
            }
            Err(err) => {
                error!(torrent_file = %task.torrent_file_name, error = %err, "failed to register torrent");
                false
            }
        }
    }

    async fn extract_archives(&self, dir: &Path, cancel: &CancellationToken) {
        match self.extractor.extract_all(dir, cancel).await {
            Ok(outcomes) if outcomes.is_empty() => {}
            Ok(outcomes) => {
                let failed = outcomes.iter().filter(|outcome| !outcome.succeeded()).count();
                info!(archives = outcomes.len(), failed, "archive extraction finished");
            }
            Err(err) => error!(dir = %dir.display(), error = %err, "failed to scan for archives"),
        }
    }
}
