//! Bring local torrents back into a consistent, unblocked state.

use seedferry_fsops::LocationResolver;
use seedferry_torrent_core::{KnownCondition, TorrentClient, TorrentRecord, TorrentState};
use tracing::{debug, error, info, warn};

use super::RunMode;

/// Action chosen for one local torrent.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RepairAction {
    /// Paused with complete data: start it.
    Resume,
    /// Stuck on a vanished peer: stop it to clear the error.
    Stop,
    /// Data is missing: search the local root for this file and move the torrent there.
    Relocate {
        /// Largest payload file, relative to the download directory.
        relative_file: String,
    },
    /// Data is missing and the torrent lists no file to search for.
    Unresolvable,
}

/// First matching repair rule for `record`, if any.
///
/// Rules, in order: resume stopped complete torrents, stop torrents whose peer
/// vanished, relocate torrents with no data unless they are verifying.
#[must_use]
pub fn plan_repair(record: &TorrentRecord) -> Option<RepairAction> {
    if record.state == TorrentState::Stopped && record.is_complete() {
        return Some(RepairAction::Resume);
    }
    if record.reports(KnownCondition::StoppedPeerMissing) {
        return Some(RepairAction::Stop);
    }
    let data_missing =
        record.percent_done <= 0.0 || record.reports(KnownCondition::NoDataFound);
    if data_missing && !record.state.is_verifying() {
        return Some(record.largest_file().map_or(RepairAction::Unresolvable, |file| {
            RepairAction::Relocate {
                relative_file: file.name.clone(),
            }
        }));
    }
    None
}

/// Counts of repair decisions taken during one pass.
///
/// In dry-run mode the counts describe what would have been done.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RepairTally {
    /// Torrents started.
    pub resumed: usize,
    /// Torrents stopped.
    pub stopped: usize,
    /// Torrents moved and re-verified.
    pub relocated: usize,
    /// Relocations postponed because the data was not found.
    pub deferred: usize,
    /// Instance calls that failed.
    pub failed: usize,
}

impl RepairTally {
    /// Whether any instance call was made or would have been made.
    #[must_use]
    pub const fn acted(&self) -> bool {
        self.resumed + self.stopped + self.relocated > 0
    }
}

/// Apply the repair rules to every local record.
///
/// A failing call is logged and never stops the remaining records.
pub(crate) async fn repair_local(
    records: &[TorrentRecord],
    client: &dyn TorrentClient,
    resolver: &LocationResolver,
    mode: RunMode,
) -> RepairTally {
    let mut tally = RepairTally::default();
    for record in records {
        let Some(action) = plan_repair(record) else {
            debug!(
                torrent = %record.name,
                state = record.state.as_str(),
                percent = record.percent_done,
                "local torrent needs no repair"
            );
            continue;
        };
        match action {
            RepairAction::Resume => resume(record, client, mode, &mut tally).await,
            RepairAction::Stop => stop(record, client, mode, &mut tally).await,
            RepairAction::Relocate { relative_file } => {
                relocate(record, &relative_file, client, resolver, mode, &mut tally).await;
            }
            RepairAction::Unresolvable => {
                warn!(torrent = %record.name, "torrent has no data and lists no files to search for");
                tally.deferred += 1;
            }
        }
    }
    tally
}

async fn resume(
    record: &TorrentRecord,
    client: &dyn TorrentClient,
    mode: RunMode,
    tally: &mut RepairTally,
) {
    if mode.is_dry_run() {
        info!(torrent = %record.name, info_hash = %record.info_hash, "would resume completed torrent");
        tally.resumed += 1;
        return;
    }
    match client.start(&record.info_hash).await {
        Ok(()) => {
            info!(torrent = %record.name, info_hash = %record.info_hash, "resumed completed torrent");
            tally.resumed += 1;
        }
        Err(err) => {
            error!(torrent = %record.name, error = %err, "failed to resume torrent");
            tally.failed += 1;
        }
    }
}

async fn stop(record: &TorrentRecord, client: &dyn TorrentClient, mode: RunMode, tally: &mut RepairTally) {
    if mode.is_dry_run() {
        info!(torrent = %record.name, info_hash = %record.info_hash, "would stop torrent with missing peer");
        tally.stopped += 1;
        return;
    }
    match client.stop(&record.info_hash).await {
        Ok(()) => {
            info!(torrent = %record.name, info_hash = %record.info_hash, "stopped torrent with missing peer");
            tally.stopped += 1;
        }
        Err(err) => {
            error!(torrent = %record.name, error = %err, "failed to stop torrent");
            tally.failed += 1;
        }
    }
}

async fn relocate(
    record: &TorrentRecord,
    relative_file: &str,
    client: &dyn TorrentClient,
    resolver: &LocationResolver,
    mode: RunMode,
    tally: &mut RepairTally,
) {
    let Some(found) = resolver.resolve_blocking(relative_file).await else {
        warn!(
            torrent = %record.name,
            file = relative_file,
            root = %resolver.root().display(),
            "torrent data not found; retrying next cycle"
        );
        tally.deferred += 1;
        return;
    };
    let Some(location) = found.to_str() else {
        warn!(torrent = %record.name, location = %found.display(), "found location is not valid UTF-8");
        tally.deferred += 1;
        return;
    };

    if mode.is_dry_run() {
        info!(
            torrent = %record.name,
            from = %record.download_dir,
            to = location,
            "would relocate and verify torrent"
        );
        tally.relocated += 1;
        return;
    }

    if let Err(err) = client.move_data(&record.info_hash, location).await {
        error!(torrent = %record.name, location, error = %err, "failed to relocate torrent");
        tally.failed += 1;
        return;
    }
    info!(torrent = %record.name, from = %record.download_dir, to = location, "relocated torrent data");
    match client.verify(&record.info_hash).await {
        Ok(()) => {
            info!(torrent = %record.name, "verification requested");
            tally.relocated += 1;
        }
        Err(err) => {
            error!(torrent = %record.name, error = %err, "failed to request verification");
            tally.failed += 1;
        }
    }
}
