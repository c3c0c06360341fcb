//! Decide which remote torrents still need transferring.

use std::collections::HashSet;
use std::path::{Component, Path, PathBuf};

use seedferry_torrent_core::{KnownCondition, TorrentRecord, TorrentState};
use tracing::{debug, info, warn};
use uuid::Uuid;

/// Maps paths between the remote and local roots.
///
/// The remote root is mounted locally at the path the remote instance reports,
/// so remote download directories can be read directly.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PathLayout {
    remote_root: PathBuf,
    local_root: PathBuf,
}

impl PathLayout {
    /// Layout for the given roots.
    #[must_use]
    pub fn new(remote_root: impl Into<PathBuf>, local_root: impl Into<PathBuf>) -> Self {
        Self {
            remote_root: remote_root.into(),
            local_root: local_root.into(),
        }
    }

    /// Remote root.
    #[must_use]
    pub fn remote_root(&self) -> &Path {
        &self.remote_root
    }

    /// Local root.
    #[must_use]
    pub fn local_root(&self) -> &Path {
        &self.local_root
    }

    /// Path of a remote download directory relative to the remote root.
    ///
    /// Returns `None` for directories outside the root or containing `..`.
    #[must_use]
    pub fn relative_dir(&self, download_dir: &str) -> Option<PathBuf> {
        relative_under(&self.remote_root, Path::new(download_dir))
    }

    /// Remote counterpart of a path under the local root.
    #[must_use]
    pub fn local_to_remote(&self, local: &Path) -> Option<PathBuf> {
        relative_under(&self.local_root, local).map(|relative| self.remote_root.join(relative))
    }
}

fn relative_under(root: &Path, path: &Path) -> Option<PathBuf> {
    let relative = path.strip_prefix(root).ok()?;
    relative
        .components()
        .all(|component| matches!(component, Component::Normal(_)))
        .then(|| relative.to_path_buf())
}

/// One payload to copy from the remote root to the local root.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransferTask {
    /// Correlation id for the transfer's log lines.
    pub id: Uuid,
    /// Remote display name; also the payload's file or directory name.
    pub name: String,
    /// Remote info hash.
    pub info_hash: String,
    /// Download directory relative to either root.
    pub relative_dir: PathBuf,
    /// Payload under the remote root.
    pub source_path: PathBuf,
    /// Payload under the local root.
    pub dest_path: PathBuf,
    /// Download directory handed to the local instance.
    pub local_download_dir: PathBuf,
    /// Remote `.torrent` file.
    pub torrent_file_path: PathBuf,
    /// Basename of [`TransferTask::torrent_file_path`].
    pub torrent_file_name: String,
}

/// Remote torrent that reported an exhausted file-handle pool.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Restart {
    /// Remote info hash.
    pub info_hash: String,
    /// Display name.
    pub name: String,
}

/// Output of [`plan_transfers`].
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RemotePlan {
    /// Remote torrents to stop and start again.
    pub restarts: Vec<Restart>,
    /// Transfers in remote listing order.
    pub tasks: Vec<TransferTask>,
}

/// Plan restarts and transfers for the remote snapshot against the local snapshot.
///
/// A remote torrent is transferred once it is seeding with complete data and
/// no local torrent carries the same `.torrent` file name.
#[must_use]
pub fn plan_transfers(
    remote: &[TorrentRecord],
    local: &[TorrentRecord],
    layout: &PathLayout,
) -> RemotePlan {
    let transferred: HashSet<&str> = local
        .iter()
        .filter(|record| record.has_torrent_file())
        .map(|record| record.torrent_file_name.as_str())
        .collect();

    let mut plan = RemotePlan::default();
    for record in remote {
        if record.has_torrent_file() && transferred.contains(record.torrent_file_name.as_str()) {
            debug!(torrent = %record.name, "already transferred to the local instance");
            continue;
        }

        if record.reports(KnownCondition::TooManyOpenFiles) {
            plan.restarts.push(Restart {
                info_hash: record.info_hash.clone(),
                name: record.name.clone(),
            });
        }

        if record.state != TorrentState::Seeding || !record.is_complete() {
            debug!(
                torrent = %record.name,
                state = record.state.as_str(),
                percent = record.percent_done,
                "not ready for transfer"
            );
            continue;
        }

        match task_for(record, layout) {
            Ok(task) => {
                info!(
                    torrent = %task.name,
                    task_id = %task.id,
                    relative_dir = %task.relative_dir.display(),
                    "planned transfer"
                );
                plan.tasks.push(task);
            }
            Err(reason) => warn!(
                torrent = %record.name,
                download_dir = %record.download_dir,
                reason,
                "skipping remote torrent"
            ),
        }
    }
    plan
}

fn task_for(record: &TorrentRecord, layout: &PathLayout) -> Result<TransferTask, &'static str> {
    if !record.has_torrent_file() {
        return Err("missing_torrent_file");
    }
    let relative_dir = layout
        .relative_dir(&record.download_dir)
        .ok_or("outside_remote_root")?;
    let mut name_components = Path::new(&record.name).components();
    if !matches!(
        (name_components.next(), name_components.next()),
        (Some(Component::Normal(_)), None)
    ) {
        return Err("unsafe_name");
    }

    let remote_dir = layout.remote_root.join(&relative_dir);
    let local_download_dir = layout.local_root.join(&relative_dir);
    Ok(TransferTask {
        id: Uuid::new_v4(),
        name: record.name.clone(),
        info_hash: record.info_hash.clone(),
        source_path: remote_dir.join(&record.name),
        dest_path: local_download_dir.join(&record.name),
        local_download_dir,
        relative_dir,
        torrent_file_path: PathBuf::from(&record.torrent_file_path),
        torrent_file_name: record.torrent_file_name.clone(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use seedferry_test_support::RecordBuilder;

    fn layout() -> PathLayout {
        PathLayout::new("/downloads", "/data")
    }

    fn seeding(hash: &str) -> RecordBuilder {
        RecordBuilder::new(hash)
            .name(&format!("{hash}.name"))
            .seeding()
            .download_dir("/downloads/tv/showX")
            .torrent_file(&format!("/config/torrents/{hash}.torrent"))
    }

    #[test]
    fn relative_dir_rebases_onto_local_root() {
        let relative = layout().relative_dir("/downloads/tv/showX");
        assert_eq!(relative.as_deref(), Some(Path::new("tv/showX")));
        let local = relative.map(|relative| layout().local_root().join(relative));
        assert_eq!(local.as_deref(), Some(Path::new("/data/tv/showX")));
    }

    #[test]
    fn relative_dir_rejects_foreign_and_parent_paths() {
        assert_eq!(layout().relative_dir("/downloads2/tv"), None);
        assert_eq!(layout().relative_dir("/other/tv"), None);
        assert_eq!(layout().relative_dir("/downloads/../etc"), None);
        assert_eq!(
            layout().relative_dir("/downloads").as_deref(),
            Some(Path::new(""))
        );
    }

    #[test]
    fn local_paths_map_back_to_remote() {
        assert_eq!(
            layout()
                .local_to_remote(Path::new("/data/tv/Show/ep.mkv"))
                .as_deref(),
            Some(Path::new("/downloads/tv/Show/ep.mkv"))
        );
        assert_eq!(layout().local_to_remote(Path::new("/mnt/tv/ep.mkv")), None);
    }

    #[test]
    fn seeding_complete_torrent_becomes_a_task() {
        let plan = plan_transfers(&[seeding("a").build()], &[], &layout());
        assert_eq!(plan.tasks.len(), 1);
        let task = &plan.tasks[0];
        assert_eq!(task.relative_dir, PathBuf::from("tv/showX"));
        assert_eq!(task.source_path, PathBuf::from("/downloads/tv/showX/a.name"));
        assert_eq!(task.dest_path, PathBuf::from("/data/tv/showX/a.name"));
        assert_eq!(task.local_download_dir, PathBuf::from("/data/tv/showX"));
        assert_eq!(task.torrent_file_name, "a.torrent");
        assert!(plan.restarts.is_empty());
    }

    #[test]
    fn only_seeding_at_full_completion_qualifies() {
        let remote = vec![
            seeding("almost").percent(99.9).build(),
            seeding("stopped").state(TorrentState::Stopped).build(),
            seeding("downloading")
                .state(TorrentState::Downloading)
                .build(),
            seeding("done").build(),
        ];
        let plan = plan_transfers(&remote, &[], &layout());
        let names: Vec<&str> = plan.tasks.iter().map(|task| task.name.as_str()).collect();
        assert_eq!(names, vec!["done.name"]);
    }

    #[test]
    fn already_transferred_torrents_are_never_planned() {
        let remote = vec![seeding("a").build(), seeding("b").build()];
        let local = vec![
            RecordBuilder::new("other-hash")
                .torrent_file("/var/lib/transmission/torrents/a.torrent")
                .build(),
        ];
        let plan = plan_transfers(&remote, &local, &layout());
        let names: Vec<&str> = plan.tasks.iter().map(|task| task.name.as_str()).collect();
        assert_eq!(names, vec!["b.name"]);
    }

    #[test]
    fn missing_metadata_never_matches_and_is_skipped() {
        let remote = vec![
            RecordBuilder::new("bare")
                .seeding()
                .download_dir("/downloads/tv")
                .build(),
        ];
        let local = vec![RecordBuilder::new("local-bare").build()];
        let plan = plan_transfers(&remote, &local, &layout());
        assert!(plan.tasks.is_empty());
    }

    #[test]
    fn too_many_open_files_schedules_a_restart_and_keeps_evaluating() {
        let remote = vec![
            seeding("busy")
                .error("Too many open save files (24)")
                .build(),
            seeding("waiting")
                .state(TorrentState::Downloading)
                .percent(40.0)
                .error("Too many open save files")
                .build(),
        ];
        let plan = plan_transfers(&remote, &[], &layout());
        let restarts: Vec<&str> = plan
            .restarts
            .iter()
            .map(|restart| restart.info_hash.as_str())
            .collect();
        assert_eq!(restarts, vec!["busy", "waiting"]);
        assert_eq!(plan.tasks.len(), 1);
    }

    #[test]
    fn records_outside_the_root_or_with_unsafe_names_are_skipped() {
        let remote = vec![
            seeding("outside").download_dir("/elsewhere/tv").build(),
            seeding("escape").name("../escape").build(),
            seeding("nested").name("tv/nested").build(),
        ];
        let plan = plan_transfers(&remote, &[], &layout());
        assert!(plan.tasks.is_empty());
    }
}
