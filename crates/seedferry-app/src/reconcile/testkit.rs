//! Temporary remote/local roots wired to harmless stand-in tools.

use std::os::unix::fs::PermissionsExt;
use std::path::PathBuf;

use seedferry_config::SyncConfig;
use seedferry_fsops::{CopyRunner, Extractor};
use seedferry_test_support::{RecordBuilder, write_file};
use seedferry_torrent_core::TorrentRecord;
use tempfile::TempDir;

use super::plan::PathLayout;
use super::transfer::TransferPipeline;

/// Remote root, local root and metadata directory under one temp dir.
///
/// The copy tool is `true` (or `false` for [`Sandbox::failing`]) so copies
/// succeed or fail without touching the payload. [`Sandbox::scripted`] runs a
/// shell script instead; the source path is its fifth argument.
pub(crate) struct Sandbox {
    temp: TempDir,
    copy_program: String,
    transfer_timeout_secs: u64,
}

impl Sandbox {
    pub(crate) fn new() -> anyhow::Result<Self> {
        Self::with_copy_program("true")
    }

    pub(crate) fn failing() -> anyhow::Result<Self> {
        Self::with_copy_program("false")
    }

    pub(crate) fn scripted(body: &str) -> anyhow::Result<Self> {
        let mut sandbox = Self::with_copy_program("true")?;
        let script = sandbox.temp.path().join("bin").join("copy-tool");
        write_file(&script, format!("#!/bin/sh\n{body}\n").as_bytes())?;
        std::fs::set_permissions(&script, std::fs::Permissions::from_mode(0o755))?;
        sandbox.copy_program = script.to_string_lossy().into_owned();
        Ok(sandbox)
    }

    pub(crate) fn transfer_timeout(mut self, secs: u64) -> Self {
        self.transfer_timeout_secs = secs;
        self
    }

    fn with_copy_program(copy_program: &str) -> anyhow::Result<Self> {
        let temp = tempfile::tempdir()?;
        for dir in ["remote", "local", "torrents"] {
            std::fs::create_dir_all(temp.path().join(dir))?;
        }
        Ok(Self {
            temp,
            copy_program: copy_program.to_string(),
            transfer_timeout_secs: 30,
        })
    }

    pub(crate) fn remote_root(&self) -> PathBuf {
        self.temp.path().join("remote")
    }

    pub(crate) fn local_root(&self) -> PathBuf {
        self.temp.path().join("local")
    }

    pub(crate) fn layout(&self) -> PathLayout {
        PathLayout::new(self.remote_root(), self.local_root())
    }

    pub(crate) fn config(&self) -> anyhow::Result<SyncConfig> {
        let remote_root = self.remote_root().to_string_lossy().into_owned();
        let local_root = self.local_root().to_string_lossy().into_owned();
        let uid = nix::unistd::getuid().as_raw().to_string();
        let gid = nix::unistd::getgid().as_raw().to_string();
        let copy_program = self.copy_program.clone();
        let transfer_timeout = self.transfer_timeout_secs.to_string();
        let config = SyncConfig::from_lookup(|key| match key {
            "REMOTE_HOST" => Some("seedbox.invalid".to_string()),
            "REMOTE_DIRECTORY" => Some(remote_root.clone()),
            "LOCAL_DIRECTORY" => Some(local_root.clone()),
            "PUID" => Some(uid.clone()),
            "GUID" => Some(gid.clone()),
            "COPY_PROGRAM" => Some(copy_program.clone()),
            "EXTRACT_PROGRAM" => Some("true".to_string()),
            "TRANSFER_TIMEOUT_SECS" => Some(transfer_timeout.clone()),
            "EXTRACT_TIMEOUT_SECS" => Some("30".to_string()),
            _ => None,
        })?;
        Ok(config)
    }

    pub(crate) fn pipeline(&self) -> anyhow::Result<TransferPipeline> {
        let config = self.config()?;
        Ok(TransferPipeline::new(
            CopyRunner::new(&config.tools, &config.progress, config.ownership),
            Extractor::new(&config.tools),
        ))
    }

    /// Write a payload file under the remote root.
    pub(crate) fn remote_payload(&self, relative: &str, contents: &[u8]) -> anyhow::Result<()> {
        write_file(&self.remote_root().join(relative), contents)
    }

    /// Seeding remote record whose `.torrent` file exists with `metainfo`.
    pub(crate) fn seeding_record(
        &self,
        hash: &str,
        relative_dir: &str,
        name: &str,
        metainfo: &[u8],
    ) -> anyhow::Result<TorrentRecord> {
        let torrent_file = self.torrent_file(hash);
        write_file(&torrent_file, metainfo)?;
        Ok(RecordBuilder::new(hash)
            .name(name)
            .seeding()
            .download_dir(&self.remote_root().join(relative_dir).to_string_lossy())
            .torrent_file(&torrent_file.to_string_lossy())
            .build())
    }

    pub(crate) fn torrent_file(&self, hash: &str) -> PathBuf {
        self.temp.path().join("torrents").join(format!("{hash}.torrent"))
    }
}
