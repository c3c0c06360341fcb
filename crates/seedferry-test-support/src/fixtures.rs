//! Record builders and filesystem helpers.

use std::fs;
use std::path::Path;

use anyhow::Result;
use seedferry_torrent_core::{TorrentFile, TorrentRecord, TorrentState};

/// Builder for [`TorrentRecord`] fixtures.
#[derive(Debug, Clone)]
pub struct RecordBuilder {
    record: TorrentRecord,
}

impl RecordBuilder {
    /// Start a record with the given info hash; the name defaults to the hash.
    #[must_use]
    pub fn new(info_hash: &str) -> Self {
        Self {
            record: TorrentRecord {
                info_hash: info_hash.to_string(),
                name: info_hash.to_string(),
                ..TorrentRecord::default()
            },
        }
    }

    /// Display name.
    #[must_use]
    pub fn name(mut self, name: &str) -> Self {
        self.record.name = name.to_string();
        self
    }

    /// Lifecycle state.
    #[must_use]
    pub fn state(mut self, state: TorrentState) -> Self {
        self.record.state = state;
        self
    }

    /// Completion in percent.
    #[must_use]
    pub fn percent(mut self, percent: f64) -> Self {
        self.record.percent_done = percent;
        self
    }

    /// Client error text.
    #[must_use]
    pub fn error(mut self, error: &str) -> Self {
        self.record.error_string = error.to_string();
        self
    }

    /// Download directory.
    #[must_use]
    pub fn download_dir(mut self, dir: &str) -> Self {
        self.record.download_dir = dir.to_string();
        self
    }

    /// Append a payload file.
    #[must_use]
    pub fn file(mut self, name: &str, length: u64) -> Self {
        self.record.files.push(TorrentFile {
            name: name.to_string(),
            length,
        });
        self
    }

    /// Metadata file path; the name is derived from it.
    #[must_use]
    pub fn torrent_file(mut self, path: &str) -> Self {
        self.record.torrent_file_path = path.to_string();
        self.record.torrent_file_name = TorrentRecord::file_name_of(path);
        self
    }

    /// Seeding, fully downloaded.
    #[must_use]
    pub fn seeding(self) -> Self {
        self.state(TorrentState::Seeding).percent(100.0)
    }

    /// Finish the record.
    #[must_use]
    pub fn build(self) -> TorrentRecord {
        self.record
    }
}

/// Write `contents` to `path`, creating parent directories.
///
/// # Errors
///
/// Returns an error if a directory or the file cannot be written.
pub fn write_file(path: &Path, contents: &[u8]) -> Result<()> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)?;
    }
    fs::write(path, contents)?;
    Ok(())
}
