//! Normalised torrent snapshot types shared by both instances.

use std::path::Path;

use serde::{Deserialize, Serialize};

/// Lifecycle state reported by a torrent client, encoded numerically 0–6.
///
/// Any code outside that range, or a missing code, maps to [`TorrentState::Unknown`]
/// so it can never be mistaken for [`TorrentState::Stopped`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum TorrentState {
    /// Paused by the user or the pipeline.
    Stopped,
    /// Waiting for a verification slot.
    QueuedVerify,
    /// Hash-checking local data.
    Verifying,
    /// Waiting for a download slot.
    QueuedDownload,
    /// Actively downloading.
    Downloading,
    /// Waiting for a seeding slot.
    QueuedSeed,
    /// Complete and seeding.
    Seeding,
    /// Missing or unrecognised status code.
    #[default]
    Unknown,
}

impl TorrentState {
    /// Decode a numeric status code.
    #[must_use]
    pub const fn from_code(code: i64) -> Self {
        match code {
            0 => Self::Stopped,
            1 => Self::QueuedVerify,
            2 => Self::Verifying,
            3 => Self::QueuedDownload,
            4 => Self::Downloading,
            5 => Self::QueuedSeed,
            6 => Self::Seeding,
            _ => Self::Unknown,
        }
    }

    /// Numeric status code, `7` for [`TorrentState::Unknown`].
    #[must_use]
    pub const fn code(self) -> u8 {
        match self {
            Self::Stopped => 0,
            Self::QueuedVerify => 1,
            Self::Verifying => 2,
            Self::QueuedDownload => 3,
            Self::Downloading => 4,
            Self::QueuedSeed => 5,
            Self::Seeding => 6,
            Self::Unknown => 7,
        }
    }

    /// Whether the client is verifying or about to verify local data.
    #[must_use]
    pub const fn is_verifying(self) -> bool {
        matches!(self, Self::QueuedVerify | Self::Verifying)
    }

    /// Short label for log output.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Stopped => "stopped",
            Self::QueuedVerify => "queued_verify",
            Self::Verifying => "verifying",
            Self::QueuedDownload => "queued_download",
            Self::Downloading => "downloading",
            Self::QueuedSeed => "queued_seed",
            Self::Seeding => "seeding",
            Self::Unknown => "unknown",
        }
    }
}

/// Recoverable conditions recognised by substring in a client's error string.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KnownCondition {
    /// Local client holds a stale peer reference; cleared by stopping the torrent.
    StoppedPeerMissing,
    /// Local client cannot find the payload at its download directory.
    NoDataFound,
    /// Remote client exhausted its file handles; cleared by a stop/start cycle.
    TooManyOpenFiles,
}

impl KnownCondition {
    /// Literal fragment matched against the error string.
    #[must_use]
    pub const fn fragment(self) -> &'static str {
        match self {
            Self::StoppedPeerMissing => "Stopped peer doesn't exist",
            Self::NoDataFound => "No data found!",
            Self::TooManyOpenFiles => "Too many open save files",
        }
    }

    /// Whether `error_string` reports this condition.
    #[must_use]
    pub fn matches(self, error_string: &str) -> bool {
        error_string.contains(self.fragment())
    }
}

/// One file inside a torrent payload.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TorrentFile {
    /// Path relative to the torrent's download directory.
    pub name: String,
    /// File size in bytes.
    pub length: u64,
}

/// Snapshot of one torrent as reported by a client, rebuilt every cycle.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct TorrentRecord {
    /// Client-local numeric handle; not stable across clients.
    pub id: i64,
    /// Stable identifier used for every mutating call.
    pub info_hash: String,
    /// Display name; may collide across torrents and is never used as a key.
    pub name: String,
    /// Lifecycle state.
    pub state: TorrentState,
    /// Completion in percent, always within `[0, 100]`.
    pub percent_done: f64,
    /// Free-text error reported by the client, empty when healthy.
    pub error_string: String,
    /// Absolute download directory as seen by the owning client.
    pub download_dir: String,
    /// Payload files in client order.
    pub files: Vec<TorrentFile>,
    /// Full path of the `.torrent` metadata file, empty when unknown.
    pub torrent_file_path: String,
    /// Basename of [`TorrentRecord::torrent_file_path`]; the "already transferred" key.
    pub torrent_file_name: String,
}

impl TorrentRecord {
    /// Convert a client-side completion fraction (`0.0..=1.0`) into percent.
    #[must_use]
    pub fn percent_from_fraction(fraction: f64) -> f64 {
        if fraction.is_nan() {
            return 0.0;
        }
        (fraction * 100.0).clamp(0.0, 100.0)
    }

    /// Basename of a metadata file path, empty for an empty path.
    #[must_use]
    pub fn file_name_of(path: &str) -> String {
        Path::new(path)
            .file_name()
            .and_then(|name| name.to_str())
            .unwrap_or_default()
            .to_string()
    }

    /// Whether every byte has been downloaded.
    #[must_use]
    pub fn is_complete(&self) -> bool {
        self.percent_done >= 100.0
    }

    /// Whether the client reports the given condition.
    #[must_use]
    pub fn reports(&self, condition: KnownCondition) -> bool {
        condition.matches(&self.error_string)
    }

    /// Largest payload file; ties resolve to the earliest file.
    #[must_use]
    pub fn largest_file(&self) -> Option<&TorrentFile> {
        self.files
            .iter()
            .reduce(|best, file| if file.length > best.length { file } else { best })
    }

    /// Whether the record carries a usable metadata file name.
    #[must_use]
    pub fn has_torrent_file(&self) -> bool {
        !self.torrent_file_name.is_empty()
    }
}

/// Request payload for registering a `.torrent` file with a client.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AddTorrent {
    /// Raw bencoded metainfo bytes.
    pub metainfo: Vec<u8>,
    /// Whether the torrent should be admitted paused.
    pub paused: bool,
    /// Absolute download directory on the receiving client.
    pub download_dir: String,
}
