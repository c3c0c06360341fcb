//! Transmission RPC payloads and conversion into [`TorrentRecord`].

use serde::{Deserialize, Serialize};
use seedferry_torrent_core::{TorrentFile, TorrentRecord, TorrentState};

/// Fields requested from `torrent-get`.
pub const TORRENT_FIELDS: &[&str] = &[
    "id",
    "hashString",
    "name",
    "status",
    "percentDone",
    "errorString",
    "downloadDir",
    "files",
    "torrentFile",
];

/// RPC envelope sent to the server.
#[derive(Debug, Serialize)]
pub struct RpcRequest<'a, A> {
    /// Method name (`torrent-get`, `torrent-start`, ...).
    pub method: &'a str,
    /// Method arguments.
    pub arguments: A,
}

/// RPC envelope returned by the server.
#[derive(Debug, Deserialize)]
pub struct RpcResponse<T> {
    /// `success` or an error description.
    pub result: String,
    /// Method-specific payload.
    pub arguments: Option<T>,
}

/// Arguments for `torrent-get`.
#[derive(Debug, Serialize)]
pub struct TorrentGetArgs<'a> {
    /// Requested fields.
    pub fields: &'a [&'a str],
}

/// Arguments addressing torrents by hash.
#[derive(Debug, Serialize)]
pub struct IdsArgs<'a> {
    /// Info hashes.
    pub ids: [&'a str; 1],
}

/// Arguments for `torrent-set-location`.
#[derive(Debug, Serialize)]
pub struct SetLocationArgs<'a> {
    /// Info hashes.
    pub ids: [&'a str; 1],
    /// New data location.
    pub location: &'a str,
    /// Move existing data instead of only re-pointing.
    #[serde(rename = "move")]
    pub move_data: bool,
}

/// Arguments for `torrent-add`.
#[derive(Debug, Serialize)]
pub struct AddArgs<'a> {
    /// Base64-encoded metainfo.
    pub metainfo: String,
    /// Admit the torrent paused.
    pub paused: bool,
    /// Download directory on the receiving instance.
    #[serde(rename = "download-dir")]
    pub download_dir: &'a str,
}

/// Empty argument object.
#[derive(Debug, Serialize, Default)]
pub struct NoArgs {}

/// `torrent-get` payload.
#[derive(Debug, Deserialize, Default)]
pub struct TorrentList {
    /// Listed torrents.
    #[serde(default)]
    pub torrents: Vec<WireTorrent>,
}

/// `torrent-add` payload; exactly one field is normally present.
#[derive(Debug, Deserialize, Default)]
pub struct AddedTorrent {
    /// Set when the torrent was newly added.
    #[serde(rename = "torrent-added")]
    pub added: Option<AddedRef>,
    /// Set when the torrent was already known.
    #[serde(rename = "torrent-duplicate")]
    pub duplicate: Option<AddedRef>,
}

/// Identity of an added torrent.
#[derive(Debug, Deserialize, Default)]
pub struct AddedRef {
    /// Display name.
    #[serde(default)]
    pub name: String,
    /// Info hash.
    #[serde(rename = "hashString", default)]
    pub hash_string: String,
}

/// Torrent as returned by `torrent-get`; every field may be absent.
#[derive(Debug, Deserialize, Default)]
#[serde(rename_all = "camelCase", default)]
pub struct WireTorrent {
    /// Session-scoped numeric id.
    pub id: i64,
    /// Info hash.
    pub hash_string: String,
    /// Display name.
    pub name: String,
    /// Numeric status code.
    pub status: Option<i64>,
    /// Completion fraction `0.0..=1.0`.
    pub percent_done: Option<f64>,
    /// Client error text.
    pub error_string: String,
    /// Download directory as seen by the instance.
    pub download_dir: String,
    /// Payload files.
    pub files: Vec<WireFile>,
    /// Path of the stored `.torrent` file.
    pub torrent_file: String,
}

/// One payload file.
#[derive(Debug, Deserialize, Default)]
#[serde(rename_all = "camelCase", default)]
pub struct WireFile {
    /// Path relative to the download directory.
    pub name: String,
    /// Size in bytes.
    pub length: u64,
}

impl From<WireTorrent> for TorrentRecord {
    fn from(wire: WireTorrent) -> Self {
        let torrent_file_name = Self::file_name_of(&wire.torrent_file);
        Self {
            id: wire.id,
            info_hash: wire.hash_string,
            name: wire.name,
            state: wire
                .status
                .map_or(TorrentState::Unknown, TorrentState::from_code),
            percent_done: Self::percent_from_fraction(wire.percent_done.unwrap_or(0.0)),
            error_string: wire.error_string,
            download_dir: wire.download_dir,
            files: wire
                .files
                .into_iter()
                .map(|file| TorrentFile {
                    name: file.name,
                    length: file.length,
                })
                .collect(),
            torrent_file_path: wire.torrent_file,
            torrent_file_name,
        }
    }
}
