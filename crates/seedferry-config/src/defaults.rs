//! Fallback values applied when an environment variable is absent.
//!
//! # Design
//! - Keep every default in one place so operators can audit them.
//! - Defaults mirror a typical seedbox + home-server Transmission pairing.

/// Transmission RPC port.
pub const RPC_PORT: u16 = 9091;
/// Transmission RPC user.
pub const RPC_USERNAME: &str = "transmission";
/// Transmission RPC password.
pub const RPC_PASSWORD: &str = "password";
/// Protocol used to reach the remote instance.
pub const REMOTE_PROTOCOL: &str = "https";
/// Protocol used to reach the local instance.
pub const LOCAL_PROTOCOL: &str = "http";
/// Remote root as seen by the remote instance.
pub const REMOTE_DIRECTORY: &str = "/downloads";
/// Local root.
pub const LOCAL_DIRECTORY: &str = "/data";
/// Local instance host.
pub const LOCAL_HOST: &str = "192.168.0.100";
/// Owner applied to copied payloads.
pub const PUID: u32 = 1001;
/// Group applied to copied payloads.
pub const GUID: u32 = 1001;
/// Seconds between reconciliation cycles.
pub const SYNC_INTERVAL_SECS: u64 = 600;
/// Deadline for one copy process in seconds.
pub const TRANSFER_TIMEOUT_SECS: u64 = 43_200;
/// Deadline for one extraction process in seconds.
pub const EXTRACT_TIMEOUT_SECS: u64 = 3_600;
/// HTTP timeout for instance and queue calls in seconds.
pub const RPC_TIMEOUT_SECS: u64 = 30;
/// Copy executable.
pub const COPY_PROGRAM: &str = "rsync";
/// Extraction executable.
pub const EXTRACT_PROGRAM: &str = "unrar";
/// Progress percentages surfaced in the log.
pub const PROGRESS_MILESTONES: &[u8] = &[10, 25, 50, 75, 90];
/// Distance from a milestone that still counts as reaching it.
pub const PROGRESS_TOLERANCE: u8 = 2;
/// Log level used when `LOG_LEVEL` is absent or unrecognised.
pub const LOG_LEVEL: &str = "info";
/// Queue-API applications probed for `{NAME}_URL` / `{NAME}_API_KEY` pairs.
pub const ARR_APPLICATIONS: &[&str] = &["sonarr", "radarr", "lidarr", "readarr"];
