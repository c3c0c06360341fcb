//! Typed configuration consumed by the reconciliation service.

use std::path::PathBuf;
use std::time::Duration;

/// Transport used to reach a Transmission RPC endpoint.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Protocol {
    /// Plain HTTP.
    Http,
    /// HTTP over TLS.
    Https,
}

impl Protocol {
    /// URL scheme for the protocol.
    #[must_use]
    pub const fn scheme(self) -> &'static str {
        match self {
            Self::Http => "http",
            Self::Https => "https",
        }
    }
}

/// Connection settings for one torrent client instance.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InstanceConfig {
    /// Label used in log output (`remote` or `local`).
    pub label: String,
    /// Transport protocol.
    pub protocol: Protocol,
    /// Host name or address.
    pub host: String,
    /// RPC port.
    pub port: u16,
    /// RPC user.
    pub username: String,
    /// RPC password.
    pub password: String,
}

impl InstanceConfig {
    /// Full Transmission RPC endpoint.
    #[must_use]
    pub fn rpc_url(&self) -> String {
        format!(
            "{}://{}:{}/transmission/rpc",
            self.protocol.scheme(),
            self.host,
            self.port
        )
    }
}

/// Numeric owner and group applied to copied payloads and created directories.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Ownership {
    /// Owning user id.
    pub uid: u32,
    /// Owning group id.
    pub gid: u32,
}

impl Ownership {
    /// `uid:gid` form understood by the copy tool's `--chown` flag.
    #[must_use]
    pub fn chown_spec(self) -> String {
        format!("{}:{}", self.uid, self.gid)
    }
}

/// External executables and their deadlines.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ToolSettings {
    /// Copy executable.
    pub copy_program: String,
    /// Archive extraction executable.
    pub extract_program: String,
    /// Deadline for one copy process; `None` disables it.
    pub transfer_timeout: Option<Duration>,
    /// Deadline for one extraction process; `None` disables it.
    pub extract_timeout: Option<Duration>,
}

/// Milestone throttling applied to copy progress output.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProgressSettings {
    /// Percentages surfaced in the log, ascending and de-duplicated.
    pub milestones: Vec<u8>,
    /// Distance from a milestone that still counts as reaching it.
    pub tolerance: u8,
}

/// One *arr application whose queue is polled for missing-path reports.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ArrInstanceConfig {
    /// Application name (`sonarr`, `radarr`, ...).
    pub name: String,
    /// Base URL of the application.
    pub url: String,
    /// API key sent as `X-Api-Key`.
    pub api_key: String,
}

/// Logging knobs forwarded to the telemetry crate.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LogSettings {
    /// Tracing level directive (`debug`, `info`, `warn`, `error`).
    pub level: String,
    /// Requested output format (`json` or `pretty`); inferred when absent.
    pub format: Option<String>,
}

/// Complete service configuration, built once at startup.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SyncConfig {
    /// Seedbox-side instance.
    pub remote: InstanceConfig,
    /// Home-side instance.
    pub local: InstanceConfig,
    /// Remote root as seen by the remote instance, mounted at the same path locally.
    pub remote_root: PathBuf,
    /// Local root.
    pub local_root: PathBuf,
    /// Owner applied to transferred data.
    pub ownership: Ownership,
    /// Sleep between reconciliation cycles.
    pub interval: Duration,
    /// Interval of the read-only dry-run worker; disabled when `None`.
    pub dry_run_interval: Option<Duration>,
    /// HTTP timeout for instance and queue calls.
    pub rpc_timeout: Duration,
    /// External executables.
    pub tools: ToolSettings,
    /// Progress milestone settings.
    pub progress: ProgressSettings,
    /// Queue-API instances.
    pub arr: Vec<ArrInstanceConfig>,
    /// Logging settings.
    pub log: LogSettings,
}
