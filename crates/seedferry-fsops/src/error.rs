//! Error types for filesystem and subprocess operations.

use std::io;
use std::path::{Path, PathBuf};
use std::time::Duration;

use thiserror::Error;

/// Primary error type for filesystem and subprocess operations.
#[derive(Debug, Error)]
pub enum FsOpsError {
    /// IO failures while interacting with the filesystem.
    #[error("fsops io failure")]
    Io {
        /// Operation that triggered the failure.
        operation: &'static str,
        /// Path involved in the failure.
        path: PathBuf,
        /// Underlying IO error.
        #[source]
        source: io::Error,
    },
    /// Ownership changes rejected by the operating system.
    #[error("fsops ownership failure")]
    Nix {
        /// Operation that triggered the failure.
        operation: &'static str,
        /// Path whose ownership could not be changed.
        path: PathBuf,
        /// Underlying errno.
        #[source]
        source: nix::Error,
    },
    /// The external program could not be started.
    #[error("failed to spawn external program")]
    Spawn {
        /// Program that failed to start.
        program: String,
        /// Underlying IO error.
        #[source]
        source: io::Error,
    },
    /// Waiting for the external program failed.
    #[error("failed to wait for external program")]
    Wait {
        /// Program being waited on.
        program: String,
        /// Underlying IO error.
        #[source]
        source: io::Error,
    },
    /// The external program exceeded its deadline and was killed.
    #[error("external program timed out")]
    Timeout {
        /// Program that timed out.
        program: String,
        /// Deadline that elapsed.
        after: Duration,
    },
    /// The external program was killed because shutdown was requested.
    #[error("external program cancelled")]
    Cancelled {
        /// Program that was cancelled.
        program: String,
    },
    /// Ownership changes are not available on this platform.
    #[error("fsops operation unsupported")]
    Unsupported {
        /// Operation that was requested.
        operation: &'static str,
    },
}

impl FsOpsError {
    pub(crate) fn io(operation: &'static str, path: &Path, source: io::Error) -> Self {
        Self::Io {
            operation,
            path: path.to_path_buf(),
            source,
        }
    }

    /// Whether the error came from a shutdown request rather than a fault.
    #[must_use]
    pub const fn is_cancelled(&self) -> bool {
        matches!(self, Self::Cancelled { .. })
    }
}

/// Convenience alias for filesystem operation results.
pub type FsOpsResult<T> = Result<T, FsOpsError>;
