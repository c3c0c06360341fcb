//! Error types for torrent client operations.

use std::error::Error;

use thiserror::Error;

/// Primary error type for torrent client operations.
#[derive(Debug, Error)]
pub enum TorrentError {
    /// Operation is not supported by the underlying client.
    #[error("torrent operation not supported")]
    Unsupported {
        /// Operation identifier.
        operation: &'static str,
    },
    /// Operation failed in the underlying client.
    #[error("torrent operation failed")]
    OperationFailed {
        /// Operation identifier.
        operation: &'static str,
        /// Info hash of the addressed torrent when available.
        info_hash: Option<String>,
        /// Underlying failure.
        #[source]
        source: Box<dyn Error + Send + Sync>,
    },
    /// The client answered but refused the request.
    #[error("torrent operation rejected")]
    Rejected {
        /// Operation identifier.
        operation: &'static str,
        /// Reason reported by the client.
        reason: String,
    },
}

impl TorrentError {
    /// Wrap an adapter failure for the given operation.
    pub fn failed(
        operation: &'static str,
        info_hash: Option<&str>,
        source: impl Into<Box<dyn Error + Send + Sync>>,
    ) -> Self {
        Self::OperationFailed {
            operation,
            info_hash: info_hash.map(str::to_string),
            source: source.into(),
        }
    }

    /// Operation identifier carried by every variant.
    #[must_use]
    pub const fn operation(&self) -> &'static str {
        match self {
            Self::Unsupported { operation }
            | Self::OperationFailed { operation, .. }
            | Self::Rejected { operation, .. } => operation,
        }
    }
}

/// Convenience alias for torrent operation results.
pub type TorrentResult<T> = Result<T, TorrentError>;
