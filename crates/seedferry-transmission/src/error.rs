//! Error types for the Transmission adapter.

use seedferry_torrent_core::TorrentError;
use thiserror::Error;

/// Failures raised while talking to a Transmission instance.
#[derive(Debug, Error)]
pub enum TransmissionError {
    /// The HTTP client could not be constructed.
    #[error("failed to build transmission http client")]
    Build {
        /// Underlying reqwest error.
        #[source]
        source: reqwest::Error,
    },
    /// The request could not be sent or the response body could not be read.
    #[error("transmission request failed")]
    Http {
        /// RPC method being invoked.
        method: &'static str,
        /// Underlying reqwest error.
        #[source]
        source: reqwest::Error,
    },
    /// The server answered 409 without a session identifier.
    #[error("transmission session handshake failed")]
    SessionHandshake {
        /// RPC method being invoked.
        method: &'static str,
    },
    /// The server answered with an unexpected HTTP status.
    #[error("transmission returned unexpected status")]
    Status {
        /// RPC method being invoked.
        method: &'static str,
        /// HTTP status code.
        status: u16,
    },
    /// The response body was not a valid RPC response.
    #[error("failed to decode transmission response")]
    Decode {
        /// RPC method being invoked.
        method: &'static str,
        /// Underlying serde error.
        #[source]
        source: serde_json::Error,
    },
    /// The RPC call completed but reported a non-success result.
    #[error("transmission rejected the request")]
    Rejected {
        /// RPC method being invoked.
        method: &'static str,
        /// `result` string returned by the server.
        result: String,
    },
}

impl TransmissionError {
    /// Convert into the capability-level error for `operation`.
    #[must_use]
    pub fn into_torrent_error(self, operation: &'static str, info_hash: Option<&str>) -> TorrentError {
        match self {
            Self::Rejected { result, .. } => TorrentError::Rejected {
                operation,
                reason: result,
            },
            other => TorrentError::failed(operation, info_hash, other),
        }
    }
}

/// Convenience alias for adapter results.
pub type TransmissionResult<T> = Result<T, TransmissionError>;
