//! # Design
//!
//! - Centralize errors that can stop the service or end a whole cycle.
//! - Keep error messages constant while carrying context fields for debugging.
//! - Per-record, per-task and per-call failures are logged where they happen and never
//!   reach this type.

use thiserror::Error;

/// Result alias for application operations.
pub type AppResult<T> = Result<T, AppError>;

/// Application-level error type.
#[derive(Debug, Error)]
pub enum AppError {
    /// Configuration could not be loaded.
    #[error("configuration operation failed")]
    Config {
        /// Operation identifier.
        operation: &'static str,
        /// Source configuration error.
        source: seedferry_config::ConfigError,
    },
    /// Telemetry could not be installed.
    #[error("telemetry operation failed")]
    Telemetry {
        /// Operation identifier.
        operation: &'static str,
        /// Source telemetry error.
        source: seedferry_telemetry::TelemetryError,
    },
    /// A torrent instance call needed by the whole cycle failed.
    #[error("torrent instance operation failed")]
    Torrent {
        /// Operation identifier.
        operation: &'static str,
        /// Label of the instance that failed.
        instance: String,
        /// Source torrent error.
        source: seedferry_torrent_core::TorrentError,
    },
    /// A worker task panicked or was aborted.
    #[error("worker task failed")]
    Worker {
        /// Worker mode.
        worker: &'static str,
        /// Join failure.
        source: tokio::task::JoinError,
    },
}

impl AppError {
    pub(crate) const fn config(
        operation: &'static str,
        source: seedferry_config::ConfigError,
    ) -> Self {
        Self::Config { operation, source }
    }

    pub(crate) const fn telemetry(
        operation: &'static str,
        source: seedferry_telemetry::TelemetryError,
    ) -> Self {
        Self::Telemetry { operation, source }
    }

    pub(crate) fn torrent(
        operation: &'static str,
        instance: &str,
        source: seedferry_torrent_core::TorrentError,
    ) -> Self {
        Self::Torrent {
            operation,
            instance: instance.to_string(),
            source,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::error::Error;

    #[test]
    fn app_error_helpers_build_variants() {
        let config = AppError::config(
            "load",
            seedferry_config::ConfigError::Missing {
                name: "REMOTE_HOST",
            },
        );
        assert!(matches!(config, AppError::Config { .. }));
        assert!(config.source().is_some());

        let torrent = AppError::torrent(
            "cycle.list_local",
            "local",
            seedferry_torrent_core::TorrentError::Unsupported { operation: "list" },
        );
        assert!(matches!(
            torrent,
            AppError::Torrent { ref instance, .. } if instance == "local"
        ));
        assert_eq!(torrent.to_string(), "torrent instance operation failed");
    }
}
