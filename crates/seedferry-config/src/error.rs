//! Error types for configuration loading.

use thiserror::Error;

/// Primary error type for configuration operations.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// A required environment variable was not set.
    #[error("missing required configuration")]
    Missing {
        /// Name of the missing variable.
        name: &'static str,
    },
    /// A variable contained an invalid value.
    #[error("invalid configuration field")]
    InvalidField {
        /// Variable that failed validation.
        field: &'static str,
        /// Offending value when available.
        value: Option<String>,
        /// Machine-readable reason for the failure.
        reason: &'static str,
    },
    /// Two variables must be supplied together.
    #[error("incomplete configuration pair")]
    IncompletePair {
        /// Variable that was supplied.
        present: String,
        /// Variable that was missing.
        missing: String,
    },
}

impl ConfigError {
    pub(crate) fn invalid(field: &'static str, value: &str, reason: &'static str) -> Self {
        Self::InvalidField {
            field,
            value: Some(value.to_string()),
            reason,
        }
    }
}

/// Convenience alias for configuration results.
pub type ConfigResult<T> = Result<T, ConfigError>;
