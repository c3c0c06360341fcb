//! Error types for queue API calls.

use thiserror::Error;

/// Failures raised while reading a queue.
#[derive(Debug, Error)]
pub enum ArrError {
    /// The HTTP client could not be constructed.
    #[error("failed to build queue http client")]
    Build {
        /// Underlying reqwest error.
        #[source]
        source: reqwest::Error,
    },
    /// The request failed in transit.
    #[error("queue request failed")]
    Http {
        /// Application name.
        instance: String,
        /// Underlying reqwest error.
        #[source]
        source: reqwest::Error,
    },
    /// The application answered with a non-success status.
    #[error("queue request returned unexpected status")]
    Status {
        /// Application name.
        instance: String,
        /// HTTP status code.
        status: u16,
    },
    /// The response body was not a queue page.
    #[error("failed to decode queue response")]
    Decode {
        /// Application name.
        instance: String,
        /// Underlying serde error.
        #[source]
        source: serde_json::Error,
    },
}

/// Convenience alias for queue results.
pub type ArrResult<T> = Result<T, ArrError>;
