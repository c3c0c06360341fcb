#![forbid(unsafe_code)]
#![warn(
    dead_code,
    unused,
    unused_imports,
    unused_must_use,
    unreachable_pub,
    clippy::all,
    clippy::pedantic,
    clippy::nursery,
    rustdoc::broken_intra_doc_links,
    rustdoc::bare_urls,
    missing_docs
)]

//! Logging setup shared by the seedferry binaries.
//!
//! Layout: `init.rs` (subscriber installation), `context.rs` (process span),
//! `error.rs` (installation failures).

pub mod context;
pub mod error;
pub mod init;

pub use context::GlobalContextGuard;
pub use error::{TelemetryError, TelemetryResult};
pub use init::{DEFAULT_LOG_LEVEL, LogFormat, LoggingConfig, build_sha, init_logging};
