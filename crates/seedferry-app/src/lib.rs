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
#![allow(clippy::module_name_repetitions)]

//! seedferry application wiring.
//!
//! Layout: `bootstrap.rs` (service wiring), `cli.rs` (command-line flags),
//! `reconcile/` (repair, planning, transfer and recovery), `worker.rs`
//! (cycle scheduling).

/// Application bootstrap and worker wiring.
pub mod bootstrap;
/// Command-line flags.
pub mod cli;
/// Application error type.
pub mod error;
/// Reconciliation between the remote and local instances.
pub mod reconcile;
/// Cycle scheduling and cancellation.
pub mod worker;

pub use bootstrap::run_app;
pub use error::{AppError, AppResult};
