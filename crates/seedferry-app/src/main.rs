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

//! Binary entrypoint that loads configuration and runs the reconciliation workers
//! until shutdown.

use seedferry_app::{AppResult, run_app};

/// Bootstraps seedferry and blocks until the workers stop.
#[tokio::main]
async fn main() -> AppResult<()> {
    run_app().await
}
