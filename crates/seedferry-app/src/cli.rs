//! Command-line flags layered over the environment configuration.

use clap::Parser;

/// seedferry command line.
#[derive(Debug, Clone, Default, Parser)]
#[command(
    name = "seedferry",
    version,
    about = "Keep a local Transmission instance in step with a remote seedbox"
)]
pub struct Cli {
    /// Run a single cycle and exit.
    #[arg(long)]
    pub once: bool,
    /// Run only the read-only pass that logs what would happen.
    #[arg(long)]
    pub dry_run: bool,
    /// Seconds between cycles, overriding `SYNC_INTERVAL_SECS`.
    #[arg(long, value_name = "SECS", value_parser = clap::value_parser!(u64).range(1..))]
    pub interval: Option<u64>,
}
