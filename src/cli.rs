//! Command-line interface for the procvisor binary.

use std::path::PathBuf;

use clap::Parser;

/// Launches the configured services and supervises them until the first
/// exit or a termination signal.
#[derive(Debug, Parser)]
#[command(
    name = "procvisor",
    version,
    about = "Multi-process supervisor with coordinated shutdown"
)]
pub struct Cli {
    /// Path to the TOML launch manifest.
    pub manifest: PathBuf,

    /// Override the shutdown grace period, in seconds.
    #[arg(long)]
    pub grace_secs: Option<u64>,

    /// Treat the session as non-interactive even on a terminal: ignore
    /// interrupts and defer to the parent's terminate signal.
    #[arg(long)]
    pub managed: bool,
}
