//! Binary entry point: load the manifest, assemble the task list, run the
//! supervisor, and map the shutdown cause onto the process exit status.
//!
//! Exit status contract:
//! - any failure-triggered shutdown (task exit, spawn failure) → `1`;
//! - signal-triggered shutdown → the signal is re-raised with its default
//!   disposition, so a parent supervisor observes signal-based death;
//! - an empty manifest run (nothing supervised) → `0`.

mod cli;
mod manifest;

use std::sync::Arc;
use std::time::Duration;

use anyhow::Result;
use clap::Parser;

use procvisor::{
    Config, ConsoleLogger, LogAggregatorTask, ProcessTask, ShutdownCause, SignalPolicy, Subscribe,
    Supervisor, TaskSpec,
};

use crate::cli::Cli;

#[tokio::main(flavor = "multi_thread")]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    let manifest = manifest::load(&cli.manifest)?;

    let mut cfg = Config::default();
    cfg.port = manifest.port;
    if let Some(grace) = manifest.grace {
        cfg.grace = grace;
    }
    if let Some(secs) = cli.grace_secs {
        cfg.grace = Duration::from_secs(secs);
    }

    // Startup order: the aggregator first, then the services in manifest
    // order, honoring each entry's settle delay.
    let mut tasks = Vec::with_capacity(manifest.services.len() + 1);
    if !manifest.logs.is_empty() {
        tasks.push(TaskSpec::new(LogAggregatorTask::arc(
            manifest::AGGREGATOR_NAME,
            manifest.logs.clone(),
        )));
    }
    for entry in &manifest.services {
        let mut spec = TaskSpec::new(ProcessTask::arc(entry.spec.clone()));
        if let Some(settle) = entry.settle {
            spec = spec.with_settle(settle);
        }
        tasks.push(spec);
    }

    let subscribers: Vec<Arc<dyn Subscribe>> = vec![Arc::new(ConsoleLogger)];
    let mut builder = Supervisor::builder(cfg).with_subscribers(subscribers);
    if cli.managed {
        builder = builder.with_signal_policy(SignalPolicy::new(false));
    }
    let supervisor = builder.build();

    match supervisor.run(tasks).await? {
        ShutdownCause::Signal(sig) => sig.reraise(),
        cause => std::process::exit(cause.exit_code()),
    }
}
