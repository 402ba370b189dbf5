//! # procvisor
//!
//! **Procvisor** is a multi-process supervisor with coordinated shutdown.
//!
//! It launches several independent long-running child processes — in the
//! shipped binary: a log aggregator, an application server, and a
//! front-end server — keeps them running concurrently, and guarantees
//! that if *any one* of them exits, or the supervisor itself receives a
//! termination signal, *all* remaining children are torn down in a
//! bounded, deterministic way and the process exits with a
//! distinguishing status.
//!
//! ## Architecture
//! ### Overview
//! ```text
//!     ┌──────────────┐   ┌──────────────┐   ┌──────────────────┐
//!     │  LaunchSpec  │   │  LaunchSpec  │   │   log paths      │
//!     │ (app server) │   │ (front end)  │   │ (aggregator)     │
//!     └──────┬───────┘   └──────┬───────┘   └────────┬─────────┘
//!            ▼                  ▼                    ▼
//!     ┌──────────────┐   ┌──────────────┐   ┌──────────────────┐
//!     │ ProcessTask  │   │ ProcessTask  │   │ LogAggregatorTask│
//!     └──────┬───────┘   └──────┬───────┘   └────────┬─────────┘
//!            ▼                  ▼                    ▼
//! ┌───────────────────────────────────────────────────────────────────┐
//! │  Supervisor                                                       │
//! │  - ordered startup (aggregator → app server + settle → front end) │
//! │  - ExitChannel (first exit wins)                                  │
//! │  - SignalPolicy (terminal-aware SIGINT/SIGTERM)                   │
//! │  - shutting_down latch (exactly one teardown)                     │
//! └──────┬──────────────────────────┬─────────────────────────┬───────┘
//!        │ per-task monitor         │ diagnostics             │
//!        ▼                          ▼                         ▼
//!   child.wait() ─► ExitEvent    Bus (broadcast) ─► SubscriberSet
//!   (exactly one per task)                             │
//!                                              ConsoleLogger → stderr
//! ```
//!
//! ### Lifecycle
//! ```text
//! TaskSpec ──► Supervisor::run()
//!
//! Initializing: validate names, open ExitChannel
//! Running:      start each task in order (settle between), then block on
//!                 select! { first ExitEvent | SignalPolicy::recv() }
//! ShuttingDown: request_termination() on every running task (parallel),
//!                 drain exit confirmations within Config::grace
//! Terminated:   return ShutdownCause
//!                 ├─ TaskExited / SpawnFailed  → exit status 1
//!                 ├─ Signal                    → re-raise (default disposition)
//!                 └─ Idle (no tasks)           → exit status 0
//! ```
//!
//! Tasks are never restarted: the first exit of any child is always fatal
//! to the whole group.
//!
//! ## Features
//! | Area              | Description                                               | Key types / traits                       |
//! |-------------------|-----------------------------------------------------------|------------------------------------------|
//! | **Supervision**   | Ordered startup, first-exit-wins shutdown, grace window.  | [`Supervisor`], [`ShutdownCause`]        |
//! | **Tasks**         | One OS process, or the log-follow/transform pipeline.     | [`Task`], [`ProcessTask`], [`LogAggregatorTask`] |
//! | **Exit channel**  | Non-blocking exactly-once exit reporting.                 | [`ExitChannel`], [`ExitEvent`]           |
//! | **Signals**       | Terminal-aware interrupt policy, signal re-raise.         | [`SignalPolicy`], [`ShutdownSignal`]     |
//! | **Subscriber API**| Hook into lifecycle events (console, metrics, custom).    | [`Subscribe`], [`ConsoleLogger`]         |
//! | **Errors**        | Typed errors for spawn and runtime failures.              | [`SpawnError`], [`RuntimeError`]         |
//!
//! ## Example
//! ```no_run
//! use std::sync::Arc;
//! use procvisor::{
//!     Config, ConsoleLogger, LaunchSpec, LogAggregatorTask, ProcessTask, ShutdownCause,
//!     Subscribe, Supervisor, TaskSpec,
//! };
//! use std::time::Duration;
//!
//! #[tokio::main(flavor = "multi_thread")]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let mut cfg = Config::default();
//!     cfg.port = Some(3000);
//!
//!     let subs: Vec<Arc<dyn Subscribe>> = vec![Arc::new(ConsoleLogger)];
//!     let sup = Supervisor::builder(cfg).with_subscribers(subs).build();
//!
//!     let tasks = vec![
//!         TaskSpec::new(LogAggregatorTask::arc("logs", vec!["var/log/app.log".into()])),
//!         TaskSpec::new(ProcessTask::arc(LaunchSpec::new(
//!             "app",
//!             vec!["bin/app-server".into()],
//!         )))
//!         .with_settle(Duration::from_secs(2)),
//!         TaskSpec::new(ProcessTask::arc(LaunchSpec::new(
//!             "web",
//!             vec!["bin/front-end".into(), "--port".into(), "3000".into()],
//!         ))),
//!     ];
//!
//!     match sup.run(tasks).await? {
//!         ShutdownCause::Signal(sig) => sig.reraise(),
//!         cause => std::process::exit(cause.exit_code()),
//!     }
//! }
//! ```

mod config;
mod core;
mod error;
mod events;
mod subscribers;
mod tasks;

// ---- Public re-exports ----

pub use crate::core::{ShutdownCause, ShutdownSignal, SignalPolicy, Supervisor, SupervisorBuilder};
pub use config::Config;
pub use error::{RuntimeError, SpawnError};
pub use events::{Bus, Event, EventKind, ExitChannel, ExitEvent, ExitStream};
pub use subscribers::{ConsoleLogger, Subscribe, SubscriberSet};
pub use tasks::{
    ExitOutcome, LaunchSpec, LogAggregatorTask, ProcessTask, Task, TaskRef, TaskSpec, TaskState,
};
