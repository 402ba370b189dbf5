//! # Task abstraction and lifecycle state.
//!
//! This module defines the [`Task`] trait — the seam between the
//! supervisor and the things it supervises — plus the [`TaskState`]
//! lifecycle and the decoded [`ExitOutcome`]. The common handle type is
//! [`TaskRef`], an `Arc<dyn Task>` suitable for sharing across the
//! runtime.
//!
//! ## Lifecycle
//! ```text
//! Spawned ──start()──► Running { pid } ──request_termination()──► Terminating { pid }
//!                          │                                           │
//!                          └──────────── process exits ────────────────┘
//!                                             ▼
//!                                  Exited { outcome }  →  one ExitEvent
//! ```
//!
//! Once `start()` succeeds, exactly one [`ExitEvent`](crate::ExitEvent)
//! for this task will eventually be produced, with no further interaction
//! required. Tasks are never restarted.

use std::fmt;
use std::sync::Arc;

use async_trait::async_trait;

use crate::error::SpawnError;
use crate::events::{Bus, ExitChannel};

/// Shared handle to a supervised task.
pub type TaskRef = Arc<dyn Task>;

/// Decoded exit status of a task's underlying process.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExitOutcome {
    /// Process returned an exit code.
    Code(i32),
    /// Process was terminated by the given signal number.
    Signal(i32),
    /// The platform reported neither (or the wait itself failed).
    Unknown,
}

impl fmt::Display for ExitOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ExitOutcome::Code(code) => write!(f, "exit code {code}"),
            ExitOutcome::Signal(sig) => write!(f, "signal {sig}"),
            ExitOutcome::Unknown => write!(f, "unknown status"),
        }
    }
}

/// Lifecycle state of a supervised task.
///
/// Owned by the task behind a mutex and shared with its monitor; the
/// supervisor reads snapshots for straggler reporting.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TaskState {
    /// Created, no process yet.
    Spawned,
    /// Process (or pipeline) is live. `pid` is `None` for in-process
    /// pipelines, which have no single OS handle.
    Running {
        /// Child process id, when the task wraps a single OS process.
        pid: Option<u32>,
    },
    /// Graceful termination was requested; exit not yet observed.
    Terminating {
        /// Child process id, when the task wraps a single OS process.
        pid: Option<u32>,
    },
    /// The monitored process finished. Terminal.
    Exited {
        /// Decoded exit status.
        outcome: ExitOutcome,
    },
}

impl TaskState {
    /// True while the process is live and termination has not been asked.
    pub fn is_running(&self) -> bool {
        matches!(self, TaskState::Running { .. })
    }

    /// True once the exit was observed.
    pub fn is_exited(&self) -> bool {
        matches!(self, TaskState::Exited { .. })
    }
}

/// # Supervised wrapper around one process or process pipeline.
///
/// A `Task` has a stable [`name`](Task::name), spawns its underlying
/// process on [`start`](Task::start), and forwards graceful termination
/// requests via [`request_termination`](Task::request_termination).
///
/// ## Contract
/// - `start` transitions to `Running` on success and launches a detached
///   monitor that waits for the process to exit and reports **exactly
///   one** [`ExitEvent`](crate::ExitEvent) — regardless of whether the
///   exit was normal, nonzero, or due to a signal the supervisor itself
///   sent. On failure the state is left unchanged.
/// - `request_termination` is idempotent and advisory: it delivers a
///   graceful stop request in `Running` state and is a no-op otherwise.
///   For multi-stage pipelines it must reach *every* live stage.
#[async_trait]
pub trait Task: Send + Sync + 'static {
    /// Returns a stable, human-readable task name, unique within a run.
    fn name(&self) -> &str;

    /// Creates the underlying OS process(es) and begins monitoring.
    async fn start(&self, bus: &Bus, exits: &ExitChannel) -> Result<(), SpawnError>;

    /// Requests graceful termination. Idempotent; never forces.
    async fn request_termination(&self);

    /// Snapshot of the current lifecycle state.
    fn state(&self) -> TaskState;
}
