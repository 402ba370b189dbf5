//! # Runtime events emitted by the supervisor and task monitors.
//!
//! The [`EventKind`] enum classifies event types across two categories:
//! - **Lifecycle events**: task startup and exit (starting, started,
//!   exited, spawn failure, ready)
//! - **Shutdown events**: the coordinated teardown (requested, all stopped
//!   within grace, grace exceeded)
//!
//! The [`Event`] struct carries additional metadata such as timestamps,
//! task name, reasons, and process ids.
//!
//! ## Ordering guarantees
//! Each event has a globally unique sequence number (`seq`) that increases
//! monotonically. Use `seq` to restore the exact order when events are
//! delivered out of order.
//!
//! ## Example
//! ```rust
//! use procvisor::{Event, EventKind};
//!
//! let ev = Event::new(EventKind::TaskExited)
//!     .with_task("web")
//!     .with_reason("exit code 3");
//!
//! assert_eq!(ev.kind, EventKind::TaskExited);
//! assert_eq!(ev.task.as_deref(), Some("web"));
//! assert_eq!(ev.reason.as_deref(), Some("exit code 3"));
//! ```

use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering as AtomicOrdering};
use std::time::SystemTime;

/// Global sequence counter for event ordering.
static EVENT_SEQ: AtomicU64 = AtomicU64::new(0);

/// Classification of runtime events.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EventKind {
    // === Task lifecycle events ===
    /// Task is about to spawn its underlying process.
    ///
    /// Sets:
    /// - `task`: task name
    TaskStarting,

    /// Task's process was created and is now being monitored.
    ///
    /// Sets:
    /// - `task`: task name
    /// - `pid`: process id (absent for in-process pipelines)
    TaskStarted,

    /// Task's process could not be created; startup aborts.
    ///
    /// Sets:
    /// - `task`: task name
    /// - `reason`: spawn failure message
    SpawnFailed,

    /// Task's monitored process exited (normally, with an error, or on a
    /// signal). Exactly one per started task.
    ///
    /// Sets:
    /// - `task`: task name
    /// - `reason`: decoded exit status
    TaskExited,

    /// All tasks started; the stack is considered up.
    ///
    /// Sets:
    /// - `reason`: human-readable readiness note (advertised port)
    Ready,

    // === Shutdown events ===
    /// Shutdown triggered (first task exit, spawn failure, or OS signal).
    ///
    /// Sets:
    /// - `reason`: what triggered the teardown
    /// - `task`: triggering task, when the trigger was a task
    ShutdownRequested,

    /// All tasks confirmed termination within the configured grace period.
    AllStoppedWithin,

    /// Grace period exceeded; some tasks did not confirm in time.
    ///
    /// Sets:
    /// - `reason`: names of the stragglers
    GraceExceeded,
}

/// Runtime event with optional metadata.
///
/// - `seq`: monotonic global sequence for ordering
/// - `at`: wall-clock timestamp (for logs)
/// - other optional fields are set depending on the [`EventKind`]
#[derive(Clone, Debug)]
pub struct Event {
    /// Globally unique, monotonically increasing sequence number.
    pub seq: u64,
    /// Wall-clock timestamp.
    pub at: SystemTime,
    /// Event classification.
    pub kind: EventKind,
    /// Name of the task (or subscriber), if applicable.
    pub task: Option<Arc<str>>,
    /// Human-readable reason (exit status, trigger, error details).
    pub reason: Option<Arc<str>>,
    /// Process id of the task's child, if applicable.
    pub pid: Option<u32>,
}

impl Event {
    /// Creates a new event of the given kind with current timestamp and
    /// next sequence number.
    pub fn new(kind: EventKind) -> Self {
        Self {
            seq: EVENT_SEQ.fetch_add(1, AtomicOrdering::Relaxed),
            at: SystemTime::now(),
            kind,
            task: None,
            reason: None,
            pid: None,
        }
    }

    /// Attaches a task name.
    #[inline]
    pub fn with_task(mut self, task: impl Into<Arc<str>>) -> Self {
        self.task = Some(task.into());
        self
    }

    /// Attaches a human-readable reason.
    #[inline]
    pub fn with_reason(mut self, reason: impl Into<Arc<str>>) -> Self {
        self.reason = Some(reason.into());
        self
    }

    /// Attaches a process id.
    #[inline]
    pub fn with_pid(mut self, pid: u32) -> Self {
        self.pid = Some(pid);
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sequence_is_monotonic() {
        let a = Event::new(EventKind::TaskStarting);
        let b = Event::new(EventKind::TaskStarted);
        assert!(b.seq > a.seq);
    }

    #[test]
    fn test_builders_attach_metadata() {
        let ev = Event::new(EventKind::TaskStarted)
            .with_task("web")
            .with_pid(42);
        assert_eq!(ev.task.as_deref(), Some("web"));
        assert_eq!(ev.pid, Some(42));
        assert!(ev.reason.is_none());
    }
}
