//! # Console subscriber: the stderr diagnostic stream.
//!
//! [`ConsoleLogger`] renders events as one-line diagnostics on stderr,
//! alongside the reformatted log lines the aggregator forwards there.
//! stdout stays untouched — it belongs to the children.
//!
//! ## Output format
//! ```text
//! [starting] task=web
//! [started] task=web pid=4242
//! [spawn-failed] task=web error=...
//! [exited] task=web status=exit code 3
//! [ready] front end on port 3000
//! [shutdown] process exited unexpectedly: web
//! [grace-exceeded] grace exceeded after 5s; still running: ["api"]
//! [all-stopped]
//! ```

use async_trait::async_trait;

use crate::events::{Event, EventKind};
use crate::subscribers::Subscribe;

/// Stderr logging subscriber.
///
/// The default narration sink for the supervisor binary. Implement a
/// custom [`Subscribe`] for structured logging or metrics collection.
pub struct ConsoleLogger;

#[async_trait]
impl Subscribe for ConsoleLogger {
    async fn on_event(&self, e: &Event) {
        let task = e.task.as_deref().unwrap_or("?");
        let reason = e.reason.as_deref().unwrap_or("?");
        match e.kind {
            EventKind::TaskStarting => {
                eprintln!("[starting] task={task}");
            }
            EventKind::TaskStarted => match e.pid {
                Some(pid) => eprintln!("[started] task={task} pid={pid}"),
                None => eprintln!("[started] task={task}"),
            },
            EventKind::SpawnFailed => {
                eprintln!("[spawn-failed] task={task} error={reason}");
            }
            EventKind::TaskExited => {
                eprintln!("[exited] task={task} status={reason}");
            }
            EventKind::Ready => {
                eprintln!("[ready] {reason}");
            }
            EventKind::ShutdownRequested => {
                eprintln!("[shutdown] {reason}");
            }
            EventKind::AllStoppedWithin => {
                eprintln!("[all-stopped]");
            }
            EventKind::GraceExceeded => {
                eprintln!("[grace-exceeded] {reason}");
            }
        }
    }

    fn name(&self) -> &'static str {
        "console"
    }
}
