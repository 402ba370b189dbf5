//! # ExitChannel: first-exit-wins termination reporting.
//!
//! Every started task owns a clone of [`ExitChannel`] and reports exactly
//! one [`ExitEvent`] when its monitored process finishes — normally, with
//! an error, or on a signal the supervisor itself sent. The single
//! [`ExitStream`] consumer lives in the supervisor.
//!
//! ## Contract
//! - [`ExitChannel::notify`] never blocks and never fails, even after the
//!   consumer has stopped reading. Task monitors must not be able to
//!   deadlock their own reporting during teardown.
//! - [`ExitStream::first`] blocks until at least one event has been sent,
//!   then yields the first one. The supervisor only ever *acts* on this
//!   first event; everything after it happens during the teardown that
//!   this first event triggered.
//! - [`ExitStream::drain`] consumes the remaining confirmations
//!   best-effort, bounded by the shutdown grace window.
//!
//! Backed by an unbounded `tokio::sync::mpsc` channel, the crate's
//! rendering of a "first write observed wins, later writes never block"
//! slot.

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::mpsc;
use tokio::time;

/// Notification that a task's underlying process has terminated.
///
/// Exactly one per started task over its lifetime.
#[derive(Clone, Debug)]
pub struct ExitEvent {
    /// Name of the task whose process exited.
    pub task: Arc<str>,
}

impl ExitEvent {
    /// Creates an exit event for the named task.
    pub fn new(task: impl Into<Arc<str>>) -> Self {
        Self { task: task.into() }
    }
}

/// Producer half: non-blocking, infallible exit reporting.
///
/// Cheap to clone; one clone per task monitor.
#[derive(Clone, Debug)]
pub struct ExitChannel {
    tx: mpsc::UnboundedSender<ExitEvent>,
}

impl ExitChannel {
    /// Creates the channel, returning the shared producer handle and the
    /// single consumer stream.
    pub fn new() -> (ExitChannel, ExitStream) {
        let (tx, rx) = mpsc::unbounded_channel();
        (ExitChannel { tx }, ExitStream { rx })
    }

    /// Reports a task exit. Never blocks; a closed consumer is ignored.
    pub fn notify(&self, ev: ExitEvent) {
        let _ = self.tx.send(ev);
    }
}

/// Consumer half: owned by the supervisor, read at most once for the
/// trigger and then drained during teardown.
#[derive(Debug)]
pub struct ExitStream {
    rx: mpsc::UnboundedReceiver<ExitEvent>,
}

impl ExitStream {
    /// Waits for the first exit event.
    ///
    /// Returns `None` only if every [`ExitChannel`] clone has been dropped
    /// without a send, which the supervisor prevents by keeping its own
    /// clone alive for the whole run.
    pub async fn first(&mut self) -> Option<ExitEvent> {
        self.rx.recv().await
    }

    /// Consumes up to `expected` further exit confirmations within the
    /// given window, returning how many were observed.
    ///
    /// Best-effort by design: stragglers past the window are left to the
    /// caller to report.
    pub async fn drain(&mut self, expected: usize, window: Duration) -> usize {
        let mut confirmed = 0;
        if expected == 0 {
            return confirmed;
        }
        let _ = time::timeout(window, async {
            while confirmed < expected {
                match self.rx.recv().await {
                    Some(_) => confirmed += 1,
                    None => break,
                }
            }
        })
        .await;
        confirmed
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_first_yields_earliest_send() {
        let (tx, mut rx) = ExitChannel::new();
        tx.notify(ExitEvent::new("a"));
        tx.notify(ExitEvent::new("b"));

        let first = rx.first().await.expect("event");
        assert_eq!(&*first.task, "a");
    }

    #[tokio::test]
    async fn test_notify_after_consumer_dropped_is_silent() {
        let (tx, rx) = ExitChannel::new();
        drop(rx);
        // Must not panic or block.
        tx.notify(ExitEvent::new("late"));
    }

    #[tokio::test]
    async fn test_drain_counts_confirmations() {
        let (tx, mut rx) = ExitChannel::new();
        for name in ["a", "b", "c"] {
            tx.notify(ExitEvent::new(name));
        }
        let _ = rx.first().await;
        let confirmed = rx.drain(2, Duration::from_millis(500)).await;
        assert_eq!(confirmed, 2);
    }

    #[tokio::test]
    async fn test_drain_gives_up_after_window() {
        let (tx, mut rx) = ExitChannel::new();
        tx.notify(ExitEvent::new("only"));
        // Two expected, one ever sent: the window bounds the wait.
        let confirmed = rx.drain(2, Duration::from_millis(50)).await;
        assert_eq!(confirmed, 1);
    }
}
