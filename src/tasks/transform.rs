//! # Transform stage: wrapped-record reassembly.
//!
//! Second stage of the log aggregator's pipeline. Children that need to
//! emit a message longer than their line discipline allows wrap it:
//!
//! ```text
//! [[[
//! first fragment
//! second fragment
//! ]]]
//! ```
//!
//! This stage rewrites such records into a single forwarded line, framing
//! removed, fragments joined with single spaces. A fragment ending in the
//! `(truncated)` marker flushes the open record immediately — the producer
//! cut the message off and no closing marker will follow. Unframed lines
//! pass through unchanged. Every forwarded line is prefixed with its
//! source so the combined stream stays filterable:
//!
//! ```text
//! app | first fragment second fragment
//! ```
//!
//! ## Rules
//! - Records are reassembled **per source**; interleaving between files
//!   never merges records.
//! - A new opening marker while a record is open flushes the previous
//!   record first.
//! - Cancellation drains lines already buffered in the stream, then
//!   flushes any open records, then exits. Nothing in flight is dropped.

use std::collections::HashMap;
use std::io::Write;
use std::sync::Arc;

use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

use crate::tasks::follow::SourcedLine;

/// Line opening a wrapped record.
pub(crate) const WRAP_OPEN: &str = "[[[";
/// Line closing a wrapped record.
pub(crate) const WRAP_CLOSE: &str = "]]]";
/// Suffix a producer appends when it cut a message off mid-record.
pub(crate) const TRUNCATION_MARKER: &str = "(truncated)";

/// Per-source reassembly state machine.
pub(crate) struct Reassembler {
    open: HashMap<Arc<str>, Vec<String>>,
}

impl Reassembler {
    pub(crate) fn new() -> Self {
        Self {
            open: HashMap::new(),
        }
    }

    /// Feeds one line; returns zero or more finished output lines.
    pub(crate) fn push(&mut self, input: SourcedLine) -> Vec<String> {
        let SourcedLine { source, line } = input;
        let trimmed = line.trim();
        let mut out = Vec::new();

        if trimmed == WRAP_OPEN {
            if let Some(parts) = self.open.remove(&source) {
                out.push(render(&source, &parts));
            }
            self.open.insert(source, Vec::new());
        } else if trimmed == WRAP_CLOSE {
            match self.open.remove(&source) {
                Some(parts) => out.push(render(&source, &parts)),
                // A stray closing marker is just a line.
                None => out.push(passthrough(&source, &line)),
            }
        } else if self.open.contains_key(&source) {
            let truncated = trimmed.ends_with(TRUNCATION_MARKER);
            if let Some(parts) = self.open.get_mut(&source) {
                parts.push(trimmed.to_string());
            }
            if truncated {
                if let Some(parts) = self.open.remove(&source) {
                    out.push(render(&source, &parts));
                }
            }
        } else {
            out.push(passthrough(&source, &line));
        }
        out
    }

    /// Flushes every record still open, in no particular order.
    pub(crate) fn flush(&mut self) -> Vec<String> {
        self.open
            .drain()
            .map(|(source, parts)| render(&source, &parts))
            .collect()
    }
}

fn render(source: &str, parts: &[String]) -> String {
    format!("{source} | {}", parts.join(" "))
}

fn passthrough(source: &str, line: &str) -> String {
    format!("{source} | {line}")
}

/// Starts the transform stage.
///
/// Consumes the follow stage's line stream, writes reassembled lines to
/// the sink, and exits when the stream closes or the token is cancelled —
/// in the latter case after draining what the stream already holds.
pub(crate) fn spawn(
    mut lines: mpsc::UnboundedReceiver<SourcedLine>,
    token: CancellationToken,
    mut sink: Box<dyn Write + Send>,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        let mut reassembler = Reassembler::new();
        loop {
            tokio::select! {
                maybe = lines.recv() => match maybe {
                    Some(line) => emit(&mut sink, reassembler.push(line)),
                    None => break,
                },
                _ = token.cancelled() => {
                    // No new input past this point; buffered lines still flow.
                    lines.close();
                    while let Some(line) = lines.recv().await {
                        emit(&mut sink, reassembler.push(line));
                    }
                    break;
                }
            }
        }
        emit(&mut sink, reassembler.flush());
        let _ = sink.flush();
    })
}

fn emit(sink: &mut Box<dyn Write + Send>, outputs: Vec<String>) {
    for line in outputs {
        let _ = writeln!(sink, "{line}");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;
    use std::time::Duration;

    fn line(source: &str, text: &str) -> SourcedLine {
        SourcedLine {
            source: Arc::from(source),
            line: text.to_string(),
        }
    }

    #[test]
    fn test_unframed_lines_pass_through_prefixed() {
        let mut r = Reassembler::new();
        assert_eq!(r.push(line("app", "plain text")), vec!["app | plain text"]);
        assert!(r.flush().is_empty());
    }

    #[test]
    fn test_wrapped_record_becomes_one_line() {
        let mut r = Reassembler::new();
        assert!(r.push(line("app", "[[[")).is_empty());
        assert!(r.push(line("app", "first fragment")).is_empty());
        assert!(r.push(line("app", "second fragment")).is_empty());
        assert_eq!(
            r.push(line("app", "]]]")),
            vec!["app | first fragment second fragment"]
        );
    }

    #[test]
    fn test_truncated_record_flushes_without_closing_marker() {
        let mut r = Reassembler::new();
        assert!(r.push(line("app", "[[[")).is_empty());
        assert!(r.push(line("app", "a very long message")).is_empty());
        assert_eq!(
            r.push(line("app", "that got cut (truncated)")),
            vec!["app | a very long message that got cut (truncated)"]
        );
        // The record is closed; nothing left to flush.
        assert!(r.flush().is_empty());
    }

    #[test]
    fn test_reopening_flushes_the_previous_record() {
        let mut r = Reassembler::new();
        assert!(r.push(line("app", "[[[")).is_empty());
        assert!(r.push(line("app", "orphaned")).is_empty());
        assert_eq!(r.push(line("app", "[[[")), vec!["app | orphaned"]);
        assert_eq!(r.push(line("app", "]]]")), vec!["app | "]);
    }

    #[test]
    fn test_sources_reassemble_independently() {
        let mut r = Reassembler::new();
        assert!(r.push(line("app", "[[[")).is_empty());
        assert_eq!(r.push(line("web", "untouched")), vec!["web | untouched"]);
        assert!(r.push(line("app", "inside")).is_empty());
        assert_eq!(r.push(line("app", "]]]")), vec!["app | inside"]);
    }

    #[test]
    fn test_stray_closing_marker_passes_through() {
        let mut r = Reassembler::new();
        assert_eq!(r.push(line("app", "]]]")), vec!["app | ]]]"]);
    }

    #[test]
    fn test_shutdown_flush_preserves_open_records() {
        let mut r = Reassembler::new();
        assert!(r.push(line("app", "[[[")).is_empty());
        assert!(r.push(line("app", "interrupted mid-record")).is_empty());
        assert_eq!(r.flush(), vec!["app | interrupted mid-record"]);
    }

    #[derive(Clone)]
    struct SharedSink(Arc<Mutex<Vec<u8>>>);

    impl Write for SharedSink {
        fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
            self.0.lock().expect("sink lock").extend_from_slice(buf);
            Ok(buf.len())
        }
        fn flush(&mut self) -> std::io::Result<()> {
            Ok(())
        }
    }

    #[tokio::test]
    async fn test_stage_drains_buffered_lines_on_cancellation() {
        let (tx, rx) = mpsc::unbounded_channel();
        let token = CancellationToken::new();
        let buffer = Arc::new(Mutex::new(Vec::new()));
        let handle = spawn(rx, token.clone(), Box::new(SharedSink(Arc::clone(&buffer))));

        tx.send(line("app", "[[[")).expect("send");
        tx.send(line("app", "buffered")).expect("send");
        token.cancel();

        tokio::time::timeout(Duration::from_secs(5), handle)
            .await
            .expect("stage exits")
            .expect("no panic");

        let written = String::from_utf8(buffer.lock().expect("sink lock").clone()).expect("utf8");
        assert_eq!(written, "app | buffered\n");
    }
}
