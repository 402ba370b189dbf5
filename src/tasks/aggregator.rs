//! # LogAggregatorTask: follow + transform pipeline under one task.
//!
//! A specialized [`Task`] whose "child" is a two-stage in-process
//! pipeline rather than a single OS process:
//!
//! ```text
//! log files ──► follow stage ──► mpsc<SourcedLine> ──► transform stage ──► stderr
//!               (offsets,                               (wrapped-record
//!                rotation)                               reassembly)
//! ```
//!
//! ## Termination
//! A request must reach **every** live stage, not just the first — a
//! stopped follow stage does not by itself guarantee the transform stage
//! also exits. Each stage therefore carries its own cancellation token,
//! and [`Task::request_termination`] signals them individually, follow
//! first: no more reads, the line stream closes, and the transform stage
//! drains what is buffered before exiting.
//!
//! ## Monitoring
//! The monitor waits for the *last* stage (transform), since output
//! ordering is determined by the stage that finishes last, then reports
//! the task's single [`ExitEvent`](crate::ExitEvent).

use std::io::{self, Write};
use std::path::PathBuf;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use async_trait::async_trait;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;

use crate::error::SpawnError;
use crate::events::{Bus, Event, EventKind, ExitChannel, ExitEvent};
use crate::tasks::task::{ExitOutcome, Task, TaskRef, TaskState};
use crate::tasks::{follow, transform};

/// Cancellation handles for the pipeline's live stages, in termination
/// order.
struct Stages {
    follow: CancellationToken,
    transform: CancellationToken,
}

/// Supervised wrapper around the log-follow/transform pipeline.
pub struct LogAggregatorTask {
    name: String,
    paths: Vec<PathBuf>,
    sink: Mutex<Option<Box<dyn Write + Send>>>,
    stages: Mutex<Option<Stages>>,
    state: Arc<Mutex<TaskState>>,
}

impl LogAggregatorTask {
    /// Creates the task; forwarded lines go to the process stderr.
    pub fn new(name: impl Into<String>, paths: Vec<PathBuf>) -> Self {
        Self {
            name: name.into(),
            paths,
            sink: Mutex::new(None),
            stages: Mutex::new(None),
            state: Arc::new(Mutex::new(TaskState::Spawned)),
        }
    }

    /// Replaces the output sink. Useful in tests and embedders.
    pub fn with_sink(self, sink: Box<dyn Write + Send>) -> Self {
        *lock(&self.sink) = Some(sink);
        self
    }

    /// Creates the task and returns it as a shared handle.
    pub fn arc(name: impl Into<String>, paths: Vec<PathBuf>) -> TaskRef {
        Arc::new(Self::new(name, paths))
    }
}

fn lock<T>(m: &Mutex<T>) -> MutexGuard<'_, T> {
    m.lock().unwrap_or_else(PoisonError::into_inner)
}

#[async_trait]
impl Task for LogAggregatorTask {
    fn name(&self) -> &str {
        &self.name
    }

    async fn start(&self, bus: &Bus, exits: &ExitChannel) -> Result<(), SpawnError> {
        let name: Arc<str> = Arc::from(self.name.as_str());
        bus.publish(Event::new(EventKind::TaskStarting).with_task(Arc::clone(&name)));

        let sink = lock(&self.sink)
            .take()
            .unwrap_or_else(|| Box::new(io::stderr()));

        let (line_tx, line_rx) = mpsc::unbounded_channel();
        let follow_token = CancellationToken::new();
        let transform_token = CancellationToken::new();

        let follow_handle = follow::spawn(self.paths.clone(), line_tx, follow_token.clone())
            .map_err(|source| SpawnError::Io {
                name: self.name.clone(),
                program: "log-follow".into(),
                source,
            })?;
        let transform_handle = transform::spawn(line_rx, transform_token.clone(), sink);

        *lock(&self.stages) = Some(Stages {
            follow: follow_token,
            transform: transform_token,
        });
        *lock(&self.state) = TaskState::Running { pid: None };
        bus.publish(Event::new(EventKind::TaskStarted).with_task(Arc::clone(&name)));

        let state = Arc::clone(&self.state);
        let bus = bus.clone();
        let exits = exits.clone();
        tokio::spawn(async move {
            let _ = follow_handle.await;
            let _ = transform_handle.await;
            let outcome = ExitOutcome::Code(0);
            *lock(&state) = TaskState::Exited { outcome };
            bus.publish(
                Event::new(EventKind::TaskExited)
                    .with_task(Arc::clone(&name))
                    .with_reason(outcome.to_string()),
            );
            exits.notify(ExitEvent::new(name));
        });

        Ok(())
    }

    async fn request_termination(&self) {
        {
            let mut st = lock(&self.state);
            match *st {
                TaskState::Running { pid } => *st = TaskState::Terminating { pid },
                _ => return,
            }
        }
        // Every live stage gets its own signal: follow first so the line
        // stream closes, then transform, whose cancellation path drains
        // the buffered lines before exiting.
        if let Some(stages) = lock(&self.stages).take() {
            stages.follow.cancel();
            stages.transform.cancel();
        }
    }

    fn state(&self) -> TaskState {
        *lock(&self.state)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write as _;
    use std::time::Duration;
    use tokio::time::{sleep, timeout};

    const WAIT: Duration = Duration::from_secs(5);

    fn append(path: &std::path::Path, text: &str) {
        let mut f = std::fs::OpenOptions::new()
            .create(true)
            .append(true)
            .open(path)
            .expect("open for append");
        write!(f, "{text}").expect("append");
    }

    async fn wait_for_sink(sink_path: &std::path::Path, needle: &str) -> String {
        let deadline = tokio::time::Instant::now() + WAIT;
        loop {
            let content = std::fs::read_to_string(sink_path).unwrap_or_default();
            if content.contains(needle) {
                return content;
            }
            assert!(
                tokio::time::Instant::now() < deadline,
                "sink never contained {needle:?}; have {content:?}"
            );
            sleep(Duration::from_millis(50)).await;
        }
    }

    #[tokio::test]
    async fn test_pipeline_forwards_reformatted_lines_and_exits_once() {
        let dir = tempfile::tempdir().expect("tempdir");
        let log_path = dir.path().join("app.log");
        let sink_path = dir.path().join("sink.txt");
        let sink = std::fs::File::create(&sink_path).expect("sink");

        let bus = Bus::new(16);
        let (exits, mut stream) = ExitChannel::new();
        let task =
            LogAggregatorTask::new("logs", vec![log_path.clone()]).with_sink(Box::new(sink));

        task.start(&bus, &exits).await.expect("start");
        assert!(log_path.exists(), "missing log path created at startup");
        sleep(Duration::from_millis(100)).await;

        append(&log_path, "plain line\n[[[\nwrapped one\nwrapped two\n]]]\n");
        let content = wait_for_sink(&sink_path, "wrapped").await;
        assert!(content.contains("app | plain line"));
        assert!(content.contains("app | wrapped one wrapped two"));

        task.request_termination().await;
        let ev = timeout(WAIT, stream.first())
            .await
            .expect("exit within bound")
            .expect("exit event");
        assert_eq!(&*ev.task, "logs");
        assert!(task.state().is_exited());
        // Exactly one event for the pipeline.
        assert_eq!(stream.drain(1, Duration::from_millis(100)).await, 0);
    }

    #[tokio::test]
    async fn test_termination_flushes_an_open_wrapped_record() {
        let dir = tempfile::tempdir().expect("tempdir");
        let log_path = dir.path().join("api.log");
        let sink_path = dir.path().join("sink.txt");
        let sink = std::fs::File::create(&sink_path).expect("sink");

        let bus = Bus::new(16);
        let (exits, mut stream) = ExitChannel::new();
        let task =
            LogAggregatorTask::new("logs", vec![log_path.clone()]).with_sink(Box::new(sink));

        task.start(&bus, &exits).await.expect("start");
        sleep(Duration::from_millis(100)).await;

        append(&log_path, "[[[\nnever closed (truncated)\n");
        // The truncation marker closes the record without its framing.
        let content = wait_for_sink(&sink_path, "never closed").await;
        assert!(content.contains("api | never closed (truncated)"));

        task.request_termination().await;
        let _ = timeout(WAIT, stream.first()).await.expect("exit");
    }
}
