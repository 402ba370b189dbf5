//! # Supervisor: ordered startup, first-exit-wins coordinated shutdown.
//!
//! The [`Supervisor`] owns the event bus, a [`SubscriberSet`], the
//! [`SignalPolicy`], and the `shutting_down` latch. It starts tasks in
//! their supplied order, blocks once on the first exit-or-signal, and
//! tears the whole group down inside a bounded grace window.
//!
//! ## High-level architecture
//! ```text
//! Inputs to run():
//!   Vec<TaskSpec>  ──►  Supervisor::run(tasks)
//!
//! Startup (strict order, settle honored):
//!   TaskSpec[0] ─ start ─ settle? ─► TaskSpec[1] ─ start ─ ... ─► TaskSpec[N-1]
//!        │ SpawnError at any point: remaining specs never started,
//!        ▼ teardown of what did start, cause = SpawnFailed
//!
//! Steady state (single suspension point):
//!   select! {
//!     ExitStream::first()   → cause = TaskExited   ("first exit wins")
//!     SignalPolicy::recv()  → cause = Signal
//!   }
//!
//! Shutdown (entered exactly once, CAS on shutting_down):
//!   publish ShutdownRequested(cause)
//!   request_termination() on every Running task    (unordered, parallel)
//!   ExitStream::drain(remaining, grace)            (best-effort)
//!     ├─ all confirmed  → AllStoppedWithin
//!     └─ grace elapsed  → GraceExceeded { stuck }  (logged, not escalated)
//!
//! Event flow:
//!   monitors/Supervisor ── publish ──► Bus ──► listener ──► SubscriberSet
//! ```
//!
//! ## Rules
//! - Exactly one ShuttingDown transition, no matter how many tasks fail
//!   concurrently or how many signals arrive.
//! - Termination is advisory; nothing is force-killed past the grace.
//! - The returned [`ShutdownCause`] is the caller's only structured
//!   output; everything else is diagnostic text.

use std::collections::HashSet;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use futures::future::join_all;
use tokio::time;

use crate::config::Config;
use crate::core::signal::{ShutdownSignal, SignalPolicy};
use crate::error::RuntimeError;
use crate::events::{Bus, Event, EventKind, ExitChannel, ExitStream};
use crate::subscribers::{Subscribe, SubscriberSet};
use crate::tasks::{TaskRef, TaskSpec};

/// What ended the run. The binary maps this onto the process exit status.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ShutdownCause {
    /// No tasks were supplied; nothing ran. The only exit-0 path.
    Idle,
    /// A task's process could not be created; startup was aborted.
    SpawnFailed {
        /// Task whose spawn failed.
        task: String,
    },
    /// A task's process exited while the group was running.
    TaskExited {
        /// First task whose exit was observed.
        task: String,
    },
    /// An external termination signal was received.
    Signal(ShutdownSignal),
}

impl ShutdownCause {
    /// Process exit code for this cause; signal causes re-raise instead.
    pub fn exit_code(&self) -> i32 {
        match self {
            ShutdownCause::Idle => 0,
            _ => 1,
        }
    }

    /// One-line description used in the shutdown diagnostic.
    pub fn describe(&self) -> String {
        match self {
            ShutdownCause::Idle => "no tasks to supervise".to_string(),
            ShutdownCause::SpawnFailed { task } => format!("startup failed: {task}"),
            ShutdownCause::TaskExited { task } => {
                format!("process exited unexpectedly: {task}")
            }
            ShutdownCause::Signal(sig) => format!("received {}", sig.as_str()),
        }
    }
}

/// Builder for constructing a [`Supervisor`] with optional features.
pub struct SupervisorBuilder {
    cfg: Config,
    subscribers: Vec<Arc<dyn Subscribe>>,
    policy: Option<SignalPolicy>,
}

impl SupervisorBuilder {
    /// Creates a new builder with the given configuration.
    pub fn new(cfg: Config) -> Self {
        Self {
            cfg,
            subscribers: Vec::new(),
            policy: None,
        }
    }

    /// Sets event subscribers for observability.
    ///
    /// Subscribers receive runtime events (task lifecycle, shutdown
    /// narration) through dedicated workers with bounded queues.
    pub fn with_subscribers(mut self, subscribers: Vec<Arc<dyn Subscribe>>) -> Self {
        self.subscribers = subscribers;
        self
    }

    /// Overrides the signal policy (default: derived from stdout).
    pub fn with_signal_policy(mut self, policy: SignalPolicy) -> Self {
        self.policy = Some(policy);
        self
    }

    /// Builds and returns the Supervisor instance.
    pub fn build(self) -> Supervisor {
        let bus = Bus::new(self.cfg.bus_capacity_clamped());
        let subs = Arc::new(SubscriberSet::new(self.subscribers));
        let policy = self.policy.unwrap_or_else(SignalPolicy::from_stdout);
        Supervisor {
            cfg: self.cfg,
            bus,
            subs,
            policy,
            shutting_down: AtomicBool::new(false),
        }
    }
}

/// Coordinates ordered startup, the first-exit-wins trigger, and the
/// bounded teardown of the whole task group.
pub struct Supervisor {
    cfg: Config,
    bus: Bus,
    subs: Arc<SubscriberSet>,
    policy: SignalPolicy,
    shutting_down: AtomicBool,
}

impl Supervisor {
    /// Starts building a supervisor with the given configuration.
    pub fn builder(cfg: Config) -> SupervisorBuilder {
        SupervisorBuilder::new(cfg)
    }

    /// Handle to the event bus, for embedders that want their own
    /// receivers alongside the subscriber set.
    pub fn bus(&self) -> Bus {
        self.bus.clone()
    }

    /// Runs the supplied tasks until the first exit, spawn failure, or
    /// termination signal, then tears the group down and reports what
    /// happened.
    ///
    /// Startup is strict: tasks start in input order, each successful
    /// start is followed by its spec's settle delay, and later tasks may
    /// assume earlier ones are live.
    pub async fn run(&self, tasks: Vec<TaskSpec>) -> Result<ShutdownCause, RuntimeError> {
        let mut seen = HashSet::new();
        for spec in &tasks {
            if !seen.insert(spec.task.name().to_string()) {
                return Err(RuntimeError::DuplicateName {
                    name: spec.task.name().to_string(),
                });
            }
        }
        if tasks.is_empty() {
            return Ok(ShutdownCause::Idle);
        }

        self.subscriber_listener();
        let (exits, mut stream) = ExitChannel::new();

        let mut started: Vec<TaskRef> = Vec::with_capacity(tasks.len());
        for spec in &tasks {
            match spec.task.start(&self.bus, &exits).await {
                Ok(()) => {
                    started.push(Arc::clone(&spec.task));
                    if let Some(settle) = spec.settle {
                        time::sleep(settle).await;
                    }
                }
                Err(err) => {
                    self.bus.publish(
                        Event::new(EventKind::SpawnFailed)
                            .with_task(err.task_name())
                            .with_reason(err.as_message()),
                    );
                    let cause = ShutdownCause::SpawnFailed {
                        task: err.task_name().to_string(),
                    };
                    self.shutdown(&started, &mut stream, &cause, 0).await;
                    self.finish().await;
                    return Ok(cause);
                }
            }
        }
        self.bus
            .publish(Event::new(EventKind::Ready).with_reason(self.ready_note()));

        let cause = tokio::select! {
            ev = stream.first() => match ev {
                Some(ev) => ShutdownCause::TaskExited { task: ev.task.to_string() },
                None => ShutdownCause::Idle,
            },
            res = self.policy.recv() => ShutdownCause::Signal(res?),
        };
        let observed = matches!(cause, ShutdownCause::TaskExited { .. }) as usize;
        self.shutdown(&started, &mut stream, &cause, observed).await;
        self.finish().await;
        Ok(cause)
    }

    fn ready_note(&self) -> String {
        match self.cfg.port {
            Some(port) => format!("all tasks running; front end on port {port}"),
            None => "all tasks running".to_string(),
        }
    }

    /// Subscribes to the bus and forwards events to the subscriber set
    /// (fire-and-forget).
    fn subscriber_listener(&self) {
        let mut rx = self.bus.subscribe();
        let set = Arc::clone(&self.subs);
        tokio::spawn(async move {
            while let Ok(ev) = rx.recv().await {
                set.emit(&ev);
            }
        });
    }

    /// Tears the group down. Entered at most once; later callers return
    /// immediately.
    ///
    /// `observed` is the number of exit events already consumed from the
    /// stream (1 when the trigger itself was a task exit), so the drain
    /// expects exactly the confirmations still outstanding.
    async fn shutdown(
        &self,
        started: &[TaskRef],
        stream: &mut ExitStream,
        cause: &ShutdownCause,
        observed: usize,
    ) {
        if self
            .shutting_down
            .compare_exchange(false, true, Ordering::SeqCst, Ordering::SeqCst)
            .is_err()
        {
            return;
        }

        let mut ev = Event::new(EventKind::ShutdownRequested).with_reason(cause.describe());
        if let ShutdownCause::TaskExited { task } | ShutdownCause::SpawnFailed { task } = cause {
            ev = ev.with_task(task.as_str());
        }
        self.bus.publish(ev);

        // Teardown is unordered: there are no dependencies among tasks on
        // the way down, so every running task is signaled concurrently.
        join_all(
            started
                .iter()
                .filter(|task| task.state().is_running())
                .map(|task| task.request_termination()),
        )
        .await;

        let expected = started.len().saturating_sub(observed);
        let confirmed = stream.drain(expected, self.cfg.grace).await;
        if confirmed < expected {
            let stuck: Vec<String> = started
                .iter()
                .filter(|task| !task.state().is_exited())
                .map(|task| task.name().to_string())
                .collect();
            let err = RuntimeError::GraceExceeded {
                grace: self.cfg.grace,
                stuck,
            };
            self.bus
                .publish(Event::new(EventKind::GraceExceeded).with_reason(err.as_message()));
        } else {
            self.bus.publish(Event::new(EventKind::AllStoppedWithin));
        }
    }

    /// Lets the listener forward the tail of the event stream, then
    /// closes the subscriber queues and waits for the workers to render
    /// it.
    async fn finish(&self) {
        time::sleep(Duration::from_millis(50)).await;
        self.subs.shutdown().await;
    }
}
