//! # ProcessTask: one supervised OS child process.
//!
//! Wraps a [`LaunchSpec`] and runs it as a genuine OS process via
//! [`tokio::process::Command`]. Stdio is inherited so the child shares the
//! supervisor's output streams; stdin is detached.
//!
//! ## Monitoring
//! `start()` spawns a detached monitor that blocks only on
//! `child.wait()`. When the child exits — for any reason — the monitor
//! records the decoded [`ExitOutcome`], publishes a `TaskExited`
//! diagnostic, and reports the task's single
//! [`ExitEvent`](crate::ExitEvent).
//!
//! ## Termination
//! `request_termination()` delivers SIGTERM to the child. The signal is
//! advisory: there is no SIGKILL escalation — a child that ignores it is
//! reported as a straggler by the supervisor's grace accounting and left
//! to the surrounding session.

use std::process::Stdio;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use async_trait::async_trait;
use tokio::process::Command;

use crate::error::SpawnError;
use crate::events::{Bus, Event, EventKind, ExitChannel, ExitEvent};
use crate::tasks::spec::LaunchSpec;
use crate::tasks::task::{ExitOutcome, Task, TaskRef, TaskState};

/// Supervised wrapper around a single child process.
pub struct ProcessTask {
    spec: LaunchSpec,
    state: Arc<Mutex<TaskState>>,
}

impl ProcessTask {
    /// Creates the task in `Spawned` state.
    pub fn new(spec: LaunchSpec) -> Self {
        Self {
            spec,
            state: Arc::new(Mutex::new(TaskState::Spawned)),
        }
    }

    /// Creates the task and returns it as a shared handle.
    pub fn arc(spec: LaunchSpec) -> TaskRef {
        Arc::new(Self::new(spec))
    }
}

fn lock(state: &Mutex<TaskState>) -> MutexGuard<'_, TaskState> {
    state.lock().unwrap_or_else(PoisonError::into_inner)
}

fn decode(status: std::process::ExitStatus) -> ExitOutcome {
    if let Some(code) = status.code() {
        return ExitOutcome::Code(code);
    }
    #[cfg(unix)]
    {
        use std::os::unix::process::ExitStatusExt;
        if let Some(sig) = status.signal() {
            return ExitOutcome::Signal(sig);
        }
    }
    ExitOutcome::Unknown
}

/// Sends SIGTERM to the given pid. Failure means the process is already
/// gone; the monitor reports the exit either way.
#[cfg(unix)]
fn send_term(pid: u32) {
    use nix::sys::signal::{Signal, kill};
    use nix::unistd::Pid;
    let _ = kill(Pid::from_raw(pid as i32), Signal::SIGTERM);
}

#[cfg(not(unix))]
fn send_term(_pid: u32) {}

#[async_trait]
impl Task for ProcessTask {
    fn name(&self) -> &str {
        &self.spec.name
    }

    async fn start(&self, bus: &Bus, exits: &ExitChannel) -> Result<(), SpawnError> {
        let name: Arc<str> = Arc::from(self.spec.name.as_str());
        let program = self
            .spec
            .command
            .first()
            .ok_or_else(|| SpawnError::EmptyCommand {
                name: self.spec.name.clone(),
            })?;

        bus.publish(Event::new(EventKind::TaskStarting).with_task(Arc::clone(&name)));

        let mut cmd = Command::new(program);
        cmd.args(&self.spec.command[1..])
            .envs(&self.spec.env)
            .stdin(Stdio::null());

        let mut child = cmd.spawn().map_err(|source| SpawnError::Io {
            name: self.spec.name.clone(),
            program: program.clone(),
            source,
        })?;

        let pid = child.id();
        *lock(&self.state) = TaskState::Running { pid };
        let mut started = Event::new(EventKind::TaskStarted).with_task(Arc::clone(&name));
        if let Some(pid) = pid {
            started = started.with_pid(pid);
        }
        bus.publish(started);

        let state = Arc::clone(&self.state);
        let bus = bus.clone();
        let exits = exits.clone();
        tokio::spawn(async move {
            let outcome = match child.wait().await {
                Ok(status) => decode(status),
                Err(_) => ExitOutcome::Unknown,
            };
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
        let mut st = lock(&self.state);
        if let TaskState::Running { pid } = *st {
            if let Some(pid) = pid {
                send_term(pid);
            }
            *st = TaskState::Terminating { pid };
        }
    }

    fn state(&self) -> TaskState {
        *lock(&self.state)
    }
}

#[cfg(all(test, unix))]
mod tests {
    use super::*;
    use std::time::Duration;

    fn sh(name: &str, script: &str) -> ProcessTask {
        ProcessTask::new(LaunchSpec::new(
            name,
            vec!["/bin/sh".into(), "-c".into(), script.into()],
        ))
    }

    #[tokio::test]
    async fn test_exit_code_is_reported_exactly_once() {
        let bus = Bus::new(16);
        let (exits, mut stream) = ExitChannel::new();
        let task = sh("coder", "exit 7");

        task.start(&bus, &exits).await.expect("spawn");
        let ev = stream.first().await.expect("exit event");
        assert_eq!(&*ev.task, "coder");
        assert_eq!(
            task.state(),
            TaskState::Exited {
                outcome: ExitOutcome::Code(7)
            }
        );
        // No second event for the same task.
        assert_eq!(stream.drain(1, Duration::from_millis(100)).await, 0);
    }

    #[tokio::test]
    async fn test_empty_command_is_a_spawn_error() {
        let bus = Bus::new(16);
        let (exits, _stream) = ExitChannel::new();
        let task = ProcessTask::new(LaunchSpec::new("empty", vec![]));

        let err = task.start(&bus, &exits).await.expect_err("must fail");
        assert_eq!(err.as_label(), "spawn_empty_command");
        assert_eq!(task.state(), TaskState::Spawned);
    }

    #[tokio::test]
    async fn test_unknown_program_is_a_spawn_error() {
        let bus = Bus::new(16);
        let (exits, _stream) = ExitChannel::new();
        let task = ProcessTask::new(LaunchSpec::new(
            "ghost",
            vec!["/nonexistent/definitely-not-here".into()],
        ));

        let err = task.start(&bus, &exits).await.expect_err("must fail");
        assert_eq!(err.as_label(), "spawn_io");
        assert_eq!(err.task_name(), "ghost");
    }

    #[tokio::test]
    async fn test_termination_request_stops_a_sleeper() {
        let bus = Bus::new(16);
        let (exits, mut stream) = ExitChannel::new();
        let task = sh("sleeper", "sleep 30");

        task.start(&bus, &exits).await.expect("spawn");
        task.request_termination().await;
        assert!(matches!(task.state(), TaskState::Terminating { .. }));

        let ev = tokio::time::timeout(Duration::from_secs(5), stream.first())
            .await
            .expect("terminated within bound")
            .expect("exit event");
        assert_eq!(&*ev.task, "sleeper");
        assert_eq!(
            task.state(),
            TaskState::Exited {
                outcome: ExitOutcome::Signal(nix::sys::signal::Signal::SIGTERM as i32)
            }
        );
    }

    #[tokio::test]
    async fn test_termination_request_is_idempotent_after_exit() {
        let bus = Bus::new(16);
        let (exits, mut stream) = ExitChannel::new();
        let task = sh("oneshot", "exit 0");

        task.start(&bus, &exits).await.expect("spawn");
        let _ = stream.first().await;
        let before = task.state();
        task.request_termination().await;
        assert_eq!(task.state(), before);
    }
}
