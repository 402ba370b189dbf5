//! # Launch and task specifications.
//!
//! [`LaunchSpec`] is the opaque external input describing how to start one
//! child process: a name, a command line, and environment overrides. The
//! configuration layer that produces it is outside this crate's scope.
//!
//! [`TaskSpec`] bundles a ready-to-start [`TaskRef`] with per-entry
//! startup policy — currently the settle delay honored after this task
//! starts and before the next one does.

use std::collections::HashMap;
use std::fmt;
use std::time::Duration;

use crate::tasks::task::TaskRef;

/// External description of one child process.
///
/// Immutable once handed to the supervisor. `name` must be unique within a
/// run; it keys diagnostic reporting and log filtering.
#[derive(Clone, Debug)]
pub struct LaunchSpec {
    /// Unique task name.
    pub name: String,
    /// Command words: program followed by its arguments. Must be
    /// non-empty; an empty command is rejected at spawn time.
    pub command: Vec<String>,
    /// Environment variables set on top of the inherited environment.
    pub env: HashMap<String, String>,
}

impl LaunchSpec {
    /// Creates a launch spec with no environment overrides.
    pub fn new(name: impl Into<String>, command: Vec<String>) -> Self {
        Self {
            name: name.into(),
            command,
            env: HashMap::new(),
        }
    }

    /// Adds or replaces one environment override.
    pub fn with_env(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.env.insert(key.into(), value.into());
        self
    }
}

/// # Specification for running a task under supervision.
///
/// A [`TaskSpec`] bundles:
/// - the task itself ([`TaskRef`])
/// - an optional settle delay applied after a successful start, before the
///   next task in the startup order is started
///
/// # Example
/// ```
/// use std::time::Duration;
/// use procvisor::{LaunchSpec, ProcessTask, TaskSpec};
///
/// let spec = LaunchSpec::new("web", vec!["bin/web".into()]);
/// let entry = TaskSpec::new(ProcessTask::arc(spec)).with_settle(Duration::from_secs(2));
/// assert_eq!(entry.settle, Some(Duration::from_secs(2)));
/// ```
#[derive(Clone)]
pub struct TaskSpec {
    /// Reference to the task to be started.
    pub task: TaskRef,
    /// Delay inserted after this task starts, before the next start.
    pub settle: Option<Duration>,
}

impl TaskSpec {
    /// Creates a task specification with no settle delay.
    pub fn new(task: TaskRef) -> Self {
        Self { task, settle: None }
    }

    /// Sets the settle delay.
    pub fn with_settle(mut self, settle: Duration) -> Self {
        self.settle = Some(settle);
        self
    }
}

impl fmt::Debug for TaskSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TaskSpec")
            .field("task", &self.task.name())
            .field("settle", &self.settle)
            .finish()
    }
}
