//! Error types used by the procvisor runtime and tasks.
//!
//! This module defines two error enums:
//!
//! - [`SpawnError`] — a task's underlying process could not be created.
//!   Always fatal: startup aborts before any remaining task is started.
//! - [`RuntimeError`] — errors raised by the supervision runtime itself,
//!   such as a shutdown sequence exceeding its grace period.
//!
//! Both types provide helper methods (`as_label`, `as_message`) for
//! diagnostics.

use std::time::Duration;
use thiserror::Error;

/// # Errors produced while creating a task's underlying process.
///
/// A spawn failure aborts supervisor startup immediately; tasks after the
/// failing one are never started.
#[non_exhaustive]
#[derive(Error, Debug)]
pub enum SpawnError {
    /// The launch spec carried no command words at all.
    #[error("task '{name}': launch spec has an empty command")]
    EmptyCommand {
        /// Name of the task whose spec was rejected.
        name: String,
    },

    /// The OS refused to create the process (or the pipeline's resources).
    #[error("task '{name}': failed to start '{program}': {source}")]
    Io {
        /// Name of the task that failed to start.
        name: String,
        /// Program (or pipeline stage) that could not be created.
        program: String,
        /// The underlying OS error.
        #[source]
        source: std::io::Error,
    },
}

impl SpawnError {
    /// Name of the task this spawn failure belongs to.
    pub fn task_name(&self) -> &str {
        match self {
            SpawnError::EmptyCommand { name } => name,
            SpawnError::Io { name, .. } => name,
        }
    }

    /// Returns a short stable label (snake_case) for diagnostics.
    ///
    /// # Example
    /// ```
    /// use procvisor::SpawnError;
    ///
    /// let err = SpawnError::EmptyCommand { name: "web".into() };
    /// assert_eq!(err.as_label(), "spawn_empty_command");
    /// ```
    pub fn as_label(&self) -> &'static str {
        match self {
            SpawnError::EmptyCommand { .. } => "spawn_empty_command",
            SpawnError::Io { .. } => "spawn_io",
        }
    }

    /// Returns a human-readable message with details about the error.
    pub fn as_message(&self) -> String {
        self.to_string()
    }
}

/// # Errors produced by the supervision runtime.
///
/// These represent failures in the orchestration itself. None of them
/// escapes the process as anything other than diagnostic text plus the
/// final exit status.
#[non_exhaustive]
#[derive(Error, Debug)]
pub enum RuntimeError {
    /// Shutdown grace period elapsed with tasks still unconfirmed.
    ///
    /// Logged, never escalated: the supervisor proceeds to exit and leaves
    /// straggler reclamation to the surrounding session.
    #[error("shutdown grace {grace:?} exceeded; still running: {stuck:?}")]
    GraceExceeded {
        /// The configured grace duration.
        grace: Duration,
        /// Names of tasks that did not confirm termination in time.
        stuck: Vec<String>,
    },

    /// OS signal handlers could not be installed.
    #[error("failed to install signal handlers: {source}")]
    SignalSetup {
        /// The underlying OS error.
        #[source]
        source: std::io::Error,
    },

    /// Two supplied launch specs share a task name.
    #[error("duplicate task name '{name}'")]
    DuplicateName {
        /// The offending name.
        name: String,
    },
}

impl RuntimeError {
    /// Returns a short stable label (snake_case) for diagnostics.
    ///
    /// # Example
    /// ```
    /// use procvisor::RuntimeError;
    /// use std::time::Duration;
    ///
    /// let err = RuntimeError::GraceExceeded { grace: Duration::from_secs(5), stuck: vec![] };
    /// assert_eq!(err.as_label(), "runtime_grace_exceeded");
    /// ```
    pub fn as_label(&self) -> &'static str {
        match self {
            RuntimeError::GraceExceeded { .. } => "runtime_grace_exceeded",
            RuntimeError::SignalSetup { .. } => "runtime_signal_setup",
            RuntimeError::DuplicateName { .. } => "runtime_duplicate_name",
        }
    }

    /// Returns a human-readable message with details about the error.
    pub fn as_message(&self) -> String {
        match self {
            RuntimeError::GraceExceeded { grace, stuck } => {
                format!("grace exceeded after {grace:?}; still running: {stuck:?}")
            }
            RuntimeError::SignalSetup { source } => {
                format!("signal handler installation failed: {source}")
            }
            RuntimeError::DuplicateName { name } => {
                format!("duplicate task name '{name}'")
            }
        }
    }
}
