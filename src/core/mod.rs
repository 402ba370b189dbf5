//! Runtime core: orchestration and signal policy.
//!
//! This module contains the embedded implementation of the procvisor
//! runtime. The public API from this module is [`Supervisor`] (plus its
//! builder and the [`ShutdownCause`] it returns) and the terminal-aware
//! [`SignalPolicy`].
//!
//! Internal modules:
//! - [`supervisor`]: ordered startup, first-exit-wins trigger, bounded
//!   teardown;
//! - [`signal`]: interrupt/terminate policy and signal re-raising.

mod signal;
mod supervisor;

pub use signal::{ShutdownSignal, SignalPolicy};
pub use supervisor::{ShutdownCause, Supervisor, SupervisorBuilder};
