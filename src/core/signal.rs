//! # SignalPolicy: terminal-aware interrupt and terminate handling.
//!
//! Decides, from whether the supervisor's stdout is attached to an
//! interactive terminal, how a Ctrl-C-style interrupt is treated:
//!
//! - **Interactive**: the first SIGINT makes the supervisor raise SIGTERM
//!   at *itself*. Whether the keystroke-generated signal landed here
//!   directly or via the process group, exactly one shutdown code path —
//!   the terminate signal — is ever used.
//! - **Managed** (stdout not a terminal, e.g. launched under another
//!   process supervisor): SIGINT is consumed and ignored entirely. In a
//!   process-group delivery model both this program and its supervising
//!   parent may receive the same interrupt at once; deferring to the
//!   parent's explicit SIGTERM avoids a double-shutdown race.
//!
//! Signal streams are registered inside [`SignalPolicy::recv`], i.e. once
//! the supervisor enters its steady state; signals arriving earlier keep
//! their default disposition.

use std::io::IsTerminal;

use crate::error::RuntimeError;

/// The signal that triggered shutdown.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ShutdownSignal {
    /// SIGINT (only ever surfaces if self-signaling SIGTERM failed).
    Interrupt,
    /// SIGTERM.
    Terminate,
}

impl ShutdownSignal {
    /// Conventional signal name.
    pub fn as_str(&self) -> &'static str {
        match self {
            ShutdownSignal::Interrupt => "SIGINT",
            ShutdownSignal::Terminate => "SIGTERM",
        }
    }

    /// Restores the signal's default disposition and re-raises it, so a
    /// parent supervisor observes signal-based death rather than a
    /// generic failure code.
    #[cfg(unix)]
    pub fn reraise(self) -> ! {
        use nix::sys::signal::{SaFlags, SigAction, SigHandler, SigSet, Signal, raise, sigaction};

        let sig = match self {
            ShutdownSignal::Interrupt => Signal::SIGINT,
            ShutdownSignal::Terminate => Signal::SIGTERM,
        };
        let default = SigAction::new(SigHandler::SigDfl, SaFlags::empty(), SigSet::empty());
        unsafe {
            let _ = sigaction(sig, &default);
        }
        let _ = raise(sig);
        // The raise should not return; the shell convention is the fallback.
        std::process::exit(128 + sig as i32)
    }

    /// Non-unix platforms have no signal disposition to restore.
    #[cfg(not(unix))]
    pub fn reraise(self) -> ! {
        std::process::exit(1)
    }
}

/// Terminal-attachment-dependent signal handling policy.
#[derive(Debug, Clone, Copy)]
pub struct SignalPolicy {
    interactive: bool,
}

impl SignalPolicy {
    /// Derives the policy from whether stdout is a terminal.
    pub fn from_stdout() -> Self {
        Self {
            interactive: std::io::stdout().is_terminal(),
        }
    }

    /// Builds the policy with an explicit interactivity decision.
    pub fn new(interactive: bool) -> Self {
        Self { interactive }
    }

    /// True when interrupts are converted into a terminate signal.
    pub fn is_interactive(&self) -> bool {
        self.interactive
    }

    /// Waits for the signal that should trigger shutdown.
    ///
    /// Registers the interrupt and terminate listeners, then loops:
    /// SIGTERM resolves; SIGINT is converted (interactive) or consumed
    /// (managed). Each call creates independent listeners.
    #[cfg(unix)]
    pub async fn recv(&self) -> Result<ShutdownSignal, RuntimeError> {
        use tokio::signal::unix::{SignalKind, signal};

        let mut term = signal(SignalKind::terminate())
            .map_err(|source| RuntimeError::SignalSetup { source })?;
        let mut interrupt = signal(SignalKind::interrupt())
            .map_err(|source| RuntimeError::SignalSetup { source })?;

        loop {
            tokio::select! {
                _ = term.recv() => return Ok(ShutdownSignal::Terminate),
                _ = interrupt.recv() => {
                    if self.interactive {
                        use nix::sys::signal::{Signal, raise};
                        if raise(Signal::SIGTERM).is_err() {
                            return Ok(ShutdownSignal::Interrupt);
                        }
                        // The terminate arm picks the raised signal up.
                    }
                }
            }
        }
    }

    /// Waits for the signal that should trigger shutdown.
    #[cfg(not(unix))]
    pub async fn recv(&self) -> Result<ShutdownSignal, RuntimeError> {
        tokio::signal::ctrl_c()
            .await
            .map_err(|source| RuntimeError::SignalSetup { source })?;
        Ok(ShutdownSignal::Terminate)
    }
}
