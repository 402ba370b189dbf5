//! # Event subscribers for the procvisor runtime.
//!
//! This module provides the [`Subscribe`] trait, the [`SubscriberSet`]
//! fan-out, and the built-in [`ConsoleLogger`] that renders the stderr
//! diagnostic stream.
//!
//! ## Architecture
//! ```text
//! Event flow:
//!   monitors/Supervisor ── publish(Event) ──► Bus ──► listener (in Supervisor)
//!                                                          │
//!                                                   SubscriberSet::emit
//!                                              ┌───────────┼───────────┐
//!                                              ▼           ▼           ▼
//!                                        ConsoleLogger   Metrics    Custom ...
//! ```
//!
//! ## Implementing custom subscribers
//! ```no_run
//! use procvisor::{Subscribe, Event, EventKind};
//! use async_trait::async_trait;
//!
//! struct FailureCounter;
//!
//! #[async_trait]
//! impl Subscribe for FailureCounter {
//!     async fn on_event(&self, event: &Event) {
//!         if event.kind == EventKind::TaskExited {
//!             // increment a counter
//!         }
//!     }
//! }
//! ```

mod console;
mod set;
mod subscribe;

pub use console::ConsoleLogger;
pub use set::SubscriberSet;
pub use subscribe::Subscribe;
