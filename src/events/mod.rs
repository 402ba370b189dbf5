//! Runtime events: types, broadcast bus, and the exit channel.
//!
//! This module groups the event **data model**, the **bus** used to
//! publish/subscribe to diagnostic events, and the **exit channel** that
//! carries the load-bearing "this task's process terminated" notifications.
//!
//! ## Contents
//! - [`EventKind`], [`Event`] — event classification and payload metadata
//! - [`Bus`] — thin wrapper over `tokio::sync::broadcast` (observability)
//! - [`ExitChannel`], [`ExitStream`], [`ExitEvent`] — first-exit-wins
//!   control channel (shutdown trigger + teardown confirmations)
//!
//! The bus is fire-and-forget narration; the exit channel is the control
//! path. A task monitor publishes its `TaskExited` diagnostic on the bus
//! *and* reports the single [`ExitEvent`] on the channel.

mod bus;
mod event;
mod exit;

pub use bus::Bus;
pub use event::{Event, EventKind};
pub use exit::{ExitChannel, ExitEvent, ExitStream};
