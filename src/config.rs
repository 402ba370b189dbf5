//! # Global runtime configuration.
//!
//! [`Config`] defines the supervisor's behavior: shutdown grace period,
//! event bus capacity, and the advertised front-end port (diagnostics
//! only). Settle delays are per-entry, on
//! [`TaskSpec`](crate::TaskSpec).
//!
//! # Example
//! ```
//! use std::time::Duration;
//! use procvisor::Config;
//!
//! let mut cfg = Config::default();
//! cfg.grace = Duration::from_secs(10);
//! cfg.port = Some(3000);
//!
//! assert_eq!(cfg.port, Some(3000));
//! ```

use std::time::Duration;

/// Global configuration for the supervisor.
///
/// Controls the shutdown grace window, event bus capacity, and the
/// advertised port.
#[derive(Clone, Debug)]
pub struct Config {
    /// Maximum time to wait for children to confirm termination during
    /// shutdown before the supervisor exits regardless.
    pub grace: Duration,
    /// Capacity of the event bus channel.
    pub bus_capacity: usize,
    /// Port the front-end task is expected to listen on. Narrated in the
    /// startup diagnostics; the supervisor itself never binds it.
    pub port: Option<u16>,
}

impl Default for Config {
    /// Provides a default configuration:
    /// - `grace = 5s`
    /// - `bus_capacity = 1024`
    /// - `port = None`
    fn default() -> Self {
        Self {
            grace: Duration::from_secs(5),
            bus_capacity: 1024,
            port: None,
        }
    }
}

impl Config {
    /// Bus capacity with the minimum of 1 enforced.
    pub(crate) fn bus_capacity_clamped(&self) -> usize {
        self.bus_capacity.max(1)
    }
}
