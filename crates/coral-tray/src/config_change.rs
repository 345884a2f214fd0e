//! Restarts the backend when the settings editor saves the configuration.

use std::time::Instant;

use tracing::info;

use crate::process::{BackendSpawner, ProcessSupervisor};

const CONFIG_TARGET: &str = concat!(env!("CARGO_PKG_NAME"), "::config_change");

/// Turns "configuration saved" signals into supervised restarts.
///
/// Signals are not debounced: each one stops the backend and schedules its
/// own start after the grace delay.
#[derive(Debug, Default)]
pub struct ConfigChangeCoordinator {
    received: u64,
}

impl ConfigChangeCoordinator {
    /// Builds a coordinator that has seen no signals.
    #[must_use]
    pub const fn new() -> Self {
        Self { received: 0 }
    }

    /// Restarts the backend.
    pub fn on_config_saved<S: BackendSpawner>(
        &mut self,
        supervisor: &mut ProcessSupervisor<S>,
        now: Instant,
    ) {
        self.received += 1;
        info!(
            target: CONFIG_TARGET,
            count = self.received,
            "configuration saved; restarting backend"
        );
        supervisor.restart(now);
    }

    /// Number of signals handled.
    #[must_use]
    pub const fn received(&self) -> u64 {
        self.received
    }
}
