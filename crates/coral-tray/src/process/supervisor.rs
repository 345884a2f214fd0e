//! Lifecycle rules for the single supervised backend.

use std::collections::VecDeque;
use std::fmt;
use std::sync::Arc;
use std::time::{Duration, Instant};

use tracing::{debug, warn};

use crate::health::HealthReporter;
use crate::launch::LaunchContext;

use super::errors::SpawnError;
use super::spawner::{BackendSpawner, ExitReport, Generation};
use super::PROCESS_TARGET;

/// Pause between stopping and respawning so the OS releases the input and
/// virtual keyboard devices the old backend held.
pub const RESTART_GRACE: Duration = Duration::from_millis(200);

/// Lifecycle of the backend handle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LifecycleState {
    /// No backend process is owned.
    Stopped,
    /// A spawn is in progress.
    Starting,
    /// A backend process with a known pid is owned.
    Running,
    /// The backend is being signalled and released.
    Terminating,
}

impl fmt::Display for LifecycleState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            Self::Stopped => "stopped",
            Self::Starting => "starting",
            Self::Running => "running",
            Self::Terminating => "terminating",
        };
        f.write_str(label)
    }
}

/// The supervisor's record of its backend child.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BackendHandle {
    pid: u32,
    generation: Generation,
    state: LifecycleState,
}

impl BackendHandle {
    /// Process id of the child.
    #[must_use]
    pub const fn pid(&self) -> u32 {
        self.pid
    }

    /// Generation tag carried by the child's output and exit events.
    #[must_use]
    pub const fn generation(&self) -> Generation {
        self.generation
    }

    /// Current lifecycle state.
    #[must_use]
    pub const fn state(&self) -> LifecycleState {
        self.state
    }
}

/// Result of a successful [`ProcessSupervisor::start`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StartOutcome {
    /// A new backend was spawned.
    Spawned {
        /// Process id of the new child.
        pid: u32,
        /// Generation assigned to the new child.
        generation: Generation,
    },
    /// A live backend already existed; nothing was spawned.
    AlreadyRunning {
        /// Process id of the existing child.
        pid: u32,
    },
}

/// Owns at most one backend process and enforces its lifecycle rules.
///
/// Liveness is always confirmed with the spawner's OS probe rather than
/// trusted from bookkeeping, so a backend killed externally is treated as
/// stopped on the next `start`.
pub struct ProcessSupervisor<S> {
    context: LaunchContext,
    spawner: S,
    reporter: Arc<dyn HealthReporter>,
    handle: Option<BackendHandle>,
    last_generation: Generation,
    pending_starts: VecDeque<Instant>,
    grace: Duration,
}

impl<S: BackendSpawner> ProcessSupervisor<S> {
    /// Builds a supervisor with the default [`RESTART_GRACE`].
    pub fn new(context: LaunchContext, spawner: S, reporter: Arc<dyn HealthReporter>) -> Self {
        Self {
            context,
            spawner,
            reporter,
            handle: None,
            last_generation: Generation::default(),
            pending_starts: VecDeque::new(),
            grace: RESTART_GRACE,
        }
    }

    /// Spawns the backend unless a live one already exists.
    ///
    /// # Errors
    ///
    /// Returns the [`SpawnError`] when launching fails; the supervisor stays
    /// stopped.
    pub fn start(&mut self) -> Result<StartOutcome, SpawnError> {
        if let Some(handle) = self.handle {
            if self.spawner.is_alive(handle.pid) {
                debug!(
                    target: PROCESS_TARGET,
                    pid = handle.pid,
                    "backend already running; skipping spawn"
                );
                return Ok(StartOutcome::AlreadyRunning { pid: handle.pid });
            }
            warn!(
                target: PROCESS_TARGET,
                pid = handle.pid,
                "backend vanished without an exit notification; treating as stopped"
            );
            self.handle = None;
        }

        let generation = self.last_generation.next();
        self.last_generation = generation;
        debug!(
            target: PROCESS_TARGET,
            state = %LifecycleState::Starting,
            %generation,
            "backend lifecycle transition"
        );
        self.reporter.backend_starting(&self.context);
        match self.spawner.spawn(&self.context, generation) {
            Ok(pid) => {
                self.handle = Some(BackendHandle {
                    pid,
                    generation,
                    state: LifecycleState::Running,
                });
                self.reporter.backend_running(pid, generation);
                Ok(StartOutcome::Spawned { pid, generation })
            }
            Err(error) => {
                self.reporter.backend_launch_failed(&error);
                Err(error)
            }
        }
    }

    /// Signals the backend and releases the handle without waiting for exit.
    ///
    /// Returns the pid that was released, or `None` when nothing was owned.
    pub fn stop(&mut self) -> Option<u32> {
        let mut handle = self.handle.take()?;
        handle.state = LifecycleState::Terminating;
        debug!(
            target: PROCESS_TARGET,
            pid = handle.pid,
            state = %handle.state,
            "backend lifecycle transition"
        );
        if self.spawner.is_alive(handle.pid)
            && let Err(error) = self.spawner.terminate(handle.pid)
        {
            warn!(
                target: PROCESS_TARGET,
                pid = handle.pid,
                error = %error,
                "failed to signal backend"
            );
        }
        self.reporter.backend_stopped(handle.pid);
        Some(handle.pid)
    }

    /// Stops the backend and schedules a start once the grace delay elapses.
    ///
    /// The delay applies even when nothing was running. Every call schedules
    /// its own start; the later ones find the first one's backend alive and
    /// do nothing.
    pub fn restart(&mut self, now: Instant) {
        self.stop();
        self.pending_starts.push_back(now + self.grace);
        self.reporter.restart_scheduled(self.grace);
    }

    /// Runs every scheduled start whose deadline has passed.
    pub fn fire_due_starts(&mut self, now: Instant) -> Vec<Result<StartOutcome, SpawnError>> {
        let mut outcomes = Vec::new();
        while self.pending_starts.front().is_some_and(|due| *due <= now) {
            self.pending_starts.pop_front();
            outcomes.push(self.start());
        }
        outcomes
    }

    /// Drops every scheduled start. Used when the session is ending.
    pub fn cancel_pending_starts(&mut self) {
        if !self.pending_starts.is_empty() {
            debug!(
                target: PROCESS_TARGET,
                count = self.pending_starts.len(),
                "cancelling scheduled starts"
            );
            self.pending_starts.clear();
        }
    }

    /// Earliest scheduled start.
    #[must_use]
    pub fn next_deadline(&self) -> Option<Instant> {
        self.pending_starts.front().copied()
    }

    /// Number of starts still waiting for their grace delay.
    #[must_use]
    pub fn pending_start_count(&self) -> usize {
        self.pending_starts.len()
    }

    /// Records an exit notification.
    ///
    /// The handle is cleared only when the notification matches the owned
    /// child. Returns whether it did.
    pub fn handle_exit(&mut self, generation: Generation, pid: u32, report: &ExitReport) -> bool {
        let current = self
            .handle
            .is_some_and(|handle| handle.generation == generation && handle.pid == pid);
        if current {
            self.handle = None;
        }
        self.reporter.backend_exited(pid, report, current);
        current
    }

    /// Whether events tagged `generation` come from the owned child.
    #[must_use]
    pub fn is_current(&self, generation: Generation) -> bool {
        self.handle
            .is_some_and(|handle| handle.generation == generation)
    }

    /// The owned backend, if any.
    #[must_use]
    pub const fn handle(&self) -> Option<&BackendHandle> {
        self.handle.as_ref()
    }

    /// Lifecycle state derived from the handle.
    #[must_use]
    pub fn lifecycle_state(&self) -> LifecycleState {
        self.handle
            .map_or(LifecycleState::Stopped, |handle| handle.state)
    }
}
