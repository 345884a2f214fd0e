//! Test double for [`HealthReporter`] that records structured events for assertions.

use std::sync::Mutex;
use std::time::Duration;

use crate::health::HealthReporter;
use crate::launch::LaunchContext;
use crate::permissions::Grants;
use crate::process::{ExitReport, Generation, SpawnError};

/// Structured health events tracked during scenarios.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum HealthEvent {
    /// A spawn was attempted.
    Starting,
    /// A backend obtained a pid.
    Running { pid: u32, generation: Generation },
    /// A spawn failed with the rendered error.
    LaunchFailed(String),
    /// The supervisor released a backend.
    Stopped(u32),
    /// An exit notification arrived.
    Exited {
        pid: u32,
        report: ExitReport,
        current: bool,
    },
    /// A restart was scheduled.
    RestartScheduled(Duration),
    /// The backend reported readiness.
    Ready,
    /// The permission prompt was shown.
    PermissionPrompted(Grants),
    /// The privileged setup finished.
    RemediationFinished(Result<(), String>),
}

/// Records health events for assertions.
#[derive(Debug, Default)]
pub struct RecordingHealthReporter {
    events: Mutex<Vec<HealthEvent>>,
}

impl RecordingHealthReporter {
    /// Captures a copy of the recorded events.
    #[must_use]
    pub fn events(&self) -> Vec<HealthEvent> {
        self.events
            .lock()
            .expect("health reporter mutex poisoned")
            .clone()
    }

    fn record(&self, event: HealthEvent) {
        self.events
            .lock()
            .expect("health reporter mutex poisoned")
            .push(event);
    }
}

impl HealthReporter for RecordingHealthReporter {
    fn backend_starting(&self, _context: &LaunchContext) {
        self.record(HealthEvent::Starting);
    }

    fn backend_running(&self, pid: u32, generation: Generation) {
        self.record(HealthEvent::Running { pid, generation });
    }

    fn backend_launch_failed(&self, error: &SpawnError) {
        self.record(HealthEvent::LaunchFailed(error.to_string()));
    }

    fn backend_stopped(&self, pid: u32) {
        self.record(HealthEvent::Stopped(pid));
    }

    fn backend_exited(&self, pid: u32, report: &ExitReport, current: bool) {
        self.record(HealthEvent::Exited {
            pid,
            report: *report,
            current,
        });
    }

    fn restart_scheduled(&self, delay: Duration) {
        self.record(HealthEvent::RestartScheduled(delay));
    }

    fn backend_ready(&self) {
        self.record(HealthEvent::Ready);
    }

    fn permission_prompted(&self, grants: Grants) {
        self.record(HealthEvent::PermissionPrompted(grants));
    }

    fn remediation_finished(&self, outcome: Result<(), &str>) {
        self.record(HealthEvent::RemediationFinished(
            outcome.map_err(str::to_owned),
        ));
    }
}
