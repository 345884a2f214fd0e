//! Structured health reporting for supervisor lifecycle events.

use std::sync::Arc;
use std::time::Duration;

use crate::launch::LaunchContext;
use crate::permissions::Grants;
use crate::process::{ExitReport, Generation, SpawnError};

const HEALTH_TARGET: &str = concat!(env!("CARGO_PKG_NAME"), "::health");

/// Observer trait used to surface lifecycle events to telemetry sinks.
pub trait HealthReporter: Send + Sync {
    /// Invoked before a backend spawn is attempted.
    fn backend_starting(&self, context: &LaunchContext);

    /// Invoked once the spawned backend has a process id.
    fn backend_running(&self, pid: u32, generation: Generation);

    /// Invoked when a spawn attempt fails.
    fn backend_launch_failed(&self, error: &SpawnError);

    /// Invoked after the supervisor signalled and released a backend.
    fn backend_stopped(&self, pid: u32);

    /// Invoked for every exit notification; `current` is false when the
    /// handle had already been released or replaced.
    fn backend_exited(&self, pid: u32, report: &ExitReport, current: bool);

    /// Invoked when a restart schedules a start after `delay`.
    fn restart_scheduled(&self, delay: Duration);

    /// Invoked when the backend reports it finished initialising.
    fn backend_ready(&self);

    /// Invoked when the user is asked to grant device access.
    fn permission_prompted(&self, grants: Grants);

    /// Invoked when the privileged remediation finishes.
    fn remediation_finished(&self, outcome: Result<(), &str>);
}

impl<T> HealthReporter for Arc<T>
where
    T: HealthReporter + ?Sized,
{
    fn backend_starting(&self, context: &LaunchContext) {
        (**self).backend_starting(context);
    }

    fn backend_running(&self, pid: u32, generation: Generation) {
        (**self).backend_running(pid, generation);
    }

    fn backend_launch_failed(&self, error: &SpawnError) {
        (**self).backend_launch_failed(error);
    }

    fn backend_stopped(&self, pid: u32) {
        (**self).backend_stopped(pid);
    }

    fn backend_exited(&self, pid: u32, report: &ExitReport, current: bool) {
        (**self).backend_exited(pid, report, current);
    }

    fn restart_scheduled(&self, delay: Duration) {
        (**self).restart_scheduled(delay);
    }

    fn backend_ready(&self) {
        (**self).backend_ready();
    }

    fn permission_prompted(&self, grants: Grants) {
        (**self).permission_prompted(grants);
    }

    fn remediation_finished(&self, outcome: Result<(), &str>) {
        (**self).remediation_finished(outcome);
    }
}

/// Default reporter that records lifecycle events using `tracing`.
#[derive(Debug, Default, Clone, Copy)]
pub struct StructuredHealthReporter;

impl StructuredHealthReporter {
    /// Builds a new reporter.
    #[must_use]
    pub const fn new() -> Self {
        Self
    }
}

impl HealthReporter for StructuredHealthReporter {
    fn backend_starting(&self, context: &LaunchContext) {
        tracing::info!(
            target: HEALTH_TARGET,
            event = "backend_starting",
            executable = %context.executable().display(),
            config = %context.config_file().display(),
            "starting backend"
        );
    }

    fn backend_running(&self, pid: u32, generation: Generation) {
        tracing::info!(
            target: HEALTH_TARGET,
            event = "backend_running",
            pid,
            %generation,
            "backend running"
        );
    }

    fn backend_launch_failed(&self, error: &SpawnError) {
        tracing::error!(
            target: HEALTH_TARGET,
            event = "backend_launch_failed",
            error = %error,
            "backend failed to start"
        );
    }

    fn backend_stopped(&self, pid: u32) {
        tracing::info!(
            target: HEALTH_TARGET,
            event = "backend_stopped",
            pid,
            "backend stopped"
        );
    }

    fn backend_exited(&self, pid: u32, report: &ExitReport, current: bool) {
        tracing::info!(
            target: HEALTH_TARGET,
            event = "backend_exited",
            pid,
            code = ?report.code,
            signal = ?report.signal,
            current,
            "backend process exited with {report}"
        );
    }

    fn restart_scheduled(&self, delay: Duration) {
        tracing::info!(
            target: HEALTH_TARGET,
            event = "restart_scheduled",
            delay_ms = u64::try_from(delay.as_millis()).unwrap_or(u64::MAX),
            "backend restart scheduled"
        );
    }

    fn backend_ready(&self) {
        tracing::info!(
            target: HEALTH_TARGET,
            event = "backend_ready",
            "backend ready"
        );
    }

    fn permission_prompted(&self, grants: Grants) {
        tracing::warn!(
            target: HEALTH_TARGET,
            event = "permission_prompted",
            input_group = grants.input_group,
            uinput_rule = grants.uinput_rule,
            "requesting device access"
        );
    }

    fn remediation_finished(&self, outcome: Result<(), &str>) {
        match outcome {
            Ok(()) => tracing::info!(
                target: HEALTH_TARGET,
                event = "remediation_succeeded",
                "device access configured"
            ),
            Err(error) => tracing::error!(
                target: HEALTH_TARGET,
                event = "remediation_failed",
                error,
                "device access setup failed"
            ),
        }
    }
}
