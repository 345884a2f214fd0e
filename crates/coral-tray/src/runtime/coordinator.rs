use std::fmt;
use std::sync::Arc;
use std::time::Instant;

use coral_protocol::ProtocolEvent;
use tracing::{debug, info, warn};

use crate::animation::{TrayAnimation, TrayAnimationState};
use crate::config_change::ConfigChangeCoordinator;
use crate::desktop::{Desktop, Notice};
use crate::events::{LoopEvent, QuitSource};
use crate::health::HealthReporter;
use crate::permissions::{
    Elevator, GrantProbe, PermissionOutcome, PermissionWorkflow, RemediationPlan, WorkflowAction,
    permission_request, remediation_failed, setup_complete,
};
use crate::process::{BackendSpawner, ProcessSupervisor, SpawnError};

use super::RUNTIME_TARGET;

/// Why the event loop stopped.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExitReason {
    /// A `QUIT` control command.
    UserQuit,
    /// A termination signal.
    Signal(i32),
    /// The user skipped the permission setup.
    PermissionDeclined,
    /// The privileged setup failed.
    RemediationFailed,
    /// The permission setup finished.
    SetupComplete {
        /// Whether a reboot was requested.
        reboot: bool,
    },
    /// Every event producer went away.
    ChannelClosed,
}

impl ExitReason {
    /// Whether the process should report failure.
    #[must_use]
    pub const fn is_failure(self) -> bool {
        matches!(self, Self::ChannelClosed)
    }
}

impl fmt::Display for ExitReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::UserQuit => f.write_str("quit requested"),
            Self::Signal(signal) => write!(f, "signal {signal}"),
            Self::PermissionDeclined => f.write_str("device access declined"),
            Self::RemediationFailed => f.write_str("device access setup failed"),
            Self::SetupComplete { reboot: true } => f.write_str("setup complete; rebooting"),
            Self::SetupComplete { reboot: false } => f.write_str("setup complete"),
            Self::ChannelClosed => f.write_str("event channel closed"),
        }
    }
}

impl From<QuitSource> for ExitReason {
    fn from(source: QuitSource) -> Self {
        match source {
            QuitSource::Control => Self::UserQuit,
            QuitSource::Signal(signal) => Self::Signal(signal),
        }
    }
}

/// Owns every state machine and routes loop events between them.
///
/// All mutation happens through [`Coordinator::handle`] and
/// [`Coordinator::on_deadline`], called from the single loop thread with the
/// current time, so ordering is exactly the order events were received.
pub struct Coordinator<S, D, E, P> {
    supervisor: ProcessSupervisor<S>,
    animation: TrayAnimation,
    permissions: PermissionWorkflow,
    config_changes: ConfigChangeCoordinator,
    desktop: D,
    elevator: E,
    probe: P,
    reporter: Arc<dyn HealthReporter>,
    remediation_plan: Option<RemediationPlan>,
    exit: Option<ExitReason>,
}

impl<S, D, E, P> Coordinator<S, D, E, P>
where
    S: BackendSpawner,
    D: Desktop,
    E: Elevator,
    P: GrantProbe,
{
    /// Wires the state machines around `supervisor`.
    pub fn new(
        supervisor: ProcessSupervisor<S>,
        desktop: D,
        elevator: E,
        probe: P,
        reporter: Arc<dyn HealthReporter>,
    ) -> Self {
        Self {
            supervisor,
            animation: TrayAnimation::new(),
            permissions: PermissionWorkflow::new(),
            config_changes: ConfigChangeCoordinator::new(),
            desktop,
            elevator,
            probe,
            reporter,
            remediation_plan: None,
            exit: None,
        }
    }

    /// Launches the backend for the first time.
    pub fn startup(&mut self) {
        if let Err(error) = self.supervisor.start() {
            self.report_launch_failure(&error);
        }
    }

    /// Applies one loop event.
    pub fn handle(&mut self, event: LoopEvent, now: Instant) {
        if self.exit.is_some() {
            debug!(target: RUNTIME_TARGET, %event, "session ending; ignoring event");
            return;
        }
        match event {
            LoopEvent::Backend { generation, event } => {
                if self.supervisor.is_current(generation) {
                    self.dispatch(event, now);
                } else {
                    debug!(
                        target: RUNTIME_TARGET,
                        %generation,
                        token = ?event.token(),
                        "dropping output from a replaced backend"
                    );
                }
            }
            LoopEvent::BackendOutputClosed { generation } => {
                debug!(target: RUNTIME_TARGET, %generation, "backend output closed");
            }
            LoopEvent::BackendExited {
                generation,
                pid,
                report,
            } => {
                if self.supervisor.handle_exit(generation, pid, &report) {
                    self.release_trigger();
                }
            }
            LoopEvent::ConfigSaved => {
                self.config_changes
                    .on_config_saved(&mut self.supervisor, now);
                // The old backend's output is dropped from here on, so its
                // TRIGGER_UP would never arrive.
                self.release_trigger();
            }
            LoopEvent::FocusRequested => self.desktop.focus_primary(),
            LoopEvent::Quit(source) => self.finish(source.into()),
            LoopEvent::PermissionChoice(choice) => {
                let action = self.permissions.on_choice(choice);
                self.act(action);
            }
            LoopEvent::RemediationFinished(outcome) => {
                self.reporter
                    .remediation_finished(outcome.as_ref().map(|_| ()).map_err(String::as_str));
                let action = self.permissions.on_remediation(outcome);
                self.act(action);
            }
            LoopEvent::RebootChoice(choice) => {
                let action = self.permissions.on_reboot_choice(choice);
                self.act(action);
            }
        }
    }

    fn dispatch(&mut self, event: ProtocolEvent, now: Instant) {
        match event {
            ProtocolEvent::TriggerDown => {
                if self.animation.trigger_down(now) {
                    debug!(target: RUNTIME_TARGET, "trigger down; animating");
                }
            }
            ProtocolEvent::TriggerUp => self.release_trigger(),
            ProtocolEvent::NeedInputGroup | ProtocolEvent::NeedUinputRule => {
                self.desktop.dismiss_welcome();
                let action = self.permissions.on_deficiency(&self.probe);
                self.act(action);
            }
            ProtocolEvent::BackendReady => {
                self.desktop.backend_ready();
                self.reporter.backend_ready();
            }
            ProtocolEvent::Unrecognized(line) => {
                debug!(target: RUNTIME_TARGET, line = %line, "ignoring unrecognized backend output");
            }
        }
    }

    fn act(&mut self, action: WorkflowAction) {
        match action {
            WorkflowAction::Ignore => {}
            WorkflowAction::AskPermission(grants) => {
                self.reporter.permission_prompted(grants);
                self.desktop.ask_permission(&permission_request(grants));
            }
            WorkflowAction::Remediate => match RemediationPlan::for_current_user() {
                Ok(plan) => {
                    self.elevator.remediate(&plan);
                    self.remediation_plan = Some(plan);
                }
                Err(error) => {
                    let next = self.permissions.on_remediation(Err(error.to_string()));
                    self.act(next);
                }
            },
            WorkflowAction::ReportFailure(message) => {
                let plan = self
                    .remediation_plan
                    .clone()
                    .unwrap_or_else(|| RemediationPlan::new("$USER"));
                self.desktop.show_error(&remediation_failed(&message, &plan));
                self.finish(ExitReason::RemediationFailed);
            }
            WorkflowAction::AskReboot => self.desktop.ask_reboot(&setup_complete()),
            WorkflowAction::Finish(PermissionOutcome::Declined) => {
                self.finish(ExitReason::PermissionDeclined);
            }
            WorkflowAction::Finish(PermissionOutcome::RemediationFailed) => {
                self.finish(ExitReason::RemediationFailed);
            }
            WorkflowAction::Finish(PermissionOutcome::SetupComplete { reboot }) => {
                self.supervisor.stop();
                if reboot && let Err(error) = self.elevator.reboot() {
                    warn!(target: RUNTIME_TARGET, error = %error, "reboot request failed");
                }
                self.finish(ExitReason::SetupComplete { reboot });
            }
        }
    }

    /// Runs whatever timers are due at `now`.
    pub fn on_deadline(&mut self, now: Instant) {
        if let Some(frame) = self.animation.tick(now) {
            self.desktop.show_frame(frame);
        }
        for outcome in self.supervisor.fire_due_starts(now) {
            if let Err(error) = outcome {
                self.report_launch_failure(&error);
            }
        }
    }

    /// Earliest pending timer.
    #[must_use]
    pub fn next_deadline(&self) -> Option<Instant> {
        match (self.animation.next_deadline(), self.supervisor.next_deadline()) {
            (Some(tick), Some(start)) => Some(tick.min(start)),
            (tick, start) => tick.or(start),
        }
    }

    /// Set once the session should end.
    #[must_use]
    pub const fn exit_reason(&self) -> Option<ExitReason> {
        self.exit
    }

    /// Stops the backend and waits for outstanding notices.
    pub fn shutdown(&mut self) {
        self.supervisor.cancel_pending_starts();
        self.supervisor.stop();
        self.desktop.shutdown();
    }

    fn finish(&mut self, reason: ExitReason) {
        info!(target: RUNTIME_TARGET, %reason, "ending session");
        self.supervisor.cancel_pending_starts();
        self.supervisor.stop();
        self.release_trigger();
        self.exit.get_or_insert(reason);
    }

    fn release_trigger(&mut self) {
        if let Some(frame) = self.animation.trigger_up() {
            self.desktop.show_frame(frame);
        }
    }

    fn report_launch_failure(&mut self, error: &SpawnError) {
        self.desktop.show_error(&Notice::error(
            "Coral Failed to Start",
            format!("The speech engine could not be started:\n{error}"),
        ));
    }

    /// The process supervisor.
    #[must_use]
    pub const fn supervisor(&self) -> &ProcessSupervisor<S> {
        &self.supervisor
    }

    /// Current animation state.
    #[must_use]
    pub const fn animation_state(&self) -> TrayAnimationState {
        self.animation.state()
    }

    /// The permission workflow.
    #[must_use]
    pub const fn permissions(&self) -> &PermissionWorkflow {
        &self.permissions
    }
}
