use std::fmt;

use tracing::{debug, info};

use super::PERMISSIONS_TARGET;
use super::grants::{GrantProbe, Grants};

/// Answer to the "grant access" prompt.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GrantChoice {
    /// Run the privileged setup.
    Grant,
    /// Decline; the session ends.
    Skip,
}

/// Answer to the "setup complete" prompt.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RebootChoice {
    /// Reboot the machine immediately.
    RebootNow,
    /// Quit and leave the reboot to the user.
    Later,
}

/// How the workflow ended the session.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PermissionOutcome {
    /// The user skipped the setup.
    Declined,
    /// The privileged setup failed.
    RemediationFailed,
    /// The setup succeeded; `reboot` records the user's choice.
    SetupComplete {
        /// Whether a reboot was requested.
        reboot: bool,
    },
}

/// Where the workflow is.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum WorkflowStage {
    /// No prompt is open.
    #[default]
    Idle,
    /// Waiting for the grant/skip answer.
    AwaitingChoice,
    /// The privileged helper is running.
    Remediating,
    /// Waiting for the reboot answer.
    AwaitingReboot,
    /// The session is ending.
    Finished,
}

impl fmt::Display for WorkflowStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            Self::Idle => "idle",
            Self::AwaitingChoice => "awaiting_choice",
            Self::Remediating => "remediating",
            Self::AwaitingReboot => "awaiting_reboot",
            Self::Finished => "finished",
        };
        f.write_str(label)
    }
}

/// What the coordinator must do after an input.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WorkflowAction {
    /// Nothing.
    Ignore,
    /// Show the grant/skip prompt for the missing grants.
    AskPermission(Grants),
    /// Run the privileged setup.
    Remediate,
    /// Show the failure with manual instructions, then end the session.
    ReportFailure(String),
    /// Show the reboot prompt.
    AskReboot,
    /// Stop the backend and end the session.
    Finish(PermissionOutcome),
}

/// State machine for the once-per-session permission prompt.
#[derive(Debug, Clone, Default)]
pub struct PermissionWorkflow {
    stage: WorkflowStage,
    prompt_shown: bool,
}

impl PermissionWorkflow {
    /// Builds a workflow that has not prompted yet.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Handles a permission-deficiency event from the backend.
    ///
    /// Only the first call per session can prompt. The flag is latched before
    /// probing so a second event arriving while the first prompt is open is
    /// ignored.
    pub fn on_deficiency<P>(&mut self, probe: &P) -> WorkflowAction
    where
        P: GrantProbe + ?Sized,
    {
        if self.prompt_shown {
            debug!(
                target: PERMISSIONS_TARGET,
                stage = %self.stage,
                "permission prompt already handled this session"
            );
            return WorkflowAction::Ignore;
        }
        self.prompt_shown = true;

        let grants = probe.probe();
        if grants.is_complete() {
            info!(
                target: PERMISSIONS_TARGET,
                "device access already granted; ignoring deficiency report"
            );
            return WorkflowAction::Ignore;
        }
        self.stage = WorkflowStage::AwaitingChoice;
        WorkflowAction::AskPermission(grants)
    }

    /// Handles the grant/skip answer.
    pub fn on_choice(&mut self, choice: GrantChoice) -> WorkflowAction {
        if self.stage != WorkflowStage::AwaitingChoice {
            return self.unexpected("permission choice");
        }
        match choice {
            GrantChoice::Grant => {
                self.stage = WorkflowStage::Remediating;
                WorkflowAction::Remediate
            }
            GrantChoice::Skip => {
                self.stage = WorkflowStage::Finished;
                WorkflowAction::Finish(PermissionOutcome::Declined)
            }
        }
    }

    /// Handles the privileged helper's result.
    pub fn on_remediation(&mut self, outcome: Result<(), String>) -> WorkflowAction {
        if self.stage != WorkflowStage::Remediating {
            return self.unexpected("remediation result");
        }
        match outcome {
            Ok(()) => {
                self.stage = WorkflowStage::AwaitingReboot;
                WorkflowAction::AskReboot
            }
            Err(message) => {
                self.stage = WorkflowStage::Finished;
                WorkflowAction::ReportFailure(message)
            }
        }
    }

    /// Handles the reboot answer.
    pub fn on_reboot_choice(&mut self, choice: RebootChoice) -> WorkflowAction {
        if self.stage != WorkflowStage::AwaitingReboot {
            return self.unexpected("reboot choice");
        }
        self.stage = WorkflowStage::Finished;
        WorkflowAction::Finish(PermissionOutcome::SetupComplete {
            reboot: choice == RebootChoice::RebootNow,
        })
    }

    fn unexpected(&self, input: &str) -> WorkflowAction {
        debug!(
            target: PERMISSIONS_TARGET,
            stage = %self.stage,
            input,
            "ignoring input outside its stage"
        );
        WorkflowAction::Ignore
    }

    /// Current stage.
    #[must_use]
    pub const fn stage(&self) -> WorkflowStage {
        self.stage
    }

    /// Whether the session's single prompt has been claimed.
    #[must_use]
    pub const fn prompt_already_shown(&self) -> bool {
        self.prompt_shown
    }
}
