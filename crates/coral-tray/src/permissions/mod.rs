//! One-time device access setup.
//!
//! The backend reports missing access with `NEED_INPUT_GROUP` or
//! `NEED_UINPUT_RULE`. [`PermissionWorkflow`] decides what to do next and the
//! coordinator carries out the returned [`WorkflowAction`]: showing dialogs,
//! running the privileged [`RemediationPlan`] through an [`Elevator`], and
//! finally stopping the backend and quitting.

mod grants;
mod notices;
mod remediation;
mod workflow;

pub use grants::{GrantProbe, Grants, SystemGrantProbe};
#[cfg(test)]
pub use grants::MockGrantProbe;
pub use notices::{permission_request, remediation_failed, setup_complete};
pub use remediation::{ElevationError, Elevator, PkexecElevator, RemediationPlan};
pub use workflow::{
    GrantChoice, PermissionOutcome, PermissionWorkflow, RebootChoice, WorkflowAction, WorkflowStage,
};

pub(crate) const PERMISSIONS_TARGET: &str = concat!(env!("CARGO_PKG_NAME"), "::permissions");
