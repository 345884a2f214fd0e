//! Supervisor for the Coral speech backend.
//!
//! The tray process keeps one backend alive, decodes the tokens the backend
//! prints on standard output, animates the tray icon while the hotkey is held,
//! and walks the user through a one-time device permission setup when the
//! backend reports that it cannot read keyboard devices.
//!
//! Everything that changes state runs on one thread. Backend output, process
//! exits, control socket commands, signals, and dialog answers arrive as
//! [`LoopEvent`]s on a channel; [`runtime::run_loop`] hands them, together
//! with timer deadlines, to a [`Coordinator`] that owns every state machine.
//! Tests drive the coordinator directly with injected events and instants.
//!
//! Startup order:
//!
//! 1. claim the per-user [`InstanceGuard`], or ask the running instance to
//!    focus and exit;
//! 2. resolve the [`LaunchContext`] for the current deployment and seed the
//!    per-user config;
//! 3. open the control socket and signal forwarding;
//! 4. start the backend and run the loop until a quit path fires.

mod animation;
mod app;
mod cli;
mod config_change;
mod desktop;
mod events;
mod files;
mod health;
mod instance;
mod launch;
mod permissions;
mod process;
pub mod runtime;
mod telemetry;

pub use animation::{FRAME_COUNT, FRAME_INTERVAL, IconFrame, TrayAnimation, TrayAnimationState};
pub use app::{AppError, Outcome, execute, run};
pub use cli::{Cli, CliCommand, NotifyCommand};
pub use config_change::ConfigChangeCoordinator;
pub use desktop::{Desktop, Notice, ZenityDesktop};
pub use events::{EventSink, LoopEvent, QuitSource, channel};
pub use health::{HealthReporter, StructuredHealthReporter};
pub use instance::{
    ControlError, ControlListener, HealthState, InstanceError, InstanceGuard, send_command,
};
pub use launch::{
    DeploymentMode, HostEnvironment, LaunchContext, LaunchError, PathResolver, SeedError,
    SeedOutcome, seed_user_config,
};
pub use permissions::{
    ElevationError, Elevator, GrantChoice, GrantProbe, Grants, PermissionOutcome,
    PermissionWorkflow, PkexecElevator, RebootChoice, RemediationPlan, SystemGrantProbe,
    WorkflowAction, WorkflowStage,
};
pub use process::{
    BackendHandle, BackendSpawner, ExitReport, Generation, LifecycleState, ProcessSupervisor,
    RESTART_GRACE, SpawnError, StartOutcome, SystemSpawner, TerminateError,
};
pub use runtime::{Coordinator, ExitReason};
pub use telemetry::{TelemetryError, TelemetryHandle};

#[cfg(test)]
mod tests;
