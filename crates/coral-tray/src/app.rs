//! Startup and shutdown sequencing for the supervisor process.

use std::ffi::OsString;
use std::process::ExitCode;
use std::sync::Arc;

use clap::Parser;
use coral_config::{Config, RuntimePaths, RuntimePathsError};
use coral_protocol::ControlCommand;
use thiserror::Error;
use tracing::{debug, error, info, warn};

use crate::cli::{Cli, CliCommand};
use crate::desktop::ZenityDesktop;
use crate::events;
use crate::health::{HealthReporter, StructuredHealthReporter};
use crate::instance::{
    ControlError, ControlListener, HealthState, InstanceError, InstanceGuard, send_command,
};
use crate::launch::{HostEnvironment, LaunchError, PathResolver, seed_user_config};
use crate::permissions::{PkexecElevator, SystemGrantProbe};
use crate::process::{ProcessSupervisor, SystemSpawner};
use crate::runtime::{Coordinator, ExitReason, SignalError, SignalForwarder, run_loop};
use crate::telemetry::{self, TelemetryError};

const APP_TARGET: &str = concat!(env!("CARGO_PKG_NAME"), "::app");

/// Errors that abort the supervisor before or after its event loop.
#[derive(Debug, Error)]
pub enum AppError {
    /// Logging could not be configured.
    #[error(transparent)]
    Telemetry(#[from] TelemetryError),
    /// The runtime directory could not be prepared.
    #[error(transparent)]
    RuntimePaths(#[from] RuntimePathsError),
    /// The instance lock could not be managed.
    #[error(transparent)]
    Instance(#[from] InstanceError),
    /// The control socket failed.
    #[error(transparent)]
    Control(#[from] ControlError),
    /// Signal forwarding could not be installed.
    #[error(transparent)]
    Signals(#[from] SignalError),
    /// The backend could not be located.
    #[error(transparent)]
    Launch(#[from] LaunchError),
}

/// How an invocation ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome {
    /// The supervisor ran and its loop stopped for `ExitReason`.
    Finished(ExitReason),
    /// Another instance owns the session; it was asked to focus.
    Deferred,
    /// A `notify` command was delivered.
    Notified,
}

impl Outcome {
    /// Process exit status for this outcome.
    #[must_use]
    pub fn exit_code(self) -> ExitCode {
        match self {
            Self::Finished(reason) if reason.is_failure() => ExitCode::FAILURE,
            _ => ExitCode::SUCCESS,
        }
    }
}

/// Parses `args` and runs the requested command.
pub fn run<I, T>(args: I) -> ExitCode
where
    I: IntoIterator<Item = T>,
    T: Into<OsString> + Clone,
{
    let cli = match Cli::try_parse_from(args) {
        Ok(cli) => cli,
        Err(error) => {
            let failed = error.use_stderr();
            // clap renders help, version, and usage errors itself.
            if error.print().is_err() || failed {
                return ExitCode::FAILURE;
            }
            return ExitCode::SUCCESS;
        }
    };
    match execute(cli) {
        Ok(outcome) => outcome.exit_code(),
        Err(failure) => {
            error!(target: APP_TARGET, error = %failure, "coral-tray failed");
            eprintln!("coral-tray: {failure}");
            ExitCode::FAILURE
        }
    }
}

/// Runs a parsed invocation.
///
/// # Errors
///
/// Returns an [`AppError`] when setup fails before the event loop starts or
/// the control socket cannot be shut down cleanly.
pub fn execute(cli: Cli) -> Result<Outcome, AppError> {
    let Cli { config, command } = cli;
    telemetry::initialise(&config)?;
    let paths = RuntimePaths::from_config(&config)?;
    match command {
        Some(CliCommand::Notify { command }) => {
            send_command(paths.socket_path(), command.into())?;
            Ok(Outcome::Notified)
        }
        None => supervise(&config, paths),
    }
}

fn supervise(config: &Config, paths: RuntimePaths) -> Result<Outcome, AppError> {
    let guard = match InstanceGuard::acquire(paths.clone()) {
        Ok(guard) => guard,
        Err(InstanceError::AlreadyRunning { pid }) => {
            info!(target: APP_TARGET, pid, "already running; focusing existing instance");
            focus_existing(&paths);
            return Ok(Outcome::Deferred);
        }
        Err(InstanceError::StartupInProgress) => {
            info!(target: APP_TARGET, "another instance is starting; exiting");
            return Ok(Outcome::Deferred);
        }
        Err(other) => return Err(other.into()),
    };
    info!(target: APP_TARGET, pid = guard.pid(), "instance lock held");
    guard.write_health(HealthState::Starting)?;

    let context = PathResolver::new(config, HostEnvironment::capture()?).resolve()?;
    if let Err(failure) = seed_user_config(&context) {
        warn!(
            target: APP_TARGET,
            error = %failure,
            "could not seed user config; launching anyway"
        );
    }

    let (sink, receiver) = events::channel();
    let listener = ControlListener::start(guard.paths().socket_path(), sink.clone())?;
    let signals = SignalForwarder::install(sink.clone())?;

    let reporter: Arc<dyn HealthReporter> = Arc::new(StructuredHealthReporter::new());
    let supervisor = ProcessSupervisor::new(
        context,
        SystemSpawner::new(sink.clone()),
        Arc::clone(&reporter),
    );
    let mut coordinator = Coordinator::new(
        supervisor,
        ZenityDesktop::new(sink.clone()),
        PkexecElevator::new(sink),
        SystemGrantProbe::default(),
        reporter,
    );

    coordinator.startup();
    guard.write_health(HealthState::Ready)?;
    let reason = run_loop(&mut coordinator, &receiver);
    info!(target: APP_TARGET, %reason, "event loop stopped");

    if let Err(failure) = guard.write_health(HealthState::Stopping) {
        warn!(target: APP_TARGET, error = %failure, "could not record stopping state");
    }
    coordinator.shutdown();
    drop(signals);
    debug!(
        target: APP_TARGET,
        socket = %listener.path().display(),
        "closing control socket"
    );
    listener.shutdown()?;
    drop(guard);
    info!(target: APP_TARGET, "shutdown complete");
    Ok(Outcome::Finished(reason))
}

fn focus_existing(paths: &RuntimePaths) {
    match send_command(paths.socket_path(), ControlCommand::Focus) {
        Ok(()) => debug!(target: APP_TARGET, "focus request delivered"),
        Err(failure) => warn!(
            target: APP_TARGET,
            error = %failure,
            "could not reach the running instance"
        ),
    }
}
