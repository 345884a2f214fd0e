//! Backend process supervision.
//!
//! [`ProcessSupervisor`] owns at most one backend child. Spawning, signalling,
//! and liveness probing go through the [`BackendSpawner`] seam so the
//! lifecycle rules can be exercised without real processes; [`SystemSpawner`]
//! is the OS-backed implementation that forwards decoded output and exit
//! notifications to the event loop.

mod errors;
mod liveness;
mod spawner;
mod supervisor;

pub use errors::{SpawnError, TerminateError};
pub use liveness::check_process;
pub use spawner::{BackendSpawner, ExitReport, Generation, SystemSpawner};
pub use supervisor::{
    BackendHandle, LifecycleState, ProcessSupervisor, RESTART_GRACE, StartOutcome,
};

pub(crate) const PROCESS_TARGET: &str = concat!(env!("CARGO_PKG_NAME"), "::process");
