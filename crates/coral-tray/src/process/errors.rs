//! Errors raised while launching or signalling the backend.

use std::io;
use std::path::PathBuf;

use nix::errno::Errno;
use thiserror::Error;

/// Errors surfaced when a backend launch fails.
#[derive(Debug, Error)]
pub enum SpawnError {
    /// The executable could not be started.
    #[error("failed to start backend '{executable}': {source}")]
    Spawn {
        /// Executable that failed to start.
        executable: PathBuf,
        /// Underlying IO error.
        #[source]
        source: io::Error,
    },
    /// The child started without a captured standard output.
    #[error("backend pid {pid} started without a stdout pipe")]
    MissingStdout {
        /// Process id of the orphaned child.
        pid: u32,
    },
    /// A helper thread for the child could not be created.
    #[error("failed to start backend monitor thread: {source}")]
    Thread {
        /// Underlying IO error.
        #[source]
        source: io::Error,
    },
}

/// Errors raised while sending the termination signal.
#[derive(Debug, Error)]
pub enum TerminateError {
    /// The pid does not fit the platform's pid type.
    #[error("pid {pid} is out of range")]
    InvalidPid {
        /// Offending pid.
        pid: u32,
    },
    /// The signal could not be delivered.
    #[error("failed to signal backend pid {pid}: {source}")]
    Signal {
        /// Target pid.
        pid: u32,
        /// Underlying OS error.
        #[source]
        source: Errno,
    },
}
