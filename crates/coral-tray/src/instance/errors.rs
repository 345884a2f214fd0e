use std::io;
use std::path::PathBuf;

use nix::errno::Errno;
use thiserror::Error;

/// Errors raised while claiming or maintaining the instance lock.
#[derive(Debug, Error)]
pub enum InstanceError {
    /// Another supervisor holds the lock and is alive.
    #[error("coral-tray is already running with pid {pid}")]
    AlreadyRunning {
        /// Process id recorded by the running instance.
        pid: u32,
    },
    /// Another supervisor created the lock moments ago and has not written
    /// its pid yet.
    #[error("another coral-tray instance is starting")]
    StartupInProgress,
    /// Creating the lock file failed.
    #[error("failed to create lock file '{path}': {source}")]
    LockCreate {
        /// Lock file path.
        path: PathBuf,
        /// Underlying IO error.
        #[source]
        source: io::Error,
    },
    /// Writing the pid file failed.
    #[error("failed to write pid file '{path}': {source}")]
    PidWrite {
        /// Pid file path.
        path: PathBuf,
        /// Underlying IO error.
        #[source]
        source: io::Error,
    },
    /// Writing the health snapshot failed.
    #[error("failed to write health snapshot '{path}': {source}")]
    HealthWrite {
        /// Health file path.
        path: PathBuf,
        /// Underlying IO error.
        #[source]
        source: io::Error,
    },
    /// Serialising the health snapshot failed.
    #[error("failed to serialise health snapshot: {0}")]
    HealthSerialise(#[from] serde_json::Error),
    /// Removing stale files failed.
    #[error("failed to remove stale file '{path}': {source}")]
    Cleanup {
        /// Path that could not be removed.
        path: PathBuf,
        /// Underlying IO error.
        #[source]
        source: io::Error,
    },
    /// Probing the recorded pid failed.
    #[error("failed to probe process {pid}: {source}")]
    CheckProcess {
        /// Pid that was probed.
        pid: u32,
        /// Errno returned by the probe.
        #[source]
        source: Errno,
    },
}

/// Errors raised by the control socket.
#[derive(Debug, Error)]
pub enum ControlError {
    /// Binding the socket failed.
    #[error("failed to bind control socket '{path}': {source}")]
    Bind {
        /// Socket path.
        path: PathBuf,
        /// Underlying IO error.
        #[source]
        source: io::Error,
    },
    /// A live listener already owns the socket.
    #[error("control socket '{path}' is already in use")]
    InUse {
        /// Socket path.
        path: PathBuf,
    },
    /// Something other than a socket exists at the path.
    #[error("'{path}' exists and is not a socket")]
    NotSocket {
        /// Offending path.
        path: PathBuf,
    },
    /// Inspecting or removing a stale socket failed.
    #[error("failed to clean stale control socket '{path}': {source}")]
    Cleanup {
        /// Socket path.
        path: PathBuf,
        /// Underlying IO error.
        #[source]
        source: io::Error,
    },
    /// Switching the listener to non-blocking mode failed.
    #[error("failed to enable non-blocking accept: {source}")]
    NonBlocking {
        /// Underlying IO error.
        #[source]
        source: io::Error,
    },
    /// The accept thread could not be started.
    #[error("failed to start control listener thread: {source}")]
    Thread {
        /// Underlying IO error.
        #[source]
        source: io::Error,
    },
    /// The accept thread panicked.
    #[error("control listener thread panicked")]
    ThreadPanic,
    /// Connecting to a running instance failed.
    #[error("failed to reach running instance at '{path}': {source}")]
    Connect {
        /// Socket path.
        path: PathBuf,
        /// Underlying IO error.
        #[source]
        source: io::Error,
    },
    /// Sending a command failed.
    #[error("failed to send control command: {source}")]
    Send {
        /// Underlying IO error.
        #[source]
        source: io::Error,
    },
}
