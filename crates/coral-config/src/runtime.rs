//! Derives runtime artefact paths shared by the supervisor and `notify`.
//!
//! The runtime directory houses the single-instance lock, the pid file, the
//! health snapshot, and the control socket. The running supervisor and the
//! `notify` subcommand must agree on this layout so a second launch can reach
//! the first one.

use std::fs;
use std::path::{Path, PathBuf};

use thiserror::Error;

use crate::Config;

const LOCK_FILE: &str = "coral-tray.lock";
const PID_FILE: &str = "coral-tray.pid";
const HEALTH_FILE: &str = "coral-tray.health";
const SOCKET_FILE: &str = "coral-tray.sock";

/// Canonical paths for runtime artefacts written by the supervisor.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RuntimePaths {
    runtime_dir: PathBuf,
    lock_path: PathBuf,
    pid_path: PathBuf,
    health_path: PathBuf,
    socket_path: PathBuf,
}

impl RuntimePaths {
    /// Derives runtime paths from the configuration and creates the directory.
    ///
    /// # Errors
    ///
    /// Returns [`RuntimePathsError::RuntimeDirectory`] when the directory
    /// cannot be created.
    pub fn from_config(config: &Config) -> Result<Self, RuntimePathsError> {
        Self::in_directory(config.runtime_dir())
    }

    /// Lays out the runtime artefacts inside `runtime_dir`, creating it.
    ///
    /// # Errors
    ///
    /// Returns [`RuntimePathsError::RuntimeDirectory`] when the directory
    /// cannot be created.
    pub fn in_directory(runtime_dir: PathBuf) -> Result<Self, RuntimePathsError> {
        fs::create_dir_all(&runtime_dir).map_err(|source| RuntimePathsError::RuntimeDirectory {
            path: runtime_dir.clone(),
            source,
        })?;
        Ok(Self {
            lock_path: runtime_dir.join(LOCK_FILE),
            pid_path: runtime_dir.join(PID_FILE),
            health_path: runtime_dir.join(HEALTH_FILE),
            socket_path: runtime_dir.join(SOCKET_FILE),
            runtime_dir,
        })
    }

    /// Directory holding runtime artefacts.
    #[must_use]
    pub fn runtime_dir(&self) -> &Path {
        self.runtime_dir.as_path()
    }

    /// Path to the lock file guarding singleton startup.
    #[must_use]
    pub fn lock_path(&self) -> &Path {
        self.lock_path.as_path()
    }

    /// Path to the PID file.
    #[must_use]
    pub fn pid_path(&self) -> &Path {
        self.pid_path.as_path()
    }

    /// Path to the health snapshot.
    #[must_use]
    pub fn health_path(&self) -> &Path {
        self.health_path.as_path()
    }

    /// Path to the control socket the running instance listens on.
    #[must_use]
    pub fn socket_path(&self) -> &Path {
        self.socket_path.as_path()
    }
}

/// Errors raised while deriving runtime paths.
#[derive(Debug, Error)]
pub enum RuntimePathsError {
    /// Creating the runtime directory failed.
    #[error("failed to prepare runtime directory '{path}': {source}")]
    RuntimeDirectory {
        /// Directory that could not be created.
        path: PathBuf,
        /// Underlying IO error.
        #[source]
        source: std::io::Error,
    },
}
