use std::fs::{self, File, OpenOptions};
use std::io::{self, Write};
use std::os::unix::fs::OpenOptionsExt;
use std::path::Path;
use std::time::{Duration, SystemTime, UNIX_EPOCH};

use coral_config::RuntimePaths;
use serde::Serialize;
use tracing::{debug, info, warn};

use crate::process::check_process;

use super::INSTANCE_TARGET;
use super::errors::InstanceError;

/// How long a lock without a pid file is assumed to belong to an instance
/// that is still starting.
const STARTUP_WINDOW: Duration = Duration::from_secs(2);

/// Status recorded in the health snapshot.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum HealthState {
    /// The lock is held and the backend is being launched.
    Starting,
    /// The event loop is running.
    Ready,
    /// The supervisor is shutting down.
    Stopping,
}

#[derive(Debug, Serialize)]
struct HealthSnapshot {
    status: HealthState,
    pid: u32,
    timestamp: u64,
}

/// Exclusive per-user claim on the supervisor role.
///
/// Dropping the guard removes the lock, pid, and health files.
#[derive(Debug)]
pub struct InstanceGuard {
    paths: RuntimePaths,
    _lock: File,
    pid: u32,
}

impl InstanceGuard {
    /// Claims the lock and records this process's pid.
    ///
    /// A lock left behind by a dead process is cleaned and claimed.
    ///
    /// # Errors
    ///
    /// Returns [`InstanceError::AlreadyRunning`] when a live instance holds
    /// the lock, [`InstanceError::StartupInProgress`] when one is still
    /// starting, or an IO variant when the files cannot be written.
    pub fn acquire(paths: RuntimePaths) -> Result<Self, InstanceError> {
        Self::acquire_as(paths, std::process::id())
    }

    pub(crate) fn acquire_as(paths: RuntimePaths, pid: u32) -> Result<Self, InstanceError> {
        let lock = acquire_lock(&paths)?;
        let guard = Self {
            paths,
            _lock: lock,
            pid,
        };
        guard.write_pid()?;
        Ok(guard)
    }

    fn write_pid(&self) -> Result<(), InstanceError> {
        let path = self.paths.pid_path();
        let pid_error = |source| InstanceError::PidWrite {
            path: path.to_path_buf(),
            source,
        };
        let mut file = private_file(path, false).map_err(pid_error)?;
        writeln!(file, "{}", self.pid).map_err(pid_error)?;
        file.sync_all().map_err(pid_error)?;
        debug!(
            target: INSTANCE_TARGET,
            pid = self.pid,
            file = %path.display(),
            "pid file written"
        );
        Ok(())
    }

    /// Rewrites the health snapshot with `status`.
    ///
    /// # Errors
    ///
    /// Returns [`InstanceError::HealthWrite`] or
    /// [`InstanceError::HealthSerialise`] when the snapshot cannot be written.
    pub fn write_health(&self, status: HealthState) -> Result<(), InstanceError> {
        let path = self.paths.health_path();
        let health_error = |source| InstanceError::HealthWrite {
            path: path.to_path_buf(),
            source,
        };
        let snapshot = HealthSnapshot {
            status,
            pid: self.pid,
            timestamp: SystemTime::now()
                .duration_since(UNIX_EPOCH)
                .map_or(0, |elapsed| elapsed.as_secs()),
        };
        let mut file = private_file(path, false).map_err(health_error)?;
        serde_json::to_writer(&mut file, &snapshot)?;
        file.write_all(b"\n").map_err(health_error)?;
        file.sync_all().map_err(health_error)?;
        debug!(
            target: INSTANCE_TARGET,
            status = ?snapshot.status,
            file = %path.display(),
            "health snapshot updated"
        );
        Ok(())
    }

    /// Runtime paths the guard manages.
    #[must_use]
    pub const fn paths(&self) -> &RuntimePaths {
        &self.paths
    }

    /// Pid recorded for this instance.
    #[must_use]
    pub const fn pid(&self) -> u32 {
        self.pid
    }
}

impl Drop for InstanceGuard {
    fn drop(&mut self) {
        for path in [
            self.paths.health_path(),
            self.paths.pid_path(),
            self.paths.lock_path(),
        ] {
            if let Err(error) = fs::remove_file(path)
                && error.kind() != io::ErrorKind::NotFound
            {
                warn!(
                    target: INSTANCE_TARGET,
                    file = %path.display(),
                    error = %error,
                    "failed to remove runtime file"
                );
            }
        }
    }
}

fn private_file(path: &Path, create_new: bool) -> io::Result<File> {
    let mut options = OpenOptions::new();
    options.write(true).mode(0o600);
    if create_new {
        options.create_new(true);
    } else {
        options.create(true).truncate(true);
    }
    options.open(path)
}

fn acquire_lock(paths: &RuntimePaths) -> Result<File, InstanceError> {
    match private_file(paths.lock_path(), true) {
        Ok(file) => {
            info!(
                target: INSTANCE_TARGET,
                file = %paths.lock_path().display(),
                "acquired instance lock"
            );
            Ok(file)
        }
        Err(error) if error.kind() == io::ErrorKind::AlreadyExists => handle_existing_lock(paths),
        Err(source) => Err(InstanceError::LockCreate {
            path: paths.lock_path().to_path_buf(),
            source,
        }),
    }
}

fn handle_existing_lock(paths: &RuntimePaths) -> Result<File, InstanceError> {
    match read_pid(paths.pid_path()) {
        Some(pid) if pid != 0 => match check_process(pid) {
            Ok(true) => {
                info!(
                    target: INSTANCE_TARGET,
                    pid,
                    "existing instance is alive"
                );
                return Err(InstanceError::AlreadyRunning { pid });
            }
            Ok(false) => warn!(
                target: INSTANCE_TARGET,
                pid,
                "previous instance is gone; cleaning stale files"
            ),
            Err(source) => return Err(InstanceError::CheckProcess { pid, source }),
        },
        _ if lock_is_fresh(paths.lock_path()) => {
            return Err(InstanceError::StartupInProgress);
        }
        _ => warn!(
            target: INSTANCE_TARGET,
            "lock without a pid file; cleaning stale files"
        ),
    }
    remove_file(paths.lock_path())?;
    remove_file(paths.pid_path())?;
    acquire_lock(paths)
}

fn lock_is_fresh(path: &Path) -> bool {
    fs::metadata(path)
        .and_then(|metadata| metadata.modified())
        .ok()
        .and_then(|modified| modified.elapsed().ok())
        .is_some_and(|age| age < STARTUP_WINDOW)
}

fn read_pid(path: &Path) -> Option<u32> {
    let content = fs::read_to_string(path).ok()?;
    content.trim().parse::<u32>().ok()
}

fn remove_file(path: &Path) -> Result<(), InstanceError> {
    match fs::remove_file(path) {
        Ok(()) => Ok(()),
        Err(error) if error.kind() == io::ErrorKind::NotFound => Ok(()),
        Err(source) => Err(InstanceError::Cleanup {
            path: path.to_path_buf(),
            source,
        }),
    }
}
