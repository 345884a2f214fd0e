//! OS-level liveness probe for previously observed process ids.

use nix::errno::Errno;
use nix::sys::signal::kill;
use nix::unistd::Pid;
use tracing::warn;

use super::PROCESS_TARGET;

/// Probes `pid` with the null signal.
///
/// `EPERM` means the process exists but belongs to someone else, so it counts
/// as alive. `ESRCH` and `ECHILD` mean it is gone.
///
/// # Errors
///
/// Returns any other errno reported by `kill(2)`.
pub fn check_process(pid: u32) -> Result<bool, Errno> {
    if pid == 0 {
        return Ok(false);
    }
    let Ok(raw) = i32::try_from(pid) else {
        return Ok(false);
    };
    match kill(Pid::from_raw(raw), None) {
        Ok(()) | Err(Errno::EPERM) => Ok(true),
        Err(Errno::ESRCH | Errno::ECHILD) => Ok(false),
        Err(errno) => Err(errno),
    }
}

/// Like [`check_process`] but treats probe failures as a dead process.
#[must_use]
pub fn is_alive(pid: u32) -> bool {
    check_process(pid).unwrap_or_else(|errno| {
        warn!(
            target: PROCESS_TARGET,
            pid,
            error = %errno,
            "liveness probe failed; treating process as stopped"
        );
        false
    })
}
