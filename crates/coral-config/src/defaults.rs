//! Default values shared by the supervisor binary and its helpers.

use std::env;
use std::path::PathBuf;

#[cfg(unix)]
use dirs::runtime_dir;
#[cfg(unix)]
use nix::unistd::geteuid;

use crate::logging::LogFormat;

/// Default log filter expression used by the binaries.
pub const DEFAULT_LOG_FILTER: &str = "info";

/// Directory name used beneath the runtime and home directories.
pub const APP_DIR_NAME: &str = "coral";

/// Default log filter expression used by the binaries.
#[must_use]
pub const fn default_log_filter() -> &'static str {
    DEFAULT_LOG_FILTER
}

/// Default logging format for the binaries.
#[must_use]
pub const fn default_log_format() -> LogFormat {
    LogFormat::Compact
}

/// Computes the directory that holds lock, pid, health, and socket files.
///
/// Prefers `$XDG_RUNTIME_DIR/coral`. When no runtime directory exists the
/// path is namespaced by effective uid beneath the temporary directory so
/// users sharing `/tmp` do not contend for the same lock.
#[must_use]
pub fn default_runtime_directory() -> PathBuf {
    #[cfg(unix)]
    {
        if let Some(mut dir) = runtime_dir() {
            dir.push(APP_DIR_NAME);
            return dir;
        }
        let mut dir = env::temp_dir();
        dir.push(APP_DIR_NAME);
        dir.push(format!("uid-{}", geteuid().as_raw()));
        dir
    }

    #[cfg(not(unix))]
    {
        let mut dir = env::temp_dir();
        dir.push(APP_DIR_NAME);
        dir
    }
}

/// Per-user configuration file handed to the backend: `~/.coral/conf/config.json`.
///
/// Returns `None` when the home directory cannot be determined.
#[must_use]
pub fn default_user_config_path() -> Option<PathBuf> {
    dirs::home_dir().map(|home| {
        home.join(format!(".{APP_DIR_NAME}"))
            .join("conf")
            .join("config.json")
    })
}
