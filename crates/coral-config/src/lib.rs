//! Shared configuration for the Coral tray supervisor.
//!
//! Options are layered by `clap`: command-line flags take precedence over
//! `CORAL_*` environment variables, which take precedence over built-in
//! defaults. The supervisor never parses the backend's JSON configuration; it
//! only decides which file path to hand over, so the options here describe the
//! supervisor itself (logging, runtime directory) and the overrides used to
//! locate the backend.

use std::ffi::OsString;
use std::path::{Path, PathBuf};

use clap::Parser;

mod defaults;
mod logging;
mod runtime;

pub use defaults::{
    APP_DIR_NAME, DEFAULT_LOG_FILTER, default_log_filter, default_log_format,
    default_runtime_directory, default_user_config_path,
};
pub use logging::{LogFormat, LogFormatParseError};
pub use runtime::{RuntimePaths, RuntimePathsError};

/// Supervisor configuration.
#[derive(Debug, Clone, PartialEq, Eq, Parser)]
#[command(name = "coral-tray", about = "Supervises the Coral speech backend")]
pub struct Config {
    /// Tracing filter expression, for example `info` or `coral_tray=debug`.
    #[arg(
        long,
        env = "CORAL_LOG_FILTER",
        default_value = DEFAULT_LOG_FILTER,
        global = true
    )]
    pub log_filter: String,
    /// Log output format.
    #[arg(
        long,
        env = "CORAL_LOG_FORMAT",
        default_value_t = default_log_format(),
        global = true
    )]
    pub log_format: LogFormat,
    /// Directory holding the lock, pid, health, and socket files.
    #[arg(long, env = "CORAL_RUNTIME_DIR", global = true)]
    pub runtime_dir: Option<PathBuf>,
    /// Backend executable to launch instead of the resolved one.
    #[arg(long, env = "CORAL_BACKEND_BINARY")]
    pub backend_binary: Option<PathBuf>,
    /// Configuration file handed to the backend instead of `~/.coral/conf/config.json`.
    #[arg(long, env = "CORAL_CONFIG_FILE")]
    pub config_file: Option<PathBuf>,
    /// Resources directory of a packaged installation.
    #[arg(long, env = "CORAL_INSTALL_ROOT")]
    pub install_root: Option<PathBuf>,
    /// Source checkout used when running from a development tree.
    #[arg(long, env = "CORAL_REPO_ROOT")]
    pub repo_root: Option<PathBuf>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            log_filter: DEFAULT_LOG_FILTER.to_owned(),
            log_format: default_log_format(),
            runtime_dir: None,
            backend_binary: None,
            config_file: None,
            install_root: None,
            repo_root: None,
        }
    }
}

impl Config {
    /// Parses configuration from an argument iterator, consulting the
    /// environment for anything not given on the command line.
    ///
    /// # Errors
    ///
    /// Returns the `clap` error describing the invalid or unknown argument.
    pub fn load_from_iter<I, T>(args: I) -> Result<Self, clap::Error>
    where
        I: IntoIterator<Item = T>,
        T: Into<OsString> + Clone,
    {
        Self::try_parse_from(args)
    }

    /// Tracing filter expression.
    #[must_use]
    pub fn log_filter(&self) -> &str {
        &self.log_filter
    }

    /// Log output format.
    #[must_use]
    pub const fn log_format(&self) -> LogFormat {
        self.log_format
    }

    /// Runtime directory, falling back to [`default_runtime_directory`].
    #[must_use]
    pub fn runtime_dir(&self) -> PathBuf {
        self.runtime_dir
            .clone()
            .unwrap_or_else(default_runtime_directory)
    }

    /// Explicit backend executable, when configured.
    #[must_use]
    pub fn backend_binary(&self) -> Option<&Path> {
        self.backend_binary.as_deref()
    }

    /// Per-user backend configuration path, falling back to
    /// [`default_user_config_path`].
    #[must_use]
    pub fn user_config_path(&self) -> Option<PathBuf> {
        self.config_file.clone().or_else(default_user_config_path)
    }

    /// Packaged installation resources directory, when configured.
    #[must_use]
    pub fn install_root(&self) -> Option<&Path> {
        self.install_root.as_deref()
    }

    /// Development checkout, when configured.
    #[must_use]
    pub fn repo_root(&self) -> Option<&Path> {
        self.repo_root.as_deref()
    }
}
