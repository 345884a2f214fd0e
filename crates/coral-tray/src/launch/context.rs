use std::collections::BTreeMap;
use std::ffi::OsString;
use std::path::{Path, PathBuf};

/// Parameters used for every backend spawn, fixed at startup.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LaunchContext {
    executable: PathBuf,
    config_file: PathBuf,
    working_dir: PathBuf,
    env_overlay: BTreeMap<String, OsString>,
    default_config: Option<PathBuf>,
}

impl LaunchContext {
    /// Builds a context with an empty environment overlay.
    #[must_use]
    pub fn new(
        executable: impl Into<PathBuf>,
        config_file: impl Into<PathBuf>,
        working_dir: impl Into<PathBuf>,
    ) -> Self {
        Self {
            executable: executable.into(),
            config_file: config_file.into(),
            working_dir: working_dir.into(),
            env_overlay: BTreeMap::new(),
            default_config: None,
        }
    }

    /// Adds or replaces one overlay variable.
    #[must_use]
    pub fn with_env(mut self, key: impl Into<String>, value: impl Into<OsString>) -> Self {
        self.env_overlay.insert(key.into(), value.into());
        self
    }

    /// Records the shipped default config used to seed the per-user file.
    #[must_use]
    pub fn with_default_config(mut self, path: impl Into<PathBuf>) -> Self {
        self.default_config = Some(path.into());
        self
    }

    /// Replaces the executable; the working directory follows it.
    #[must_use]
    pub fn with_executable_override(mut self, executable: &Path) -> Self {
        self.executable = executable.to_path_buf();
        if let Some(parent) = executable.parent().filter(|p| !p.as_os_str().is_empty()) {
            self.working_dir = parent.to_path_buf();
        }
        self
    }

    /// Backend executable.
    #[must_use]
    pub fn executable(&self) -> &Path {
        &self.executable
    }

    /// Config file passed as the backend's only argument.
    #[must_use]
    pub fn config_file(&self) -> &Path {
        &self.config_file
    }

    /// Working directory for the backend.
    #[must_use]
    pub fn working_dir(&self) -> &Path {
        &self.working_dir
    }

    /// Variables layered over the host environment.
    #[must_use]
    pub const fn env_overlay(&self) -> &BTreeMap<String, OsString> {
        &self.env_overlay
    }

    /// Shipped default config, when the layout provides one.
    #[must_use]
    pub fn default_config(&self) -> Option<&Path> {
        self.default_config.as_deref()
    }
}
