use std::env;
use std::ffi::OsString;
use std::fmt;
use std::path::{Path, PathBuf};

use tracing::{debug, info};

use coral_config::Config;

use super::{LAUNCH_TARGET, LaunchContext, LaunchError};

const DEFAULT_DISPLAY: &str = ":0";
const LIBRARY_PATH_VAR: &str = "LD_LIBRARY_PATH";
const DISPLAY_VAR: &str = "DISPLAY";

/// How the supervisor was installed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DeploymentMode {
    /// Running from a self-mounting image mounted at `mount_root`.
    SelfMounting {
        /// Root of the mounted image (the directory holding `usr/`).
        mount_root: PathBuf,
    },
    /// Installed package with a resources directory beside the binary.
    Packaged {
        /// Directory holding the backend and its default config.
        resources_dir: PathBuf,
    },
    /// Source checkout with a locally built backend.
    Development {
        /// Root of the checkout.
        repo_root: PathBuf,
    },
}

impl fmt::Display for DeploymentMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::SelfMounting { .. } => f.write_str("self-mounting"),
            Self::Packaged { .. } => f.write_str("packaged"),
            Self::Development { .. } => f.write_str("development"),
        }
    }
}

/// Snapshot of the process environment the resolver depends on.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HostEnvironment {
    /// `APPIMAGE`, set by the image runtime to the image file path.
    pub appimage: Option<OsString>,
    /// `APPDIR`, set by the image runtime to the mount point.
    pub appdir: Option<PathBuf>,
    /// Path of the running supervisor executable.
    pub current_exe: PathBuf,
    /// Working directory at startup.
    pub current_dir: PathBuf,
    /// Host `LD_LIBRARY_PATH`.
    pub library_path: Option<OsString>,
    /// Host `DISPLAY`.
    pub display: Option<OsString>,
    /// Whether Windows file names and conventions apply.
    pub windows: bool,
}

impl HostEnvironment {
    /// Reads the live process environment.
    ///
    /// # Errors
    ///
    /// Fails when the executable path or working directory is unavailable.
    pub fn capture() -> Result<Self, LaunchError> {
        Ok(Self {
            appimage: env::var_os("APPIMAGE"),
            appdir: env::var_os("APPDIR").map(PathBuf::from),
            current_exe: env::current_exe().map_err(|source| LaunchError::CurrentExe { source })?,
            current_dir: env::current_dir().map_err(|source| LaunchError::CurrentDir { source })?,
            library_path: env::var_os(LIBRARY_PATH_VAR),
            display: env::var_os(DISPLAY_VAR),
            windows: cfg!(windows),
        })
    }

    const fn backend_file_name(&self) -> &'static str {
        if self.windows { "coral.exe" } else { "coral" }
    }
}

/// Computes the [`LaunchContext`] for the detected deployment mode.
#[derive(Debug)]
pub struct PathResolver<'a> {
    config: &'a Config,
    host: HostEnvironment,
}

impl<'a> PathResolver<'a> {
    /// Builds a resolver over explicit inputs.
    #[must_use]
    pub const fn new(config: &'a Config, host: HostEnvironment) -> Self {
        Self { config, host }
    }

    /// Detects the deployment mode.
    ///
    /// The image runtime's `APPIMAGE` variable wins, then a configured install
    /// root, then a development checkout (configured or the working directory).
    ///
    /// # Errors
    ///
    /// Returns [`LaunchError::MountRoot`] when running from an image whose
    /// mount point cannot be derived.
    pub fn mode(&self) -> Result<DeploymentMode, LaunchError> {
        if self.host.appimage.is_some() {
            let mount_root = match &self.host.appdir {
                Some(dir) => dir.clone(),
                // <mount>/usr/bin/<exe>
                None => self
                    .host
                    .current_exe
                    .ancestors()
                    .nth(3)
                    .filter(|root| !root.as_os_str().is_empty())
                    .map(Path::to_path_buf)
                    .ok_or_else(|| LaunchError::MountRoot {
                        exe: self.host.current_exe.display().to_string(),
                    })?,
            };
            return Ok(DeploymentMode::SelfMounting { mount_root });
        }
        if let Some(resources_dir) = self.config.install_root() {
            return Ok(DeploymentMode::Packaged {
                resources_dir: resources_dir.to_path_buf(),
            });
        }
        let repo_root = self
            .config
            .repo_root()
            .map_or_else(|| self.host.current_dir.clone(), Path::to_path_buf);
        Ok(DeploymentMode::Development { repo_root })
    }

    /// Resolves every launch parameter.
    ///
    /// # Errors
    ///
    /// Fails when the mode cannot be detected or no per-user config path
    /// exists.
    pub fn resolve(&self) -> Result<LaunchContext, LaunchError> {
        let mode = self.mode()?;
        let config_file = self
            .config
            .user_config_path()
            .ok_or(LaunchError::NoUserConfig)?;

        let mut context = match &mode {
            DeploymentMode::SelfMounting { mount_root } => {
                self.self_mounting_context(mount_root, config_file)
            }
            DeploymentMode::Packaged { resources_dir } => {
                self.packaged_context(resources_dir, config_file)
            }
            DeploymentMode::Development { repo_root } => {
                self.development_context(repo_root, config_file)
            }
        };

        if !self.host.windows {
            let display = self
                .host
                .display
                .clone()
                .filter(|value| !value.is_empty())
                .unwrap_or_else(|| OsString::from(DEFAULT_DISPLAY));
            context = context.with_env(DISPLAY_VAR, display);
        }
        if let Some(executable) = self.config.backend_binary() {
            debug!(
                target: LAUNCH_TARGET,
                executable = %executable.display(),
                "backend executable overridden"
            );
            context = context.with_executable_override(executable);
        }

        info!(
            target: LAUNCH_TARGET,
            mode = %mode,
            executable = %context.executable().display(),
            config = %context.config_file().display(),
            cwd = %context.working_dir().display(),
            "resolved backend launch parameters"
        );
        Ok(context)
    }

    fn self_mounting_context(&self, mount_root: &Path, config_file: PathBuf) -> LaunchContext {
        let usr = mount_root.join("usr");
        let bin = usr.join("bin");
        let mut library_path = usr.join("lib").into_os_string();
        if let Some(host) = self.host.library_path.as_ref().filter(|v| !v.is_empty()) {
            library_path.push(":");
            library_path.push(host);
        }
        LaunchContext::new(
            bin.join(self.host.backend_file_name()),
            config_file,
            bin.clone(),
        )
        .with_default_config(usr.join("share").join("coral").join("conf").join("config.json"))
        .with_env(LIBRARY_PATH_VAR, library_path)
    }

    fn packaged_context(&self, resources_dir: &Path, config_file: PathBuf) -> LaunchContext {
        let name = self.host.backend_file_name();
        let beside_exe = self
            .host
            .current_exe
            .parent()
            .map(|dir| dir.join("resources").join(name));
        let executable = first_existing(resources_dir.join(name), beside_exe);
        let working_dir = parent_or_self(&executable);
        LaunchContext::new(executable, config_file, working_dir)
            .with_default_config(resources_dir.join("conf").join("config.json"))
    }

    fn development_context(&self, repo_root: &Path, config_file: PathBuf) -> LaunchContext {
        let conf = repo_root.join("coral").join("conf");
        let (executable, default_config) = if self.host.windows {
            let build = repo_root.join("build-win");
            (
                first_existing(
                    build.join("Release").join("coral.exe"),
                    Some(build.join("coral").join("Release").join("coral.exe")),
                ),
                conf.join("config.json"),
            )
        } else {
            (
                repo_root.join("coral").join("bin").join("coral"),
                conf.join("config-linux.json"),
            )
        };
        let working_dir = parent_or_self(&executable);
        LaunchContext::new(executable, config_file, working_dir).with_default_config(default_config)
    }
}

fn first_existing(primary: PathBuf, fallback: Option<PathBuf>) -> PathBuf {
    match fallback {
        Some(candidate) if !primary.exists() && candidate.exists() => candidate,
        _ => primary,
    }
}

fn parent_or_self(path: &Path) -> PathBuf {
    path.parent()
        .map_or_else(|| path.to_path_buf(), Path::to_path_buf)
}
