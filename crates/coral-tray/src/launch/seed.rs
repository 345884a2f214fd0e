use std::fs;
use std::io;
use std::path::PathBuf;

use thiserror::Error;
use tracing::{debug, info};

use crate::files::atomic_write;

use super::{LAUNCH_TARGET, LaunchContext};

/// Result of preparing the per-user config before the first launch.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SeedOutcome {
    /// The shipped default was copied into place.
    Seeded,
    /// The user already has a config file.
    AlreadyPresent,
    /// The layout ships no default config, or it is missing on disk.
    NoDefault,
}

/// Errors raised while seeding the per-user config.
#[derive(Debug, Error)]
pub enum SeedError {
    /// The per-user config directory could not be created.
    #[error("failed to create config directory '{path}': {source}")]
    Directory {
        /// Directory that could not be created.
        path: PathBuf,
        /// Underlying IO error.
        #[source]
        source: io::Error,
    },
    /// Reading the shipped default failed.
    #[error("failed to read default config '{path}': {source}")]
    ReadDefault {
        /// Default config path.
        path: PathBuf,
        /// Underlying IO error.
        #[source]
        source: io::Error,
    },
    /// Writing the per-user copy failed.
    #[error("failed to write user config '{path}': {source}")]
    Write {
        /// Per-user config path.
        path: PathBuf,
        /// Underlying IO error.
        #[source]
        source: io::Error,
    },
}

/// Ensures the per-user config exists, copying the shipped default on first run.
///
/// An existing user file is never touched.
///
/// # Errors
///
/// Returns a [`SeedError`] when the directory cannot be created or the copy
/// fails. Callers log the failure and launch anyway; the backend reports its
/// own error if it cannot read the file.
pub fn seed_user_config(context: &LaunchContext) -> Result<SeedOutcome, SeedError> {
    let target = context.config_file();
    if let Some(parent) = target.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent).map_err(|source| SeedError::Directory {
            path: parent.to_path_buf(),
            source,
        })?;
    }
    if target.exists() {
        debug!(
            target: LAUNCH_TARGET,
            path = %target.display(),
            "user config already present"
        );
        return Ok(SeedOutcome::AlreadyPresent);
    }
    let Some(default) = context.default_config().filter(|path| path.exists()) else {
        debug!(
            target: LAUNCH_TARGET,
            path = %target.display(),
            "no default config to seed from"
        );
        return Ok(SeedOutcome::NoDefault);
    };

    let contents = fs::read(default).map_err(|source| SeedError::ReadDefault {
        path: default.to_path_buf(),
        source,
    })?;
    atomic_write(target, &contents).map_err(|source| SeedError::Write {
        path: target.to_path_buf(),
        source,
    })?;
    info!(
        target: LAUNCH_TARGET,
        from = %default.display(),
        to = %target.display(),
        "seeded user config from shipped default"
    );
    Ok(SeedOutcome::Seeded)
}

#[cfg(test)]
mod tests {
    use std::path::Path;

    use super::*;

    fn context(root: &Path) -> LaunchContext {
        LaunchContext::new(
            root.join("bin").join("coral"),
            root.join("home").join(".coral").join("conf").join("config.json"),
            root.join("bin"),
        )
        .with_default_config(root.join("share").join("config.json"))
    }

    #[test]
    fn copies_default_on_first_run() {
        let dir = tempfile::tempdir().expect("temp dir");
        let context = context(dir.path());
        let default = dir.path().join("share").join("config.json");
        fs::create_dir_all(default.parent().expect("parent")).expect("create share");
        fs::write(&default, b"{\"hotkey\":\"alt+z\"}").expect("write default");

        let outcome = seed_user_config(&context).expect("seeding should succeed");

        assert_eq!(outcome, SeedOutcome::Seeded);
        assert_eq!(
            fs::read(context.config_file()).expect("read seeded"),
            b"{\"hotkey\":\"alt+z\"}"
        );
    }

    #[test]
    fn leaves_existing_user_config_alone() {
        let dir = tempfile::tempdir().expect("temp dir");
        let context = context(dir.path());
        let default = dir.path().join("share").join("config.json");
        fs::create_dir_all(default.parent().expect("parent")).expect("create share");
        fs::write(&default, b"{}").expect("write default");
        fs::create_dir_all(context.config_file().parent().expect("parent"))
            .expect("create conf");
        fs::write(context.config_file(), b"{\"mine\":1}").expect("write user config");

        let outcome = seed_user_config(&context).expect("seeding should succeed");

        assert_eq!(outcome, SeedOutcome::AlreadyPresent);
        assert_eq!(
            fs::read(context.config_file()).expect("read user config"),
            b"{\"mine\":1}"
        );
    }

    #[test]
    fn creates_directory_even_without_default() {
        let dir = tempfile::tempdir().expect("temp dir");
        let context = context(dir.path());

        let outcome = seed_user_config(&context).expect("seeding should succeed");

        assert_eq!(outcome, SeedOutcome::NoDefault);
        assert!(
            context
                .config_file()
                .parent()
                .is_some_and(Path::is_dir),
            "config directory should exist"
        );
    }
}
