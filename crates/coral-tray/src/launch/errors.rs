use std::io;

use thiserror::Error;

/// Errors raised while computing launch parameters.
#[derive(Debug, Error)]
pub enum LaunchError {
    /// The running executable's path could not be determined.
    #[error("failed to locate the running executable: {source}")]
    CurrentExe {
        /// Underlying IO error.
        #[source]
        source: io::Error,
    },
    /// The working directory could not be read.
    #[error("failed to read the current directory: {source}")]
    CurrentDir {
        /// Underlying IO error.
        #[source]
        source: io::Error,
    },
    /// No per-user config path could be derived.
    #[error("cannot determine the home directory for the per-user configuration")]
    NoUserConfig,
    /// The image mount point could not be derived from the executable path.
    #[error("cannot derive the image mount point from '{exe}'")]
    MountRoot {
        /// Executable path that was too shallow.
        exe: String,
    },
}
