//! Locates the backend and the launch parameters for the current deployment.
//!
//! Three layouts are recognised: a self-mounting image (`APPIMAGE` set by the
//! image runtime), a packaged installation with a resources directory, and a
//! development checkout. Each yields a [`LaunchContext`] describing the
//! executable, the per-user config file passed as the sole argument, the
//! working directory, and the environment overlay.

mod context;
mod errors;
mod resolver;
mod seed;

pub use context::LaunchContext;
pub use errors::LaunchError;
pub use resolver::{DeploymentMode, HostEnvironment, PathResolver};
pub use seed::{SeedError, SeedOutcome, seed_user_config};

pub(crate) const LAUNCH_TARGET: &str = concat!(env!("CARGO_PKG_NAME"), "::launch");
