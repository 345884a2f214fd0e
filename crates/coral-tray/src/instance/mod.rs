//! Single-instance enforcement.
//!
//! [`InstanceGuard`] owns the lock and pid files in the runtime directory.
//! While it is held, [`ControlListener`] accepts [`ControlCommand`] lines on
//! the instance's socket; a second launch uses [`send_command`] to ask the
//! running instance to focus instead of starting another backend.
//!
//! [`ControlCommand`]: coral_protocol::ControlCommand

mod control;
mod errors;
mod guard;

pub use control::{ControlListener, send_command};
pub use errors::{ControlError, InstanceError};
pub use guard::{HealthState, InstanceGuard};

pub(crate) const INSTANCE_TARGET: &str = concat!(env!("CARGO_PKG_NAME"), "::instance");
