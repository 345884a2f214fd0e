//! The single-consumer core: the coordinator, its loop, and signal input.

mod coordinator;
mod event_loop;
mod signals;

pub use coordinator::{Coordinator, ExitReason};
pub use event_loop::run_loop;
pub use signals::{SignalError, SignalForwarder};

pub(crate) const RUNTIME_TARGET: &str = concat!(env!("CARGO_PKG_NAME"), "::runtime");
