//! Typed messages consumed by the supervisor's event loop.
//!
//! Every asynchronous source (backend output, process exit, control socket,
//! POSIX signals, dialog answers, privileged helper outcomes) posts a
//! [`LoopEvent`] through an [`EventSink`]. The loop is the only consumer, so
//! all state transitions happen on one thread in arrival order.

use std::fmt;

use crossbeam_channel::{Receiver, Sender, unbounded};
use tracing::debug;

use coral_protocol::ProtocolEvent;

use crate::permissions::{GrantChoice, RebootChoice};
use crate::process::{ExitReport, Generation};

const EVENTS_TARGET: &str = concat!(env!("CARGO_PKG_NAME"), "::events");

/// Why the loop should stop.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum QuitSource {
    /// A `QUIT` control command, for example from the tray menu.
    Control,
    /// A termination signal.
    Signal(i32),
}

/// A message for the event loop.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LoopEvent {
    /// One decoded line of backend output.
    Backend {
        /// Backend instance that produced the line.
        generation: Generation,
        /// Decoded line.
        event: ProtocolEvent,
    },
    /// The backend's output stream closed.
    BackendOutputClosed {
        /// Backend instance whose stream closed.
        generation: Generation,
    },
    /// The backend process terminated.
    BackendExited {
        /// Backend instance that exited.
        generation: Generation,
        /// Process id of the exited child.
        pid: u32,
        /// Exit code or terminating signal.
        report: ExitReport,
    },
    /// The settings editor saved the configuration.
    ConfigSaved,
    /// A second launch asked this instance to show itself.
    FocusRequested,
    /// The user or the OS asked the supervisor to exit.
    Quit(QuitSource),
    /// Answer to the permission prompt.
    PermissionChoice(GrantChoice),
    /// Outcome of the privileged remediation helper.
    RemediationFinished(Result<(), String>),
    /// Answer to the reboot prompt shown after a successful remediation.
    RebootChoice(RebootChoice),
}

impl fmt::Display for LoopEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Backend { generation, event } => write!(f, "backend {generation}: {event}"),
            Self::BackendOutputClosed { generation } => {
                write!(f, "backend {generation}: output closed")
            }
            Self::BackendExited {
                generation, pid, ..
            } => write!(f, "backend {generation}: pid {pid} exited"),
            Self::ConfigSaved => f.write_str("config saved"),
            Self::FocusRequested => f.write_str("focus requested"),
            Self::Quit(source) => write!(f, "quit ({source:?})"),
            Self::PermissionChoice(choice) => write!(f, "permission choice {choice:?}"),
            Self::RemediationFinished(Ok(())) => f.write_str("remediation succeeded"),
            Self::RemediationFinished(Err(_)) => f.write_str("remediation failed"),
            Self::RebootChoice(choice) => write!(f, "reboot choice {choice:?}"),
        }
    }
}

/// Cloneable sending half handed to producer threads.
#[derive(Debug, Clone)]
pub struct EventSink {
    sender: Sender<LoopEvent>,
}

impl EventSink {
    /// Posts an event. Returns `false` when the loop has already exited.
    pub fn send(&self, event: LoopEvent) -> bool {
        match self.sender.send(event) {
            Ok(()) => true,
            Err(error) => {
                debug!(
                    target: EVENTS_TARGET,
                    event = %error.into_inner(),
                    "event loop gone; dropping event"
                );
                false
            }
        }
    }
}

/// Creates the loop's unbounded queue.
#[must_use]
pub fn channel() -> (EventSink, Receiver<LoopEvent>) {
    let (sender, receiver) = unbounded();
    (EventSink { sender }, receiver)
}
