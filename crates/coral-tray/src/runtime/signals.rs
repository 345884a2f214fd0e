use std::io;
use std::thread::{self, JoinHandle};

use signal_hook::consts::signal::{SIGHUP, SIGINT, SIGQUIT, SIGTERM};
use signal_hook::iterator::{Handle, Signals};
use thiserror::Error;
use tracing::{info, warn};

use crate::events::{EventSink, LoopEvent, QuitSource};

use super::RUNTIME_TARGET;

/// Errors reported while installing signal forwarding.
#[derive(Debug, Error)]
pub enum SignalError {
    /// Installing signal handlers failed.
    #[error("failed to install signal handlers: {source}")]
    Install {
        /// Underlying IO error.
        #[source]
        source: io::Error,
    },
    /// The forwarding thread could not be started.
    #[error("failed to start signal thread: {source}")]
    Thread {
        /// Underlying IO error.
        #[source]
        source: io::Error,
    },
}

/// Forwards POSIX signals to the event loop until dropped.
///
/// `SIGHUP` means the configuration was saved; `SIGTERM`, `SIGINT`, and
/// `SIGQUIT` request an orderly quit.
#[derive(Debug)]
pub struct SignalForwarder {
    handle: Handle,
    thread: Option<JoinHandle<()>>,
}

impl SignalForwarder {
    /// Installs handlers and starts forwarding to `sink`.
    ///
    /// # Errors
    ///
    /// Returns a [`SignalError`] when handlers or the thread cannot be set up.
    pub fn install(sink: EventSink) -> Result<Self, SignalError> {
        let mut signals = Signals::new([SIGTERM, SIGINT, SIGQUIT, SIGHUP])
            .map_err(|source| SignalError::Install { source })?;
        let handle = signals.handle();
        let thread = thread::Builder::new()
            .name("signal-forwarder".to_owned())
            .spawn(move || {
                for signal in signals.forever() {
                    info!(target: RUNTIME_TARGET, signal, "signal received");
                    if !sink.send(event_for(signal)) {
                        break;
                    }
                }
            })
            .map_err(|source| SignalError::Thread { source })?;
        Ok(Self {
            handle,
            thread: Some(thread),
        })
    }
}

impl Drop for SignalForwarder {
    fn drop(&mut self) {
        self.handle.close();
        if let Some(thread) = self.thread.take()
            && thread.join().is_err()
        {
            warn!(target: RUNTIME_TARGET, "signal thread panicked");
        }
    }
}

pub(super) const fn event_for(signal: i32) -> LoopEvent {
    if signal == SIGHUP {
        LoopEvent::ConfigSaved
    } else {
        LoopEvent::Quit(QuitSource::Signal(signal))
    }
}
