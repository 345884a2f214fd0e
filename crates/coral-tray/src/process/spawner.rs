//! OS-backed backend launching and exit monitoring.

use std::fmt;
use std::io::BufReader;
use std::ops::ControlFlow;
use std::process::{Child, ChildStdout, Command, ExitStatus, Stdio};
use std::thread;
use std::time::Duration;

use crossbeam_channel::{Receiver, RecvTimeoutError, Sender, bounded};
use nix::errno::Errno;
use nix::sys::signal::{Signal, kill};
use nix::unistd::Pid;
use tracing::{debug, info, warn};

use coral_protocol::LineDecoder;

use crate::events::{EventSink, LoopEvent};
use crate::launch::LaunchContext;

use super::errors::{SpawnError, TerminateError};
use super::{PROCESS_TARGET, liveness};

/// How long the exit monitor waits for buffered output after the child exits.
const OUTPUT_DRAIN: Duration = Duration::from_millis(500);

/// Monotonic id distinguishing successive backend instances.
///
/// Output and exit notifications carry the generation of the child that
/// produced them so the supervisor can discard messages from a child it has
/// already replaced.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Generation(u64);

impl Generation {
    /// Wraps a raw generation number.
    #[must_use]
    pub const fn new(raw: u64) -> Self {
        Self(raw)
    }

    /// The generation issued after this one.
    #[must_use]
    pub const fn next(self) -> Self {
        Self(self.0.wrapping_add(1))
    }
}

impl fmt::Display for Generation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// How a backend process ended.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ExitReport {
    /// Exit code, when the process exited normally.
    pub code: Option<i32>,
    /// Terminating signal, when the process was killed.
    pub signal: Option<i32>,
}

impl From<ExitStatus> for ExitReport {
    fn from(status: ExitStatus) -> Self {
        #[cfg(unix)]
        let signal = {
            use std::os::unix::process::ExitStatusExt;
            status.signal()
        };
        #[cfg(not(unix))]
        let signal = None;
        Self {
            code: status.code(),
            signal,
        }
    }
}

impl fmt::Display for ExitReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match (self.code, self.signal) {
            (Some(code), _) => write!(f, "code {code}"),
            (None, Some(signal)) => write!(f, "signal {signal}"),
            (None, None) => f.write_str("unknown status"),
        }
    }
}

/// Launches, signals, and probes backend processes.
pub trait BackendSpawner {
    /// Starts the backend described by `context` and returns its pid.
    ///
    /// Implementations deliver the child's decoded output and its exit
    /// asynchronously, tagged with `generation`.
    ///
    /// # Errors
    ///
    /// Returns a [`SpawnError`] when the process cannot be started.
    fn spawn(&mut self, context: &LaunchContext, generation: Generation)
    -> Result<u32, SpawnError>;

    /// Asks the process to terminate.
    ///
    /// # Errors
    ///
    /// Returns a [`TerminateError`] when the signal cannot be sent.
    fn terminate(&mut self, pid: u32) -> Result<(), TerminateError>;

    /// Whether `pid` still refers to a running process.
    fn is_alive(&self, pid: u32) -> bool;
}

/// Spawns real processes and feeds their output into the event loop.
#[derive(Debug, Clone)]
pub struct SystemSpawner {
    events: EventSink,
}

impl SystemSpawner {
    /// Builds a spawner posting to `events`.
    #[must_use]
    pub const fn new(events: EventSink) -> Self {
        Self { events }
    }
}

impl BackendSpawner for SystemSpawner {
    fn spawn(
        &mut self,
        context: &LaunchContext,
        generation: Generation,
    ) -> Result<u32, SpawnError> {
        let mut command = Command::new(context.executable());
        command
            .arg(context.config_file())
            .current_dir(context.working_dir())
            .envs(context.env_overlay())
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::null());

        debug!(
            target: PROCESS_TARGET,
            executable = %context.executable().display(),
            %generation,
            "spawning backend"
        );
        let mut child = command.spawn().map_err(|source| SpawnError::Spawn {
            executable: context.executable().to_path_buf(),
            source,
        })?;
        let pid = child.id();

        let Some(stdout) = child.stdout.take() else {
            abandon(pid);
            return Err(SpawnError::MissingStdout { pid });
        };

        let (drained, output_done) = bounded::<()>(0);
        let output_events = self.events.clone();
        if let Err(source) = thread::Builder::new()
            .name(format!("backend-output-{generation}"))
            .spawn(move || forward_output(stdout, generation, &output_events, drained))
        {
            abandon(pid);
            return Err(SpawnError::Thread { source });
        }

        let exit_events = self.events.clone();
        if let Err(source) = thread::Builder::new()
            .name(format!("backend-exit-{generation}"))
            .spawn(move || wait_for_exit(child, generation, &exit_events, &output_done))
        {
            abandon(pid);
            return Err(SpawnError::Thread { source });
        }

        info!(
            target: PROCESS_TARGET,
            pid,
            %generation,
            "backend process started"
        );
        Ok(pid)
    }

    fn terminate(&mut self, pid: u32) -> Result<(), TerminateError> {
        send_signal(pid, Signal::SIGTERM)
    }

    fn is_alive(&self, pid: u32) -> bool {
        liveness::is_alive(pid)
    }
}

fn send_signal(pid: u32, signal: Signal) -> Result<(), TerminateError> {
    let raw = i32::try_from(pid).map_err(|_| TerminateError::InvalidPid { pid })?;
    match kill(Pid::from_raw(raw), signal) {
        Ok(()) | Err(Errno::ESRCH) => Ok(()),
        Err(source) => Err(TerminateError::Signal { pid, source }),
    }
}

/// Kills a child whose monitoring could not be set up.
fn abandon(pid: u32) {
    if let Err(error) = send_signal(pid, Signal::SIGKILL) {
        warn!(
            target: PROCESS_TARGET,
            pid,
            error = %error,
            "failed to kill unmonitored backend"
        );
    }
}

/// Decodes the child's stdout until it closes.
///
/// Dropping `drained` on return tells the exit monitor that every line has
/// been queued.
fn forward_output(
    stdout: ChildStdout,
    generation: Generation,
    events: &EventSink,
    drained: Sender<()>,
) {
    let decoder = LineDecoder::new(BufReader::new(stdout));
    let result = decoder.run(|event| {
        if events.send(LoopEvent::Backend { generation, event }) {
            ControlFlow::Continue(())
        } else {
            ControlFlow::Break(())
        }
    });
    match result {
        Ok(summary) => debug!(
            target: PROCESS_TARGET,
            %generation,
            lines = summary.lines,
            unrecognized = summary.unrecognized,
            "backend output closed"
        ),
        Err(error) => warn!(
            target: PROCESS_TARGET,
            %generation,
            error = %error,
            "backend output failed"
        ),
    }
    events.send(LoopEvent::BackendOutputClosed { generation });
    drop(drained);
}

/// Reaps the child and reports its exit after its output has drained.
///
/// A grandchild can inherit stdout and keep the pipe open, so the drain wait
/// is bounded by [`OUTPUT_DRAIN`].
fn wait_for_exit(
    mut child: Child,
    generation: Generation,
    events: &EventSink,
    output_done: &Receiver<()>,
) {
    let pid = child.id();
    let report = match child.wait() {
        Ok(status) => ExitReport::from(status),
        Err(error) => {
            warn!(
                target: PROCESS_TARGET,
                pid,
                error = %error,
                "failed to wait for backend"
            );
            ExitReport::default()
        }
    };
    // Nothing is ever sent: disconnection means the output thread finished.
    if matches!(
        output_done.recv_timeout(OUTPUT_DRAIN),
        Err(RecvTimeoutError::Timeout)
    ) {
        debug!(
            target: PROCESS_TARGET,
            pid,
            "backend output still open after exit"
        );
    }
    events.send(LoopEvent::BackendExited {
        generation,
        pid,
        report,
    });
}
