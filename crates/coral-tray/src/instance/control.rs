use std::fs;
use std::io::{self, BufRead, BufReader, Write};
use std::net::Shutdown;
use std::os::unix::fs::FileTypeExt;
use std::os::unix::net::{UnixListener, UnixStream};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::thread::{self, JoinHandle};
use std::time::Duration;

use coral_protocol::ControlCommand;
use tracing::{debug, info, warn};

use crate::events::{EventSink, LoopEvent, QuitSource};

use super::INSTANCE_TARGET;
use super::errors::ControlError;

const ACCEPT_BACKOFF: Duration = Duration::from_millis(25);
const ERROR_BACKOFF: Duration = Duration::from_millis(150);
const READ_TIMEOUT: Duration = Duration::from_millis(500);

/// Accepts control commands from other processes on a Unix socket.
///
/// Commands are forwarded to the event loop in arrival order. The socket file
/// is removed when the listener shuts down.
#[derive(Debug)]
pub struct ControlListener {
    path: PathBuf,
    shutdown: Arc<AtomicBool>,
    handle: Option<JoinHandle<()>>,
}

impl ControlListener {
    /// Binds `path`, replacing a stale socket, and starts accepting.
    ///
    /// # Errors
    ///
    /// Returns a [`ControlError`] when the socket is in use, the path is not
    /// a socket, or binding fails.
    pub fn start(path: &Path, sink: EventSink) -> Result<Self, ControlError> {
        let listener = bind(path)?;
        if let Err(source) = listener.set_nonblocking(true) {
            remove_socket(path);
            return Err(ControlError::NonBlocking { source });
        }
        let shutdown = Arc::new(AtomicBool::new(false));
        let flag = Arc::clone(&shutdown);
        let socket_path = path.to_path_buf();
        let handle = thread::Builder::new()
            .name("control-listener".to_owned())
            .spawn(move || accept_loop(&listener, &socket_path, &flag, &sink))
            .map_err(|source| {
                remove_socket(path);
                ControlError::Thread { source }
            })?;
        info!(
            target: INSTANCE_TARGET,
            socket = %path.display(),
            "control socket listening"
        );
        Ok(Self {
            path: path.to_path_buf(),
            shutdown,
            handle: Some(handle),
        })
    }

    /// Socket path.
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Stops accepting and waits for the listener thread.
    ///
    /// # Errors
    ///
    /// Returns [`ControlError::ThreadPanic`] when the thread panicked.
    pub fn shutdown(mut self) -> Result<(), ControlError> {
        self.shutdown.store(true, Ordering::SeqCst);
        match self.handle.take() {
            Some(handle) => handle.join().map_err(|_| ControlError::ThreadPanic),
            None => Ok(()),
        }
    }
}

impl Drop for ControlListener {
    fn drop(&mut self) {
        self.shutdown.store(true, Ordering::SeqCst);
    }
}

fn bind(path: &Path) -> Result<UnixListener, ControlError> {
    if let Ok(metadata) = fs::symlink_metadata(path) {
        if !metadata.file_type().is_socket() {
            return Err(ControlError::NotSocket {
                path: path.to_path_buf(),
            });
        }
        match UnixStream::connect(path) {
            Ok(_stream) => {
                return Err(ControlError::InUse {
                    path: path.to_path_buf(),
                });
            }
            Err(error)
                if matches!(
                    error.kind(),
                    io::ErrorKind::ConnectionRefused | io::ErrorKind::NotFound
                ) =>
            {
                debug!(
                    target: INSTANCE_TARGET,
                    socket = %path.display(),
                    "removing stale control socket"
                );
                fs::remove_file(path).map_err(|source| ControlError::Cleanup {
                    path: path.to_path_buf(),
                    source,
                })?;
            }
            Err(source) => {
                return Err(ControlError::Cleanup {
                    path: path.to_path_buf(),
                    source,
                });
            }
        }
    }
    UnixListener::bind(path).map_err(|source| ControlError::Bind {
        path: path.to_path_buf(),
        source,
    })
}

fn accept_loop(listener: &UnixListener, path: &Path, shutdown: &AtomicBool, sink: &EventSink) {
    let mut last_error = None::<io::ErrorKind>;
    while !shutdown.load(Ordering::SeqCst) {
        match listener.accept() {
            Ok((stream, _)) => {
                last_error = None;
                if let Err(error) = serve(stream, sink) {
                    warn!(
                        target: INSTANCE_TARGET,
                        error = %error,
                        "control connection failed"
                    );
                }
            }
            Err(error) if error.kind() == io::ErrorKind::WouldBlock => thread::sleep(ACCEPT_BACKOFF),
            Err(error) => {
                let kind = error.kind();
                if last_error != Some(kind) {
                    warn!(
                        target: INSTANCE_TARGET,
                        error = %error,
                        "control socket accept error"
                    );
                }
                last_error = Some(kind);
                thread::sleep(ERROR_BACKOFF);
            }
        }
    }
    remove_socket(path);
}

fn serve(stream: UnixStream, sink: &EventSink) -> io::Result<()> {
    stream.set_nonblocking(false)?;
    stream.set_read_timeout(Some(READ_TIMEOUT))?;
    for line in BufReader::new(stream).lines() {
        let line = line?;
        if line.trim().is_empty() {
            continue;
        }
        match ControlCommand::from_line(&line) {
            Ok(command) => {
                debug!(target: INSTANCE_TARGET, %command, "control command received");
                sink.send(event_for(command));
            }
            Err(_) => warn!(
                target: INSTANCE_TARGET,
                line = %line.trim(),
                "ignoring unknown control command"
            ),
        }
    }
    Ok(())
}

const fn event_for(command: ControlCommand) -> LoopEvent {
    match command {
        ControlCommand::Focus => LoopEvent::FocusRequested,
        ControlCommand::ConfigSaved => LoopEvent::ConfigSaved,
        ControlCommand::Quit => LoopEvent::Quit(QuitSource::Control),
    }
}

fn remove_socket(path: &Path) {
    if let Err(error) = fs::remove_file(path)
        && error.kind() != io::ErrorKind::NotFound
    {
        warn!(
            target: INSTANCE_TARGET,
            error = %error,
            socket = %path.display(),
            "failed to remove control socket"
        );
    }
}

/// Sends one command to the instance listening on `path`.
///
/// # Errors
///
/// Returns [`ControlError::Connect`] when no instance is listening, or
/// [`ControlError::Send`] when the write fails.
pub fn send_command(path: &Path, command: ControlCommand) -> Result<(), ControlError> {
    let mut stream = UnixStream::connect(path).map_err(|source| ControlError::Connect {
        path: path.to_path_buf(),
        source,
    })?;
    stream
        .write_all(command.to_line().as_bytes())
        .and_then(|()| stream.shutdown(Shutdown::Write))
        .map_err(|source| ControlError::Send { source })
}
