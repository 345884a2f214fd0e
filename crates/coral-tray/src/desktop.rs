//! The user-facing surface: tray icon frames, status, and modal dialogs.
//!
//! Dialogs never block the event loop. Question dialogs run on helper threads
//! and post the user's answer back as a [`LoopEvent`].

use std::ffi::OsString;
use std::io;
use std::process::{Command, Stdio};
use std::thread::{self, JoinHandle};

use tracing::{debug, info, warn};

use crate::animation::IconFrame;
use crate::events::{EventSink, LoopEvent};
use crate::permissions::{GrantChoice, RebootChoice};

const DESKTOP_TARGET: &str = concat!(env!("CARGO_PKG_NAME"), "::desktop");

/// Text for one dialog.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Notice {
    /// Window title.
    pub title: String,
    /// Body text, shown verbatim.
    pub message: String,
    /// Label of the affirmative button.
    pub accept_label: String,
    /// Label of the negative button; unused by error notices.
    pub cancel_label: String,
}

impl Notice {
    /// An informational notice with a single dismiss button.
    #[must_use]
    pub fn error(title: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            message: message.into(),
            accept_label: "OK".to_owned(),
            cancel_label: String::new(),
        }
    }

    /// A two-choice question.
    #[must_use]
    pub fn question(
        title: impl Into<String>,
        message: impl Into<String>,
        accept_label: impl Into<String>,
        cancel_label: impl Into<String>,
    ) -> Self {
        Self {
            title: title.into(),
            message: message.into(),
            accept_label: accept_label.into(),
            cancel_label: cancel_label.into(),
        }
    }
}

/// Operations the supervisor needs from the desktop shell.
pub trait Desktop {
    /// Displays one tray icon frame.
    fn show_frame(&mut self, frame: IconFrame);

    /// Switches the welcome status to "ready".
    fn backend_ready(&mut self);

    /// Closes the welcome surface before a permission dialog appears.
    fn dismiss_welcome(&mut self);

    /// Brings the primary surface to the foreground.
    fn focus_primary(&mut self);

    /// Shows an error without waiting for it to be dismissed.
    fn show_error(&mut self, notice: &Notice);

    /// Asks whether to grant device access; answers with
    /// [`LoopEvent::PermissionChoice`].
    fn ask_permission(&mut self, notice: &Notice);

    /// Asks whether to reboot now; answers with [`LoopEvent::RebootChoice`].
    fn ask_reboot(&mut self, notice: &Notice);

    /// Waits for outstanding notices so they are seen before exit.
    fn shutdown(&mut self);
}

/// Desktop surface backed by `zenity` dialogs.
#[derive(Debug)]
pub struct ZenityDesktop {
    program: OsString,
    sink: EventSink,
    notices: Vec<JoinHandle<()>>,
}

impl ZenityDesktop {
    /// Builds a surface posting dialog answers to `sink`.
    #[must_use]
    pub fn new(sink: EventSink) -> Self {
        Self::with_program("zenity", sink)
    }

    /// Uses `program` in place of `zenity`. It must accept zenity's flags.
    #[must_use]
    pub fn with_program(program: impl Into<OsString>, sink: EventSink) -> Self {
        Self {
            program: program.into(),
            sink,
            notices: Vec::new(),
        }
    }

    fn question(&self, notice: &Notice) -> Command {
        let mut command = Command::new(&self.program);
        command
            .arg("--question")
            .arg("--no-markup")
            .arg("--title")
            .arg(&notice.title)
            .arg("--text")
            .arg(&notice.message)
            .arg("--ok-label")
            .arg(&notice.accept_label)
            .arg("--cancel-label")
            .arg(&notice.cancel_label)
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::null());
        command
    }

    fn spawn_question(
        &self,
        name: &str,
        notice: &Notice,
        answer: fn(bool) -> LoopEvent,
    ) {
        let mut command = self.question(notice);
        let sink = self.sink.clone();
        let title = notice.title.clone();
        let spawned = thread::Builder::new()
            .name(name.to_owned())
            .spawn(move || {
                let accepted = match command.status() {
                    Ok(status) => status.success(),
                    Err(error) => {
                        warn!(
                            target: DESKTOP_TARGET,
                            title = %title,
                            error = %error,
                            "dialog could not be shown; treating as cancelled"
                        );
                        false
                    }
                };
                sink.send(answer(accepted));
            });
        if let Err(error) = spawned {
            warn!(
                target: DESKTOP_TARGET,
                error = %error,
                "dialog thread could not be started; treating as cancelled"
            );
            self.sink.send(answer(false));
        }
    }

    fn spawn_error(&self, notice: &Notice) -> io::Result<JoinHandle<()>> {
        let mut command = Command::new(&self.program);
        command
            .arg("--error")
            .arg("--no-markup")
            .arg("--title")
            .arg(&notice.title)
            .arg("--text")
            .arg(&notice.message)
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::null());
        let title = notice.title.clone();
        thread::Builder::new()
            .name("error-notice".to_owned())
            .spawn(move || {
                if let Err(error) = command.status() {
                    warn!(
                        target: DESKTOP_TARGET,
                        title = %title,
                        error = %error,
                        "error notice could not be shown"
                    );
                }
            })
    }
}

impl Desktop for ZenityDesktop {
    fn show_frame(&mut self, frame: IconFrame) {
        debug!(target: DESKTOP_TARGET, %frame, "tray frame");
    }

    fn backend_ready(&mut self) {
        info!(target: DESKTOP_TARGET, "status: ready");
    }

    fn dismiss_welcome(&mut self) {
        debug!(target: DESKTOP_TARGET, "welcome dismissed");
    }

    fn focus_primary(&mut self) {
        info!(target: DESKTOP_TARGET, "focus requested by another launch");
    }

    fn show_error(&mut self, notice: &Notice) {
        warn!(
            target: DESKTOP_TARGET,
            title = %notice.title,
            message = %notice.message,
            "showing error"
        );
        self.notices.retain(|handle| !handle.is_finished());
        match self.spawn_error(notice) {
            Ok(handle) => self.notices.push(handle),
            Err(error) => warn!(
                target: DESKTOP_TARGET,
                error = %error,
                "error notice thread could not be started"
            ),
        }
    }

    fn ask_permission(&mut self, notice: &Notice) {
        self.spawn_question("permission-prompt", notice, permission_answer);
    }

    fn ask_reboot(&mut self, notice: &Notice) {
        self.spawn_question("reboot-prompt", notice, reboot_answer);
    }

    fn shutdown(&mut self) {
        for handle in self.notices.drain(..) {
            if handle.join().is_err() {
                warn!(target: DESKTOP_TARGET, "error notice thread panicked");
            }
        }
    }
}

fn permission_answer(accepted: bool) -> LoopEvent {
    LoopEvent::PermissionChoice(if accepted {
        GrantChoice::Grant
    } else {
        GrantChoice::Skip
    })
}

fn reboot_answer(accepted: bool) -> LoopEvent {
    LoopEvent::RebootChoice(if accepted {
        RebootChoice::RebootNow
    } else {
        RebootChoice::Later
    })
}

#[cfg(test)]
mod tests {
    use std::fs;
    use std::os::unix::fs::PermissionsExt;
    use std::path::{Path, PathBuf};
    use std::time::Duration;

    use rstest::rstest;

    use super::*;
    use crate::events;

    fn dialog_script(dir: &Path, body: &str) -> PathBuf {
        let path = dir.join("dialog");
        fs::write(&path, format!("#!/bin/sh\n{body}\n")).expect("write script");
        fs::set_permissions(&path, fs::Permissions::from_mode(0o755)).expect("chmod script");
        path
    }

    #[rstest]
    #[case("exit 0", LoopEvent::PermissionChoice(GrantChoice::Grant))]
    #[case("exit 1", LoopEvent::PermissionChoice(GrantChoice::Skip))]
    fn permission_answer_follows_exit_status(#[case] body: &str, #[case] expected: LoopEvent) {
        let dir = tempfile::tempdir().expect("temp dir");
        let (sink, receiver) = events::channel();
        let mut desktop = ZenityDesktop::with_program(dialog_script(dir.path(), body), sink);

        desktop.ask_permission(&Notice::question("t", "m", "Grant Access", "Skip"));

        let event = receiver
            .recv_timeout(Duration::from_secs(5))
            .expect("answer should arrive");
        assert_eq!(event, expected);
    }

    #[rstest]
    fn missing_dialog_program_counts_as_cancel() {
        let dir = tempfile::tempdir().expect("temp dir");
        let (sink, receiver) = events::channel();
        let mut desktop = ZenityDesktop::with_program(dir.path().join("absent"), sink);

        desktop.ask_reboot(&Notice::question("t", "m", "Reboot Now", "Later"));

        let event = receiver
            .recv_timeout(Duration::from_secs(5))
            .expect("answer should arrive");
        assert_eq!(event, LoopEvent::RebootChoice(RebootChoice::Later));
    }

    #[rstest]
    fn shutdown_waits_for_error_notices() {
        let dir = tempfile::tempdir().expect("temp dir");
        let marker = dir.path().join("shown");
        let script = dialog_script(
            dir.path(),
            &format!("sleep 0.2\ntouch '{}'", marker.display()),
        );
        let (sink, _receiver) = events::channel();
        let mut desktop = ZenityDesktop::with_program(script, sink);

        desktop.show_error(&Notice::error("Permission Error", "details"));
        desktop.shutdown();

        assert!(marker.exists(), "notice should finish before shutdown returns");
    }

    #[rstest]
    #[case(permission_answer as fn(bool) -> LoopEvent, LoopEvent::PermissionChoice(GrantChoice::Skip))]
    #[case(reboot_answer as fn(bool) -> LoopEvent, LoopEvent::RebootChoice(RebootChoice::Later))]
    fn declined_answers_map_to_cancel(
        #[case] answer: fn(bool) -> LoopEvent,
        #[case] expected: LoopEvent,
    ) {
        assert_eq!(answer(false), expected);
        assert_ne!(answer(true), expected);
    }

    #[rstest]
    fn finished_notices_are_released() {
        let dir = tempfile::tempdir().expect("temp dir");
        let script = dialog_script(dir.path(), "exit 0");
        let (sink, _receiver) = events::channel();
        let mut desktop = ZenityDesktop::with_program(script, sink);

        desktop.show_error(&Notice::error("Coral Failed to Start", "first"));
        let deadline = std::time::Instant::now() + Duration::from_secs(5);
        while !desktop.notices.iter().all(JoinHandle::is_finished) {
            assert!(std::time::Instant::now() < deadline, "notice never finished");
            thread::sleep(Duration::from_millis(10));
        }
        desktop.show_error(&Notice::error("Coral Failed to Start", "second"));

        assert_eq!(desktop.notices.len(), 1);
        desktop.shutdown();
    }
}
