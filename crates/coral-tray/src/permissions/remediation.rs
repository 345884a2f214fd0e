use std::env;
use std::ffi::OsString;
use std::io;
use std::path::PathBuf;
use std::process::{Command, Output, Stdio};
use std::thread;

use nix::unistd::{User, getuid};
use thiserror::Error;
use tracing::{info, warn};

use crate::events::{EventSink, LoopEvent};
use crate::process::ExitReport;

use super::PERMISSIONS_TARGET;
use super::grants::{INPUT_GROUP, UINPUT_RULE, UINPUT_RULE_PATH};

/// Exit status `pkexec` uses when the authentication dialog is dismissed.
const PKEXEC_DISMISSED: i32 = 126;

/// Errors raised by the privileged helper.
#[derive(Debug, Error)]
pub enum ElevationError {
    /// The current user name could not be determined.
    #[error("cannot determine the current user name")]
    UnknownUser,
    /// The elevation program could not be started.
    #[error("failed to run '{program}': {source}")]
    Spawn {
        /// Program that failed to start.
        program: String,
        /// Underlying IO error.
        #[source]
        source: io::Error,
    },
    /// The elevated script failed.
    #[error("privileged setup failed ({}){}", .status, detail_suffix(.stderr))]
    Failed {
        /// Exit status of the elevation program.
        status: ExitReport,
        /// Captured standard error.
        stderr: String,
    },
    /// The user dismissed the authentication dialog.
    #[error("authentication was dismissed")]
    Dismissed,
    /// The worker thread could not be started.
    #[error("failed to start the setup thread: {source}")]
    Thread {
        /// Underlying IO error.
        #[source]
        source: io::Error,
    },
    /// The reboot command failed.
    #[error("reboot request failed ({status})")]
    Reboot {
        /// Exit status of the reboot command.
        status: ExitReport,
    },
}

fn detail_suffix(stderr: &str) -> String {
    let trimmed = stderr.trim();
    if trimmed.is_empty() {
        String::new()
    } else {
        format!(": {trimmed}")
    }
}

/// The three OS changes granting device access, run as one elevated script.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RemediationPlan {
    user: String,
    group: String,
    rule_path: PathBuf,
}

impl RemediationPlan {
    /// Plans the setup for `user` with the standard group and rule file.
    #[must_use]
    pub fn new(user: impl Into<String>) -> Self {
        Self {
            user: user.into(),
            group: INPUT_GROUP.to_owned(),
            rule_path: PathBuf::from(UINPUT_RULE_PATH),
        }
    }

    /// Plans the setup for the user running this process.
    ///
    /// # Errors
    ///
    /// Returns [`ElevationError::UnknownUser`] when neither the user database
    /// nor `USER` yields a name.
    pub fn for_current_user() -> Result<Self, ElevationError> {
        current_user_name()
            .map(Self::new)
            .ok_or(ElevationError::UnknownUser)
    }

    /// User to add to the group.
    #[must_use]
    pub fn user(&self) -> &str {
        &self.user
    }

    /// Shell script performing all three changes, stopping at the first failure.
    #[must_use]
    pub fn script(&self) -> String {
        let rule_path = self.rule_path.to_string_lossy();
        format!(
            "usermod -aG {group} {user} && printf '%s\\n' {rule} > {path} && \
             udevadm control --reload-rules && udevadm trigger /dev/uinput",
            group = shell_quote(&self.group),
            user = shell_quote(&self.user),
            rule = shell_quote(UINPUT_RULE),
            path = shell_quote(&rule_path),
        )
    }

    /// Commands the user can run by hand when the elevated setup fails.
    #[must_use]
    pub fn manual_instructions(&self) -> String {
        let rule_path = self.rule_path.to_string_lossy();
        format!(
            "sudo usermod -aG {group} {user}\n\
             echo '{UINPUT_RULE}' | sudo tee {rule_path}\n\
             sudo udevadm control --reload-rules && sudo udevadm trigger /dev/uinput",
            group = self.group,
            user = self.user,
        )
    }
}

fn current_user_name() -> Option<String> {
    match User::from_uid(getuid()) {
        Ok(Some(user)) => return Some(user.name),
        Ok(None) => {}
        Err(error) => warn!(
            target: PERMISSIONS_TARGET,
            error = %error,
            "user database lookup failed"
        ),
    }
    env::var("USER").ok().filter(|name| !name.is_empty())
}

fn shell_quote(value: &str) -> String {
    format!("'{}'", value.replace('\'', r"'\''"))
}

/// Runs privileged actions.
pub trait Elevator {
    /// Starts the setup without blocking; the result arrives as
    /// [`LoopEvent::RemediationFinished`].
    fn remediate(&mut self, plan: &RemediationPlan);

    /// Asks the OS to reboot.
    ///
    /// # Errors
    ///
    /// Returns an [`ElevationError`] when the request cannot be issued.
    fn reboot(&mut self) -> Result<(), ElevationError>;
}

/// Elevates through polkit's `pkexec` and reboots through `systemctl`.
#[derive(Debug, Clone)]
pub struct PkexecElevator {
    program: OsString,
    sink: EventSink,
}

impl PkexecElevator {
    /// Builds an elevator posting results to `sink`.
    #[must_use]
    pub fn new(sink: EventSink) -> Self {
        Self::with_program("pkexec", sink)
    }

    /// Uses `program` in place of `pkexec`; it receives `sh -c <script>`.
    #[must_use]
    pub fn with_program(program: impl Into<OsString>, sink: EventSink) -> Self {
        Self {
            program: program.into(),
            sink,
        }
    }
}

impl Elevator for PkexecElevator {
    fn remediate(&mut self, plan: &RemediationPlan) {
        let mut command = Command::new(&self.program);
        command
            .arg("sh")
            .arg("-c")
            .arg(plan.script())
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::piped());
        let program = self.program.to_string_lossy().into_owned();
        let sink = self.sink.clone();
        info!(target: PERMISSIONS_TARGET, user = plan.user(), "requesting elevated setup");

        let spawned = thread::Builder::new()
            .name("privileged-setup".to_owned())
            .spawn(move || {
                let outcome = interpret(&program, command.output()).map_err(|error| error.to_string());
                sink.send(LoopEvent::RemediationFinished(outcome));
            });
        if let Err(source) = spawned {
            let error = ElevationError::Thread { source };
            self.sink
                .send(LoopEvent::RemediationFinished(Err(error.to_string())));
        }
    }

    fn reboot(&mut self) -> Result<(), ElevationError> {
        info!(target: PERMISSIONS_TARGET, "requesting reboot");
        let status = Command::new("systemctl")
            .arg("reboot")
            .stdin(Stdio::null())
            .status()
            .map_err(|source| ElevationError::Spawn {
                program: "systemctl".to_owned(),
                source,
            })?;
        if status.success() {
            Ok(())
        } else {
            Err(ElevationError::Reboot {
                status: status.into(),
            })
        }
    }
}

fn interpret(program: &str, output: io::Result<Output>) -> Result<(), ElevationError> {
    let output = output.map_err(|source| ElevationError::Spawn {
        program: program.to_owned(),
        source,
    })?;
    if output.status.success() {
        return Ok(());
    }
    if output.status.code() == Some(PKEXEC_DISMISSED) {
        return Err(ElevationError::Dismissed);
    }
    Err(ElevationError::Failed {
        status: output.status.into(),
        stderr: String::from_utf8_lossy(&output.stderr).into_owned(),
    })
}
