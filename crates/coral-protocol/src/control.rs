//! Commands accepted on the running instance's control socket.

use strum::{Display, EnumString};

/// One newline-terminated request sent to the running supervisor.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Display, EnumString)]
#[strum(serialize_all = "SCREAMING_SNAKE_CASE", ascii_case_insensitive)]
pub enum ControlCommand {
    /// Bring the running instance's primary surface to the foreground.
    Focus,
    /// The settings editor saved the backend configuration.
    ConfigSaved,
    /// Stop the backend and exit.
    Quit,
}

/// Error returned when a control line names no known command.
pub type ControlCommandParseError = strum::ParseError;

impl ControlCommand {
    /// Encodes the command as a single protocol line.
    #[must_use]
    pub fn to_line(self) -> String {
        format!("{self}\n")
    }

    /// Parses one protocol line, ignoring surrounding whitespace.
    ///
    /// # Errors
    ///
    /// Returns [`ControlCommandParseError`] for unknown commands.
    pub fn from_line(line: &str) -> Result<Self, ControlCommandParseError> {
        line.trim().parse()
    }
}
