//! Command-line surface of the `coral-tray` binary.

use clap::{Parser, Subcommand, ValueEnum};

use coral_config::Config;
use coral_protocol::ControlCommand;

/// Command-line interface for the tray supervisor.
#[derive(Parser, Debug)]
#[command(
    name = "coral-tray",
    version,
    about = "Supervises the Coral speech backend",
    disable_help_subcommand = true
)]
pub struct Cli {
    /// Supervisor configuration.
    #[command(flatten)]
    pub config: Config,
    /// Talk to a running instance instead of starting one.
    #[command(subcommand)]
    pub command: Option<CliCommand>,
}

/// Subcommands.
#[derive(Subcommand, Debug, Clone, Copy, PartialEq, Eq)]
pub enum CliCommand {
    /// Sends one command to the running instance.
    Notify {
        /// Command to send.
        #[arg(value_enum)]
        command: NotifyCommand,
    },
}

/// Commands accepted by `coral-tray notify`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum NotifyCommand {
    /// Bring the running instance to the foreground.
    Focus,
    /// Restart the backend with the saved configuration.
    ConfigSaved,
    /// Stop the backend and exit.
    Quit,
}

impl From<NotifyCommand> for ControlCommand {
    fn from(command: NotifyCommand) -> Self {
        match command {
            NotifyCommand::Focus => Self::Focus,
            NotifyCommand::ConfigSaved => Self::ConfigSaved,
            NotifyCommand::Quit => Self::Quit,
        }
    }
}
