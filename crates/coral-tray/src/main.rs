use std::process::ExitCode;

fn main() -> ExitCode {
    coral_tray::run(std::env::args_os())
}
