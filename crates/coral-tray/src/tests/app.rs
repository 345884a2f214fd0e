//! End-to-end checks of the invocation paths that never start a backend.

use std::time::Duration;

use clap::Parser;
use coral_config::RuntimePaths;
use rstest::rstest;

use crate::app::{Outcome, execute};
use crate::cli::Cli;
use crate::events::{self, LoopEvent};
use crate::instance::{ControlListener, InstanceGuard};

fn cli_for(dir: &std::path::Path, extra: &[&str]) -> Cli {
    let runtime_dir = dir.to_str().expect("utf-8 temp dir");
    let mut args = vec!["coral-tray", "--runtime-dir", runtime_dir, "--log-filter", "off"];
    args.extend_from_slice(extra);
    Cli::try_parse_from(args).expect("arguments should parse")
}

#[rstest]
fn second_launch_focuses_the_running_instance() {
    let dir = tempfile::tempdir().expect("temp dir");
    let paths = RuntimePaths::in_directory(dir.path().to_path_buf()).expect("runtime paths");
    let guard = InstanceGuard::acquire(paths.clone()).expect("first instance lock");
    let (sink, receiver) = events::channel();
    let listener = ControlListener::start(paths.socket_path(), sink).expect("control socket");

    let outcome = execute(cli_for(dir.path(), &[])).expect("second launch should defer");

    assert_eq!(outcome, Outcome::Deferred);
    let event = receiver
        .recv_timeout(Duration::from_secs(5))
        .expect("focus request should arrive");
    assert_eq!(event, LoopEvent::FocusRequested);
    assert!(
        paths.pid_path().exists(),
        "the first instance keeps its pid file"
    );
    listener.shutdown().expect("listener shutdown");
    drop(guard);
}

#[rstest]
fn notify_delivers_config_saved() {
    let dir = tempfile::tempdir().expect("temp dir");
    let paths = RuntimePaths::in_directory(dir.path().to_path_buf()).expect("runtime paths");
    let (sink, receiver) = events::channel();
    let listener = ControlListener::start(paths.socket_path(), sink).expect("control socket");

    let outcome =
        execute(cli_for(dir.path(), &["notify", "config-saved"])).expect("notify should succeed");

    assert_eq!(outcome, Outcome::Notified);
    let event = receiver
        .recv_timeout(Duration::from_secs(5))
        .expect("command should arrive");
    assert_eq!(event, LoopEvent::ConfigSaved);
    listener.shutdown().expect("listener shutdown");
}
