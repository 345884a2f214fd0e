//! Command-line parsing and defaults for the supervisor configuration.

use std::path::{Path, PathBuf};

use rstest::rstest;

use coral_config::{Config, DEFAULT_LOG_FILTER, LogFormat, default_log_format};

#[test]
fn defaults_apply_without_arguments() {
    let config = Config::load_from_iter(["coral-tray"]).expect("defaults should parse");

    assert_eq!(config.log_filter(), DEFAULT_LOG_FILTER);
    assert_eq!(config.log_format(), default_log_format());
    assert_eq!(config.backend_binary(), None);
    assert_eq!(config.install_root(), None);
    assert_eq!(config.repo_root(), None);
}

#[rstest]
#[case("json", LogFormat::Json)]
#[case("compact", LogFormat::Compact)]
#[case("Compact", LogFormat::Compact)]
fn log_format_flag_is_parsed(#[case] raw: &str, #[case] expected: LogFormat) {
    let config = Config::load_from_iter(["coral-tray", "--log-format", raw])
        .expect("log format should parse");
    assert_eq!(config.log_format(), expected);
}

#[test]
fn unknown_log_format_is_rejected() {
    let error = Config::load_from_iter(["coral-tray", "--log-format", "pretty"])
        .expect_err("unknown format should fail");
    assert_eq!(error.kind(), clap::error::ErrorKind::ValueValidation);
}

#[test]
fn location_overrides_are_parsed() {
    let config = Config::load_from_iter([
        "coral-tray",
        "--backend-binary",
        "/opt/coral/bin/coral",
        "--config-file",
        "/srv/coral/config.json",
        "--runtime-dir",
        "/run/user/1000/coral-test",
        "--install-root",
        "/opt/coral/resources",
        "--repo-root",
        "/home/dev/coral",
    ])
    .expect("overrides should parse");

    assert_eq!(config.backend_binary(), Some(Path::new("/opt/coral/bin/coral")));
    assert_eq!(
        config.user_config_path(),
        Some(PathBuf::from("/srv/coral/config.json"))
    );
    assert_eq!(
        config.runtime_dir(),
        PathBuf::from("/run/user/1000/coral-test")
    );
    assert_eq!(config.install_root(), Some(Path::new("/opt/coral/resources")));
    assert_eq!(config.repo_root(), Some(Path::new("/home/dev/coral")));
}

#[test]
fn user_config_defaults_beneath_the_home_directory() {
    let Some(path) = Config::default().user_config_path() else {
        return;
    };
    assert!(
        path.ends_with(".coral/conf/config.json"),
        "unexpected config path: {}",
        path.display()
    );
}
