//! Configuration layering: defaults < file < environment < command line.

use std::io::Write;

use clap::Parser;
use serial_test::serial;

use httpmon::cli::Cli;

fn config_file(contents: &str) -> tempfile::NamedTempFile {
    let mut file = tempfile::NamedTempFile::new().unwrap();
    file.write_all(contents.as_bytes()).unwrap();
    file
}

#[tokio::test]
#[serial]
async fn command_line_beats_environment_beats_file() {
    let file = config_file(
        r#"
[monitor]
log_file_path = "/from/file.log"
threshold_hits_per_sec = 5
alert_window_secs = 60
stats_interval_secs = 20
"#,
    );

    // SAFETY: serialized test, no other thread reads the environment
    unsafe {
        std::env::set_var("HTTPMON_MONITOR_THRESHOLD_HITS_PER_SEC", "7");
        std::env::set_var("HTTPMON_MONITOR_ALERT_WINDOW_SECS", "90");
    }

    let cli = Cli::try_parse_from([
        "httpmon",
        "--config",
        file.path().to_str().unwrap(),
        "--threshold",
        "9",
    ])
    .unwrap();
    let config = cli.load_config().await;

    unsafe {
        std::env::remove_var("HTTPMON_MONITOR_THRESHOLD_HITS_PER_SEC");
        std::env::remove_var("HTTPMON_MONITOR_ALERT_WINDOW_SECS");
    }

    let config = config.unwrap();
    assert_eq!(config.monitor.log_file_path, "/from/file.log");
    assert_eq!(config.monitor.threshold_hits_per_sec, 9);
    assert_eq!(config.monitor.alert_window_secs, 90);
    assert_eq!(config.monitor.stats_interval_secs, 20);
    config.validate().unwrap();
}

#[tokio::test]
#[serial]
async fn positional_path_without_config_file() {
    let cli = Cli::try_parse_from(["httpmon", "/var/log/access.log", "--headless"]).unwrap();
    let config = cli.load_config().await.unwrap();

    assert_eq!(config.monitor.log_file_path, "/var/log/access.log");
    assert!(config.display.headless);
    assert_eq!(config.monitor.threshold_hits_per_sec, 10);
    assert_eq!(config.monitor.alert_window_secs, 120);
}

#[tokio::test]
#[serial]
async fn missing_config_file_is_an_error() {
    let dir = tempfile::tempdir().unwrap();
    let missing = dir.path().join("httpmon.toml");
    let cli = Cli::try_parse_from(["httpmon", "--config", missing.to_str().unwrap()]).unwrap();

    let err = cli.load_config().await.unwrap_err();
    assert!(err.to_string().contains("config file not found"));
}

#[tokio::test]
#[serial]
async fn invalid_override_is_caught_by_validation() {
    let cli = Cli::try_parse_from(["httpmon", "/var/log/access.log", "--time-window", "0"]).unwrap();
    let config = cli.load_config().await.unwrap();
    let err = config.validate().unwrap_err();
    assert!(err.to_string().contains("alert_window_secs"));
}
