//! Command-line arguments for `httpmon`.
//!
//! Uses `clap` v4 derive macros. Every flag is an override on top of the
//! configuration file and `HTTPMON_*` environment variables.

use std::path::PathBuf;

use anyhow::Result;
use clap::Parser;

use httpmon_core::config::HttpmonConfig;

/// Live HTTP access-log monitor.
///
/// Follows an access log, alerts when the request rate over the alert window
/// exceeds the threshold and shows per-interval statistics.
#[derive(Parser, Debug)]
#[command(name = "httpmon")]
#[command(version, about, long_about = None)]
pub struct Cli {
    /// Access log to follow (overrides `monitor.log_file_path`).
    pub log_file: Option<PathBuf>,

    /// Path to an httpmon.toml configuration file.
    #[arg(short, long)]
    pub config: Option<PathBuf>,

    /// Alert threshold, in average hits per second over the window.
    #[arg(long)]
    pub threshold: Option<u64>,

    /// Alert window, in seconds.
    #[arg(long, alias = "time_window")]
    pub time_window: Option<u64>,

    /// Statistics interval, in seconds.
    #[arg(long)]
    pub stats_interval: Option<u64>,

    /// Print reports to stdout instead of drawing the terminal UI.
    #[arg(long)]
    pub headless: bool,

    /// Override log level (trace, debug, info, warn, error).
    #[arg(long)]
    pub log_level: Option<String>,

    /// Override log format (json, pretty).
    #[arg(long)]
    pub log_format: Option<String>,

    /// Validate configuration and exit without monitoring.
    #[arg(long)]
    pub validate: bool,
}

impl Cli {
    /// Loads the effective configuration: defaults, then the file (if any),
    /// then environment variables, then these flags.
    ///
    /// The result is not validated; the supervisor does that once every layer
    /// has been applied.
    pub async fn load_config(&self) -> Result<HttpmonConfig> {
        let mut config = match &self.config {
            Some(path) => HttpmonConfig::from_file(path)
                .await
                .map_err(|e| anyhow::anyhow!("failed to load config: {}", e))?,
            None => HttpmonConfig::default(),
        };
        config.apply_env_overrides();
        self.apply_overrides(&mut config);
        Ok(config)
    }

    /// Applies the flags that were given on the command line.
    pub fn apply_overrides(&self, config: &mut HttpmonConfig) {
        if let Some(path) = &self.log_file {
            config.monitor.log_file_path = path.display().to_string();
        }
        if let Some(threshold) = self.threshold {
            config.monitor.threshold_hits_per_sec = threshold;
        }
        if let Some(window) = self.time_window {
            config.monitor.alert_window_secs = window;
        }
        if let Some(interval) = self.stats_interval {
            config.monitor.stats_interval_secs = interval;
        }
        if self.headless {
            config.display.headless = true;
        }
        if let Some(level) = &self.log_level {
            config.general.log_level.clone_from(level);
        }
        if let Some(format) = &self.log_format {
            config.general.log_format.clone_from(format);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn positional_log_file_and_original_flag_names() {
        let cli = Cli::try_parse_from([
            "httpmon",
            "/var/log/access.log",
            "--threshold",
            "20",
            "--time_window",
            "60",
        ])
        .unwrap();

        let mut config = HttpmonConfig::default();
        cli.apply_overrides(&mut config);
        assert_eq!(config.monitor.log_file_path, "/var/log/access.log");
        assert_eq!(config.monitor.threshold_hits_per_sec, 20);
        assert_eq!(config.monitor.alert_window_secs, 60);
        assert_eq!(config.monitor.stats_interval_secs, 10);
    }

    #[test]
    fn absent_flags_leave_config_untouched() {
        let cli = Cli::try_parse_from(["httpmon"]).unwrap();
        let mut config = HttpmonConfig::default();
        config.monitor.log_file_path = "/from/file.log".to_owned();
        config.general.log_level = "warn".to_owned();

        cli.apply_overrides(&mut config);
        assert_eq!(config.monitor.log_file_path, "/from/file.log");
        assert_eq!(config.general.log_level, "warn");
        assert!(!config.display.headless);
    }

    #[test]
    fn logging_and_display_overrides() {
        let cli = Cli::try_parse_from([
            "httpmon",
            "--headless",
            "--log-level",
            "debug",
            "--log-format",
            "pretty",
            "--stats-interval",
            "5",
        ])
        .unwrap();
        let mut config = HttpmonConfig::default();
        cli.apply_overrides(&mut config);
        assert!(config.display.headless);
        assert_eq!(config.general.log_level, "debug");
        assert_eq!(config.general.log_format, "pretty");
        assert_eq!(config.monitor.stats_interval_secs, 5);
    }

    #[test]
    fn non_numeric_threshold_is_a_usage_error() {
        assert!(Cli::try_parse_from(["httpmon", "--threshold", "many"]).is_err());
    }
}
