//! Configuration -- `httpmon.toml` parsing and runtime settings.
//!
//! [`HttpmonConfig`] is the top-level structure. Each crate reads only its own
//! section.
//!
//! # Precedence
//! 1. CLI arguments (applied by the binary)
//! 2. Environment variables (`HTTPMON_MONITOR_THRESHOLD_HITS_PER_SEC=20`)
//! 3. Configuration file
//! 4. Defaults ([`Default`] impls)
//!
//! # Example
//! ```no_run
//! # async fn example() -> Result<(), httpmon_core::error::HttpmonError> {
//! use httpmon_core::config::HttpmonConfig;
//!
//! let config = HttpmonConfig::load("httpmon.toml").await?;
//! let config = HttpmonConfig::parse("[monitor]\nlog_file_path = \"/tmp/access.log\"")?;
//! # Ok(())
//! # }
//! ```

use std::path::Path;

use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::error::{ConfigError, HttpmonError};

/// Supported metrics scrape path.
pub const METRICS_ENDPOINT: &str = "/metrics";

/// httpmon configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct HttpmonConfig {
    /// Logging settings
    #[serde(default)]
    pub general: GeneralConfig,
    /// Tailer, alert engine and stats engine settings
    #[serde(default)]
    pub monitor: MonitorConfig,
    /// Status renderer settings
    #[serde(default)]
    pub display: DisplayConfig,
    /// Prometheus exporter settings
    #[serde(default)]
    pub metrics: MetricsConfig,
}

impl HttpmonConfig {
    /// Loads a TOML file, applies environment overrides and validates.
    pub async fn load(path: impl AsRef<Path>) -> Result<Self, HttpmonError> {
        let mut config = Self::from_file(path).await?;
        config.apply_env_overrides();
        config.validate()?;
        Ok(config)
    }

    /// Loads a TOML file without environment overrides or validation.
    ///
    /// Validation is deferred because `monitor.log_file_path` is commonly
    /// supplied on the command line instead of in the file.
    pub async fn from_file(path: impl AsRef<Path>) -> Result<Self, HttpmonError> {
        let path = path.as_ref();
        let content = tokio::fs::read_to_string(path).await.map_err(|e| {
            if e.kind() == std::io::ErrorKind::NotFound {
                HttpmonError::Config(ConfigError::FileNotFound {
                    path: path.display().to_string(),
                })
            } else {
                HttpmonError::Io(e)
            }
        })?;
        Self::parse(&content)
    }

    /// Parses a TOML string.
    pub fn parse(toml_str: &str) -> Result<Self, HttpmonError> {
        toml::from_str(toml_str).map_err(|e| {
            HttpmonError::Config(ConfigError::ParseFailed {
                reason: e.to_string(),
            })
        })
    }

    /// Overrides values from `HTTPMON_{SECTION}_{FIELD}` environment variables.
    pub fn apply_env_overrides(&mut self) {
        // General
        override_string(&mut self.general.log_level, "HTTPMON_GENERAL_LOG_LEVEL");
        override_string(&mut self.general.log_format, "HTTPMON_GENERAL_LOG_FORMAT");
        override_string(&mut self.general.log_file, "HTTPMON_GENERAL_LOG_FILE");

        // Monitor
        override_string(
            &mut self.monitor.log_file_path,
            "HTTPMON_MONITOR_LOG_FILE_PATH",
        );
        override_u64(
            &mut self.monitor.threshold_hits_per_sec,
            "HTTPMON_MONITOR_THRESHOLD_HITS_PER_SEC",
        );
        override_u64(
            &mut self.monitor.alert_window_secs,
            "HTTPMON_MONITOR_ALERT_WINDOW_SECS",
        );
        override_opt_u64(
            &mut self.monitor.alert_warmup_secs,
            "HTTPMON_MONITOR_ALERT_WARMUP_SECS",
        );
        override_u64(
            &mut self.monitor.stats_interval_secs,
            "HTTPMON_MONITOR_STATS_INTERVAL_SECS",
        );
        override_u64(
            &mut self.monitor.poll_interval_ms,
            "HTTPMON_MONITOR_POLL_INTERVAL_MS",
        );
        override_usize(
            &mut self.monitor.channel_capacity,
            "HTTPMON_MONITOR_CHANNEL_CAPACITY",
        );
        override_usize(
            &mut self.monitor.max_line_length,
            "HTTPMON_MONITOR_MAX_LINE_LENGTH",
        );

        // Display
        override_u64(
            &mut self.display.refresh_interval_ms,
            "HTTPMON_DISPLAY_REFRESH_INTERVAL_MS",
        );
        override_usize(
            &mut self.display.top_sections,
            "HTTPMON_DISPLAY_TOP_SECTIONS",
        );
        override_bool(&mut self.display.headless, "HTTPMON_DISPLAY_HEADLESS");
        override_string(
            &mut self.display.headless_format,
            "HTTPMON_DISPLAY_HEADLESS_FORMAT",
        );

        // Metrics
        override_bool(&mut self.metrics.enabled, "HTTPMON_METRICS_ENABLED");
        override_string(
            &mut self.metrics.listen_addr,
            "HTTPMON_METRICS_LISTEN_ADDR",
        );
        override_u16(&mut self.metrics.port, "HTTPMON_METRICS_PORT");
    }

    /// Validates every section.
    ///
    /// Invalid values are fatal at startup; none of these conditions can be
    /// discovered later while the pipeline runs.
    pub fn validate(&self) -> Result<(), HttpmonError> {
        let valid_levels = ["trace", "debug", "info", "warn", "error"];
        if !valid_levels.contains(&self.general.log_level.as_str()) {
            return Err(invalid(
                "general.log_level",
                format!("must be one of: {}", valid_levels.join(", ")),
            ));
        }

        let valid_formats = ["json", "pretty"];
        if !valid_formats.contains(&self.general.log_format.as_str()) {
            return Err(invalid(
                "general.log_format",
                format!("must be one of: {}", valid_formats.join(", ")),
            ));
        }

        self.monitor.validate()?;

        if self.display.refresh_interval_ms == 0 {
            return Err(invalid(
                "display.refresh_interval_ms",
                "must be greater than 0",
            ));
        }

        let valid_report_formats = ["text", "json"];
        if !valid_report_formats.contains(&self.display.headless_format.as_str()) {
            return Err(invalid(
                "display.headless_format",
                format!("must be one of: {}", valid_report_formats.join(", ")),
            ));
        }

        if self.metrics.enabled && self.metrics.endpoint != METRICS_ENDPOINT {
            return Err(invalid(
                "metrics.endpoint",
                format!("only '{METRICS_ENDPOINT}' is supported"),
            ));
        }

        Ok(())
    }
}

fn invalid(field: &str, reason: impl Into<String>) -> HttpmonError {
    ConfigError::InvalidValue {
        field: field.to_owned(),
        reason: reason.into(),
    }
    .into()
}

/// Logging settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct GeneralConfig {
    /// trace, debug, info, warn, error
    pub log_level: String,
    /// json, pretty
    pub log_format: String,
    /// Diagnostic log destination. Empty logs to stderr.
    pub log_file: String,
}

impl Default for GeneralConfig {
    fn default() -> Self {
        Self {
            log_level: "info".to_owned(),
            log_format: "json".to_owned(),
            log_file: "httpmon.log".to_owned(),
        }
    }
}

/// Tailer and consumer settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct MonitorConfig {
    /// Access log to follow. Required.
    pub log_file_path: String,
    /// Average hits per second over the window above which an alert fires.
    pub threshold_hits_per_sec: u64,
    /// Sliding window width, in seconds.
    pub alert_window_secs: u64,
    /// Wall-clock time before alert transitions are evaluated.
    /// Defaults to `alert_window_secs`.
    pub alert_warmup_secs: Option<u64>,
    /// Stats aggregation interval, in seconds.
    pub stats_interval_secs: u64,
    /// Sleep between reads when no complete line is available.
    pub poll_interval_ms: u64,
    /// Capacity of each tailer -> consumer channel.
    pub channel_capacity: usize,
    /// Longest accepted line, in bytes.
    pub max_line_length: usize,
}

impl Default for MonitorConfig {
    fn default() -> Self {
        Self {
            log_file_path: String::new(),
            threshold_hits_per_sec: 10,
            alert_window_secs: 120,
            alert_warmup_secs: None,
            stats_interval_secs: 10,
            poll_interval_ms: 100,
            channel_capacity: 1024,
            max_line_length: 64 * 1024,
        }
    }
}

impl MonitorConfig {
    /// Effective warm-up period in seconds.
    pub fn effective_warmup_secs(&self) -> u64 {
        self.alert_warmup_secs.unwrap_or(self.alert_window_secs)
    }

    fn validate(&self) -> Result<(), HttpmonError> {
        if self.log_file_path.trim().is_empty() {
            return Err(invalid("monitor.log_file_path", "a log file path is required"));
        }

        let positive_u64 = [
            ("monitor.threshold_hits_per_sec", self.threshold_hits_per_sec),
            ("monitor.alert_window_secs", self.alert_window_secs),
            ("monitor.stats_interval_secs", self.stats_interval_secs),
            ("monitor.poll_interval_ms", self.poll_interval_ms),
        ];
        for (field, value) in positive_u64 {
            if value == 0 {
                return Err(invalid(field, "must be greater than 0"));
            }
        }

        if self.channel_capacity == 0 {
            return Err(invalid("monitor.channel_capacity", "must be greater than 0"));
        }
        if self.max_line_length == 0 {
            return Err(invalid("monitor.max_line_length", "must be greater than 0"));
        }

        Ok(())
    }
}

/// Status renderer settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DisplayConfig {
    /// Redraw period, in milliseconds.
    pub refresh_interval_ms: u64,
    /// Number of sections listed in the last-interval breakdown.
    pub top_sections: usize,
    /// Print reports to stdout instead of drawing a terminal UI.
    pub headless: bool,
    /// Headless report format: `text` or `json` (one object per line).
    pub headless_format: String,
}

impl Default for DisplayConfig {
    fn default() -> Self {
        Self {
            refresh_interval_ms: 250,
            top_sections: 2,
            headless: false,
            headless_format: "text".to_owned(),
        }
    }
}

/// Prometheus exporter settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct MetricsConfig {
    /// Enable the HTTP exporter.
    pub enabled: bool,
    /// Bind address.
    pub listen_addr: String,
    /// Bind port.
    pub port: u16,
    /// Scrape path. Only `/metrics` is supported.
    pub endpoint: String,
}

impl Default for MetricsConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            listen_addr: "127.0.0.1".to_owned(),
            port: 9102,
            endpoint: METRICS_ENDPOINT.to_owned(),
        }
    }
}

// --- environment override helpers ---

fn override_string(target: &mut String, env_key: &str) {
    if let Ok(val) = std::env::var(env_key) {
        *target = val;
    }
}

fn override_bool(target: &mut bool, env_key: &str) {
    if let Ok(val) = std::env::var(env_key) {
        match val.parse::<bool>() {
            Ok(parsed) => *target = parsed,
            Err(_) => warn!(
                env_key,
                value = val.as_str(),
                "failed to parse bool from env var, ignoring"
            ),
        }
    }
}

fn override_u16(target: &mut u16, env_key: &str) {
    if let Ok(val) = std::env::var(env_key) {
        match val.parse::<u16>() {
            Ok(parsed) => *target = parsed,
            Err(_) => warn!(
                env_key,
                value = val.as_str(),
                "failed to parse u16 from env var, ignoring"
            ),
        }
    }
}

fn override_usize(target: &mut usize, env_key: &str) {
    if let Ok(val) = std::env::var(env_key) {
        match val.parse::<usize>() {
            Ok(parsed) => *target = parsed,
            Err(_) => warn!(
                env_key,
                value = val.as_str(),
                "failed to parse usize from env var, ignoring"
            ),
        }
    }
}

fn override_u64(target: &mut u64, env_key: &str) {
    if let Ok(val) = std::env::var(env_key) {
        match val.parse::<u64>() {
            Ok(parsed) => *target = parsed,
            Err(_) => warn!(
                env_key,
                value = val.as_str(),
                "failed to parse u64 from env var, ignoring"
            ),
        }
    }
}

fn override_opt_u64(target: &mut Option<u64>, env_key: &str) {
    if let Ok(val) = std::env::var(env_key) {
        match val.parse::<u64>() {
            Ok(parsed) => *target = Some(parsed),
            Err(_) => warn!(
                env_key,
                value = val.as_str(),
                "failed to parse u64 from env var, ignoring"
            ),
        }
    }
}
