//! Pipeline settings.
//!
//! [`PipelineConfig`] is derived from the core
//! [`MonitorConfig`](httpmon_core::config::MonitorConfig) and carries the
//! values the tailer and the two consumers need, in their native types.
//!
//! # Example
//! ```ignore
//! use httpmon_core::config::HttpmonConfig;
//! use httpmon_log_pipeline::config::PipelineConfig;
//!
//! let core_config = HttpmonConfig::default();
//! let config = PipelineConfig::from_core(&core_config.monitor);
//! ```

use std::path::PathBuf;
use std::time::Duration;

use httpmon_core::config::MonitorConfig;
use serde::{Deserialize, Serialize};

use crate::error::LogPipelineError;

/// Pipeline settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PipelineConfig {
    /// Access log to follow.
    pub log_file_path: PathBuf,
    /// Average hits per second above which an alert fires.
    pub threshold_hits_per_sec: u64,
    /// Sliding window width, in seconds.
    pub window_secs: u64,
    /// Wall-clock warm-up before alert transitions are evaluated, in seconds.
    pub warmup_secs: u64,
    /// Stats aggregation interval, in seconds.
    pub stats_interval_secs: u64,
    /// Sleep between reads when no complete line is available.
    pub poll_interval_ms: u64,
    /// Capacity of each tailer -> consumer channel.
    pub channel_capacity: usize,
    /// Longest accepted line, in bytes.
    pub max_line_length: usize,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self::from_core(&MonitorConfig::default())
    }
}

impl PipelineConfig {
    /// Builds pipeline settings from the `[monitor]` section.
    pub fn from_core(core: &MonitorConfig) -> Self {
        Self {
            log_file_path: PathBuf::from(&core.log_file_path),
            threshold_hits_per_sec: core.threshold_hits_per_sec,
            window_secs: core.alert_window_secs,
            warmup_secs: core.effective_warmup_secs(),
            stats_interval_secs: core.stats_interval_secs,
            poll_interval_ms: core.poll_interval_ms,
            channel_capacity: core.channel_capacity,
            max_line_length: core.max_line_length,
        }
    }

    /// Polling sleep as a [`Duration`].
    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms)
    }

    /// Stats interval as a [`Duration`].
    pub fn stats_interval(&self) -> Duration {
        Duration::from_secs(self.stats_interval_secs)
    }

    /// Alert warm-up as a [`Duration`].
    pub fn warmup(&self) -> Duration {
        Duration::from_secs(self.warmup_secs)
    }

    /// Validates the settings.
    pub fn validate(&self) -> Result<(), LogPipelineError> {
        if self.log_file_path.as_os_str().is_empty() {
            return Err(LogPipelineError::Config {
                field: "log_file_path".to_owned(),
                reason: "a log file path is required".to_owned(),
            });
        }

        // the window is the rate denominator
        if self.window_secs == 0 {
            return Err(LogPipelineError::Config {
                field: "window_secs".to_owned(),
                reason: "must be greater than 0".to_owned(),
            });
        }

        if self.threshold_hits_per_sec == 0 {
            return Err(LogPipelineError::Config {
                field: "threshold_hits_per_sec".to_owned(),
                reason: "must be greater than 0".to_owned(),
            });
        }

        if self
            .threshold_hits_per_sec
            .checked_mul(self.window_secs)
            .is_none()
        {
            return Err(LogPipelineError::Config {
                field: "threshold_hits_per_sec".to_owned(),
                reason: "threshold * window overflows".to_owned(),
            });
        }

        if self.stats_interval_secs == 0 {
            return Err(LogPipelineError::Config {
                field: "stats_interval_secs".to_owned(),
                reason: "must be greater than 0".to_owned(),
            });
        }

        if self.poll_interval_ms == 0 {
            return Err(LogPipelineError::Config {
                field: "poll_interval_ms".to_owned(),
                reason: "must be greater than 0".to_owned(),
            });
        }

        if self.channel_capacity == 0 {
            return Err(LogPipelineError::Config {
                field: "channel_capacity".to_owned(),
                reason: "must be greater than 0".to_owned(),
            });
        }

        if self.max_line_length == 0 {
            return Err(LogPipelineError::Config {
                field: "max_line_length".to_owned(),
                reason: "must be greater than 0".to_owned(),
            });
        }

        Ok(())
    }
}

/// Pipeline settings builder.
#[derive(Default)]
pub struct PipelineConfigBuilder {
    config: PipelineConfig,
}

impl PipelineConfigBuilder {
    /// Creates a builder with default settings.
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the followed file.
    pub fn log_file_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.config.log_file_path = path.into();
        self
    }

    /// Sets the alert threshold, in average hits per second.
    pub fn threshold_hits_per_sec(mut self, threshold: u64) -> Self {
        self.config.threshold_hits_per_sec = threshold;
        self
    }

    /// Sets the sliding window width. The warm-up follows unless set afterwards.
    pub fn window_secs(mut self, secs: u64) -> Self {
        self.config.window_secs = secs;
        self.config.warmup_secs = secs;
        self
    }

    /// Sets the alert warm-up.
    pub fn warmup_secs(mut self, secs: u64) -> Self {
        self.config.warmup_secs = secs;
        self
    }

    /// Sets the stats interval.
    pub fn stats_interval_secs(mut self, secs: u64) -> Self {
        self.config.stats_interval_secs = secs;
        self
    }

    /// Sets the polling sleep.
    pub fn poll_interval_ms(mut self, ms: u64) -> Self {
        self.config.poll_interval_ms = ms;
        self
    }

    /// Sets the per-consumer channel capacity.
    pub fn channel_capacity(mut self, capacity: usize) -> Self {
        self.config.channel_capacity = capacity;
        self
    }

    /// Sets the maximum line length.
    pub fn max_line_length(mut self, len: usize) -> Self {
        self.config.max_line_length = len;
        self
    }

    /// Validates and returns the settings.
    pub fn build(self) -> Result<PipelineConfig, LogPipelineError> {
        self.config.validate()?;
        Ok(self.config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_lacks_path() {
        let err = PipelineConfig::default().validate().unwrap_err();
        assert!(err.to_string().contains("log_file_path"));
    }

    #[test]
    fn from_core_preserves_values() {
        let core = MonitorConfig {
            log_file_path: "/tmp/access.log".to_owned(),
            threshold_hits_per_sec: 5,
            alert_window_secs: 6,
            alert_warmup_secs: Some(0),
            stats_interval_secs: 2,
            ..Default::default()
        };
        let config = PipelineConfig::from_core(&core);
        assert_eq!(config.log_file_path, PathBuf::from("/tmp/access.log"));
        assert_eq!(config.threshold_hits_per_sec, 5);
        assert_eq!(config.window_secs, 6);
        assert_eq!(config.warmup_secs, 0);
        assert_eq!(config.stats_interval(), Duration::from_secs(2));
        config.validate().unwrap();
    }

    #[test]
    fn from_core_warmup_defaults_to_window() {
        let core = MonitorConfig {
            alert_window_secs: 30,
            ..Default::default()
        };
        assert_eq!(PipelineConfig::from_core(&core).warmup_secs, 30);
    }

    #[test]
    fn validate_rejects_zero_window() {
        let result = PipelineConfigBuilder::new()
            .log_file_path("/tmp/access.log")
            .window_secs(0)
            .build();
        assert!(result.is_err());
    }

    #[test]
    fn validate_rejects_overflowing_threshold() {
        let result = PipelineConfigBuilder::new()
            .log_file_path("/tmp/access.log")
            .threshold_hits_per_sec(u64::MAX)
            .window_secs(2)
            .build();
        assert!(result.is_err());
    }

    #[test]
    fn builder_creates_valid_config() {
        let config = PipelineConfigBuilder::new()
            .log_file_path("/tmp/access.log")
            .window_secs(6)
            .warmup_secs(0)
            .poll_interval_ms(10)
            .channel_capacity(16)
            .build()
            .unwrap();
        assert_eq!(config.window_secs, 6);
        assert_eq!(config.warmup(), Duration::ZERO);
        assert_eq!(config.poll_interval(), Duration::from_millis(10));
        assert_eq!(config.channel_capacity, 16);
    }
}
