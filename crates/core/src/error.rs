//! Error types shared by every httpmon crate.
//!
//! Only startup-time failures (configuration, opening the log file) ever reach
//! the top level as [`HttpmonError`]. Malformed log lines and transient read
//! errors are handled inside the pipeline and never surface here.

/// Top-level httpmon error.
#[derive(Debug, thiserror::Error)]
pub enum HttpmonError {
    /// Configuration could not be loaded or is invalid.
    #[error("config error: {0}")]
    Config(#[from] ConfigError),

    /// A pipeline unit failed to start, stop or communicate.
    #[error("pipeline error: {0}")]
    Pipeline(#[from] PipelineError),

    /// I/O error.
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

/// Configuration errors.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// The configuration file does not exist.
    #[error("config file not found: {path}")]
    FileNotFound { path: String },

    /// The configuration file is not valid TOML for [`HttpmonConfig`](crate::config::HttpmonConfig).
    #[error("failed to parse config: {reason}")]
    ParseFailed { reason: String },

    /// A field holds a value outside its allowed domain.
    #[error("invalid config value for '{field}': {reason}")]
    InvalidValue { field: String, reason: String },
}

/// Pipeline lifecycle errors.
#[derive(Debug, thiserror::Error)]
pub enum PipelineError {
    /// `start()` was called on a running pipeline.
    #[error("pipeline is already running")]
    AlreadyRunning,

    /// `stop()` was called on a pipeline that is not running.
    #[error("pipeline is not running")]
    NotRunning,

    /// The pipeline could not be started.
    #[error("pipeline init failed: {0}")]
    InitFailed(String),

    /// One or more units ended abnormally (panic or error) during shutdown.
    #[error("pipeline unit failed: {0}")]
    UnitFailed(String),
}
