//! Log pipeline error types.
//!
//! [`LogPipelineError`] covers everything that can go wrong inside the
//! pipeline. `From<LogPipelineError> for HttpmonError` lets startup failures
//! propagate with `?`.

use httpmon_core::error::{ConfigError, HttpmonError, PipelineError};

/// Log pipeline domain error.
#[derive(Debug, thiserror::Error)]
pub enum LogPipelineError {
    /// A line is not a valid access-log record.
    ///
    /// Expected and common; the tailer drops the line and keeps going.
    #[error("rejected line: {field}: {reason}")]
    Rejected {
        /// Offending field (`line` when the overall shape is wrong)
        field: &'static str,
        /// Why it was rejected
        reason: String,
    },

    /// The followed file could not be opened or positioned.
    #[error("tailer error: {path}: {reason}")]
    Tailer {
        /// Log file path
        path: String,
        /// Failure reason
        reason: String,
    },

    /// Invalid pipeline settings.
    #[error("config error: {field}: {reason}")]
    Config {
        /// Setting name
        field: String,
        /// Failure reason
        reason: String,
    },

    /// Regex compilation error.
    #[error("regex error: {0}")]
    Regex(#[from] regex::Error),
}

impl LogPipelineError {
    pub(crate) fn rejected(field: &'static str, reason: impl Into<String>) -> Self {
        Self::Rejected {
            field,
            reason: reason.into(),
        }
    }
}

impl From<LogPipelineError> for HttpmonError {
    fn from(err: LogPipelineError) -> Self {
        match err {
            LogPipelineError::Config { field, reason } => {
                HttpmonError::Config(ConfigError::InvalidValue { field, reason })
            }
            other => HttpmonError::Pipeline(PipelineError::InitFailed(other.to_string())),
        }
    }
}
