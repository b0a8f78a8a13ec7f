//! Parsed access-log records and status classing.
//!
//! A [`LogEvent`] is created by the parser for every accepted line and is
//! immutable afterwards. The tailer hands each consumer its own clone.

use std::fmt;

use serde::{Deserialize, Serialize};

/// One parsed request record.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LogEvent {
    /// Remote host (first column).
    pub client: String,
    /// Authenticated user (third column), `-` when absent.
    pub user_id: String,
    /// Request time, Unix seconds.
    pub timestamp: i64,
    /// HTTP method, e.g. `GET`.
    pub method: String,
    /// First path segment of the request target (`/api/user` -> `api`).
    pub section: String,
    /// HTTP status code, always within `100..=599`.
    pub status_code: u16,
    /// Response size in bytes (`-` is recorded as 0).
    pub size_bytes: u64,
}

impl LogEvent {
    /// Returns the status class bucket of this event.
    pub fn status_class(&self) -> StatusClass {
        StatusClass::from_code(self.status_code)
    }
}

/// Status code bucket keyed by the leading digit.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum StatusClass {
    /// `1XX`
    Informational,
    /// `2XX`
    Success,
    /// `3XX`
    Redirection,
    /// `4XX`
    ClientError,
    /// `5XX`
    ServerError,
    /// Anything with an unexpected leading digit.
    Other,
}

impl StatusClass {
    /// Buckets a numeric status code by its first digit.
    pub fn from_code(code: u16) -> Self {
        match code / 100 {
            1 => Self::Informational,
            2 => Self::Success,
            3 => Self::Redirection,
            4 => Self::ClientError,
            5 => Self::ServerError,
            _ => Self::Other,
        }
    }

    /// Display label (`2XX`, ..., `other`).
    pub fn label(self) -> &'static str {
        match self {
            Self::Informational => "1XX",
            Self::Success => "2XX",
            Self::Redirection => "3XX",
            Self::ClientError => "4XX",
            Self::ServerError => "5XX",
            Self::Other => "other",
        }
    }
}

impl fmt::Display for StatusClass {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}
