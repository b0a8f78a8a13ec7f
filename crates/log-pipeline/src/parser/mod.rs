//! Log parsing -- turns one raw access-log line into a [`LogEvent`](httpmon_core::event::LogEvent).
//!
//! Parsing is pure: no I/O and no state beyond the compiled pattern, so one
//! [`AccessLogParser`] can be shared by any number of callers.

pub mod access;

pub use access::AccessLogParser;
