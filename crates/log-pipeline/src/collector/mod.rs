//! Log collection -- follows the access log and produces parsed events.
//!
//! The [`FileTailer`] runs in its own tokio task and pushes every accepted
//! [`LogEvent`](httpmon_core::event::LogEvent) to one bounded
//! `tokio::sync::mpsc` channel per consumer.

pub mod file;

pub use file::FileTailer;

/// Counters reported by the tailer when its loop exits.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TailerSummary {
    /// Complete lines read after the initial end-of-file position.
    pub lines_read: u64,
    /// Events delivered to the consumers.
    pub events_emitted: u64,
    /// Lines the parser rejected.
    pub lines_rejected: u64,
    /// Lines discarded for exceeding the maximum length.
    pub oversized_lines: u64,
}
