//! Metric names and descriptions.
//!
//! Every Prometheus metric httpmon emits is named here. Call sites use these
//! constants with `metrics::counter!()` / `metrics::gauge!()`.
//!
//! # Naming
//!
//! - prefix: `httpmon_`
//! - unit: `tailer_`, `alert_`, `stats_`, `process_`
//! - suffix: `_total` for counters, none for gauges
//!
//! ```ignore
//! metrics::counter!(httpmon_core::metrics::TAILER_EVENTS_EMITTED_TOTAL).increment(1);
//! ```

// --- label keys ---

/// Status class label key (`1XX`..`5XX`, `other`)
pub const LABEL_STATUS_CLASS: &str = "status_class";

/// Transition kind label key (`alert`, `recovered`)
pub const LABEL_TRANSITION: &str = "transition";

// --- tailer ---

/// Tailer: complete lines read from the log file (counter)
pub const TAILER_LINES_READ_TOTAL: &str = "httpmon_tailer_lines_read_total";

/// Tailer: lines rejected by the parser (counter)
pub const TAILER_LINES_REJECTED_TOTAL: &str = "httpmon_tailer_lines_rejected_total";

/// Tailer: parsed events delivered to the consumers (counter)
pub const TAILER_EVENTS_EMITTED_TOTAL: &str = "httpmon_tailer_events_emitted_total";

/// Tailer: partial lines discarded for exceeding the length limit (counter)
pub const TAILER_OVERSIZED_LINES_TOTAL: &str = "httpmon_tailer_oversized_lines_total";

/// Tailer: transient read failures (counter)
pub const TAILER_READ_ERRORS_TOTAL: &str = "httpmon_tailer_read_errors_total";

// --- alert engine ---

/// Alert engine: timestamps currently retained in the sliding window (gauge)
pub const ALERT_WINDOW_HITS: &str = "httpmon_alert_window_hits";

/// Alert engine: 1 while alerting, 0 otherwise (gauge)
pub const ALERT_ACTIVE: &str = "httpmon_alert_active";

/// Alert engine: state transitions (counter, label: transition)
pub const ALERT_TRANSITIONS_TOTAL: &str = "httpmon_alert_transitions_total";

// --- stats engine ---

/// Stats engine: hits since start (gauge)
pub const STATS_TOTAL_HITS: &str = "httpmon_stats_total_hits";

/// Stats engine: bytes since start (gauge)
pub const STATS_TOTAL_BYTES: &str = "httpmon_stats_total_bytes";

/// Stats engine: completed intervals (counter)
pub const STATS_INTERVALS_COMPLETED_TOTAL: &str = "httpmon_stats_intervals_completed_total";

/// Stats engine: hits per status class in the last interval (gauge, label: status_class)
pub const STATS_INTERVAL_STATUS_HITS: &str = "httpmon_stats_interval_status_hits";

// --- process ---

/// Process: build information (gauge, always 1, label: version)
pub const PROCESS_BUILD_INFO: &str = "httpmon_process_build_info";

/// Registers HELP text for every metric.
///
/// Call once after the global recorder is installed.
pub fn describe_all() {
    use metrics::{describe_counter, describe_gauge};

    describe_counter!(
        TAILER_LINES_READ_TOTAL,
        "Complete lines read from the followed access log"
    );
    describe_counter!(
        TAILER_LINES_REJECTED_TOTAL,
        "Lines dropped because they are not valid access-log records"
    );
    describe_counter!(
        TAILER_EVENTS_EMITTED_TOTAL,
        "Parsed events delivered to the alert and stats engines"
    );
    describe_counter!(
        TAILER_OVERSIZED_LINES_TOTAL,
        "Partial lines discarded for exceeding the maximum line length"
    );
    describe_counter!(
        TAILER_READ_ERRORS_TOTAL,
        "Transient read errors on the followed access log"
    );

    describe_gauge!(
        ALERT_WINDOW_HITS,
        "Hits retained in the alert sliding window"
    );
    describe_gauge!(ALERT_ACTIVE, "1 while the high-traffic alert is active");
    describe_counter!(
        ALERT_TRANSITIONS_TOTAL,
        "Alert state transitions by kind (alert, recovered)"
    );

    describe_gauge!(STATS_TOTAL_HITS, "Hits observed since monitoring started");
    describe_gauge!(STATS_TOTAL_BYTES, "Bytes served since monitoring started");
    describe_counter!(
        STATS_INTERVALS_COMPLETED_TOTAL,
        "Completed statistics intervals"
    );
    describe_gauge!(
        STATS_INTERVAL_STATUS_HITS,
        "Hits per status class in the last completed interval"
    );

    describe_gauge!(PROCESS_BUILD_INFO, "Build information (always 1)");
}
