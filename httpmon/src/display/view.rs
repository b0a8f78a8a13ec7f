//! Text for the status display, independent of any terminal.

use httpmon_log_pipeline::{AlertSnapshot, IntervalStats, StatsSnapshot, TransitionKind};
use serde::Serialize;

use super::ViewSettings;

/// Screen title.
pub const TITLE: &str = "HTTP Log Monitor (press q to quit)";

/// Shown until the first interval completes.
pub const WAITING_FOR_INTERVAL: &str = "Waiting for the first interval to complete...";

/// `1234567` -> `1,234,567`.
pub fn group_thousands(n: u64) -> String {
    let digits = n.to_string();
    let mut out = String::with_capacity(digits.len() + digits.len() / 3);
    for (i, ch) in digits.chars().enumerate() {
        if i > 0 && (digits.len() - i) % 3 == 0 {
            out.push(',');
        }
        out.push(ch);
    }
    out
}

/// One-line summary of what is being monitored.
pub fn settings_line(settings: &ViewSettings) -> String {
    format!(
        "Following {} | alert above {} hits/s over {}s | stats every {}s",
        settings.log_file_path,
        settings.threshold_hits_per_sec,
        settings.window_secs,
        settings.stats_interval_secs
    )
}

/// Running totals since start.
pub fn totals_lines(stats: &StatsSnapshot) -> Vec<String> {
    vec![
        format!("Total hits: {}", group_thousands(stats.total_hits)),
        format!("Total bytes: {}", group_thousands(stats.total_bytes)),
    ]
}

pub fn interval_heading(settings: &ViewSettings) -> String {
    format!("Stats from the last {} seconds", settings.stats_interval_secs)
}

/// Status classes of one interval, busiest first.
pub fn status_lines(interval: &IntervalStats) -> Vec<String> {
    let mut classes: Vec<_> = interval.status_class_counts.iter().collect();
    classes.sort_by(|a, b| b.1.cmp(a.1).then_with(|| a.0.cmp(b.0)));
    classes
        .into_iter()
        .map(|(class, count)| format!("{class}: {}", group_thousands(*count)))
        .collect()
}

/// The `n` busiest sections of one interval.
pub fn section_lines(interval: &IntervalStats, n: usize) -> Vec<String> {
    interval
        .top_sections(n)
        .into_iter()
        .map(|s| {
            format!(
                "/{}  hits: {}  bytes: {}",
                s.section,
                group_thousands(s.hits),
                group_thousands(s.bytes)
            )
        })
        .collect()
}

/// "There has been 1 alert since monitoring started" and friends.
pub fn alert_headline(alert: &AlertSnapshot) -> String {
    match alert.alert_count {
        1 => "There has been 1 alert since monitoring started".to_owned(),
        n => format!("There have been {n} alerts since monitoring started"),
    }
}

pub fn transition_label(kind: TransitionKind) -> &'static str {
    match kind {
        TransitionKind::Alert => "ALERT",
        TransitionKind::Recovered => "RECOVERED",
    }
}

/// Full text block for a completed interval, used by the headless renderer.
pub fn interval_report(stats: &StatsSnapshot, settings: &ViewSettings) -> Vec<String> {
    let mut lines = totals_lines(stats);
    let Some(interval) = &stats.last_interval else {
        lines.push(WAITING_FOR_INTERVAL.to_owned());
        return lines;
    };

    lines.push(format!(
        "{}: {} hits, {} bytes",
        interval_heading(settings),
        group_thousands(interval.hits),
        group_thousands(interval.bytes)
    ));
    if interval.is_empty() {
        lines.push("  no traffic".to_owned());
        return lines;
    }
    lines.extend(status_lines(interval).into_iter().map(|l| format!("  {l}")));
    lines.extend(
        section_lines(interval, settings.top_sections)
            .into_iter()
            .map(|l| format!("  {l}")),
    );
    lines
}

/// Machine-readable form of a completed interval.
#[derive(Debug, Serialize)]
pub struct IntervalRecord {
    pub total_hits: u64,
    pub total_bytes: u64,
    pub intervals_completed: u64,
    pub interval_hits: u64,
    pub interval_bytes: u64,
    pub status_classes: Vec<(String, u64)>,
    pub top_sections: Vec<httpmon_log_pipeline::SectionStat>,
    pub alert_count: u64,
    pub is_alerted: bool,
}

impl IntervalRecord {
    /// Builds the record; `None` until an interval has completed.
    pub fn from_snapshots(
        stats: &StatsSnapshot,
        alert: &AlertSnapshot,
        top_sections: usize,
    ) -> Option<Self> {
        let interval = stats.last_interval.as_ref()?;
        Some(Self {
            total_hits: stats.total_hits,
            total_bytes: stats.total_bytes,
            intervals_completed: stats.intervals_completed,
            interval_hits: interval.hits,
            interval_bytes: interval.bytes,
            status_classes: interval
                .status_class_counts
                .iter()
                .map(|(class, count)| (class.label().to_owned(), *count))
                .collect(),
            top_sections: interval.top_sections(top_sections),
            alert_count: alert.alert_count,
            is_alerted: alert.is_alerted,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::BTreeMap;
    use std::time::Duration;

    use httpmon_core::event::StatusClass;

    fn settings() -> ViewSettings {
        ViewSettings {
            log_file_path: "/tmp/access.log".to_owned(),
            threshold_hits_per_sec: 10,
            window_secs: 120,
            stats_interval_secs: 10,
            top_sections: 2,
            refresh_interval: Duration::from_millis(250),
        }
    }

    fn interval() -> IntervalStats {
        IntervalStats {
            hits: 6,
            bytes: 4_600,
            section_counts: BTreeMap::from([
                ("api".to_owned(), 3),
                ("report".to_owned(), 1),
                ("user".to_owned(), 2),
            ]),
            section_bytes: BTreeMap::from([
                ("api".to_owned(), 3_000),
                ("report".to_owned(), 100),
                ("user".to_owned(), 1_500),
            ]),
            status_class_counts: BTreeMap::from([
                (StatusClass::Success, 4),
                (StatusClass::ServerError, 2),
            ]),
            duration_secs: 10,
        }
    }

    #[test]
    fn thousands_grouping() {
        assert_eq!(group_thousands(0), "0");
        assert_eq!(group_thousands(999), "999");
        assert_eq!(group_thousands(1_000), "1,000");
        assert_eq!(group_thousands(1_234_567), "1,234,567");
    }

    #[test]
    fn headline_pluralizes() {
        let mut alert = AlertSnapshot::default();
        assert_eq!(
            alert_headline(&alert),
            "There have been 0 alerts since monitoring started"
        );
        alert.alert_count = 1;
        assert_eq!(
            alert_headline(&alert),
            "There has been 1 alert since monitoring started"
        );
    }

    #[test]
    fn status_lines_busiest_first() {
        assert_eq!(status_lines(&interval()), vec!["2XX: 4", "5XX: 2"]);
    }

    #[test]
    fn section_lines_limit_and_order() {
        assert_eq!(
            section_lines(&interval(), 2),
            vec!["/api  hits: 3  bytes: 3,000", "/user  hits: 2  bytes: 1,500"]
        );
    }

    #[test]
    fn report_before_first_interval() {
        let lines = interval_report(&StatsSnapshot::default(), &settings());
        assert_eq!(lines.last().unwrap(), WAITING_FOR_INTERVAL);
    }

    #[test]
    fn report_for_completed_interval() {
        let stats = StatsSnapshot {
            total_hits: 1_006,
            total_bytes: 54_600,
            intervals_completed: 3,
            last_interval: Some(interval()),
        };
        let lines = interval_report(&stats, &settings());
        assert_eq!(lines[0], "Total hits: 1,006");
        assert_eq!(lines[2], "Stats from the last 10 seconds: 6 hits, 4,600 bytes");
        assert!(lines.contains(&"  5XX: 2".to_owned()));
        assert!(lines.contains(&"  /api  hits: 3  bytes: 3,000".to_owned()));
        assert!(!lines.iter().any(|l| l.contains("/report")));
    }

    #[test]
    fn report_for_quiet_interval() {
        let stats = StatsSnapshot {
            intervals_completed: 1,
            last_interval: Some(IntervalStats::default()),
            ..StatsSnapshot::default()
        };
        let lines = interval_report(&stats, &settings());
        assert_eq!(lines.last().unwrap(), "  no traffic");
    }

    #[test]
    fn record_uses_status_labels() {
        let stats = StatsSnapshot {
            total_hits: 6,
            total_bytes: 4_600,
            intervals_completed: 1,
            last_interval: Some(interval()),
        };
        let quiet = AlertSnapshot::default();
        assert!(IntervalRecord::from_snapshots(&StatsSnapshot::default(), &quiet, 2).is_none());

        let record = IntervalRecord::from_snapshots(&stats, &quiet, 1).unwrap();
        let json = serde_json::to_value(&record).unwrap();
        assert_eq!(json["status_classes"][0][0], "2XX");
        assert_eq!(json["top_sections"][0]["section"], "api");
        assert_eq!(json["top_sections"].as_array().unwrap().len(), 1);
        assert_eq!(json["is_alerted"], false);
    }
}
