//! Fixed-interval traffic statistics.
//!
//! [`StatsWindow`] accumulates every event into running totals and into the
//! current interval. When an interval's wall-clock length has elapsed, the
//! current accumulators become the published "last interval" and start over.
//! [`StatsEngine`] is the consumer task around it.
//!
//! The boundary is checked whenever a batch of events has been drained, not
//! on a separate timer, so a quiet log keeps showing its last busy interval.

use std::collections::BTreeMap;

use httpmon_core::event::{LogEvent, StatusClass};
use httpmon_core::metrics as m;
use httpmon_core::pipeline::PipelineControl;
use serde::Serialize;
use tokio::sync::mpsc;
use tokio::time::{Duration, Instant};
use tracing::{debug, info};

use crate::error::LogPipelineError;
use crate::snapshot::SnapshotCell;

/// Hits and bytes for one section.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SectionStat {
    /// Section name
    pub section: String,
    /// Requests
    pub hits: u64,
    /// Bytes served
    pub bytes: u64,
}

/// Aggregates for one interval.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct IntervalStats {
    /// Requests in the interval.
    pub hits: u64,
    /// Bytes served in the interval.
    pub bytes: u64,
    /// Requests per section.
    pub section_counts: BTreeMap<String, u64>,
    /// Bytes per section.
    pub section_bytes: BTreeMap<String, u64>,
    /// Requests per status class.
    pub status_class_counts: BTreeMap<StatusClass, u64>,
    /// Wall-clock length of the interval, in whole seconds.
    pub duration_secs: u64,
}

impl IntervalStats {
    fn record(&mut self, event: &LogEvent) {
        self.hits += 1;
        self.bytes = self.bytes.saturating_add(event.size_bytes);
        *self.section_counts.entry(event.section.clone()).or_default() += 1;
        let section_bytes = self.section_bytes.entry(event.section.clone()).or_default();
        *section_bytes = section_bytes.saturating_add(event.size_bytes);
        *self
            .status_class_counts
            .entry(event.status_class())
            .or_default() += 1;
    }

    /// Whether no event was recorded.
    pub fn is_empty(&self) -> bool {
        self.hits == 0
    }

    /// Requests with the given status class.
    pub fn status_hits(&self, class: StatusClass) -> u64 {
        self.status_class_counts.get(&class).copied().unwrap_or(0)
    }

    /// The `n` busiest sections, by hits descending then name ascending.
    pub fn top_sections(&self, n: usize) -> Vec<SectionStat> {
        let mut sections: Vec<SectionStat> = self
            .section_counts
            .iter()
            .map(|(section, &hits)| SectionStat {
                section: section.clone(),
                hits,
                bytes: self.section_bytes.get(section).copied().unwrap_or(0),
            })
            .collect();
        sections.sort_by(|a, b| b.hits.cmp(&a.hits).then_with(|| a.section.cmp(&b.section)));
        sections.truncate(n);
        sections
    }
}

/// Read-only view of the statistics, published for the renderer.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct StatsSnapshot {
    /// Requests since start.
    pub total_hits: u64,
    /// Bytes since start.
    pub total_bytes: u64,
    /// Completed intervals since start.
    pub intervals_completed: u64,
    /// The most recently completed interval.
    pub last_interval: Option<IntervalStats>,
}

/// Interval aggregator.
#[derive(Debug)]
pub struct StatsWindow {
    interval: Duration,
    interval_start: Instant,
    current: IntervalStats,
    last: Option<IntervalStats>,
    total_hits: u64,
    total_bytes: u64,
    intervals_completed: u64,
}

impl StatsWindow {
    /// Creates an aggregator whose first interval starts at `now`.
    pub fn new(interval: Duration, now: Instant) -> Result<Self, LogPipelineError> {
        if interval.is_zero() {
            return Err(LogPipelineError::Config {
                field: "stats_interval_secs".to_owned(),
                reason: "must be greater than 0".to_owned(),
            });
        }
        Ok(Self {
            interval,
            interval_start: now,
            current: IntervalStats::default(),
            last: None,
            total_hits: 0,
            total_bytes: 0,
            intervals_completed: 0,
        })
    }

    /// Adds an event to the running totals and the current interval.
    ///
    /// Byte counters saturate at `u64::MAX`.
    pub fn record(&mut self, event: &LogEvent) {
        self.total_hits += 1;
        self.total_bytes = self.total_bytes.saturating_add(event.size_bytes);
        self.current.record(event);
    }

    /// Closes the current interval if at least one interval length has
    /// elapsed since it started. Returns whether it did.
    pub fn roll_if_due(&mut self, now: Instant) -> bool {
        if now.saturating_duration_since(self.interval_start) < self.interval {
            return false;
        }
        self.roll(now);
        true
    }

    /// Closes the current interval unconditionally and starts the next at `now`.
    pub fn roll(&mut self, now: Instant) {
        let mut closed = std::mem::take(&mut self.current);
        closed.duration_secs = now.saturating_duration_since(self.interval_start).as_secs();
        self.last = Some(closed);
        self.interval_start = now;
        self.intervals_completed += 1;
    }

    /// The interval being accumulated.
    pub fn current(&self) -> &IntervalStats {
        &self.current
    }

    /// The most recently completed interval.
    pub fn last_interval(&self) -> Option<&IntervalStats> {
        self.last.as_ref()
    }

    /// Copies the published state.
    pub fn snapshot(&self) -> StatsSnapshot {
        StatsSnapshot {
            total_hits: self.total_hits,
            total_bytes: self.total_bytes,
            intervals_completed: self.intervals_completed,
            last_interval: self.last.clone(),
        }
    }
}

/// Consumer task driving a [`StatsWindow`] from the tailer's channel.
pub struct StatsEngine {
    window: StatsWindow,
    rx: mpsc::Receiver<LogEvent>,
    snapshot: SnapshotCell<StatsSnapshot>,
}

impl StatsEngine {
    /// Creates the engine.
    pub fn new(
        window: StatsWindow,
        rx: mpsc::Receiver<LogEvent>,
        snapshot: SnapshotCell<StatsSnapshot>,
    ) -> Self {
        Self {
            window,
            rx,
            snapshot,
        }
    }

    /// Consumes events until `control` is signaled or the channel closes.
    ///
    /// Returns the final state.
    pub async fn run(mut self, control: PipelineControl) -> StatsSnapshot {
        info!(
            interval_secs = self.window.interval.as_secs(),
            "stats engine started"
        );

        loop {
            if control.is_signaled() {
                break;
            }

            let event = tokio::select! {
                received = self.rx.recv() => match received {
                    Some(event) => event,
                    None => {
                        info!("event channel closed, stopping stats engine");
                        break;
                    }
                },
                _ = control.signaled() => {
                    debug!("stats engine received shutdown signal");
                    break;
                }
            };

            self.record_batch(event);

            if self.window.roll_if_due(Instant::now()) {
                self.report_interval();
            }
            self.publish();
        }

        let last = self.window.snapshot();
        self.snapshot.store(last.clone());
        info!(
            total_hits = last.total_hits,
            total_bytes = last.total_bytes,
            "stats engine stopped"
        );
        last
    }

    /// Records `first` plus whatever is already queued, at most one channel's
    /// worth in total. Returns how many events were recorded.
    fn record_batch(&mut self, first: LogEvent) -> usize {
        self.window.record(&first);
        let mut recorded = 1;
        while recorded < self.rx.max_capacity() {
            let Ok(event) = self.rx.try_recv() else {
                break;
            };
            self.window.record(&event);
            recorded += 1;
        }
        recorded
    }

    fn report_interval(&self) {
        metrics::counter!(m::STATS_INTERVALS_COMPLETED_TOTAL).increment(1);
        let Some(interval) = self.window.last_interval() else {
            return;
        };
        for (class, count) in &interval.status_class_counts {
            metrics::gauge!(m::STATS_INTERVAL_STATUS_HITS, m::LABEL_STATUS_CLASS => class.label())
                .set(*count as f64);
        }
        debug!(
            hits = interval.hits,
            bytes = interval.bytes,
            sections = interval.section_counts.len(),
            duration_secs = interval.duration_secs,
            "stats interval completed"
        );
    }

    fn publish(&self) {
        let snapshot = self.window.snapshot();
        metrics::gauge!(m::STATS_TOTAL_HITS).set(snapshot.total_hits as f64);
        metrics::gauge!(m::STATS_TOTAL_BYTES).set(snapshot.total_bytes as f64);
        self.snapshot.store(snapshot);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn event(section: &str, status_code: u16, size_bytes: u64) -> LogEvent {
        LogEvent {
            client: "10.0.0.1".to_owned(),
            user_id: "apache".to_owned(),
            timestamp: 1_549_573_860,
            method: "GET".to_owned(),
            section: section.to_owned(),
            status_code,
            size_bytes,
        }
    }

    fn window(start: Instant) -> StatsWindow {
        StatsWindow::new(Duration::from_secs(10), start).unwrap()
    }

    #[test]
    fn zero_interval_is_rejected() {
        assert!(StatsWindow::new(Duration::ZERO, Instant::now()).is_err());
    }

    #[test]
    fn events_accumulate_within_one_interval() {
        let start = Instant::now();
        let mut w = window(start);
        w.record(&event("api", 200, 100));
        w.record(&event("api", 404, 50));
        w.record(&event("report", 500, 10));

        assert!(!w.roll_if_due(start + Duration::from_secs(9)));
        assert_eq!(w.current().hits, 3);
        assert_eq!(w.current().section_counts["api"], 2);
        assert_eq!(w.current().section_bytes["api"], 150);
        assert!(w.last_interval().is_none());
        assert_eq!(w.snapshot().total_hits, 3);
    }

    #[test]
    fn crossing_the_boundary_publishes_and_resets() {
        let start = Instant::now();
        let mut w = window(start);
        w.record(&event("api", 200, 100));
        w.record(&event("api", 201, 100));
        w.record(&event("report", 503, 7));

        assert!(w.roll_if_due(start + Duration::from_secs(10)));

        let snapshot = w.snapshot();
        let last = snapshot.last_interval.unwrap();
        assert_eq!(last.hits, 3);
        assert_eq!(last.bytes, 207);
        assert_eq!(last.status_hits(StatusClass::Success), 2);
        assert_eq!(last.status_hits(StatusClass::ServerError), 1);
        assert_eq!(last.status_hits(StatusClass::ClientError), 0);
        assert_eq!(last.duration_secs, 10);
        assert!(w.current().is_empty());
        assert_eq!(snapshot.intervals_completed, 1);
    }

    #[test]
    fn totals_span_intervals() {
        let start = Instant::now();
        let mut w = window(start);
        w.record(&event("api", 200, 100));
        w.roll(start + Duration::from_secs(10));
        w.record(&event("user", 200, 5));
        w.record(&event("user", 200, 5));
        w.roll(start + Duration::from_secs(21));

        let snapshot = w.snapshot();
        assert_eq!(snapshot.total_hits, 3);
        assert_eq!(snapshot.total_bytes, 110);
        let last = snapshot.last_interval.unwrap();
        assert_eq!(last.hits, 2);
        assert_eq!(last.duration_secs, 11);
        assert!(!last.section_counts.contains_key("api"));
    }

    #[test]
    fn next_boundary_is_measured_from_the_roll() {
        let start = Instant::now();
        let mut w = window(start);
        assert!(w.roll_if_due(start + Duration::from_secs(15)));
        assert!(!w.roll_if_due(start + Duration::from_secs(24)));
        assert!(w.roll_if_due(start + Duration::from_secs(25)));
    }

    #[test]
    fn top_sections_orders_by_hits_then_name() {
        let start = Instant::now();
        let mut w = window(start);
        for (section, n) in [("report", 2), ("api", 3), ("user", 2), ("help", 1)] {
            for _ in 0..n {
                w.record(&event(section, 200, 10));
            }
        }

        let top = w.current().top_sections(2);
        assert_eq!(
            top,
            vec![
                SectionStat {
                    section: "api".to_owned(),
                    hits: 3,
                    bytes: 30
                },
                SectionStat {
                    section: "report".to_owned(),
                    hits: 2,
                    bytes: 20
                },
            ]
        );
        assert_eq!(w.current().top_sections(10).len(), 4);
    }

    #[test]
    fn byte_counters_saturate_instead_of_overflowing() {
        let start = Instant::now();
        let mut w = window(start);
        w.record(&event("api", 200, u64::MAX));
        w.record(&event("api", 200, u64::MAX));

        let snapshot = w.snapshot();
        assert_eq!(snapshot.total_hits, 2);
        assert_eq!(snapshot.total_bytes, u64::MAX);
        assert_eq!(w.current().bytes, u64::MAX);
        assert_eq!(w.current().section_bytes["api"], u64::MAX);

        assert!(w.roll_if_due(start + Duration::from_secs(10)));
        w.record(&event("report", 200, 1));
        assert_eq!(w.snapshot().total_bytes, u64::MAX);
        assert_eq!(w.current().bytes, 1);
    }

    #[tokio::test]
    async fn batch_is_capped_at_channel_capacity() {
        let (tx, mut rx) = mpsc::channel(4);
        for _ in 0..4 {
            tx.send(event("api", 200, 1)).await.unwrap();
        }
        let first = rx.recv().await.unwrap();
        tx.send(event("api", 200, 1)).await.unwrap();

        let mut engine = StatsEngine::new(window(Instant::now()), rx, SnapshotCell::default());
        assert_eq!(engine.record_batch(first), 4);
        assert_eq!(engine.rx.len(), 1);
        assert_eq!(engine.window.snapshot().total_hits, 4);
    }

    #[test]
    fn unexpected_status_lands_in_other() {
        let start = Instant::now();
        let mut w = window(start);
        w.record(&event("api", 700, 1));
        assert_eq!(w.current().status_hits(StatusClass::Other), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn engine_rolls_on_drain_after_interval() {
        let (tx, rx) = mpsc::channel(64);
        let cell = SnapshotCell::default();
        let control = PipelineControl::new();
        let engine = StatsEngine::new(window(Instant::now()), rx, cell.clone());
        let handle = tokio::spawn(engine.run(control.clone()));

        tx.send(event("api", 200, 100)).await.unwrap();
        tx.send(event("user", 404, 10)).await.unwrap();
        tokio::time::timeout(Duration::from_secs(1), async {
            while cell.load().total_hits < 2 {
                tokio::task::yield_now().await;
            }
        })
        .await
        .unwrap();
        assert!(cell.load().last_interval.is_none());

        tokio::time::advance(Duration::from_secs(10)).await;
        tx.send(event("api", 200, 1)).await.unwrap();
        tokio::time::timeout(Duration::from_secs(1), async {
            while cell.load().last_interval.is_none() {
                tokio::task::yield_now().await;
            }
        })
        .await
        .unwrap();

        let snapshot = cell.load();
        let last = snapshot.last_interval.as_ref().unwrap();
        // the event that triggered the check belongs to the closed interval
        assert_eq!(last.hits, 3);
        assert_eq!(snapshot.total_hits, 3);

        control.signal();
        let final_snapshot = handle.await.unwrap();
        assert_eq!(final_snapshot.total_bytes, 111);
    }
}
