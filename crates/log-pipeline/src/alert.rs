//! High-traffic alerting over a sliding time window.
//!
//! [`AlertWindow`] is the pure state machine: it retains request timestamps
//! within the trailing window and flips between *normal* and *alerting* when
//! the average rate crosses the threshold. [`AlertEngine`] is the consumer
//! task that feeds it from the tailer's channel and publishes an
//! [`AlertSnapshot`] after every batch.
//!
//! # Rate comparison
//! The average is `retained / window_secs` hits per second. It is compared
//! without division: an alert is raised iff
//! `retained > threshold_hits_per_sec * window_secs`.

use std::collections::VecDeque;
use std::fmt;

use httpmon_core::event::LogEvent;
use httpmon_core::metrics as m;
use httpmon_core::pipeline::PipelineControl;
use serde::Serialize;
use tokio::sync::mpsc;
use tokio::time::{Duration, Instant};
use tracing::{debug, info, warn};

use crate::error::LogPipelineError;
use crate::snapshot::SnapshotCell;

const TIME_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

/// Direction of an alert state change.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum TransitionKind {
    /// Normal -> Alerting
    Alert,
    /// Alerting -> Normal
    Recovered,
}

impl TransitionKind {
    /// Lower-case label used in logs and metrics.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Alert => "alert",
            Self::Recovered => "recovered",
        }
    }
}

impl fmt::Display for TransitionKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One recorded state change.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AlertTransition {
    /// Alert or recovery.
    pub kind: TransitionKind,
    /// Hits retained in the window when the transition happened.
    pub hits: u64,
    /// Event timestamp (Unix seconds) that triggered the evaluation.
    pub timestamp: i64,
    /// Operator-facing message.
    pub message: String,
}

impl AlertTransition {
    fn new(kind: TransitionKind, hits: u64, timestamp: i64) -> Self {
        let time = format_timestamp(timestamp);
        let message = match kind {
            TransitionKind::Alert => {
                format!("High traffic generated an alert - hits = {hits}, triggered at {time}")
            }
            TransitionKind::Recovered => {
                format!("Traffic normalized - hits = {hits}, recovered at {time}")
            }
        };
        Self {
            kind,
            hits,
            timestamp,
            message,
        }
    }
}

/// Read-only view of the alert state, published for the renderer.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct AlertSnapshot {
    /// Number of alert onsets since start. Recoveries are not counted.
    pub alert_count: u64,
    /// Whether the alert is currently active.
    pub is_alerted: bool,
    /// Timestamps retained in the window at the last evaluation.
    pub window_hits: u64,
    /// Most recent transition, if any.
    pub last_transition: Option<AlertTransition>,
}

/// Sliding-window rate state machine.
///
/// Timestamps are expected in non-decreasing order, as they are when tailing a
/// single log. An out-of-order timestamp is still retained; it is evicted once
/// it falls behind the window of a later evaluation.
#[derive(Debug)]
pub struct AlertWindow {
    timestamps: VecDeque<i64>,
    window_secs: u64,
    /// `threshold_hits_per_sec * window_secs`
    max_hits: u64,
    is_alerted: bool,
    alert_count: u64,
    last_transition: Option<AlertTransition>,
}

impl AlertWindow {
    /// Creates a window in the normal state.
    ///
    /// `window_secs` must be positive; it is the rate denominator.
    pub fn new(window_secs: u64, threshold_hits_per_sec: u64) -> Result<Self, LogPipelineError> {
        if window_secs == 0 {
            return Err(LogPipelineError::Config {
                field: "window_secs".to_owned(),
                reason: "must be greater than 0".to_owned(),
            });
        }
        let max_hits = threshold_hits_per_sec
            .checked_mul(window_secs)
            .ok_or_else(|| LogPipelineError::Config {
                field: "threshold_hits_per_sec".to_owned(),
                reason: "threshold * window overflows".to_owned(),
            })?;

        Ok(Self {
            timestamps: VecDeque::new(),
            window_secs,
            max_hits,
            is_alerted: false,
            alert_count: 0,
            last_transition: None,
        })
    }

    /// Retains `timestamp` and evicts everything older than the window ending
    /// at it. Does not evaluate transitions.
    pub fn record(&mut self, timestamp: i64) {
        self.timestamps.push_back(timestamp);
        self.evict(timestamp);
    }

    /// Evaluates the state machine at `now`.
    ///
    /// Returns the transition, if one happened. Calling it again at the same
    /// `now` without new timestamps never changes state.
    pub fn evaluate(&mut self, now: i64) -> Option<AlertTransition> {
        self.evict(now);

        let hits = self.window_hits();
        let breached = hits > self.max_hits;

        let kind = match (self.is_alerted, breached) {
            (false, true) => {
                self.alert_count += 1;
                TransitionKind::Alert
            }
            (true, false) => TransitionKind::Recovered,
            _ => return None,
        };

        self.is_alerted = breached;
        let transition = AlertTransition::new(kind, hits, now);
        self.last_transition = Some(transition.clone());
        Some(transition)
    }

    /// Records `timestamp` and evaluates at it.
    pub fn observe(&mut self, timestamp: i64) -> Option<AlertTransition> {
        self.record(timestamp);
        self.evaluate(timestamp)
    }

    /// Timestamps currently retained.
    pub fn window_hits(&self) -> u64 {
        self.timestamps.len() as u64
    }

    /// Whether the alert is active.
    pub fn is_alerted(&self) -> bool {
        self.is_alerted
    }

    /// Alert onsets so far.
    pub fn alert_count(&self) -> u64 {
        self.alert_count
    }

    /// Copies the current state.
    pub fn snapshot(&self) -> AlertSnapshot {
        AlertSnapshot {
            alert_count: self.alert_count,
            is_alerted: self.is_alerted,
            window_hits: self.window_hits(),
            last_transition: self.last_transition.clone(),
        }
    }

    /// Keeps timestamps `>= now - window_secs`.
    fn evict(&mut self, now: i64) {
        let cutoff = now.saturating_sub_unsigned(self.window_secs);
        while self.timestamps.front().is_some_and(|&ts| ts < cutoff) {
            self.timestamps.pop_front();
        }
    }
}

/// Consumer task driving an [`AlertWindow`] from the tailer's channel.
pub struct AlertEngine {
    window: AlertWindow,
    rx: mpsc::Receiver<LogEvent>,
    snapshot: SnapshotCell<AlertSnapshot>,
    warmup: Duration,
}

impl AlertEngine {
    /// Creates the engine. Transitions are not evaluated until `warmup` of
    /// wall-clock time has passed since [`run`](Self::run) started.
    pub fn new(
        window: AlertWindow,
        rx: mpsc::Receiver<LogEvent>,
        snapshot: SnapshotCell<AlertSnapshot>,
        warmup: Duration,
    ) -> Self {
        Self {
            window,
            rx,
            snapshot,
            warmup,
        }
    }

    /// Consumes events until `control` is signaled or the channel closes.
    ///
    /// Returns the final state.
    pub async fn run(mut self, control: PipelineControl) -> AlertSnapshot {
        let started = Instant::now();
        info!(
            window_secs = self.window.window_secs,
            max_hits = self.window.max_hits,
            warmup_secs = self.warmup.as_secs(),
            "alert engine started"
        );

        loop {
            if control.is_signaled() {
                break;
            }

            let event = tokio::select! {
                received = self.rx.recv() => match received {
                    Some(event) => event,
                    None => {
                        info!("event channel closed, stopping alert engine");
                        break;
                    }
                },
                _ = control.signaled() => {
                    debug!("alert engine received shutdown signal");
                    break;
                }
            };

            let evaluating = started.elapsed() >= self.warmup;
            self.admit_batch(event, evaluating);

            self.publish();
        }

        let last = self.window.snapshot();
        self.snapshot.store(last.clone());
        info!(alert_count = last.alert_count, "alert engine stopped");
        last
    }

    /// Admits `first` plus whatever is already queued, at most one channel's
    /// worth in total. Returns how many events were admitted.
    fn admit_batch(&mut self, first: LogEvent, evaluating: bool) -> usize {
        self.admit(first.timestamp, evaluating);
        let mut admitted = 1;
        while admitted < self.rx.max_capacity() {
            let Ok(event) = self.rx.try_recv() else {
                break;
            };
            self.admit(event.timestamp, evaluating);
            admitted += 1;
        }
        admitted
    }

    fn admit(&mut self, timestamp: i64, evaluating: bool) {
        if !evaluating {
            self.window.record(timestamp);
            return;
        }

        if let Some(transition) = self.window.observe(timestamp) {
            metrics::counter!(m::ALERT_TRANSITIONS_TOTAL, m::LABEL_TRANSITION => transition.kind.as_str())
                .increment(1);
            match transition.kind {
                TransitionKind::Alert => warn!(
                    hits = transition.hits,
                    timestamp = transition.timestamp,
                    alert_count = self.window.alert_count(),
                    "{}",
                    transition.message
                ),
                TransitionKind::Recovered => info!(
                    hits = transition.hits,
                    timestamp = transition.timestamp,
                    "{}",
                    transition.message
                ),
            }
        }
    }

    fn publish(&self) {
        let snapshot = self.window.snapshot();
        metrics::gauge!(m::ALERT_WINDOW_HITS).set(snapshot.window_hits as f64);
        metrics::gauge!(m::ALERT_ACTIVE).set(if snapshot.is_alerted { 1.0 } else { 0.0 });
        self.snapshot.store(snapshot);
    }
}

fn format_timestamp(timestamp: i64) -> String {
    chrono::DateTime::from_timestamp(timestamp, 0)
        .map(|dt| dt.format(TIME_FORMAT).to_string())
        .unwrap_or_else(|| timestamp.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    const T: i64 = 1_549_573_860;

    fn window() -> AlertWindow {
        AlertWindow::new(6, 5).unwrap()
    }

    fn record_many(window: &mut AlertWindow, timestamp: i64, count: usize) {
        for _ in 0..count {
            window.record(timestamp);
        }
    }

    /// 3 hits at T and 7 at T+1, then 27 at T+2: alert.
    fn alerted_window() -> AlertWindow {
        let mut w = window();
        record_many(&mut w, T, 3);
        record_many(&mut w, T + 1, 7);
        assert_eq!(w.evaluate(T + 1), None);
        record_many(&mut w, T + 2, 27);
        let transition = w.evaluate(T + 2).unwrap();
        assert_eq!(transition.kind, TransitionKind::Alert);
        w
    }

    #[test]
    fn zero_window_is_rejected() {
        assert!(AlertWindow::new(0, 5).is_err());
    }

    #[test]
    fn below_threshold_does_not_alert() {
        let mut w = window();
        record_many(&mut w, T, 3);
        record_many(&mut w, T + 1, 7);

        // 10 / 6 ~= 1.67 hits/s
        assert_eq!(w.evaluate(T + 1), None);
        assert!(!w.is_alerted());
        assert_eq!(w.alert_count(), 0);
        assert_eq!(w.window_hits(), 10);
    }

    #[test]
    fn burst_triggers_alert() {
        let w = alerted_window();
        assert!(w.is_alerted());
        assert_eq!(w.alert_count(), 1);
        assert_eq!(w.window_hits(), 37);

        let snapshot = w.snapshot();
        let last = snapshot.last_transition.unwrap();
        assert_eq!(last.hits, 37);
        assert_eq!(
            last.message,
            "High traffic generated an alert - hits = 37, triggered at 2019-02-07 21:11:02"
        );
    }

    #[test]
    fn exactly_at_threshold_does_not_alert() {
        let mut w = window();
        record_many(&mut w, T, 30);
        assert_eq!(w.evaluate(T), None);
        w.record(T);
        assert_eq!(w.evaluate(T).map(|t| t.kind), Some(TransitionKind::Alert));
    }

    #[test]
    fn reevaluation_is_idempotent() {
        let mut w = alerted_window();
        assert_eq!(w.evaluate(T + 2), None);
        assert_eq!(w.evaluate(T + 2), None);
        assert_eq!(w.alert_count(), 1);
        assert!(w.is_alerted());
    }

    #[test]
    fn aging_out_the_burst_recovers() {
        let mut w = alerted_window();
        let mut push_out = T + 2;
        for _ in 0..6 {
            push_out += 1;
            w.record(push_out);
        }

        let transition = w.evaluate(push_out).unwrap();
        assert_eq!(transition.kind, TransitionKind::Recovered);
        assert_eq!(transition.hits, 6);
        assert_eq!(
            transition.message,
            "Traffic normalized - hits = 6, recovered at 2019-02-07 21:11:08"
        );
        assert!(!w.is_alerted());
        // recoveries are not counted
        assert_eq!(w.alert_count(), 1);
    }

    #[test]
    fn burst_after_recovery_alerts_again() {
        let mut w = alerted_window();
        let mut push_out = T + 2;
        for _ in 0..6 {
            push_out += 1;
            w.record(push_out);
        }
        w.evaluate(push_out);

        record_many(&mut w, push_out, 50);
        let transition = w.evaluate(push_out).unwrap();
        assert_eq!(transition.kind, TransitionKind::Alert);
        assert_eq!(w.alert_count(), 2);
        assert_eq!(w.window_hits(), 56);
    }

    #[test]
    fn observe_evaluates_on_every_timestamp() {
        let mut w = window();
        let transitions: Vec<_> = (0..31).filter_map(|_| w.observe(T)).collect();
        assert_eq!(transitions.len(), 1);
        assert_eq!(transitions[0].hits, 31);

        // one hit far in the future evicts everything else
        let recovered = w.observe(T + 100).unwrap();
        assert_eq!(recovered.kind, TransitionKind::Recovered);
        assert_eq!(recovered.hits, 1);
    }

    #[test]
    fn retained_timestamps_stay_inside_window() {
        let mut w = window();
        for ts in T..T + 20 {
            w.observe(ts);
            assert!(w.timestamps.iter().all(|&kept| kept >= ts - 6));
        }
        assert_eq!(w.window_hits(), 7);
    }

    #[test]
    fn transition_kind_serializes_lowercase() {
        assert_eq!(TransitionKind::Alert.to_string(), "alert");
        assert_eq!(TransitionKind::Recovered.as_str(), "recovered");
    }

    #[test]
    fn out_of_range_timestamp_formats_as_number() {
        assert_eq!(format_timestamp(i64::MAX), i64::MAX.to_string());
    }

    fn event_at(timestamp: i64) -> LogEvent {
        LogEvent {
            client: "10.0.0.1".to_owned(),
            user_id: "apache".to_owned(),
            timestamp,
            method: "GET".to_owned(),
            section: "api".to_owned(),
            status_code: 200,
            size_bytes: 100,
        }
    }

    #[tokio::test]
    async fn engine_publishes_transitions() {
        let (tx, rx) = mpsc::channel(64);
        let cell = SnapshotCell::default();
        let control = PipelineControl::new();
        let engine = AlertEngine::new(window(), rx, cell.clone(), Duration::ZERO);
        let handle = tokio::spawn(engine.run(control.clone()));

        for _ in 0..31 {
            tx.send(event_at(T)).await.unwrap();
        }

        tokio::time::timeout(Duration::from_secs(2), async {
            while !cell.load().is_alerted {
                tokio::task::yield_now().await;
            }
        })
        .await
        .expect("alert should be published");

        control.signal();
        let last = handle.await.unwrap();
        assert_eq!(last.alert_count, 1);
        assert_eq!(cell.load().alert_count, 1);
    }

    #[tokio::test(start_paused = true)]
    async fn engine_does_not_alert_during_warmup() {
        let (tx, rx) = mpsc::channel(64);
        let cell = SnapshotCell::default();
        let control = PipelineControl::new();
        let engine = AlertEngine::new(window(), rx, cell.clone(), Duration::from_secs(6));
        let handle = tokio::spawn(engine.run(control.clone()));

        for _ in 0..40 {
            tx.send(event_at(T)).await.unwrap();
        }
        tokio::time::timeout(Duration::from_secs(1), async {
            while cell.load().window_hits < 40 {
                tokio::task::yield_now().await;
            }
        })
        .await
        .unwrap();
        assert!(!cell.load().is_alerted, "no evaluation during warm-up");

        tokio::time::advance(Duration::from_secs(6)).await;
        tx.send(event_at(T + 1)).await.unwrap();
        tokio::time::timeout(Duration::from_secs(1), async {
            while !cell.load().is_alerted {
                tokio::task::yield_now().await;
            }
        })
        .await
        .expect("alert after warm-up");

        control.signal();
        assert_eq!(handle.await.unwrap().alert_count, 1);
    }

    #[tokio::test]
    async fn batch_is_capped_at_channel_capacity() {
        let (tx, mut rx) = mpsc::channel(4);
        for _ in 0..4 {
            tx.send(event_at(T)).await.unwrap();
        }
        let first = rx.recv().await.unwrap();
        tx.send(event_at(T)).await.unwrap();

        let mut engine = AlertEngine::new(window(), rx, SnapshotCell::default(), Duration::ZERO);
        assert_eq!(engine.admit_batch(first, true), 4);
        assert_eq!(engine.rx.len(), 1);
        assert_eq!(engine.window.window_hits(), 4);
    }

    #[tokio::test]
    async fn engine_stops_when_channel_closes() {
        let (tx, rx) = mpsc::channel(4);
        let engine = AlertEngine::new(window(), rx, SnapshotCell::default(), Duration::ZERO);
        let handle = tokio::spawn(engine.run(PipelineControl::new()));
        drop(tx);
        tokio::time::timeout(Duration::from_secs(1), handle)
            .await
            .expect("engine should exit on closed channel")
            .unwrap();
    }
}
