//! Pipeline wiring -- tailer, alert engine and stats engine as one unit.
//!
//! [`MonitorPipeline`] implements the core
//! [`Pipeline`](httpmon_core::pipeline::Pipeline) trait so the supervisor can
//! drive it through `start` / `stop` / `health_check`.
//!
//! # Topology
//! ```text
//!               +--> mpsc --> AlertEngine --> SnapshotCell<AlertSnapshot>
//! FileTailer ---+
//!               +--> mpsc --> StatsEngine --> SnapshotCell<StatsSnapshot>
//! ```
//!
//! Each consumer gets its own bounded channel and its own copy of every event.

use std::sync::Arc;

use httpmon_core::error::{HttpmonError, PipelineError};
use httpmon_core::pipeline::{HealthStatus, Pipeline, PipelineControl};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio::time::Instant;
use tracing::{error, info};

use crate::alert::{AlertEngine, AlertSnapshot, AlertWindow};
use crate::collector::{FileTailer, TailerSummary};
use crate::config::PipelineConfig;
use crate::error::LogPipelineError;
use crate::snapshot::SnapshotCell;
use crate::stats::{StatsEngine, StatsSnapshot, StatsWindow};

/// Lifecycle state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum PipelineState {
    Initialized,
    Running,
    Stopped,
}

struct RunningUnits {
    tailer: JoinHandle<TailerSummary>,
    alert: JoinHandle<AlertSnapshot>,
    stats: JoinHandle<StatsSnapshot>,
}

/// The running monitor: one tailer feeding two consumers.
///
/// # Example
/// ```ignore
/// use httpmon_log_pipeline::{MonitorPipeline, MonitorPipelineBuilder};
///
/// let mut pipeline = MonitorPipelineBuilder::new().config(config).build()?;
/// pipeline.start().await?;
/// let alerts = pipeline.alert_snapshot();
/// pipeline.stop().await?;
/// ```
pub struct MonitorPipeline {
    config: PipelineConfig,
    state: PipelineState,
    control: PipelineControl,
    alert_snapshot: SnapshotCell<AlertSnapshot>,
    stats_snapshot: SnapshotCell<StatsSnapshot>,
    units: Option<RunningUnits>,
    tailer_summary: Option<TailerSummary>,
}

impl MonitorPipeline {
    /// Current state as a string.
    pub fn state_name(&self) -> &'static str {
        match self.state {
            PipelineState::Initialized => "initialized",
            PipelineState::Running => "running",
            PipelineState::Stopped => "stopped",
        }
    }

    /// Pipeline settings.
    pub fn config(&self) -> &PipelineConfig {
        &self.config
    }

    /// Shutdown signal shared by every unit.
    pub fn control(&self) -> PipelineControl {
        self.control.clone()
    }

    /// Latest published alert state.
    pub fn alert_snapshot(&self) -> Arc<AlertSnapshot> {
        self.alert_snapshot.load()
    }

    /// Latest published statistics.
    pub fn stats_snapshot(&self) -> Arc<StatsSnapshot> {
        self.stats_snapshot.load()
    }

    /// Handle to the alert snapshot, for readers outliving a borrow of the pipeline.
    pub fn alert_cell(&self) -> SnapshotCell<AlertSnapshot> {
        self.alert_snapshot.clone()
    }

    /// Handle to the stats snapshot.
    pub fn stats_cell(&self) -> SnapshotCell<StatsSnapshot> {
        self.stats_snapshot.clone()
    }

    /// Tailer counters, available once the pipeline has stopped.
    pub fn tailer_summary(&self) -> Option<TailerSummary> {
        self.tailer_summary
    }
}

impl Pipeline for MonitorPipeline {
    async fn start(&mut self) -> Result<(), HttpmonError> {
        match self.state {
            PipelineState::Running => return Err(PipelineError::AlreadyRunning.into()),
            // the control cannot be reset once signaled
            PipelineState::Stopped => {
                return Err(PipelineError::InitFailed(
                    "a stopped pipeline cannot be restarted".to_owned(),
                )
                .into());
            }
            PipelineState::Initialized => {}
        }

        info!(path = %self.config.log_file_path.display(), "starting monitor pipeline");

        // opening the file is the only fatal runtime failure; nothing is
        // spawned before it succeeds
        let tailer = FileTailer::open(&self.config).await?;
        let alert_window =
            AlertWindow::new(self.config.window_secs, self.config.threshold_hits_per_sec)?;
        let stats_window = StatsWindow::new(self.config.stats_interval(), Instant::now())?;

        let (alert_tx, alert_rx) = mpsc::channel(self.config.channel_capacity);
        let (stats_tx, stats_rx) = mpsc::channel(self.config.channel_capacity);

        let alert_engine = AlertEngine::new(
            alert_window,
            alert_rx,
            self.alert_snapshot.clone(),
            self.config.warmup(),
        );
        let stats_engine = StatsEngine::new(stats_window, stats_rx, self.stats_snapshot.clone());

        self.units = Some(RunningUnits {
            alert: tokio::spawn(alert_engine.run(self.control.clone())),
            stats: tokio::spawn(stats_engine.run(self.control.clone())),
            tailer: tokio::spawn(tailer.run(vec![alert_tx, stats_tx], self.control.clone())),
        });

        self.state = PipelineState::Running;
        info!("monitor pipeline started");
        Ok(())
    }

    async fn stop(&mut self) -> Result<(), HttpmonError> {
        if self.state != PipelineState::Running {
            return Err(PipelineError::NotRunning.into());
        }

        info!("stopping monitor pipeline");
        self.control.signal();
        self.state = PipelineState::Stopped;

        let Some(units) = self.units.take() else {
            return Ok(());
        };

        // join every unit even if an earlier one failed
        let mut failures = Vec::new();

        match units.tailer.await {
            Ok(summary) => self.tailer_summary = Some(summary),
            Err(e) => {
                error!(unit = "tailer", error = %e, "unit ended abnormally");
                failures.push(format!("tailer: {e}"));
            }
        }
        match units.alert.await {
            Ok(last) => info!(alert_count = last.alert_count, "alert engine joined"),
            Err(e) => {
                error!(unit = "alert_engine", error = %e, "unit ended abnormally");
                failures.push(format!("alert engine: {e}"));
            }
        }
        match units.stats.await {
            Ok(last) => info!(total_hits = last.total_hits, "stats engine joined"),
            Err(e) => {
                error!(unit = "stats_engine", error = %e, "unit ended abnormally");
                failures.push(format!("stats engine: {e}"));
            }
        }

        if !failures.is_empty() {
            return Err(PipelineError::UnitFailed(failures.join("; ")).into());
        }

        info!("monitor pipeline stopped");
        Ok(())
    }

    async fn health_check(&self) -> HealthStatus {
        match (self.state, &self.units) {
            (PipelineState::Running, Some(units)) => {
                let exited: Vec<&str> = [
                    ("tailer", units.tailer.is_finished()),
                    ("alert engine", units.alert.is_finished()),
                    ("stats engine", units.stats.is_finished()),
                ]
                .into_iter()
                .filter_map(|(name, finished)| finished.then_some(name))
                .collect();

                if exited.is_empty() {
                    HealthStatus::Healthy
                } else {
                    HealthStatus::Degraded(format!("exited early: {}", exited.join(", ")))
                }
            }
            (PipelineState::Running, None) => HealthStatus::Degraded("no units".to_owned()),
            (PipelineState::Initialized, _) => HealthStatus::Unhealthy("not started".to_owned()),
            (PipelineState::Stopped, _) => HealthStatus::Unhealthy("stopped".to_owned()),
        }
    }
}

/// Monitor pipeline builder.
#[derive(Default)]
pub struct MonitorPipelineBuilder {
    config: PipelineConfig,
    control: Option<PipelineControl>,
}

impl MonitorPipelineBuilder {
    /// Creates a builder with default settings.
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the pipeline settings.
    pub fn config(mut self, config: PipelineConfig) -> Self {
        self.config = config;
        self
    }

    /// Uses an existing shutdown signal instead of creating one.
    pub fn control(mut self, control: PipelineControl) -> Self {
        self.control = Some(control);
        self
    }

    /// Validates the settings and builds the pipeline.
    pub fn build(self) -> Result<MonitorPipeline, LogPipelineError> {
        self.config.validate()?;

        Ok(MonitorPipeline {
            config: self.config,
            state: PipelineState::Initialized,
            control: self.control.unwrap_or_default(),
            alert_snapshot: SnapshotCell::default(),
            stats_snapshot: SnapshotCell::default(),
            units: None,
            tailer_summary: None,
        })
    }
}
