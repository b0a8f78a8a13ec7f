//! Process supervision -- assembly, startup and ordered shutdown.
//!
//! The [`Supervisor`] owns the monitor pipeline and the shared
//! [`PipelineControl`]. It starts the pipeline before any renderer touches
//! the screen, so startup failures (missing log file, bad settings) are
//! reported on a clean terminal.
//!
//! # Shutdown
//!
//! Any of these signals the control:
//!
//! - the renderer (user pressed `q`)
//! - SIGINT / SIGTERM
//! - a pipeline unit exiting early
//!
//! The supervisor then waits for the renderer to return and joins every
//! pipeline unit through [`Pipeline::stop`].

use std::path::Path;
use std::time::Duration;

use anyhow::Result;
use tokio::task::JoinHandle;

use httpmon_core::config::HttpmonConfig;
use httpmon_core::pipeline::{HealthStatus, Pipeline, PipelineControl};
use httpmon_log_pipeline::{MonitorPipeline, MonitorPipelineBuilder, PipelineConfig};

use crate::display::{
    HeadlessRenderer, ReportFormat, Renderer, SnapshotSources, TerminalRenderer, ViewSettings,
};
use crate::metrics_server;

/// How often pipeline health is checked while running.
const HEALTH_CHECK_INTERVAL: Duration = Duration::from_secs(1);

/// Owns the pipeline and drives it from start to joined shutdown.
pub struct Supervisor {
    config: HttpmonConfig,
    pipeline: MonitorPipeline,
    control: PipelineControl,
}

impl Supervisor {
    /// Load configuration from `config_path` and build the supervisor.
    pub async fn build(config_path: &Path) -> Result<Self> {
        let config = HttpmonConfig::load(config_path)
            .await
            .map_err(|e| anyhow::anyhow!("failed to load config: {}", e))?;
        Self::build_from_config(config)
    }

    /// Build from an already-loaded configuration.
    ///
    /// Validates it, installs the metrics exporter when enabled and builds
    /// (but does not start) the pipeline.
    pub fn build_from_config(config: HttpmonConfig) -> Result<Self> {
        config
            .validate()
            .map_err(|e| anyhow::anyhow!("config validation failed: {}", e))?;

        if config.metrics.enabled {
            metrics_server::install_metrics_recorder(&config.metrics)?;
        }

        let control = PipelineControl::new();
        let pipeline = MonitorPipelineBuilder::new()
            .config(PipelineConfig::from_core(&config.monitor))
            .control(control.clone())
            .build()
            .map_err(|e| anyhow::anyhow!("failed to build monitor pipeline: {}", e))?;

        tracing::info!(
            path = %config.monitor.log_file_path,
            threshold = config.monitor.threshold_hits_per_sec,
            window_secs = config.monitor.alert_window_secs,
            stats_interval_secs = config.monitor.stats_interval_secs,
            "supervisor initialized"
        );

        Ok(Self {
            config,
            pipeline,
            control,
        })
    }

    /// The loaded configuration.
    pub fn config(&self) -> &HttpmonConfig {
        &self.config
    }

    /// Shutdown signal shared with every unit.
    pub fn control(&self) -> PipelineControl {
        self.control.clone()
    }

    /// Snapshot handles for a renderer.
    pub fn sources(&self) -> SnapshotSources {
        SnapshotSources::for_pipeline(&self.pipeline, ViewSettings::from_config(&self.config))
    }

    /// The supervised pipeline.
    pub fn pipeline(&self) -> &MonitorPipeline {
        &self.pipeline
    }

    /// Runs with the renderer selected by `display.headless`.
    pub async fn run(&mut self) -> Result<()> {
        if self.config.display.headless {
            let format: ReportFormat = self.config.display.headless_format.parse()?;
            self.run_with(HeadlessRenderer::stdout(format)).await
        } else {
            self.run_with(TerminalRenderer::new()).await
        }
    }

    /// Starts the pipeline, runs `renderer` until shutdown, then joins every
    /// unit.
    ///
    /// # Errors
    ///
    /// - The pipeline fails to start; the renderer never runs
    /// - The renderer fails; the pipeline is still stopped and joined
    /// - A unit ended abnormally
    pub async fn run_with<R: Renderer>(&mut self, mut renderer: R) -> Result<()> {
        self.pipeline
            .start()
            .await
            .map_err(|e| anyhow::anyhow!("failed to start monitor pipeline: {}", e))?;

        let signal_task = spawn_signal_listener(self.control.clone());

        let render_result = {
            let render = renderer.run(self.sources(), self.control.clone());
            tokio::pin!(render);
            let mut health_tick = tokio::time::interval(HEALTH_CHECK_INTERVAL);

            loop {
                tokio::select! {
                    result = &mut render => break result,
                    _ = health_tick.tick() => {
                        if let HealthStatus::Degraded(reason) = self.pipeline.health_check().await {
                            tracing::error!(reason = %reason, "pipeline degraded, shutting down");
                            self.control.signal();
                        }
                    }
                }
            }
        };

        if let Err(e) = &render_result {
            tracing::error!(error = %e, "renderer failed");
        }

        self.control.signal();
        signal_task.abort();

        let stop_result = self.pipeline.stop().await;
        if let Some(summary) = self.pipeline.tailer_summary() {
            tracing::info!(
                lines_read = summary.lines_read,
                events_emitted = summary.events_emitted,
                lines_rejected = summary.lines_rejected,
                oversized_lines = summary.oversized_lines,
                "tailer summary"
            );
        }

        render_result?;
        stop_result.map_err(|e| anyhow::anyhow!("pipeline shutdown failed: {}", e))?;

        tracing::info!("httpmon shut down");
        Ok(())
    }
}

/// Signals `control` on SIGINT or SIGTERM.
fn spawn_signal_listener(control: PipelineControl) -> JoinHandle<()> {
    tokio::spawn(async move {
        tokio::select! {
            result = wait_for_shutdown_signal() => match result {
                Ok(signal) => {
                    tracing::info!(signal = signal, "shutdown signal received");
                    control.signal();
                }
                Err(e) => tracing::warn!(error = %e, "signal handlers unavailable"),
            },
            _ = control.signaled() => {}
        }
    })
}

/// Wait for a shutdown signal (SIGTERM or SIGINT).
///
/// Returns the name of the signal that triggered the shutdown.
#[cfg(unix)]
async fn wait_for_shutdown_signal() -> Result<&'static str> {
    use tokio::signal::unix::{SignalKind, signal};

    let mut sigterm = signal(SignalKind::terminate())
        .map_err(|e| anyhow::anyhow!("failed to install SIGTERM handler: {}", e))?;
    let mut sigint = signal(SignalKind::interrupt())
        .map_err(|e| anyhow::anyhow!("failed to install SIGINT handler: {}", e))?;

    Ok(tokio::select! {
        _ = sigterm.recv() => "SIGTERM",
        _ = sigint.recv() => "SIGINT",
    })
}

#[cfg(not(unix))]
async fn wait_for_shutdown_signal() -> Result<&'static str> {
    tokio::signal::ctrl_c().await?;
    Ok("ctrl-c")
}
