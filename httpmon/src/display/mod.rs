//! Status renderers.
//!
//! A renderer periodically reads the latest published snapshots and presents
//! them. It never touches consumer state directly; everything it needs is in
//! [`SnapshotSources`].
//!
//! - [`TerminalRenderer`]: full-screen `ratatui` view, quit with `q` / `Esc` / `Ctrl-C`
//! - [`HeadlessRenderer`]: stdout reports for hosts without a terminal
//!
//! Text shared by both lives in [`view`].

pub mod headless;
pub mod terminal;
pub mod view;

use std::future::Future;
use std::time::Duration;

use httpmon_core::config::HttpmonConfig;
use httpmon_core::pipeline::PipelineControl;
use httpmon_log_pipeline::{AlertSnapshot, MonitorPipeline, SnapshotCell, StatsSnapshot};

pub use headless::{HeadlessRenderer, ReportFormat};
pub use terminal::TerminalRenderer;

/// Settings echoed by the renderers.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ViewSettings {
    /// File being followed.
    pub log_file_path: String,
    /// Alert threshold, hits per second.
    pub threshold_hits_per_sec: u64,
    /// Alert window, seconds.
    pub window_secs: u64,
    /// Statistics interval, seconds.
    pub stats_interval_secs: u64,
    /// Sections listed per interval.
    pub top_sections: usize,
    /// Redraw / poll period.
    pub refresh_interval: Duration,
}

impl ViewSettings {
    /// Extracts the renderer-facing settings.
    pub fn from_config(config: &HttpmonConfig) -> Self {
        Self {
            log_file_path: config.monitor.log_file_path.clone(),
            threshold_hits_per_sec: config.monitor.threshold_hits_per_sec,
            window_secs: config.monitor.alert_window_secs,
            stats_interval_secs: config.monitor.stats_interval_secs,
            top_sections: config.display.top_sections,
            refresh_interval: Duration::from_millis(config.display.refresh_interval_ms),
        }
    }
}

/// Read handles to everything a renderer shows.
#[derive(Debug, Clone)]
pub struct SnapshotSources {
    /// Alert engine output.
    pub alert: SnapshotCell<AlertSnapshot>,
    /// Stats engine output.
    pub stats: SnapshotCell<StatsSnapshot>,
    /// Static settings.
    pub settings: ViewSettings,
}

impl SnapshotSources {
    /// Handles for a built (not necessarily started) pipeline.
    pub fn for_pipeline(pipeline: &MonitorPipeline, settings: ViewSettings) -> Self {
        Self {
            alert: pipeline.alert_cell(),
            stats: pipeline.stats_cell(),
            settings,
        }
    }
}

/// Presents snapshots until shutdown.
///
/// `run` returns once `control` is signaled. A renderer that owns user input
/// signals `control` itself when the user asks to quit.
pub trait Renderer {
    /// Renders until shutdown.
    fn run(
        &mut self,
        sources: SnapshotSources,
        control: PipelineControl,
    ) -> impl Future<Output = anyhow::Result<()>>;
}
