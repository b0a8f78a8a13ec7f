//! Line-oriented renderer for hosts without an interactive terminal.
//!
//! Polls the snapshots every refresh period and writes a report whenever a
//! stats interval completes or the alert state changes. Nothing is written
//! for ticks without news.

use std::io::{Stdout, Write};
use std::str::FromStr;

use anyhow::Result;
use httpmon_core::pipeline::PipelineControl;
use httpmon_log_pipeline::{AlertSnapshot, AlertTransition, StatsSnapshot};
use serde::Serialize;
use tokio::time::MissedTickBehavior;

use super::view::{self, IntervalRecord};
use super::{Renderer, SnapshotSources, ViewSettings};

/// Output encoding of headless reports.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ReportFormat {
    /// Human-readable blocks.
    #[default]
    Text,
    /// One JSON object per line.
    Json,
}

impl FromStr for ReportFormat {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "text" => Ok(Self::Text),
            "json" => Ok(Self::Json),
            other => Err(anyhow::anyhow!(
                "unknown report format '{}', expected 'text' or 'json'",
                other
            )),
        }
    }
}

#[derive(Serialize)]
#[serde(tag = "type", rename_all = "lowercase")]
enum JsonRecord<'a> {
    Interval(IntervalRecord),
    Transition(&'a AlertTransition),
}

/// Writes reports to `W` (stdout in production).
pub struct HeadlessRenderer<W = Stdout> {
    out: W,
    format: ReportFormat,
    intervals_seen: u64,
    last_transition: Option<AlertTransition>,
}

impl HeadlessRenderer<Stdout> {
    /// Renderer writing to standard output.
    pub fn stdout(format: ReportFormat) -> Self {
        Self::new(std::io::stdout(), format)
    }
}

impl<W: Write> HeadlessRenderer<W> {
    pub fn new(out: W, format: ReportFormat) -> Self {
        Self {
            out,
            format,
            intervals_seen: 0,
            last_transition: None,
        }
    }

    /// The underlying writer.
    pub fn get_ref(&self) -> &W {
        &self.out
    }

    /// Writes whatever changed since the previous call.
    fn report(
        &mut self,
        settings: &ViewSettings,
        alert: &AlertSnapshot,
        stats: &StatsSnapshot,
    ) -> Result<()> {
        if alert.last_transition != self.last_transition {
            if let Some(transition) = &alert.last_transition {
                self.write_transition(transition)?;
            }
            self.last_transition.clone_from(&alert.last_transition);
        }

        if stats.intervals_completed > self.intervals_seen {
            self.intervals_seen = stats.intervals_completed;
            self.write_interval(settings, alert, stats)?;
        }

        self.out.flush()?;
        Ok(())
    }

    fn write_transition(&mut self, transition: &AlertTransition) -> Result<()> {
        match self.format {
            ReportFormat::Text => writeln!(
                self.out,
                "[{}] {}",
                view::transition_label(transition.kind),
                transition.message
            )?,
            ReportFormat::Json => {
                serde_json::to_writer(&mut self.out, &JsonRecord::Transition(transition))?;
                writeln!(self.out)?;
            }
        }
        Ok(())
    }

    fn write_interval(
        &mut self,
        settings: &ViewSettings,
        alert: &AlertSnapshot,
        stats: &StatsSnapshot,
    ) -> Result<()> {
        match self.format {
            ReportFormat::Text => {
                for line in view::interval_report(stats, settings) {
                    writeln!(self.out, "{line}")?;
                }
                writeln!(self.out, "{}", view::alert_headline(alert))?;
                writeln!(self.out)?;
            }
            ReportFormat::Json => {
                let Some(record) =
                    IntervalRecord::from_snapshots(stats, alert, settings.top_sections)
                else {
                    return Ok(());
                };
                serde_json::to_writer(&mut self.out, &JsonRecord::Interval(record))?;
                writeln!(self.out)?;
            }
        }
        Ok(())
    }
}

impl<W: Write> Renderer for HeadlessRenderer<W> {
    async fn run(&mut self, sources: SnapshotSources, control: PipelineControl) -> Result<()> {
        tracing::info!(format = ?self.format, "headless renderer started");

        let mut tick = tokio::time::interval(sources.settings.refresh_interval);
        tick.set_missed_tick_behavior(MissedTickBehavior::Skip);

        loop {
            tokio::select! {
                _ = control.signaled() => break,
                _ = tick.tick() => {
                    let alert = sources.alert.load();
                    let stats = sources.stats.load();
                    self.report(&sources.settings, &alert, &stats)?;
                }
            }
        }

        // pick up anything published since the last tick
        let alert = sources.alert.load();
        let stats = sources.stats.load();
        self.report(&sources.settings, &alert, &stats)?;

        tracing::info!(
            total_hits = stats.total_hits,
            alert_count = alert.alert_count,
            "headless renderer stopped"
        );
        Ok(())
    }
}
