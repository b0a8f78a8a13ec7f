//! Replays a recorded access log into a live file at a steady pace.
//!
//! Used to feed a running monitor with realistic traffic (see the
//! `httpmon-replay` binary).

use std::path::Path;
use std::time::Duration;

use anyhow::{Context, Result};
use httpmon_core::pipeline::PipelineControl;
use tokio::fs::{File, OpenOptions};
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};

/// Outcome of a replay.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ReplaySummary {
    /// Lines written to the output.
    pub lines_written: u64,
    /// Whether the replay stopped before the end of the input.
    pub interrupted: bool,
}

/// Appends `input` to `output` one line at a time, pausing `delay` after
/// each line. The output is created if missing and never truncated, so a
/// monitor already following it keeps a valid offset.
///
/// Empty input lines are skipped. Stops early once `control` is signaled.
pub async fn replay(
    input: &Path,
    output: &Path,
    delay: Duration,
    control: &PipelineControl,
) -> Result<ReplaySummary> {
    let source = File::open(input)
        .await
        .with_context(|| format!("failed to open data file '{}'", input.display()))?;
    let mut sink = OpenOptions::new()
        .create(true)
        .append(true)
        .open(output)
        .await
        .with_context(|| format!("failed to open log file '{}'", output.display()))?;

    let mut lines = BufReader::new(source).lines();
    let mut summary = ReplaySummary::default();

    loop {
        if control.is_signaled() {
            summary.interrupted = true;
            break;
        }

        let Some(line) = lines.next_line().await? else {
            break;
        };
        if line.trim().is_empty() {
            continue;
        }

        sink.write_all(line.as_bytes()).await?;
        sink.write_all(b"\n").await?;
        sink.flush().await?;
        summary.lines_written += 1;

        tokio::select! {
            _ = tokio::time::sleep(delay) => {}
            _ = control.signaled() => {
                summary.interrupted = true;
                break;
            }
        }
    }

    tracing::info!(
        lines_written = summary.lines_written,
        interrupted = summary.interrupted,
        "replay finished"
    );
    Ok(summary)
}
