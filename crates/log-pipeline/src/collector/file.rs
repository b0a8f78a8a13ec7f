//! File tailer
//!
//! Follows a growing access log the way `tail -f` does: the file is opened,
//! positioned at its end, and polled for newly appended lines. Each line is
//! parsed and the resulting event is pushed to every sink.
//!
//! Log rotation is not handled; a rotated-away file simply stops growing.

use std::io::SeekFrom;
use std::path::PathBuf;
use std::time::Duration;

use httpmon_core::event::LogEvent;
use httpmon_core::metrics as m;
use httpmon_core::pipeline::PipelineControl;
use tokio::fs::File;
use tokio::io::{AsyncBufReadExt, AsyncSeekExt, BufReader};
use tokio::sync::mpsc;
use tracing::{debug, info, warn};

use super::TailerSummary;
use crate::config::PipelineConfig;
use crate::error::LogPipelineError;
use crate::parser::AccessLogParser;

/// What the tailer should do after an attempt to deliver an event.
enum Delivery {
    /// At least one sink is still open.
    Continue,
    /// Every sink has been closed.
    SinksClosed,
    /// Shutdown was signaled while waiting on backpressure.
    Cancelled,
}

/// Follows one access-log file and feeds parsed events to the consumers.
pub struct FileTailer {
    path: PathBuf,
    reader: BufReader<File>,
    parser: AccessLogParser,
    poll_interval: Duration,
    max_line_length: usize,
    /// Bytes of the line currently being assembled.
    pending: Vec<u8>,
    /// Set after an oversized partial line was dropped; the rest of that line
    /// is skipped up to its newline.
    discarding: bool,
    summary: TailerSummary,
}

impl FileTailer {
    /// Opens `config.log_file_path` and seeks to its end.
    ///
    /// Only lines appended after this call are processed. A missing or
    /// unreadable file is an error; an empty file is not.
    pub async fn open(config: &PipelineConfig) -> Result<Self, LogPipelineError> {
        let path = config.log_file_path.clone();
        let tailer_error = |e: std::io::Error| LogPipelineError::Tailer {
            path: path.display().to_string(),
            reason: e.to_string(),
        };

        let mut file = File::open(&path).await.map_err(tailer_error)?;
        let offset = file.seek(SeekFrom::End(0)).await.map_err(tailer_error)?;

        info!(path = %path.display(), offset, "tailing access log");

        Ok(Self {
            path,
            reader: BufReader::new(file),
            parser: AccessLogParser::new()?,
            poll_interval: config.poll_interval(),
            max_line_length: config.max_line_length,
            pending: Vec::new(),
            discarding: false,
            summary: TailerSummary::default(),
        })
    }

    /// Runs until `control` is signaled or every sink is closed.
    ///
    /// Delivery awaits channel capacity, so a slow consumer stalls the tailer
    /// instead of losing events. The wait is raced against `control`.
    pub async fn run(
        mut self,
        mut sinks: Vec<mpsc::Sender<LogEvent>>,
        control: PipelineControl,
    ) -> TailerSummary {
        loop {
            if control.is_signaled() {
                debug!("tailer received shutdown signal");
                break;
            }

            match self.reader.read_until(b'\n', &mut self.pending).await {
                Ok(_) if self.pending.ends_with(b"\n") => {
                    let line = std::mem::take(&mut self.pending);
                    match self.handle_line(&line, &mut sinks, &control).await {
                        Delivery::Continue => {}
                        Delivery::SinksClosed => {
                            info!("all event sinks closed, stopping tailer");
                            break;
                        }
                        Delivery::Cancelled => break,
                    }
                    // more lines may already be buffered; read again without sleeping
                    continue;
                }
                Ok(_) => {
                    // EOF, possibly mid-line
                    self.discard_if_oversized();
                }
                Err(e) => {
                    metrics::counter!(m::TAILER_READ_ERRORS_TOTAL).increment(1);
                    warn!(path = %self.path.display(), error = %e, "read failed, retrying");
                }
            }

            tokio::select! {
                _ = tokio::time::sleep(self.poll_interval) => {}
                _ = control.signaled() => {
                    debug!("tailer received shutdown signal while idle");
                    break;
                }
            }
        }

        info!(
            lines_read = self.summary.lines_read,
            events_emitted = self.summary.events_emitted,
            lines_rejected = self.summary.lines_rejected,
            "tailer stopped"
        );
        self.summary
    }

    async fn handle_line(
        &mut self,
        line: &[u8],
        sinks: &mut Vec<mpsc::Sender<LogEvent>>,
        control: &PipelineControl,
    ) -> Delivery {
        if std::mem::take(&mut self.discarding) {
            // tail end of a line already dropped as oversized
            return Delivery::Continue;
        }

        self.summary.lines_read += 1;
        metrics::counter!(m::TAILER_LINES_READ_TOTAL).increment(1);

        if line.len() > self.max_line_length {
            self.record_oversized(line.len());
            return Delivery::Continue;
        }

        let text = String::from_utf8_lossy(line);
        let event = match self.parser.parse(&text) {
            Ok(event) => event,
            Err(e) => {
                self.summary.lines_rejected += 1;
                metrics::counter!(m::TAILER_LINES_REJECTED_TOTAL).increment(1);
                debug!(error = %e, "dropping line");
                return Delivery::Continue;
            }
        };

        let delivery = deliver(event, sinks, control).await;
        if matches!(delivery, Delivery::Continue) {
            self.summary.events_emitted += 1;
            metrics::counter!(m::TAILER_EVENTS_EMITTED_TOTAL).increment(1);
        }
        delivery
    }

    fn discard_if_oversized(&mut self) {
        if self.pending.len() > self.max_line_length {
            let len = self.pending.len();
            self.pending.clear();
            if !self.discarding {
                self.record_oversized(len);
                self.discarding = true;
            }
        }
    }

    fn record_oversized(&mut self, len: usize) {
        self.summary.oversized_lines += 1;
        metrics::counter!(m::TAILER_OVERSIZED_LINES_TOTAL).increment(1);
        warn!(
            len,
            max = self.max_line_length,
            "discarding line exceeding maximum length"
        );
    }
}

/// Sends one event to every open sink, dropping sinks whose receiver is gone.
async fn deliver(
    event: LogEvent,
    sinks: &mut Vec<mpsc::Sender<LogEvent>>,
    control: &PipelineControl,
) -> Delivery {
    let mut closed = Vec::new();

    for (idx, sink) in sinks.iter().enumerate() {
        tokio::select! {
            result = sink.send(event.clone()) => {
                if result.is_err() {
                    closed.push(idx);
                }
            }
            _ = control.signaled() => {
                debug!("shutdown signaled while waiting on a full channel");
                return Delivery::Cancelled;
            }
        }
    }

    for idx in closed.into_iter().rev() {
        sinks.remove(idx);
        warn!(remaining = sinks.len(), "event sink closed");
    }

    if sinks.is_empty() {
        Delivery::SinksClosed
    } else {
        Delivery::Continue
    }
}
