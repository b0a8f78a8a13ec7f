//! Feeds a recorded access log into a file that httpmon is following.

use std::path::PathBuf;
use std::time::Duration;

use anyhow::Result;
use clap::Parser;

use httpmon::replay::replay;
use httpmon_core::pipeline::PipelineControl;

/// Replay recorded access-log lines into a live log file.
#[derive(Parser, Debug)]
#[command(name = "httpmon-replay")]
#[command(version, about, long_about = None)]
struct ReplayCli {
    /// Recorded access log (CSV).
    data_file: PathBuf,

    /// File to append to; created if missing.
    log_file: PathBuf,

    /// Pause after each line, in milliseconds.
    #[arg(long, default_value_t = 500)]
    delay_ms: u64,
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = ReplayCli::parse();
    let control = PipelineControl::new();

    tokio::spawn({
        let control = control.clone();
        async move {
            if tokio::signal::ctrl_c().await.is_ok() {
                control.signal();
            }
        }
    });

    let summary = replay(
        &cli.data_file,
        &cli.log_file,
        Duration::from_millis(cli.delay_ms),
        &control,
    )
    .await?;

    if summary.interrupted {
        eprintln!("replay interrupted after {} lines", summary.lines_written);
    }
    Ok(())
}
