//! Logging initialization for httpmon.
//!
//! Configures `tracing-subscriber` from the `[general]` section of
//! `HttpmonConfig`. Output goes through a `tracing-appender` non-blocking
//! writer, either to `general.log_file` or to stderr.

use std::io;
use std::path::Path;

use anyhow::Result;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_appender::rolling::{RollingFileAppender, Rotation};
use tracing_subscriber::EnvFilter;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;

use httpmon_core::config::GeneralConfig;

/// Initialize the global tracing subscriber.
///
/// Must be called exactly once, before any tracing macros are used. The
/// returned guard flushes buffered records when dropped and has to be kept
/// alive for the lifetime of the process.
///
/// With an empty `log_file`, records go to stderr in headless mode and are
/// discarded while the terminal UI owns the screen.
///
/// # Formats
///
/// * `"json"` - Machine-parseable JSON lines (default)
/// * `"pretty"` - Human-readable multi-line output
pub fn init_tracing(config: &GeneralConfig, terminal_ui: bool) -> Result<WorkerGuard> {
    let env_filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&config.log_level));

    let (writer, guard) = if !config.log_file.is_empty() {
        tracing_appender::non_blocking(file_appender(Path::new(&config.log_file))?)
    } else if terminal_ui {
        tracing_appender::non_blocking(io::sink())
    } else {
        tracing_appender::non_blocking(io::stderr())
    };

    match config.log_format.as_str() {
        "json" => {
            tracing_subscriber::registry()
                .with(env_filter)
                .with(tracing_subscriber::fmt::layer().json().with_writer(writer))
                .try_init()
                .map_err(|e| {
                    anyhow::anyhow!("failed to initialize JSON tracing subscriber: {}", e)
                })?;
        }
        "pretty" => {
            tracing_subscriber::registry()
                .with(env_filter)
                .with(
                    tracing_subscriber::fmt::layer()
                        .pretty()
                        .with_ansi(false)
                        .with_writer(writer),
                )
                .try_init()
                .map_err(|e| {
                    anyhow::anyhow!("failed to initialize pretty tracing subscriber: {}", e)
                })?;
        }
        _ => {
            return Err(anyhow::anyhow!(
                "unknown log format '{}', expected 'json' or 'pretty'",
                config.log_format
            ));
        }
    }

    Ok(guard)
}

/// Appending, never-rotated file writer for `path`.
fn file_appender(path: &Path) -> Result<RollingFileAppender> {
    let file_name = path
        .file_name()
        .ok_or_else(|| anyhow::anyhow!("log file '{}' has no file name", path.display()))?;
    let dir = match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent,
        _ => Path::new("."),
    };

    RollingFileAppender::builder()
        .rotation(Rotation::NEVER)
        .filename_prefix(file_name.to_string_lossy())
        .build(dir)
        .map_err(|e| anyhow::anyhow!("failed to open log file '{}': {}", path.display(), e))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn file_appender_creates_file_in_parent_dir() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("httpmon.log");
        let _appender = file_appender(&path).unwrap();
        assert!(path.exists());
    }

    #[test]
    fn file_appender_rejects_path_without_file_name() {
        assert!(file_appender(Path::new("/")).is_err());
    }

    #[test]
    fn file_appender_fails_when_directory_cannot_be_created() {
        let dir = tempfile::tempdir().unwrap();
        let missing = dir.path().join("nope").join("deeper");
        // a regular file where a directory is needed
        std::fs::write(dir.path().join("nope"), b"").unwrap();
        assert!(file_appender(&missing.join("httpmon.log")).is_err());
    }
}
