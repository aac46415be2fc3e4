//! Logging setup.
//!
//! The terminal UI owns stdout, so logs go to `<log_dir>/project-map.log`
//! (truncated at start). One-shot commands can also echo to stderr.
//! `RUST_LOG` overrides the default `info` filter.

use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::EnvFilter;

pub const LOG_FILE: &str = "project-map.log";

/// Keeps the background log writer alive; dropping it flushes the file
pub struct LoggingGuard {
    _file_guard: WorkerGuard,
}

/// Create the log directory and truncate the previous session's file
fn prepare_log_file(log_dir: &Path) -> io::Result<PathBuf> {
    fs::create_dir_all(log_dir)?;
    let path = log_dir.join(LOG_FILE);
    fs::write(&path, "")?;
    Ok(path)
}

pub fn init_logging(log_dir: &Path, echo_stderr: bool) -> io::Result<LoggingGuard> {
    prepare_log_file(log_dir)?;

    let file_appender = tracing_appender::rolling::never(log_dir, LOG_FILE);
    let (writer, file_guard) = tracing_appender::non_blocking(file_appender);

    let file_layer = tracing_subscriber::fmt::layer()
        .with_writer(writer)
        .with_ansi(false)
        .with_target(true);
    let stderr_layer = echo_stderr.then(|| {
        tracing_subscriber::fmt::layer()
            .with_writer(io::stderr)
            .with_target(false)
            .compact()
    });

    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::registry()
        .with(env_filter)
        .with(file_layer)
        .with(stderr_layer)
        .try_init()
        .map_err(io::Error::other)?;

    Ok(LoggingGuard {
        _file_guard: file_guard,
    })
}
