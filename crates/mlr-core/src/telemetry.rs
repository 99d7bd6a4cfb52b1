//! Centralised tracing initialisation for MLR-Bench binaries.
//!
//! Call [`init_tracing`] once at program start to configure the global
//! subscriber with an `EnvFilter`, optional JSON formatting and an optional
//! log file. Later calls are silently ignored.
//!
//! The log file rotates daily: `mlr.log` is written as `mlr.log.YYYY-MM-DD`
//! and only the newest [`MAX_LOG_FILES`] files are kept.

use std::path::Path;

use anyhow::Context;
use tracing::Level;
use tracing_appender::rolling::{RollingFileAppender, Rotation};
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{fmt, EnvFilter};

/// Initialise the global tracing subscriber.
///
/// * `json`: emit newline-delimited JSON log lines on stderr.
/// * `level`: default verbosity when `RUST_LOG` is not set.
/// * `log_file`: also append plain-text lines to a daily-rotated file
///   named after this path. If the file cannot be opened, console logging
///   still works and a warning is logged.
pub fn init_tracing(json: bool, level: Level, log_file: Option<&Path>) {
    let env_filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level.as_str()));

    let mut open_error = None;
    let log_writer = log_file.and_then(|path| match rolling_log_file(path) {
        Ok(appender) => Some(appender),
        Err(e) => {
            open_error = Some((path.to_path_buf(), e));
            None
        }
    });

    if json {
        tracing_subscriber::registry()
            .with(env_filter)
            .with(fmt::layer().with_target(false).json())
            .with(log_writer.map(|w| {
                fmt::layer()
                    .with_ansi(false)
                    .with_target(false)
                    .with_writer(w)
            }))
            .try_init()
            .ok();
    } else {
        tracing_subscriber::registry()
            .with(env_filter)
            .with(fmt::layer().with_target(false))
            .with(log_writer.map(|w| {
                fmt::layer()
                    .with_ansi(false)
                    .with_target(false)
                    .with_writer(w)
            }))
            .try_init()
            .ok();
    }

    if let Some((path, error)) = open_error {
        tracing::warn!(path = ?path, error = %format!("{error:#}"), "could not open log file");
    }
}

/// Rotated log files kept next to the configured log path.
pub const MAX_LOG_FILES: usize = 7;

/// Daily-rotating appender for `path`: files land in its parent directory
/// with its file name as prefix.
pub fn rolling_log_file(path: &Path) -> anyhow::Result<RollingFileAppender> {
    let prefix = path
        .file_name()
        .with_context(|| format!("log path {path:?} has no file name"))?;
    let dir = match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent,
        _ => Path::new("."),
    };
    RollingFileAppender::builder()
        .rotation(Rotation::DAILY)
        .filename_prefix(prefix.to_string_lossy())
        .max_log_files(MAX_LOG_FILES)
        .build(dir)
        .with_context(|| format!("cannot open log file in {dir:?}"))
}

/// Map a log-level name (`DEBUG`, `INFO`, `WARNING`, `ERROR`, ...) to a
/// [`Level`]. Unknown names fall back to `INFO`.
pub fn parse_level(name: &str) -> Level {
    match name.trim().to_ascii_uppercase().as_str() {
        "TRACE" => Level::TRACE,
        "DEBUG" => Level::DEBUG,
        "WARN" | "WARNING" => Level::WARN,
        "ERROR" | "CRITICAL" => Level::ERROR,
        _ => Level::INFO,
    }
}
