//! Subscriber setup for the `berth` binary.
//!
//! Everything goes to stderr so stdout stays clean for `versions --json`.
//! With `log_to_file` set, a daily `berth.*.log` in the runtime directory
//! gets the same events plus source locations.

use std::io;
use std::path::PathBuf;
use std::sync::OnceLock;

use tracing::Level;
use tracing_appender::non_blocking::{NonBlocking, WorkerGuard};
use tracing_appender::rolling::{RollingFileAppender, Rotation};
use tracing_subscriber::fmt::time::UtcTime;
use tracing_subscriber::prelude::*;
use tracing_subscriber::{fmt, EnvFilter};

use crate::config::{runtime_dir, LogLevel};

const LOG_FILE_PREFIX: &str = "berth";
const MAX_LOG_FILES: usize = 7;

static INIT: OnceLock<()> = OnceLock::new();

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogMode {
    Stderr,
    Both,
}

impl LogMode {
    pub fn for_config(log_to_file: bool) -> Self {
        if log_to_file {
            LogMode::Both
        } else {
            LogMode::Stderr
        }
    }
}

/// Keeps the file writer flushing until dropped at the end of `main`.
pub struct LogGuard {
    _guard: Option<WorkerGuard>,
}

/// Installs the global subscriber once. `cli_override` wins over the
/// configured level, and `RUST_LOG` directives are layered on top.
pub fn init(level: LogLevel, mode: LogMode, cli_override: Option<LogLevel>) -> LogGuard {
    let mut guard = None;

    INIT.get_or_init(|| {
        if let Some(level) = cli_override.unwrap_or(level).as_tracing_level() {
            guard = install(level, mode);
        }
    });

    LogGuard { _guard: guard }
}

fn install(level: Level, mode: LogMode) -> Option<WorkerGuard> {
    let (writer, guard) = match mode {
        LogMode::Stderr => (None, None),
        LogMode::Both => match file_writer() {
            Ok((writer, guard)) => (Some(writer), Some(guard)),
            Err(e) => {
                eprintln!(
                    "Warning: file logging disabled, cannot write to {}: {}",
                    log_dir().display(),
                    e
                );
                (None, None)
            }
        },
    };

    let file_layer = writer.map(|writer| {
        fmt::layer()
            .with_writer(writer)
            .with_timer(UtcTime::rfc_3339())
            .with_ansi(false)
            .with_file(true)
            .with_line_number(true)
            .with_filter(env_filter(level))
    });

    let stderr_layer = fmt::layer()
        .with_writer(io::stderr)
        .with_timer(UtcTime::rfc_3339())
        .with_target(true)
        .with_filter(env_filter(level));

    tracing_subscriber::registry()
        .with(file_layer)
        .with(stderr_layer)
        .init();

    guard
}

fn file_writer() -> io::Result<(NonBlocking, WorkerGuard)> {
    let dir = log_dir();
    std::fs::create_dir_all(&dir)?;

    let appender = RollingFileAppender::builder()
        .rotation(Rotation::DAILY)
        .filename_prefix(LOG_FILE_PREFIX)
        .filename_suffix("log")
        .max_log_files(MAX_LOG_FILES)
        .build(&dir)
        .map_err(io::Error::other)?;

    Ok(tracing_appender::non_blocking(appender))
}

fn env_filter(level: Level) -> EnvFilter {
    EnvFilter::builder()
        .with_default_directive(level.into())
        .from_env_lossy()
}

pub fn log_dir() -> PathBuf {
    runtime_dir()
}
