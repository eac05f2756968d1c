//! Diagnostic logging setup for the `td` binary.
//!
//! Human-readable events go to stderr, filtered by `TD_LOG` (default
//! `warn`) so that stdout stays machine-readable. When a `log-dir` is
//! configured, JSON events are also written to a daily-rolling file there,
//! filtered by `TD_FILE_LOG` (default `info`).

use std::path::Path;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::{EnvFilter, Layer, layer::SubscriberExt, util::SubscriberInitExt};

/// Filter directives for stderr.
pub const LOG_ENV: &str = "TD_LOG";

/// Filter directives for the log file.
pub const FILE_LOG_ENV: &str = "TD_FILE_LOG";

/// Prefix of the rolling log files.
pub const LOG_FILE_PREFIX: &str = "td.log";

fn filter_from_env(var: &str, default: &str) -> EnvFilter {
    EnvFilter::try_from_env(var).unwrap_or_else(|_| EnvFilter::new(default))
}

pub fn stderr_filter() -> EnvFilter {
    filter_from_env(LOG_ENV, "warn")
}

pub fn file_filter() -> EnvFilter {
    filter_from_env(FILE_LOG_ENV, "info")
}

/// Install the global subscriber.
///
/// The returned guard flushes the file writer when dropped, so it must live
/// until the process is about to exit. Installing twice is a no-op.
pub fn init(log_dir: Option<&Path>) -> Option<WorkerGuard> {
    let stderr_layer = tracing_subscriber::fmt::layer()
        .with_writer(std::io::stderr)
        .with_target(false)
        .with_filter(stderr_filter());

    let (file_layer, guard) = match log_dir {
        Some(dir) => match std::fs::create_dir_all(dir) {
            Ok(()) => {
                let appender = tracing_appender::rolling::daily(dir, LOG_FILE_PREFIX);
                let (writer, guard) = tracing_appender::non_blocking(appender);
                let layer = tracing_subscriber::fmt::layer()
                    .json()
                    .with_writer(writer)
                    .with_filter(file_filter());
                (Some(layer), Some(guard))
            }
            Err(e) => {
                eprintln!("Warning: cannot create log directory {}: {}", dir.display(), e);
                (None, None)
            }
        },
        None => (None, None),
    };

    let _ = tracing_subscriber::registry()
        .with(stderr_layer)
        .with(file_layer)
        .try_init();

    guard
}
