use std::path::Path;

use tracing::warn;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

const DEFAULT_FILTER: &str = "song_dl=info";
const LOG_FILE: &str = "song-dl.log";

/// Initialize global subscriber. Call once at app start.
///
/// Logs to the console and to a daily-rolling file in `log_dir`. The
/// returned guard must be kept alive for the file writer to flush.
pub fn init(log_dir: &Path) -> Option<WorkerGuard> {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(DEFAULT_FILTER));

    let console = fmt::layer()
        .with_target(false)
        .with_level(true)
        .with_line_number(true);

    let (file_layer, guard, dir_error) = match std::fs::create_dir_all(log_dir) {
        Ok(()) => {
            let appender = tracing_appender::rolling::daily(log_dir, LOG_FILE);
            let (writer, guard) = tracing_appender::non_blocking(appender);
            let layer = fmt::layer()
                .with_writer(writer)
                .with_ansi(false)
                .with_target(true)
                .with_line_number(true);
            (Some(layer), Some(guard), None)
        }
        Err(e) => (None, None, Some(e)),
    };

    let _ = tracing_subscriber::registry()
        .with(filter)
        .with(console)
        .with(file_layer)
        .try_init();

    if let Some(e) = dir_error {
        warn!(dir = %log_dir.display(), error = %e, "file logging disabled");
    }
    guard
}
