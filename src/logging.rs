use std::path::Path;

use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::EnvFilter;
use tracing_subscriber::fmt;
use tracing_subscriber::prelude::*;

pub const LOG_ENV: &str = "IMGPULL_LOG";

/// Install the global subscriber. Logs go to stderr (level from `IMGPULL_LOG`,
/// default `warn`); `verbose` raises that to `debug` and also appends to
/// `<log_dir>/imgpull.log`. Keep the returned guard alive until exit so the
/// file writer flushes.
pub fn init(verbose: bool, log_dir: &Path) -> Option<WorkerGuard> {
    let default_level = if verbose { "debug" } else { "warn" };
    let filter = EnvFilter::try_from_env(LOG_ENV).unwrap_or_else(|_| EnvFilter::new(default_level));
    let stderr_layer = fmt::layer().with_writer(std::io::stderr).with_target(false);

    if verbose && std::fs::create_dir_all(log_dir).is_ok() {
        let appender = tracing_appender::rolling::never(log_dir, "imgpull.log");
        let (writer, guard) = tracing_appender::non_blocking(appender);
        let file_layer = fmt::layer().with_writer(writer).with_ansi(false).with_thread_names(true);
        let _ = tracing_subscriber::registry()
            .with(filter)
            .with(stderr_layer)
            .with(file_layer)
            .try_init();
        return Some(guard);
    }
    let _ = tracing_subscriber::registry().with(filter).with(stderr_layer).try_init();
    None
}
