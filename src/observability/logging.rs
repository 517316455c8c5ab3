use crate::constants::{LOG_DIR, LOG_FILE_PREFIX};
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

const DEFAULT_FILTER: &str = "batch_notifier=info,warn";

/// Console status lines plus a daily JSON log under `logs/`.
///
/// Each JSON line carries the enclosing `send` span, so entries from one run
/// can be grouped by `run_id`. Hold the returned guard until exit; dropping it
/// flushes the file writer.
pub fn init_logging() -> Option<WorkerGuard> {
    let env_filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(DEFAULT_FILTER));

    let console_layer = fmt::layer().with_target(false).with_writer(std::io::stdout);

    // Without a writable log directory the run still goes ahead, console only
    let (file_layer, guard) = match std::fs::create_dir_all(LOG_DIR) {
        Ok(()) => {
            let appender = tracing_appender::rolling::daily(LOG_DIR, LOG_FILE_PREFIX);
            let (writer, guard) = tracing_appender::non_blocking(appender);
            let layer = fmt::layer()
                .json()
                .with_current_span(true)
                .with_span_list(false)
                .with_writer(writer);
            (Some(layer), Some(guard))
        }
        Err(e) => {
            eprintln!("⚠️  Cannot create {}: {}; logging to console only", LOG_DIR, e);
            (None, None)
        }
    };

    tracing_subscriber::registry()
        .with(env_filter)
        .with(file_layer)
        .with(console_layer)
        .init();

    guard
}
