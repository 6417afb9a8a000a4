use std::path::Path;

use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt};

fn env_filter(level: &str) -> EnvFilter {
    let default_filter = format!("trajectory={level},trajectory_core=warn");
    EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&default_filter))
}

/// Initialize logging to stderr, or to `log_file` when given.
///
/// The level can be overridden with the `RUST_LOG` environment variable.
/// File logging goes through a background writer; keep the returned guard
/// alive until exit so buffered lines are flushed.
pub fn init_logging(
    level: &str,
    log_file: Option<&Path>,
) -> color_eyre::Result<Option<WorkerGuard>> {
    let Some(log_path) = log_file else {
        tracing_subscriber::registry()
            .with(env_filter(level))
            .with(
                fmt::layer()
                    .with_writer(std::io::stderr)
                    .with_target(true)
                    .with_thread_ids(false),
            )
            .init();
        return Ok(None);
    };

    let directory = match log_path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent,
        _ => Path::new("."),
    };
    std::fs::create_dir_all(directory)?;
    let file_name = log_path.file_name().ok_or_else(|| {
        color_eyre::eyre::eyre!("Log file path has no file name: {}", log_path.display())
    })?;

    let appender = tracing_appender::rolling::never(directory, file_name);
    let (writer, guard) = tracing_appender::non_blocking(appender);

    tracing_subscriber::registry()
        .with(env_filter(level))
        .with(
            fmt::layer()
                .with_writer(writer)
                .with_ansi(false)
                .with_target(true)
                .with_thread_ids(false),
        )
        .init();

    tracing::info!(
        "Trajectory logging initialized (log_path={})",
        log_path.display()
    );
    Ok(Some(guard))
}
