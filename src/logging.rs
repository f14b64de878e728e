use std::io;
use tracing_subscriber::fmt;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::prelude::*;
use tracing_subscriber::EnvFilter;

/// Configures logging for the CLI: progress and summaries on stderr, the
/// full debug trail in a daily-rolling file under `logs/`.
///
/// The stderr level defaults to `info` when `--progress` is given and `warn`
/// otherwise; `RUST_LOG` overrides either.
pub fn configure_logging(progress: bool) {
    let default_level = if progress { "info" } else { "warn" };
    let stderr_log = fmt::layer()
        .with_writer(io::stderr)
        .with_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| {
            EnvFilter::new(default_level)
        }));

    let _ = std::fs::create_dir_all("logs");
    let file_appender = tracing_appender::rolling::daily("logs", "cognate.log");
    let file_log = fmt::layer()
        .with_writer(file_appender)
        .with_ansi(false)
        .with_filter(EnvFilter::new("debug"));

    tracing_subscriber::Registry::default()
        .with(stderr_log)
        .with(file_log)
        .init();
}
