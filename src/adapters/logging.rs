//! Subscriber setup shared by the binaries.
//!
//! Logs go to stdout unless `DIAGNOSTICA_LOG_MODE=file`, in which case they
//! are appended to `DIAGNOSTICA_LOG_FILE`. Every line passes through
//! [`SanitizingMakeWriter`] before it is written.

use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use super::sanitize::SanitizingMakeWriter;

const DEFAULT_LOG_FILE: &str = "diagnostica.log";

/// Install the global subscriber.
///
/// The returned guard flushes buffered lines on drop; keep it alive for the
/// whole run.
///
/// # Errors
/// Returns error if the log file cannot be opened.
pub fn init() -> std::io::Result<WorkerGuard> {
    let log_mode = std::env::var("DIAGNOSTICA_LOG_MODE").unwrap_or_else(|_| "stdout".to_string());

    let (writer, guard) = if log_mode.trim().eq_ignore_ascii_case("file") {
        let log_file = std::env::var("DIAGNOSTICA_LOG_FILE")
            .unwrap_or_else(|_| DEFAULT_LOG_FILE.to_string());

        if let Some(parent) = std::path::Path::new(&log_file).parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)?;
            }
        }

        let file = std::fs::OpenOptions::new()
            .create(true)
            .append(true)
            .open(&log_file)?;
        tracing_appender::non_blocking(file)
    } else {
        tracing_appender::non_blocking(std::io::stdout())
    };

    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with(tracing_subscriber::fmt::layer().with_writer(SanitizingMakeWriter::new(writer)))
        .init();

    Ok(guard)
}
