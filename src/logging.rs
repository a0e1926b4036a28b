use std::path::Path;

use tracing::Level;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_appender::rolling::{InitError, RollingFileAppender, Rotation};
use tracing_subscriber::EnvFilter;
use tracing_subscriber::fmt;
use tracing_subscriber::fmt::writer::MakeWriterExt;

pub const LOG_FILE_PREFIX: &str = "poller.log";

/// Daily rolling diagnostic log in `dir`. Fails if the directory cannot be
/// created or the file cannot be opened.
pub fn file_appender(dir: &Path) -> Result<RollingFileAppender, InitError> {
    RollingFileAppender::builder()
        .rotation(Rotation::DAILY)
        .filename_prefix(LOG_FILE_PREFIX)
        .build(dir)
}

/// Everything goes to the rolling file, warnings and errors are mirrored to
/// stderr. The returned guard must be held until exit so buffered lines are
/// flushed.
pub fn setup_logging(dir: &Path, level: &str) -> Result<WorkerGuard, InitError> {
    let (non_blocking, guard) = tracing_appender::non_blocking(file_appender(dir)?);

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));

    fmt()
        .with_env_filter(filter)
        .with_writer(non_blocking.and(std::io::stderr.with_max_level(Level::WARN)))
        .with_ansi(false)
        .with_level(true)
        .init();

    Ok(guard)
}
