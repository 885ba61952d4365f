//! Scoped log sink for a single unit invocation.
//!
//! [`LogContext`] installs a thread-scoped `tracing` subscriber writing to
//! `<log_dir>/<log_name>`. Dropping the context restores the previous
//! subscriber and closes the file, so every exit path releases the sink.

use std::fs::{self, File, OpenOptions};
use std::io;
use std::sync::{Arc, Mutex};

use camino::{Utf8Path, Utf8PathBuf};
use tracing::Subscriber;
use tracing::span::EnteredSpan;
use tracing::subscriber::DefaultGuard;
use tracing_subscriber::EnvFilter;
use tracing_subscriber::fmt;
use unitkit_config::{Config, LogFormat};

/// Errors encountered while opening a log context.
#[derive(Debug, Clone, thiserror::Error)]
pub enum TelemetryError {
    /// Failed to parse the configured log filter expression.
    #[error("invalid log filter: {0}")]
    Filter(String),
    /// Failed to create the log directory or open the log file.
    #[error("error while opening log file {path}: {source}")]
    Io {
        /// Path being opened.
        path: Utf8PathBuf,
        /// Underlying I/O error.
        #[source]
        source: Arc<io::Error>,
    },
}

/// Active log sink; events on this thread go to the file until dropped.
#[derive(Debug)]
pub struct LogContext {
    path: Utf8PathBuf,
    // Exited before the subscriber guard is released.
    _span: EnteredSpan,
    _guard: DefaultGuard,
}

impl LogContext {
    /// Opens `<log_dir>/<log_name>` for appending and makes it the current
    /// thread's log sink.
    ///
    /// # Errors
    ///
    /// Returns [`TelemetryError::Filter`] for an invalid filter expression and
    /// [`TelemetryError::Io`] when the directory or file cannot be opened.
    pub fn open(config: &Config, unit_id: &str, log_name: &str) -> Result<Self, TelemetryError> {
        let filter = EnvFilter::try_new(config.log_filter())
            .map_err(|error| TelemetryError::Filter(error.to_string()))?;
        let path = config.log_dir().join(log_name);
        let file = open_append(config.log_dir(), &path)?;
        let subscriber = build_subscriber(config.log_format(), filter, file);

        let guard = tracing::subscriber::set_default(subscriber);
        let span = tracing::info_span!("unit", id = unit_id).entered();
        Ok(Self {
            path,
            _span: span,
            _guard: guard,
        })
    }

    /// Path of the log file.
    #[must_use]
    pub fn path(&self) -> &Utf8Path {
        self.path.as_path()
    }
}

fn open_append(dir: &Utf8Path, path: &Utf8Path) -> Result<File, TelemetryError> {
    let io_error = |source: io::Error| TelemetryError::Io {
        path: path.to_path_buf(),
        source: Arc::new(source),
    };
    fs::create_dir_all(dir).map_err(io_error)?;
    OpenOptions::new()
        .create(true)
        .append(true)
        .open(path)
        .map_err(io_error)
}

fn build_subscriber(
    format: LogFormat,
    filter: EnvFilter,
    file: File,
) -> Box<dyn Subscriber + Send + Sync> {
    let builder = fmt::Subscriber::builder()
        .with_env_filter(filter)
        .with_target(true)
        .with_level(true)
        .with_thread_ids(false)
        .with_thread_names(false)
        .with_writer(Mutex::new(file))
        .with_ansi(false)
        .with_timer(fmt::time::UtcTime::rfc_3339());

    match format {
        LogFormat::Json => Box::new(builder.json().flatten_event(true).finish()),
        LogFormat::Compact => Box::new(builder.compact().finish()),
        LogFormat::Pretty => Box::new(builder.pretty().finish()),
    }
}

#[cfg(test)]
mod tests {
    use rstest::rstest;
    use tempfile::TempDir;

    use super::*;

    fn config_in(dir: &TempDir, format: LogFormat) -> Config {
        let mut config = Config::default();
        config.log_dir = Utf8PathBuf::from_path_buf(dir.path().join("log")).expect("utf-8 path");
        config.log_format = format;
        config
    }

    #[rstest]
    #[case::json(LogFormat::Json)]
    #[case::compact(LogFormat::Compact)]
    #[case::pretty(LogFormat::Pretty)]
    fn events_reach_the_log_file(#[case] format: LogFormat) {
        let dir = TempDir::new().expect("temp dir");
        let config = config_in(&dir, format);
        let path = {
            let context = LogContext::open(&config, "file-tools", "units.log").expect("open");
            tracing::info!(operation = "read-file", "calling operation");
            context.path().to_path_buf()
        };

        let contents = fs::read_to_string(&path).expect("read log");
        assert!(contents.contains("calling operation"));
        assert!(contents.contains("read-file"));
    }

    #[test]
    fn dropping_the_context_stops_capture() {
        let dir = TempDir::new().expect("temp dir");
        let config = config_in(&dir, LogFormat::Compact);
        let context = LogContext::open(&config, "u", "units.log").expect("open");
        let path = context.path().to_path_buf();
        drop(context);
        tracing::info!("after drop");

        let contents = fs::read_to_string(&path).expect("read log");
        assert!(!contents.contains("after drop"));
    }

    #[test]
    fn filter_excludes_lower_levels() {
        let dir = TempDir::new().expect("temp dir");
        let config = config_in(&dir, LogFormat::Compact);
        let context = LogContext::open(&config, "u", "units.log").expect("open");
        tracing::debug!("hidden payload");
        tracing::info!("visible summary");
        let path = context.path().to_path_buf();
        drop(context);

        let contents = fs::read_to_string(&path).expect("read log");
        assert!(contents.contains("visible summary"));
        assert!(!contents.contains("hidden payload"));
    }

    #[test]
    fn invalid_filter_is_rejected() {
        let dir = TempDir::new().expect("temp dir");
        let mut config = config_in(&dir, LogFormat::Compact);
        config.log_filter = "unitkit=loudest".into();
        let err = LogContext::open(&config, "u", "units.log").expect_err("invalid filter");
        assert!(matches!(err, TelemetryError::Filter(_)));
    }
}
