use camino::Utf8PathBuf;
use std::env;

use crate::logging::LogFormat;
use crate::output::{ErrorChannel, ManifestFormat};

/// Default log filter expression used by unit processes.
pub const DEFAULT_LOG_FILTER: &str = "info";

/// Suffix appended to a unit id to name its key-value store file.
pub const DEFAULT_STORE_FILE_SUFFIX: &str = ".config";

/// Name of the per-user directory holding unit artefacts.
const BASE_DIR_NAME: &str = ".unitkit";

/// Default log filter expression used by unit processes.
#[must_use]
pub const fn default_log_filter() -> &'static str {
    DEFAULT_LOG_FILTER
}

/// Owned log filter value used where allocation is required (e.g. serde).
#[must_use]
pub fn default_log_filter_string() -> String {
    DEFAULT_LOG_FILTER.to_owned()
}

/// Default rendering for log records.
#[must_use]
pub const fn default_log_format() -> LogFormat {
    LogFormat::Pretty
}

/// Hosts written against the original protocol read errors from stdout.
#[must_use]
pub const fn default_error_channel() -> ErrorChannel {
    ErrorChannel::Stdout
}

/// Default manifest encoding.
#[must_use]
pub const fn default_manifest_format() -> ManifestFormat {
    ManifestFormat::Json
}

/// Default directory for per-unit log files (`~/.unitkit/log`).
#[must_use]
pub fn default_log_dir() -> Utf8PathBuf {
    base_directory().join("log")
}

/// Default directory for key-value store files (`~/.unitkit/units`).
#[must_use]
pub fn default_store_dir() -> Utf8PathBuf {
    base_directory().join("units")
}

fn base_directory() -> Utf8PathBuf {
    let mut base = home_directory().unwrap_or_else(fallback_directory);
    base.push(BASE_DIR_NAME);
    base
}

fn home_directory() -> Option<Utf8PathBuf> {
    dirs::home_dir().and_then(|path| Utf8PathBuf::from_path_buf(path).ok())
}

fn fallback_directory() -> Utf8PathBuf {
    let candidate = env::temp_dir();
    Utf8PathBuf::from_path_buf(candidate).unwrap_or_else(|_| Utf8PathBuf::from("/tmp"))
}
