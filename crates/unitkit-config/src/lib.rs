//! Shared configuration for unit processes.
//!
//! A unit is launched by its host once per request, so configuration is read
//! on every invocation. Values are layered by `ortho_config`: built-in
//! defaults, then an optional TOML file (`--config-path` or
//! `UNITKIT_CONFIG_PATH`), then `UNITKIT_*` environment variables, then
//! command-line flags.

mod defaults;
mod logging;
mod output;

use camino::{Utf8Path, Utf8PathBuf};
use ortho_config::OrthoConfig;
use serde::{Deserialize, Serialize};

pub use self::defaults::{
    DEFAULT_LOG_FILTER, DEFAULT_STORE_FILE_SUFFIX, default_error_channel, default_log_dir,
    default_log_filter, default_log_filter_string, default_log_format, default_manifest_format,
    default_store_dir,
};
pub use self::logging::{LogFormat, LogFormatParseError};
pub use self::output::{ErrorChannel, ManifestFormat};

/// Configuration consumed by every unit process.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize, OrthoConfig)]
#[ortho_config(prefix = "UNITKIT")]
pub struct Config {
    /// Filter expression applied to the unit's log sink.
    #[ortho_config(default = defaults::default_log_filter_string())]
    pub log_filter: String,
    /// Rendering used for log records.
    #[ortho_config(default = defaults::default_log_format())]
    pub log_format: LogFormat,
    /// Directory receiving per-unit log files.
    #[ortho_config(default = defaults::default_log_dir())]
    pub log_dir: Utf8PathBuf,
    /// Directory holding each unit's flat-file key-value store.
    #[ortho_config(default = defaults::default_store_dir())]
    pub store_dir: Utf8PathBuf,
    /// Channel receiving error text when an operation fails.
    #[ortho_config(default = defaults::default_error_channel())]
    pub error_channel: ErrorChannel,
    /// Wraps strict-mode errors in a JSON envelope carrying the error kind.
    #[ortho_config(default = false)]
    pub structured_errors: bool,
    /// Encoding used for the `describe` manifest.
    #[ortho_config(default = defaults::default_manifest_format())]
    pub manifest_format: ManifestFormat,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            log_filter: default_log_filter_string(),
            log_format: default_log_format(),
            log_dir: default_log_dir(),
            store_dir: default_store_dir(),
            error_channel: default_error_channel(),
            structured_errors: false,
            manifest_format: default_manifest_format(),
        }
    }
}

impl Config {
    /// Log filter expression.
    #[must_use]
    pub const fn log_filter(&self) -> &str {
        self.log_filter.as_str()
    }

    /// Log record rendering.
    #[must_use]
    pub const fn log_format(&self) -> LogFormat {
        self.log_format
    }

    /// Directory receiving log files.
    #[must_use]
    pub fn log_dir(&self) -> &Utf8Path {
        self.log_dir.as_path()
    }

    /// Directory holding key-value store files.
    #[must_use]
    pub fn store_dir(&self) -> &Utf8Path {
        self.store_dir.as_path()
    }

    /// Channel receiving error text.
    #[must_use]
    pub const fn error_channel(&self) -> ErrorChannel {
        self.error_channel
    }

    /// Whether strict-mode errors carry a JSON envelope.
    #[must_use]
    pub const fn structured_errors(&self) -> bool {
        self.structured_errors
    }

    /// Encoding used for manifests.
    #[must_use]
    pub const fn manifest_format(&self) -> ManifestFormat {
        self.manifest_format
    }

    /// Path of the store file for the given unit.
    #[must_use]
    pub fn store_path(&self, unit_id: &str) -> Utf8PathBuf {
        self.store_dir
            .join(format!("{unit_id}{DEFAULT_STORE_FILE_SUFFIX}"))
    }
}
