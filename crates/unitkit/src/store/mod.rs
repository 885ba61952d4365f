//! Flat-file key-value store kept per unit.
//!
//! Each unit owns `<store_dir>/<unit-id>.config`, one `key=value` pair per
//! line split at the first `=`. Lines without `=` are carried through
//! rewrites untouched.

use std::collections::BTreeMap;
use std::fs;
use std::io;
use std::sync::Arc;

use camino::{Utf8Path, Utf8PathBuf};
use thiserror::Error;
use tracing::debug;
use unitkit_config::DEFAULT_STORE_FILE_SUFFIX;

/// Tracing target for store access.
const STORE_TARGET: &str = "unitkit::store";

/// Failure to read or write a store file.
#[derive(Debug, Clone, Error)]
pub enum StoreError {
    /// Reading the store file failed.
    #[error("error while reading config file {path}: {source}")]
    Read {
        /// Store file path.
        path: Utf8PathBuf,
        /// Underlying I/O error.
        #[source]
        source: Arc<io::Error>,
    },

    /// Writing the store file failed.
    #[error("error while writing config file {path}: {source}")]
    Write {
        /// Store file path.
        path: Utf8PathBuf,
        /// Underlying I/O error.
        #[source]
        source: Arc<io::Error>,
    },
}

/// Handle to one unit's store file.
///
/// # Example
///
/// ```no_run
/// use camino::Utf8Path;
/// use unitkit::store::ConfigStore;
///
/// let store = ConfigStore::for_unit(Utf8Path::new("/home/me/.unitkit/units"), "file-tools");
/// store.set("theme", "dark")?;
/// assert_eq!(store.get("theme", "light")?, "dark");
/// # Ok::<(), unitkit::store::StoreError>(())
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConfigStore {
    path: Utf8PathBuf,
}

impl ConfigStore {
    /// Store for `unit_id` inside `store_dir`.
    #[must_use]
    pub fn for_unit(store_dir: &Utf8Path, unit_id: &str) -> Self {
        Self {
            path: store_dir.join(format!("{unit_id}{DEFAULT_STORE_FILE_SUFFIX}")),
        }
    }

    /// Store backed by an explicit file.
    #[must_use]
    pub fn at(path: impl Into<Utf8PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// Path of the backing file.
    #[must_use]
    pub fn path(&self) -> &Utf8Path {
        self.path.as_path()
    }

    /// Returns the first value stored under `key`, or `default`.
    ///
    /// A missing file yields the default.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::Read`] when the file exists but cannot be read.
    pub fn get(&self, key: &str, default: &str) -> Result<String, StoreError> {
        let contents = self.read()?;
        let value = contents
            .lines()
            .filter_map(|line| line.split_once('='))
            .find(|(candidate, _)| *candidate == key)
            .map_or_else(|| default.to_owned(), |(_, value)| value.to_owned());
        Ok(value)
    }

    /// Stores `value` under `key`, rewriting existing entries in place or
    /// appending a new line. The directory and file are created as needed.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::Read`] or [`StoreError::Write`] on I/O failure.
    pub fn set(&self, key: &str, value: &str) -> Result<(), StoreError> {
        let contents = self.read()?;
        let mut updated = false;
        let mut lines: Vec<String> = contents
            .lines()
            .map(|line| match line.split_once('=') {
                Some((candidate, _)) if candidate == key => {
                    updated = true;
                    format!("{key}={value}")
                }
                _ => line.to_owned(),
            })
            .collect();
        if !updated {
            lines.push(format!("{key}={value}"));
        }

        let mut rendered = lines.join("\n");
        rendered.push('\n');
        self.write(&rendered)?;
        debug!(target: STORE_TARGET, path = %self.path, key, updated, "config value stored");
        Ok(())
    }

    /// Returns every pair in the file; later duplicates win.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::Read`] when the file exists but cannot be read.
    pub fn map(&self) -> Result<BTreeMap<String, String>, StoreError> {
        let contents = self.read()?;
        Ok(contents
            .lines()
            .filter_map(|line| line.split_once('='))
            .map(|(key, value)| (key.to_owned(), value.to_owned()))
            .collect())
    }

    fn read(&self) -> Result<String, StoreError> {
        match fs::read_to_string(&self.path) {
            Ok(contents) => Ok(contents),
            Err(error) if error.kind() == io::ErrorKind::NotFound => Ok(String::new()),
            Err(error) => Err(StoreError::Read {
                path: self.path.clone(),
                source: Arc::new(error),
            }),
        }
    }

    fn write(&self, contents: &str) -> Result<(), StoreError> {
        let write_error = |source: io::Error| StoreError::Write {
            path: self.path.clone(),
            source: Arc::new(source),
        };
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent).map_err(write_error)?;
        }
        fs::write(&self.path, contents).map_err(write_error)
    }
}
