//! Capability-scoped directory roots for the file operations.
//!
//! A [`SafeRoot`] wraps a `cap_std` directory handle, so every file access
//! is resolved relative to the root and cannot leave it. Host-supplied paths
//! are normalised first: absolute paths under the root lose the root prefix,
//! and anything containing `..` or an absolute path outside the root is
//! rejected before touching the filesystem.

use std::env;
use std::io;
use std::sync::Arc;

use camino::{Utf8Component, Utf8Path, Utf8PathBuf};
use cap_std::ambient_authority;
use cap_std::fs::Dir;
use thiserror::Error;

/// Name of directories skipped when listing.
const SKIPPED_DIRECTORY: &str = ".git";

/// Failure to resolve or access a path inside a root.
#[derive(Debug, Clone, Error)]
pub enum RootError {
    /// The path would leave the root.
    #[error("path is not within the safe directory: {path}")]
    Escape {
        /// Path as supplied.
        path: String,
    },

    /// A filesystem operation failed.
    #[error("{action} at {path}: {source}")]
    Io {
        /// What was being attempted.
        action: &'static str,
        /// Path involved.
        path: Utf8PathBuf,
        /// Underlying I/O error.
        #[source]
        source: Arc<io::Error>,
    },
}

impl RootError {
    fn io<'a>(action: &'static str, path: &'a Utf8Path) -> impl FnOnce(io::Error) -> Self + 'a {
        move |source| Self::Io {
            action,
            path: path.to_path_buf(),
            source: Arc::new(source),
        }
    }
}

/// A directory the file operations are confined to.
#[derive(Debug)]
pub struct SafeRoot {
    path: Utf8PathBuf,
    dir: Dir,
}

impl SafeRoot {
    /// Opens `path` as a root, resolving relative paths against the current
    /// directory.
    ///
    /// # Errors
    ///
    /// Returns [`RootError::Io`] when the directory cannot be opened.
    pub fn open(path: &Utf8Path) -> Result<Self, RootError> {
        let absolute = if path.is_absolute() {
            path.to_path_buf()
        } else {
            let current = env::current_dir()
                .map_err(RootError::io("error while reading current directory", path))?;
            let cwd = Utf8PathBuf::from_path_buf(current).map_err(|raw| RootError::Io {
                action: "error while reading current directory",
                path: path.to_path_buf(),
                source: Arc::new(io::Error::new(
                    io::ErrorKind::InvalidData,
                    format!("non UTF-8 path {}", raw.display()),
                )),
            })?;
            cwd.join(path)
        };
        let dir = Dir::open_ambient_dir(&absolute, ambient_authority())
            .map_err(RootError::io("error while opening safe directory", &absolute))?;
        Ok(Self {
            path: absolute,
            dir,
        })
    }

    /// Absolute path of the root.
    #[must_use]
    pub fn path(&self) -> &Utf8Path {
        self.path.as_path()
    }

    /// Resolves a host path to a path relative to the root.
    ///
    /// # Errors
    ///
    /// Returns [`RootError::Escape`] for paths outside the root.
    pub fn resolve(&self, path: &str) -> Result<Utf8PathBuf, RootError> {
        let escape = || RootError::Escape {
            path: path.to_owned(),
        };
        let candidate = Utf8Path::new(path);
        let relative = if candidate.is_absolute() {
            candidate.strip_prefix(&self.path).map_err(|_| escape())?
        } else {
            candidate
        };

        let mut resolved = Utf8PathBuf::new();
        for component in relative.components() {
            match component {
                Utf8Component::Normal(part) => resolved.push(part),
                Utf8Component::CurDir => {}
                Utf8Component::ParentDir | Utf8Component::RootDir | Utf8Component::Prefix(_) => {
                    return Err(escape());
                }
            }
        }
        Ok(resolved)
    }

    /// Resolves `name` inside `dir`. A `name` that repeats `dir` as a prefix
    /// is not nested twice.
    ///
    /// # Errors
    ///
    /// Returns [`RootError::Escape`] when either part leaves the root.
    pub fn resolve_in(&self, dir: &str, name: &str) -> Result<Utf8PathBuf, RootError> {
        let base = self.resolve(dir)?;
        match Utf8Path::new(name).strip_prefix(dir) {
            Ok(rest) if !dir.is_empty() => Ok(base.join(self.resolve(rest.as_str())?)),
            _ if Utf8Path::new(name).is_absolute() => self.resolve(name),
            _ => Ok(base.join(self.resolve(name)?)),
        }
    }

    /// Absolute form of a resolved relative path.
    #[must_use]
    pub fn absolute(&self, relative: &Utf8Path) -> Utf8PathBuf {
        self.path.join(relative)
    }

    /// Reads a file as UTF-8 text.
    ///
    /// # Errors
    ///
    /// Returns [`RootError::Io`] when the file cannot be read.
    pub fn read_to_string(&self, relative: &Utf8Path) -> Result<String, RootError> {
        self.dir
            .read_to_string(relative)
            .map_err(RootError::io("error while reading file", relative))
    }

    /// Writes a file, creating missing parent directories.
    ///
    /// # Errors
    ///
    /// Returns [`RootError::Io`] when a directory or the file cannot be
    /// written.
    pub fn write(&self, relative: &Utf8Path, contents: &str) -> Result<(), RootError> {
        self.create_parent(relative)?;
        self.dir
            .write(relative, contents)
            .map_err(RootError::io("error while writing file", relative))
    }

    /// Copies a file from this root into `dest`, creating missing parent
    /// directories there.
    ///
    /// # Errors
    ///
    /// Returns [`RootError::Io`] when the copy fails.
    pub fn copy_to(
        &self,
        from: &Utf8Path,
        dest: &Self,
        to: &Utf8Path,
    ) -> Result<u64, RootError> {
        dest.create_parent(to)?;
        self.dir
            .copy(from, &dest.dir, to)
            .map_err(RootError::io("error while copying file", from))
    }

    /// Creates a directory and its parents.
    ///
    /// # Errors
    ///
    /// Returns [`RootError::Io`] when the directory cannot be created.
    pub fn create_dir_all(&self, relative: &Utf8Path) -> Result<(), RootError> {
        if relative.as_str().is_empty() {
            return Ok(());
        }
        self.dir
            .create_dir_all(relative)
            .map_err(RootError::io("error while making the directory", relative))
    }

    /// Lists every directory under the root, the root first, as absolute
    /// paths in name order. `.git` directories are skipped.
    ///
    /// # Errors
    ///
    /// Returns [`RootError::Io`] when a directory cannot be read.
    pub fn list_directories(&self) -> Result<Vec<Utf8PathBuf>, RootError> {
        let mut found = vec![self.path.clone()];
        walk(&self.dir, &self.path, &mut found)?;
        Ok(found)
    }

    fn create_parent(&self, relative: &Utf8Path) -> Result<(), RootError> {
        match relative.parent() {
            Some(parent) => self.create_dir_all(parent),
            None => Ok(()),
        }
    }
}

fn walk(dir: &Dir, path: &Utf8Path, found: &mut Vec<Utf8PathBuf>) -> Result<(), RootError> {
    let entries = dir
        .entries()
        .map_err(RootError::io("error while walking directory", path))?;

    let mut children = Vec::new();
    for item in entries {
        let entry = item.map_err(RootError::io("error while walking directory", path))?;
        let is_dir = entry
            .file_type()
            .map_err(RootError::io("error while walking directory", path))?
            .is_dir();
        let Ok(name) = entry.file_name().into_string() else {
            continue;
        };
        if is_dir && name != SKIPPED_DIRECTORY {
            children.push(name);
        }
    }
    children.sort();

    for name in children {
        let child_path = path.join(&name);
        let child = dir
            .open_dir(&name)
            .map_err(RootError::io("error while walking directory", &child_path))?;
        found.push(child_path.clone());
        walk(&child, &child_path, found)?;
    }
    Ok(())
}

#[cfg(test)]
mod tests;
