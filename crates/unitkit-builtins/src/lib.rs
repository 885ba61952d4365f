//! Built-in file and build operations for unit processes.
//!
//! The operations are ordinary handlers registered through
//! [`unitkit::Unit::register`]. Every path they touch is resolved inside a
//! [`SafeRoot`], and the `build` operation drives an external toolchain with a
//! bounded wait per step. The `unitkit-files` binary wires them to stdio
//! through [`run`].

pub mod actions;
pub mod root;
pub mod toolchain;

#[cfg(test)]
mod tests;

use std::ffi::OsString;
use std::process::ExitCode;
use std::sync::Arc;

use camino::Utf8Path;
use ortho_config::OrthoConfig;
use thiserror::Error;
use unitkit::{RegistryError, Unit};
use unitkit_config::Config;

pub use self::actions::{
    BuildRequest, COMPILED, COPIED, CopyFileRequest, FileTools, ReadFileRequest, SAVED,
    SaveFileRequest,
};
pub use self::root::{RootError, SafeRoot};
pub use self::toolchain::{
    BuildPipeline, BuildStep, DEFAULT_STEP_TIMEOUT, Invocation, ProcessToolchain, Toolchain,
};

/// Display name of the unit served by `unitkit-files`.
pub const UNIT_NAME: &str = "Files";

/// Description of the unit served by `unitkit-files`.
pub const UNIT_DESCRIPTION: &str = "reads, writes, copies and builds files in the working directory";

/// Failure to start the `unitkit-files` unit.
#[derive(Debug, Error)]
pub enum StartupError {
    /// Configuration could not be loaded.
    #[error("failed to load configuration: {0}")]
    LoadConfiguration(Arc<ortho_config::OrthoError>),
    /// The working directory could not be opened as a root.
    #[error("failed to open working directory: {0}")]
    OpenRoot(#[from] RootError),
    /// A built-in operation could not be registered.
    #[error("failed to register operation: {0}")]
    Register(#[from] RegistryError),
}

/// Registers every built-in operation on `unit`.
///
/// # Errors
///
/// Returns a [`RegistryError`] if an id is rejected.
pub fn register_builtins(unit: &mut Unit, tools: &FileTools) -> Result<(), RegistryError> {
    for descriptor in tools.descriptors() {
        unit.register(descriptor)?;
    }
    Ok(())
}

/// Builds the simple unit exposing the built-ins over `tools`.
///
/// # Errors
///
/// Returns a [`RegistryError`] if an id is rejected.
pub fn files_unit(tools: &FileTools) -> Result<Unit, RegistryError> {
    let mut unit = Unit::simple(UNIT_NAME, UNIT_DESCRIPTION);
    register_builtins(&mut unit, tools)?;
    Ok(unit)
}

/// Loads configuration from `args`, roots the built-ins at `root` and serves
/// one request from stdin.
///
/// # Errors
///
/// Returns a [`StartupError`] when the unit cannot be assembled. Failures of
/// the request itself are reported through the returned exit code.
pub fn run<I, T>(args: I, root: &Utf8Path) -> Result<ExitCode, StartupError>
where
    I: IntoIterator<Item = T>,
    T: Into<OsString> + Clone,
{
    let config = Config::load_from_iter(args).map_err(StartupError::LoadConfiguration)?;
    let tools = FileTools::new(SafeRoot::open(root)?);
    let unit = files_unit(&tools)?;
    Ok(unit.respond(&config))
}
