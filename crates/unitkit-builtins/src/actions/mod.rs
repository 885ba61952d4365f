//! File and build operations exposed by the built-in unit.
//!
//! [`FileTools`] owns the roots and toolchain the handlers share and turns
//! them into [`OperationDescriptor`]s. Each handler decodes its payload into a
//! typed request with [`parse_payload`], so the schema declared here and the
//! request structs must stay in step.

use std::sync::Arc;

use serde::Deserialize;
use tracing::debug;
use unitkit::schema::Argument;
use unitkit::{HandlerError, OperationDescriptor, parse_payload};

use crate::root::{RootError, SafeRoot};
use crate::toolchain::{BuildPipeline, ProcessToolchain, Toolchain};

/// Tracing target for built-in operations.
const ACTIONS_TARGET: &str = "unitkit_builtins::actions";

/// Reply to a successful `save-file`.
pub const SAVED: &str = "file saved successfully";
/// Reply to a successful `copy-file`.
pub const COPIED: &str = "file copied successfully";
/// Reply to a successful `build`.
pub const COMPILED: &str = "compile completed successfully";

/// Payload of `read-file`.
#[derive(Debug, Clone, Deserialize)]
pub struct ReadFileRequest {
    /// Directory of the file.
    pub dir: String,
    /// File name, optionally repeating `dir`.
    pub name: String,
}

/// Payload of `save-file`.
#[derive(Debug, Clone, Deserialize)]
pub struct SaveFileRequest {
    /// Directory of the file.
    pub dir: String,
    /// File name, optionally repeating `dir`.
    pub name: String,
    /// New contents.
    pub content: String,
}

/// Payload of `copy-file`.
#[derive(Debug, Clone, Deserialize)]
pub struct CopyFileRequest {
    /// Path inside the source root.
    pub src: String,
    /// Path inside the destination root.
    pub dest: String,
}

/// Payload of `build`.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BuildRequest {
    /// Directory in the source root holding the sources.
    pub working_dir: String,
    /// Directory in the destination root receiving the binary.
    #[serde(default)]
    pub output_dir: String,
    /// Binary file name.
    pub output_name: String,
}

impl From<RootError> for HandlerError {
    fn from(error: RootError) -> Self {
        match error {
            RootError::Escape { .. } => Self::failed(error.to_string()),
            RootError::Io {
                action,
                path,
                source,
            } => Self::Io {
                message: format!("{action} at {path}"),
                source,
            },
        }
    }
}

/// Shared state behind the built-in file and build operations.
#[derive(Clone)]
pub struct FileTools {
    source: Arc<SafeRoot>,
    dest: Arc<SafeRoot>,
    toolchain: Arc<dyn Toolchain>,
    pipeline: Arc<BuildPipeline>,
}

impl std::fmt::Debug for FileTools {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FileTools")
            .field("source", &self.source.path())
            .field("dest", &self.dest.path())
            .field("pipeline", &self.pipeline)
            .finish_non_exhaustive()
    }
}

impl FileTools {
    /// Uses `root` as both source and destination, with the Go pipeline run
    /// by [`ProcessToolchain`].
    #[must_use]
    pub fn new(root: SafeRoot) -> Self {
        let shared = Arc::new(root);
        Self {
            source: Arc::clone(&shared),
            dest: shared,
            toolchain: Arc::new(ProcessToolchain),
            pipeline: Arc::new(BuildPipeline::go()),
        }
    }

    /// Sends copies and build output to a separate root.
    #[must_use]
    pub fn with_destination(mut self, dest: SafeRoot) -> Self {
        self.dest = Arc::new(dest);
        self
    }

    /// Replaces the toolchain running build steps.
    #[must_use]
    pub fn with_toolchain(mut self, toolchain: impl Toolchain + 'static) -> Self {
        self.toolchain = Arc::new(toolchain);
        self
    }

    /// Replaces the build pipeline.
    #[must_use]
    pub fn with_pipeline(mut self, pipeline: BuildPipeline) -> Self {
        self.pipeline = Arc::new(pipeline);
        self
    }

    /// Root reads and sources come from.
    #[must_use]
    pub fn source(&self) -> &SafeRoot {
        &self.source
    }

    /// Root copies and binaries go to.
    #[must_use]
    pub fn destination(&self) -> &SafeRoot {
        &self.dest
    }

    /// Returns the file contents.
    ///
    /// # Errors
    ///
    /// Fails when the path escapes the source root or cannot be read.
    pub fn read_file(&self, request: &ReadFileRequest) -> Result<String, HandlerError> {
        let path = self.source.resolve_in(&request.dir, &request.name)?;
        debug!(target: ACTIONS_TARGET, %path, "reading file");
        Ok(self.source.read_to_string(&path)?)
    }

    /// Writes the file, creating missing directories.
    ///
    /// # Errors
    ///
    /// Fails when the path escapes the source root or cannot be written.
    pub fn save_file(&self, request: &SaveFileRequest) -> Result<String, HandlerError> {
        let path = self.source.resolve_in(&request.dir, &request.name)?;
        debug!(target: ACTIONS_TARGET, %path, bytes = request.content.len(), "saving file");
        self.source.write(&path, &request.content)?;
        Ok(SAVED.to_owned())
    }

    /// Copies a file from the source root to the destination root.
    ///
    /// # Errors
    ///
    /// Fails when either path escapes its root or the copy fails.
    pub fn copy_file(&self, request: &CopyFileRequest) -> Result<String, HandlerError> {
        let from = self.source.resolve(&request.src)?;
        let to = self.dest.resolve(&request.dest)?;
        debug!(target: ACTIONS_TARGET, %from, %to, "copying file");
        self.source.copy_to(&from, &self.dest, &to)?;
        Ok(COPIED.to_owned())
    }

    /// Lists every directory under the source root, one absolute path per
    /// line.
    ///
    /// # Errors
    ///
    /// Fails when a directory cannot be read.
    pub fn list_directories(&self) -> Result<String, HandlerError> {
        let found = self.source.list_directories()?;
        Ok(found
            .iter()
            .map(|path| path.as_str())
            .collect::<Vec<_>>()
            .join("\n"))
    }

    /// Runs the build pipeline for the working directory.
    ///
    /// # Errors
    ///
    /// Fails when a path escapes its root or any build step fails.
    pub fn build(&self, request: &BuildRequest) -> Result<String, HandlerError> {
        let working_dir = self.source.absolute(&self.source.resolve(&request.working_dir)?);
        let output_dir = self.dest.resolve(&request.output_dir)?;
        self.dest.create_dir_all(&output_dir)?;
        let output = self
            .dest
            .absolute(&self.dest.resolve_in(&request.output_dir, &request.output_name)?);
        debug!(target: ACTIONS_TARGET, %working_dir, %output, "building binary");
        self.pipeline
            .run(self.toolchain.as_ref(), &working_dir, &output)?;
        Ok(COMPILED.to_owned())
    }

    /// Descriptors for every built-in operation, in registration order.
    #[must_use]
    pub fn descriptors(&self) -> Vec<OperationDescriptor> {
        vec![
            self.read_file_descriptor(),
            self.save_file_descriptor(),
            self.copy_file_descriptor(),
            self.list_directories_descriptor(),
            self.build_descriptor(),
        ]
    }

    fn read_file_descriptor(&self) -> OperationDescriptor {
        let tools = self.clone();
        OperationDescriptor::action(
            "read-file",
            move |payload: &str| -> Result<String, HandlerError> {
                tools.read_file(&parse_payload(payload)?)
            },
        )
        .with_description("reads a file")
        .with_argument(dir_argument())
        .with_argument(name_argument())
    }

    fn save_file_descriptor(&self) -> OperationDescriptor {
        let tools = self.clone();
        OperationDescriptor::action(
            "save-file",
            move |payload: &str| -> Result<String, HandlerError> {
                tools.save_file(&parse_payload(payload)?)
            },
        )
        .with_description("saves a file")
        .with_argument(dir_argument())
        .with_argument(name_argument())
        .with_argument(Argument::string("content", "the contents of the file").required())
    }

    fn copy_file_descriptor(&self) -> OperationDescriptor {
        let tools = self.clone();
        OperationDescriptor::action(
            "copy-file",
            move |payload: &str| -> Result<String, HandlerError> {
                tools.copy_file(&parse_payload(payload)?)
            },
        )
        .with_description("copies a file")
        .with_argument(Argument::string("src", "the path of the source file").required())
        .with_argument(Argument::string("dest", "the path of the destination file").required())
    }

    fn list_directories_descriptor(&self) -> OperationDescriptor {
        let tools = self.clone();
        OperationDescriptor::action(
            "list-directories",
            move |_payload: &str| -> Result<String, HandlerError> { tools.list_directories() },
        )
        .with_description("lists the directories in a directory")
    }

    fn build_descriptor(&self) -> OperationDescriptor {
        let tools = self.clone();
        OperationDescriptor::action(
            "build",
            move |payload: &str| -> Result<String, HandlerError> {
                tools.build(&parse_payload(payload)?)
            },
        )
        .with_description("compiles and builds a binary from go source code")
        .with_argument(
            Argument::string(
                "workingDir",
                "the working directory that contains the source code",
            )
            .required(),
        )
        .with_argument(Argument::string(
            "outputDir",
            "the output directory of the binary",
        ))
        .with_argument(
            Argument::string(
                "outputName",
                "the filename of the output binary without the directory",
            )
            .required(),
        )
    }
}

fn dir_argument() -> Argument {
    Argument::string("dir", "the directory of the file").required()
}

fn name_argument() -> Argument {
    Argument::string("name", "the name of the file without the directory").required()
}
