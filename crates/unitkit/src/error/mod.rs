//! Domain errors raised while registering and dispatching operations.
//!
//! All errors use `thiserror`-derived enums with structured context so callers
//! can inspect the failure programmatically. I/O errors are wrapped in `Arc`
//! to satisfy the `result_large_err` Clippy lint and keep the enums `Clone`.

use std::sync::Arc;

use serde::Serialize;
use thiserror::Error;

/// Failure reported by an operation handler.
///
/// The display text is what the host receives, so handler-supplied messages
/// and subprocess stderr are rendered verbatim.
#[derive(Debug, Clone, Error)]
pub enum HandlerError {
    /// The handler reported a domain failure.
    #[error("{message}")]
    Failed {
        /// Message passed through to the host unchanged.
        message: String,
    },

    /// The payload did not match what the handler expects.
    #[error("invalid arguments: {message}")]
    InvalidArguments {
        /// Description of the mismatch.
        message: String,
    },

    /// An external process exceeded its time budget and was killed.
    #[error("'{program}' timed out after {timeout_secs}s")]
    Timeout {
        /// Program that was running.
        program: String,
        /// Budget in seconds.
        timeout_secs: u64,
    },

    /// An external process exited unsuccessfully.
    #[error("{stderr}")]
    NonZeroExit {
        /// Program that was running.
        program: String,
        /// Exit status, or `-1` when terminated by a signal.
        status: i32,
        /// Standard error captured from the process.
        stderr: String,
    },

    /// An I/O operation failed inside the handler.
    #[error("{message}: {source}")]
    Io {
        /// What the handler was doing.
        message: String,
        /// Underlying I/O error.
        #[source]
        source: Arc<std::io::Error>,
    },
}

impl HandlerError {
    /// Creates a domain failure with the given message.
    #[must_use]
    pub fn failed(message: impl Into<String>) -> Self {
        Self::Failed {
            message: message.into(),
        }
    }

    /// Creates an argument validation failure.
    #[must_use]
    pub fn invalid_arguments(message: impl Into<String>) -> Self {
        Self::InvalidArguments {
            message: message.into(),
        }
    }

    /// Wraps an I/O error with context.
    #[must_use]
    pub fn io(message: impl Into<String>, source: std::io::Error) -> Self {
        Self::Io {
            message: message.into(),
            source: Arc::new(source),
        }
    }
}

/// Failure to turn the input stream into a well-formed request.
#[derive(Debug, Clone, Error)]
pub enum DecodeError {
    /// Reading the underlying stream failed.
    #[error("error while scanning: {source}")]
    Read {
        /// Underlying I/O error.
        #[source]
        source: Arc<std::io::Error>,
    },

    /// The payload does not satisfy the operation's argument schema.
    #[error("invalid arguments for '{operation}': {message}")]
    InvalidArguments {
        /// Operation whose schema rejected the payload.
        operation: String,
        /// Description of the violation.
        message: String,
    },
}

/// Failure to register an operation.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RegistryError {
    /// The operation name slugified to an empty id.
    #[error("operation name '{name}' does not produce a usable id")]
    EmptyId {
        /// Name supplied at registration.
        name: String,
    },

    /// The id is reserved for a built-in meta-operation.
    #[error("operation id '{id}' is reserved")]
    ReservedId {
        /// The reserved id.
        id: String,
    },
}

/// Failure to build a unit from a profile document.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ProfileError {
    /// The document is not valid TOML or has fields of the wrong type.
    #[error("invalid unit profile: {message}")]
    Parse {
        /// Parser error text.
        message: String,
    },

    /// Neither `static_id` nor `name` produces a usable id.
    #[error("unit profile '{name}' does not produce a usable id")]
    EmptyId {
        /// Name found in the document.
        name: String,
    },
}

/// Terminal failure of a single dispatch.
#[derive(Debug, Clone, Error)]
pub enum DispatchError {
    /// The request could not be decoded or its payload failed validation.
    #[error(transparent)]
    Decode(#[from] DecodeError),

    /// No operation is registered under the requested id.
    #[error("unknown operation: {id}")]
    UnknownOperation {
        /// Id sent by the host.
        id: String,
    },

    /// The handler reported a failure.
    #[error("{source}")]
    Handler {
        /// Operation that failed.
        operation: String,
        /// Error produced by the handler.
        #[source]
        source: HandlerError,
    },

    /// A manifest or result could not be serialised.
    #[error("error while encoding {subject}: {message}")]
    Encoding {
        /// What was being encoded.
        subject: String,
        /// Serialiser error text.
        message: String,
    },
}

impl DispatchError {
    /// Returns the stable classification of this error.
    #[must_use]
    pub const fn kind(&self) -> ErrorKind {
        match self {
            Self::Decode(_) => ErrorKind::Decode,
            Self::UnknownOperation { .. } => ErrorKind::UnknownOperation,
            Self::Handler { .. } => ErrorKind::Handler,
            Self::Encoding { .. } => ErrorKind::Encoding,
        }
    }

    /// Returns `timeout` or `non_zero_exit` for handler failures raised by
    /// an external process.
    #[must_use]
    pub const fn cause(&self) -> Option<&'static str> {
        match self {
            Self::Handler {
                source: HandlerError::Timeout { .. },
                ..
            } => Some("timeout"),
            Self::Handler {
                source: HandlerError::NonZeroExit { .. },
                ..
            } => Some("non_zero_exit"),
            _ => None,
        }
    }
}

/// Classification of a [`DispatchError`] exposed to hosts that opt in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    /// Malformed input or payload.
    #[serde(rename = "decode_error")]
    Decode,
    /// Unregistered operation id.
    UnknownOperation,
    /// Handler-reported failure.
    #[serde(rename = "handler_error")]
    Handler,
    /// Serialisation failure.
    #[serde(rename = "encoding_error")]
    Encoding,
}

impl ErrorKind {
    /// Returns the canonical string representation.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Decode => "decode_error",
            Self::UnknownOperation => "unknown_operation",
            Self::Handler => "handler_error",
            Self::Encoding => "encoding_error",
        }
    }
}

impl std::fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}
