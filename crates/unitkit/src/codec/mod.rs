//! Wire codec for the one-shot request/response protocol.
//!
//! A request is a line-oriented stream:
//!
//! ```text
//! <operation-id>\n
//! <ignored-delimiter-line>\n
//! <payload line 1>\n
//! ...
//! ```
//!
//! Only `\n` separates lines. The operation id is kept verbatim, the second
//! line is discarded whatever it contains, and the remaining lines are joined
//! with `\n` to rebuild the payload.
//!
//! Responses are written by [`ResponseEncoder`]. Success output is copied
//! byte-for-byte. Errors follow the configured [`ErrorChannel`]: the legacy
//! single-channel mode writes the message to standard output and exits
//! successfully, while the strict mode leaves standard output empty, writes to
//! standard error and exits with a failure status.

use std::io::{self, BufRead, Write};
use std::process::ExitCode;
use std::sync::Arc;

use serde::Serialize;
use unitkit_config::{Config, ErrorChannel};

use crate::error::{DecodeError, DispatchError, ErrorKind};

/// A decoded request.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Request {
    operation: String,
    payload: String,
}

impl Request {
    /// Creates a request from its parts.
    #[must_use]
    pub fn new(operation: impl Into<String>, payload: impl Into<String>) -> Self {
        Self {
            operation: operation.into(),
            payload: payload.into(),
        }
    }

    /// Operation id exactly as received.
    #[must_use]
    pub const fn operation(&self) -> &str {
        self.operation.as_str()
    }

    /// Reassembled payload text.
    #[must_use]
    pub const fn payload(&self) -> &str {
        self.payload.as_str()
    }

    /// Splits the request into its operation id and payload.
    #[must_use]
    pub fn into_parts(self) -> (String, String) {
        (self.operation, self.payload)
    }
}

/// Decodes one request from the stream, reading until end of input.
///
/// An empty stream yields an empty operation id and payload.
///
/// # Errors
///
/// Returns [`DecodeError::Read`] when the stream cannot be read or is not
/// valid UTF-8.
///
/// # Example
///
/// ```
/// use unitkit::codec::decode_request;
///
/// let mut input = "read-file\n---\n{\"dir\":\n\"/tmp\"}\n".as_bytes();
/// let request = decode_request(&mut input).expect("decode");
/// assert_eq!(request.operation(), "read-file");
/// assert_eq!(request.payload(), "{\"dir\":\n\"/tmp\"}");
/// ```
pub fn decode_request(reader: &mut impl BufRead) -> Result<Request, DecodeError> {
    let operation = next_line(reader)?.unwrap_or_default();
    let _delimiter = next_line(reader)?;

    let mut lines = Vec::new();
    while let Some(line) = next_line(reader)? {
        lines.push(line);
    }

    Ok(Request {
        operation,
        payload: lines.join("\n"),
    })
}

fn next_line(reader: &mut impl BufRead) -> Result<Option<String>, DecodeError> {
    let mut buffer = Vec::new();
    let read = reader.read_until(b'\n', &mut buffer).map_err(read_error)?;
    if read == 0 {
        return Ok(None);
    }
    if buffer.last() == Some(&b'\n') {
        buffer.pop();
    }
    String::from_utf8(buffer)
        .map(Some)
        .map_err(|error| read_error(io::Error::new(io::ErrorKind::InvalidData, error)))
}

fn read_error(source: io::Error) -> DecodeError {
    DecodeError::Read {
        source: Arc::new(source),
    }
}

/// Builds a request stream the way a host writes one.
///
/// The payload is split on `\n` and every segment is written as its own line
/// after a `---` delimiter, so [`decode_request`] restores it exactly.
#[must_use]
pub fn encode_request(operation: &str, payload: &str) -> String {
    let mut stream = format!("{operation}\n---\n");
    for line in payload.split('\n') {
        stream.push_str(line);
        stream.push('\n');
    }
    stream
}

/// Process outcome after a response has been written.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Exit {
    /// Exit status zero.
    Success,
    /// Non-zero exit status.
    Failure,
}

impl From<Exit> for ExitCode {
    fn from(exit: Exit) -> Self {
        match exit {
            Exit::Success => Self::SUCCESS,
            Exit::Failure => Self::FAILURE,
        }
    }
}

#[derive(Serialize)]
struct ErrorEnvelope<'a> {
    error: ErrorBody<'a>,
}

#[derive(Serialize)]
struct ErrorBody<'a> {
    kind: ErrorKind,
    message: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    cause: Option<&'static str>,
}

/// Writes dispatch results to the output channels.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct ResponseEncoder {
    channel: ErrorChannel,
    structured: bool,
}

impl ResponseEncoder {
    /// Creates an encoder for the given error channel.
    ///
    /// `structured` only affects [`ErrorChannel::Stderr`].
    #[must_use]
    pub const fn new(channel: ErrorChannel, structured: bool) -> Self {
        Self {
            channel,
            structured,
        }
    }

    /// Creates an encoder from the unit configuration.
    #[must_use]
    pub const fn from_config(config: &Config) -> Self {
        Self::new(config.error_channel(), config.structured_errors())
    }

    /// Channel receiving error text.
    #[must_use]
    pub const fn channel(&self) -> ErrorChannel {
        self.channel
    }

    /// Writes a successful result to `out` unchanged.
    ///
    /// # Errors
    ///
    /// Returns any error raised by the writer.
    pub fn write_success(&self, out: &mut impl Write, output: &str) -> io::Result<Exit> {
        out.write_all(output.as_bytes())?;
        out.flush()?;
        Ok(Exit::Success)
    }

    /// Writes an error according to the configured channel.
    ///
    /// # Errors
    ///
    /// Returns any error raised by the writers.
    pub fn write_error(
        &self,
        out: &mut impl Write,
        err: &mut impl Write,
        error: &DispatchError,
    ) -> io::Result<Exit> {
        let message = error.to_string();
        match self.channel {
            ErrorChannel::Stdout => {
                out.write_all(message.as_bytes())?;
                out.flush()?;
                Ok(Exit::Success)
            }
            ErrorChannel::Stderr => {
                if self.structured {
                    let envelope = ErrorEnvelope {
                        error: ErrorBody {
                            kind: error.kind(),
                            message: &message,
                            cause: error.cause(),
                        },
                    };
                    serde_json::to_writer(&mut *err, &envelope).map_err(io::Error::from)?;
                } else {
                    err.write_all(message.as_bytes())?;
                }
                err.flush()?;
                Ok(Exit::Failure)
            }
        }
    }

    /// Writes either outcome of a dispatch.
    ///
    /// # Errors
    ///
    /// Returns any error raised by the writers.
    pub fn write_result(
        &self,
        out: &mut impl Write,
        err: &mut impl Write,
        result: &Result<String, DispatchError>,
    ) -> io::Result<Exit> {
        match result {
            Ok(output) => self.write_success(out, output),
            Err(error) => self.write_error(out, err, error),
        }
    }
}
