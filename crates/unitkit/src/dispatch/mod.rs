//! One-shot request dispatcher.
//!
//! A [`Dispatcher`] moves through [`Stage`]s exactly once per process:
//! it decodes the request, resolves the id (`describe` first, then the
//! registry), executes the handler and encodes the outcome. Failures before
//! execution skip straight to encoding, so a handler never runs for an
//! unknown id or an undecodable stream.

use std::fmt;
use std::io::{self, BufRead, Write};

use tracing::{debug, info, trace};
use unitkit_config::{Config, ManifestFormat};

use crate::codec::{Exit, Request, ResponseEncoder, decode_request};
use crate::error::DispatchError;
use crate::manifest::ManifestSource;
use crate::operation::DESCRIBE_OPERATION;
use crate::registry::Registry;

/// Tracing target for dispatch events.
const DISPATCH_TARGET: &str = "unitkit::dispatch";

/// Position of a dispatcher in its single pass.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    /// Nothing read yet.
    AwaitingRequest,
    /// Reading the input stream.
    Decoding,
    /// Looking up the requested id.
    Resolving,
    /// Running the handler or building the manifest.
    Executing,
    /// Writing the response.
    Encoding,
    /// Response written.
    Done,
}

impl Stage {
    /// Returns the canonical string representation.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::AwaitingRequest => "awaiting_request",
            Self::Decoding => "decoding",
            Self::Resolving => "resolving",
            Self::Executing => "executing",
            Self::Encoding => "encoding",
            Self::Done => "done",
        }
    }
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Routes a single request to the manifest builder or a registered handler.
pub struct Dispatcher<'a, M: ManifestSource> {
    registry: &'a Registry,
    source: &'a M,
    format: ManifestFormat,
    encoder: ResponseEncoder,
    stage: Stage,
}

impl<M: ManifestSource> fmt::Debug for Dispatcher<'_, M> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Dispatcher")
            .field("unit", &self.registry.unit_id())
            .field("format", &self.format)
            .field("encoder", &self.encoder)
            .field("stage", &self.stage)
            .finish_non_exhaustive()
    }
}

impl<'a, M: ManifestSource> Dispatcher<'a, M> {
    /// Creates a dispatcher using the output settings from `config`.
    #[must_use]
    pub const fn new(registry: &'a Registry, source: &'a M, config: &Config) -> Self {
        Self {
            registry,
            source,
            format: config.manifest_format(),
            encoder: ResponseEncoder::from_config(config),
            stage: Stage::AwaitingRequest,
        }
    }

    /// Current stage.
    #[must_use]
    pub const fn stage(&self) -> Stage {
        self.stage
    }

    /// Resolves and executes one operation without touching any stream.
    ///
    /// # Errors
    ///
    /// Returns [`DispatchError::UnknownOperation`] for unregistered ids and
    /// whatever the handler or manifest encoder reports otherwise.
    pub fn dispatch(&self, operation: &str, payload: &str) -> Result<String, DispatchError> {
        if operation == DESCRIBE_OPERATION {
            debug!(target: DISPATCH_TARGET, "describe called");
            let manifest = self.source.manifest(self.registry);
            return manifest.encode(self.format);
        }

        let Some(registered) = self.registry.lookup(operation) else {
            return Err(DispatchError::UnknownOperation {
                id: operation.to_owned(),
            });
        };

        info!(
            target: DISPATCH_TARGET,
            name = operation,
            kind = %registered.descriptor().kind(),
            "calling operation"
        );
        debug!(target: DISPATCH_TARGET, name = operation, payload, "calling operation");
        registered.invoke(payload)
    }

    /// Reads one request from `input`, executes it and writes the response.
    ///
    /// # Errors
    ///
    /// Returns an error only when writing the response fails; dispatch
    /// failures are encoded onto the output channels.
    pub fn run(
        mut self,
        input: &mut impl BufRead,
        out: &mut impl Write,
        err: &mut impl Write,
    ) -> io::Result<Exit> {
        self.advance(Stage::Decoding);
        let (operation, result) = match decode_request(input) {
            Ok(request) => {
                let result = self.execute(&request);
                (request.into_parts().0, result)
            }
            Err(error) => (String::new(), Err(DispatchError::from(error))),
        };

        self.advance(Stage::Encoding);
        match &result {
            Ok(output) => debug!(
                target: DISPATCH_TARGET,
                operation = operation.as_str(),
                output = output.as_str(),
                "operation response"
            ),
            Err(error) => {
                info!(
                    target: DISPATCH_TARGET,
                    operation = operation.as_str(),
                    kind = %error.kind(),
                    "operation failed"
                );
                debug!(
                    target: DISPATCH_TARGET,
                    operation = operation.as_str(),
                    error = %error,
                    "operation failed"
                );
            }
        }
        let exit = self.encoder.write_result(out, err, &result);
        self.advance(Stage::Done);
        exit
    }

    fn execute(&mut self, request: &Request) -> Result<String, DispatchError> {
        self.advance(Stage::Resolving);
        let operation = request.operation();
        let known = operation == DESCRIBE_OPERATION || self.registry.lookup(operation).is_some();
        if !known {
            return Err(DispatchError::UnknownOperation {
                id: operation.to_owned(),
            });
        }
        self.advance(Stage::Executing);
        self.dispatch(operation, request.payload())
    }

    fn advance(&mut self, next: Stage) {
        trace!(target: DISPATCH_TARGET, from = %self.stage, to = %next, "dispatch stage");
        self.stage = next;
    }
}
