//! Operation registry and one-shot invocation protocol for unit processes.
//!
//! A unit is a short-lived process launched by a host for every request. It
//! registers named operations, reads a single request from standard input,
//! dispatches it and writes a single response before exiting. The built-in
//! `describe` operation returns a manifest of everything the unit registered
//! so the host can introspect it without invoking anything.
//!
//! # Architecture
//!
//! - [`codec`] turns the line-oriented request stream into a [`Request`] and
//!   writes results or errors back out.
//! - [`registry`] maps slug ids to [`OperationDescriptor`]s.
//! - [`manifest`] projects the registry into the `describe` document.
//! - [`dispatch`] runs the decode, resolve, execute and encode stages once.
//! - [`Unit`] bundles the above with logging and the per-unit store.
//!
//! # Example
//!
//! ```rust,no_run
//! use std::process::ExitCode;
//!
//! use unitkit::{HandlerError, OperationDescriptor, Unit};
//! use unitkit::schema::Argument;
//! use unitkit_config::Config;
//!
//! fn main() -> ExitCode {
//!     let mut unit = Unit::simple("Echo", "Repeats its input");
//!     unit.register(
//!         OperationDescriptor::action("echo", |payload: &str| -> Result<String, HandlerError> {
//!             Ok(payload.to_owned())
//!         })
//!         .with_argument(Argument::string("text", "text to repeat").required()),
//!     )
//!     .expect("echo is a valid id");
//!     unit.respond(&Config::default())
//! }
//! ```

pub mod card;
pub mod codec;
pub mod cron;
pub mod dispatch;
pub mod error;
pub mod manifest;
pub mod operation;
pub mod registry;
pub mod schema;
pub mod slug;
pub mod store;
pub mod telemetry;
pub mod unit;

#[cfg(test)]
mod tests;

pub use self::card::Card;
pub use self::codec::{Exit, Request, ResponseEncoder, decode_request, encode_request};
pub use self::dispatch::{Dispatcher, Stage};
pub use self::error::{
    DecodeError, DispatchError, ErrorKind, HandlerError, ProfileError, RegistryError,
};
pub use self::manifest::{Identity, Manifest, ManifestSource};
pub use self::operation::{ActionResponse, Handler, OperationDescriptor, OperationKind};
pub use self::registry::{RegisteredOperation, Registry};
pub use self::schema::{Argument, ArgumentSchema, ArgumentType, parse_payload};
pub use self::store::{ConfigStore, StoreError};
pub use self::telemetry::{LogContext, TelemetryError};
pub use self::unit::{Style, Unit};
