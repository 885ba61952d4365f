//! Operation registry for descriptor storage, lookup and invocation.
//!
//! The [`Registry`] keeps two namespaces: actions (plain, scheduled and
//! navigation actions) and commands. Lookups search actions first, then
//! commands, so an action shadows a command registered under the same id.
//! Registering an id that already exists in its namespace replaces the earlier
//! entry while keeping its position and display index.

use std::collections::HashMap;
use std::collections::hash_map::Entry;

use tracing::debug;

use crate::error::{DecodeError, DispatchError, HandlerError, RegistryError};
use crate::operation::{DESCRIBE_OPERATION, OperationDescriptor};

/// Tracing target for registry operations.
const REGISTRY_TARGET: &str = "unitkit::registry";

/// A descriptor together with the values derived at registration.
#[derive(Debug, Clone, PartialEq)]
pub struct RegisteredOperation {
    descriptor: OperationDescriptor,
    url_path: String,
    index: Option<usize>,
    sequence: usize,
}

impl RegisteredOperation {
    /// The registered descriptor.
    #[must_use]
    pub const fn descriptor(&self) -> &OperationDescriptor {
        &self.descriptor
    }

    /// Host routing path, `/extension/action/{unit}/{id}`.
    #[must_use]
    pub const fn url_path(&self) -> &str {
        self.url_path.as_str()
    }

    /// Display position among actions and navigation actions.
    ///
    /// `None` for scheduled actions and commands.
    #[must_use]
    pub const fn index(&self) -> Option<usize> {
        self.index
    }

    /// Slug id used for dispatch.
    #[must_use]
    pub const fn id(&self) -> &str {
        self.descriptor.id()
    }

    /// Validates the payload against the schema, then runs the handler.
    ///
    /// # Errors
    ///
    /// Schema violations and handler-reported argument errors become
    /// [`DispatchError::Decode`]; other handler failures become
    /// [`DispatchError::Handler`].
    pub fn invoke(&self, payload: &str) -> Result<String, DispatchError> {
        let operation = self.descriptor.id();
        self.descriptor
            .schema()
            .validate(payload)
            .map_err(|message| invalid_arguments(operation, message))?;

        self.descriptor.call(payload).map_err(|error| match error {
            HandlerError::InvalidArguments { message } => invalid_arguments(operation, message),
            source => DispatchError::Handler {
                operation: operation.to_owned(),
                source,
            },
        })
    }
}

fn invalid_arguments(operation: &str, message: String) -> DispatchError {
    DispatchError::Decode(DecodeError::InvalidArguments {
        operation: operation.to_owned(),
        message,
    })
}

/// Registry of the operations one unit exposes.
///
/// # Example
///
/// ```
/// use unitkit::{OperationDescriptor, Registry, HandlerError};
///
/// let mut registry = Registry::new("file-tools");
/// registry
///     .register(OperationDescriptor::action("Read File", |p: &str| -> Result<String, HandlerError> {
///         Ok(p.to_owned())
///     }))
///     .expect("registration succeeds");
///
/// let op = registry.lookup("read-file").expect("registered");
/// assert_eq!(op.url_path(), "/extension/action/file-tools/read-file");
/// assert_eq!(op.index(), Some(0));
/// assert!(registry.lookup("Read File").is_none());
/// ```
#[derive(Debug, Clone, Default)]
pub struct Registry {
    unit_id: String,
    actions: HashMap<String, RegisteredOperation>,
    commands: HashMap<String, RegisteredOperation>,
    next_index: usize,
    next_sequence: usize,
}

impl Registry {
    /// Creates an empty registry for the given unit id.
    #[must_use]
    pub fn new(unit_id: impl Into<String>) -> Self {
        Self {
            unit_id: unit_id.into(),
            ..Self::default()
        }
    }

    /// Id of the owning unit.
    #[must_use]
    pub const fn unit_id(&self) -> &str {
        self.unit_id.as_str()
    }

    /// Registers a descriptor, replacing any entry with the same id in the
    /// same namespace.
    ///
    /// # Errors
    ///
    /// Returns [`RegistryError::EmptyId`] when the id is empty and
    /// [`RegistryError::ReservedId`] for `describe`.
    pub fn register(
        &mut self,
        descriptor: OperationDescriptor,
    ) -> Result<&RegisteredOperation, RegistryError> {
        let id = descriptor.id().to_owned();
        if id.is_empty() {
            return Err(RegistryError::EmptyId {
                name: descriptor.display_name().to_owned(),
            });
        }
        if id == DESCRIBE_OPERATION {
            return Err(RegistryError::ReservedId { id });
        }

        let is_command = descriptor.kind().is_command();
        let previous = self
            .namespace(is_command)
            .get(&id)
            .map(|entry| (entry.sequence, entry.index));
        let sequence = match previous {
            Some((sequence, _)) => sequence,
            None => self.take_sequence(),
        };
        let index = if descriptor.kind().is_ordered() {
            match previous.and_then(|(_, index)| index) {
                Some(index) => Some(index),
                None => Some(self.take_index()),
            }
        } else {
            None
        };

        debug!(
            target: REGISTRY_TARGET,
            unit = %self.unit_id,
            operation = %id,
            kind = %descriptor.kind(),
            replaced = previous.is_some(),
            "registering operation"
        );

        let entry = RegisteredOperation {
            url_path: format!("/extension/action/{}/{id}", self.unit_id),
            descriptor,
            index,
            sequence,
        };
        let registered = match self.namespace_mut(is_command).entry(id) {
            Entry::Occupied(mut occupied) => {
                occupied.insert(entry);
                occupied.into_mut()
            }
            Entry::Vacant(vacant) => vacant.insert(entry),
        };
        Ok(registered)
    }

    /// Looks up an operation by exact id, actions before commands.
    #[must_use]
    pub fn lookup(&self, id: &str) -> Option<&RegisteredOperation> {
        self.actions.get(id).or_else(|| self.commands.get(id))
    }

    /// Looks up an entry in the action namespace only.
    #[must_use]
    pub fn action(&self, id: &str) -> Option<&RegisteredOperation> {
        self.actions.get(id)
    }

    /// Looks up an entry in the command namespace only.
    #[must_use]
    pub fn command(&self, id: &str) -> Option<&RegisteredOperation> {
        self.commands.get(id)
    }

    /// Resolves an id and invokes its handler.
    ///
    /// # Errors
    ///
    /// Returns [`DispatchError::UnknownOperation`] when nothing is registered
    /// under `id`, or any error from [`RegisteredOperation::invoke`].
    pub fn resolve_and_invoke(&self, id: &str, payload: &str) -> Result<String, DispatchError> {
        let operation = self
            .lookup(id)
            .ok_or_else(|| DispatchError::UnknownOperation { id: id.to_owned() })?;
        operation.invoke(payload)
    }

    /// Actions in registration order.
    #[must_use]
    pub fn actions(&self) -> Vec<&RegisteredOperation> {
        ordered(self.actions.values())
    }

    /// Commands in registration order.
    #[must_use]
    pub fn commands(&self) -> Vec<&RegisteredOperation> {
        ordered(self.commands.values())
    }

    /// Every operation in registration order.
    #[must_use]
    pub fn operations(&self) -> Vec<&RegisteredOperation> {
        ordered(self.actions.values().chain(self.commands.values()))
    }

    /// Returns the number of registered operations.
    #[must_use]
    pub fn len(&self) -> usize {
        self.actions.len() + self.commands.len()
    }

    /// Returns `true` when no operations are registered.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.actions.is_empty() && self.commands.is_empty()
    }

    const fn namespace(&self, commands: bool) -> &HashMap<String, RegisteredOperation> {
        if commands {
            &self.commands
        } else {
            &self.actions
        }
    }

    const fn namespace_mut(&mut self, commands: bool) -> &mut HashMap<String, RegisteredOperation> {
        if commands {
            &mut self.commands
        } else {
            &mut self.actions
        }
    }

    const fn take_index(&mut self) -> usize {
        let index = self.next_index;
        self.next_index += 1;
        index
    }

    const fn take_sequence(&mut self) -> usize {
        let sequence = self.next_sequence;
        self.next_sequence += 1;
        sequence
    }
}

fn ordered<'a>(
    entries: impl Iterator<Item = &'a RegisteredOperation>,
) -> Vec<&'a RegisteredOperation> {
    let mut sorted: Vec<&RegisteredOperation> = entries.collect();
    sorted.sort_by_key(|entry| entry.sequence);
    sorted
}

#[cfg(test)]
mod tests;
