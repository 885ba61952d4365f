//! Operation descriptors and handlers.
//!
//! An [`OperationDescriptor`] is one invocable capability of a unit. All kinds
//! share a single type: the [`OperationKind`] discriminant carries the
//! kind-specific data (the cron expression of a scheduled action), and the
//! manifest builder projects every kind through the same accessors.

use std::fmt;
use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::error::HandlerError;
use crate::schema::{Argument, ArgumentSchema};
use crate::slug::slugify;

/// Id reserved for the introspection meta-operation.
pub const DESCRIBE_OPERATION: &str = "describe";

/// Business logic behind an operation.
///
/// Closures of the shape `Fn(&str) -> Result<String, HandlerError>` implement
/// this trait, so most handlers never name it.
///
/// # Example
///
/// ```
/// use unitkit::operation::Handler;
/// use unitkit::HandlerError;
///
/// let echo = |payload: &str| -> Result<String, HandlerError> { Ok(payload.to_owned()) };
/// assert_eq!(echo.handle("hi").ok(), Some(String::from("hi")));
/// ```
pub trait Handler: Send + Sync {
    /// Runs the operation against the raw payload.
    ///
    /// # Errors
    ///
    /// Returns a [`HandlerError`] describing the failure; its display text is
    /// sent to the host verbatim.
    fn handle(&self, payload: &str) -> Result<String, HandlerError>;
}

impl<F> Handler for F
where
    F: Fn(&str) -> Result<String, HandlerError> + Send + Sync,
{
    fn handle(&self, payload: &str) -> Result<String, HandlerError> {
        self(payload)
    }
}

/// Kind of an operation, with kind-specific data.
///
/// # Example
///
/// ```
/// use unitkit::OperationKind;
///
/// let kind = OperationKind::CronAction { expression: "0 * * * *".into() };
/// assert_eq!(kind.as_str(), "cron_action");
/// assert_eq!(kind.cron_expression(), Some("0 * * * *"));
/// assert!(!kind.is_ordered());
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum OperationKind {
    /// An invocable action producing a result.
    Action,
    /// A fire-and-forget command; its success output is empty.
    Command,
    /// An action the host runs on a schedule.
    CronAction {
        /// Five-field cron expression or `@`-macro.
        expression: String,
    },
    /// An action surfaced as a navigation entry by the host.
    NavigationAction,
}

impl OperationKind {
    /// Returns the canonical string representation.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Action => "action",
            Self::Command => "command",
            Self::CronAction { .. } => "cron_action",
            Self::NavigationAction => "navigation_action",
        }
    }

    /// Cron expression for scheduled actions.
    #[must_use]
    pub fn cron_expression(&self) -> Option<&str> {
        match self {
            Self::CronAction { expression } => Some(expression.as_str()),
            _ => None,
        }
    }

    /// Whether the kind receives a display index.
    #[must_use]
    pub const fn is_ordered(&self) -> bool {
        matches!(self, Self::Action | Self::NavigationAction)
    }

    /// Whether the kind lives in the command namespace.
    #[must_use]
    pub const fn is_command(&self) -> bool {
        matches!(self, Self::Command)
    }
}

impl fmt::Display for OperationKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Structured result returned by compound-unit actions.
///
/// Serialised as JSON; empty fields are omitted.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ActionResponse {
    /// Page title.
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub html_title: String,
    /// Extra markup for the document head.
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub html_head: String,
    /// Markup for the document body.
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub html_body: String,
    /// Subject line for text delivery.
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub subject: String,
    /// Plain-text body.
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub text_body: String,
    /// Renders the body without the host's layout.
    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    pub no_layout: bool,
}

/// One invocable capability of a unit.
///
/// # Example
///
/// ```
/// use unitkit::{OperationDescriptor, HandlerError};
/// use unitkit::schema::Argument;
///
/// let op = OperationDescriptor::action("Read File", |payload: &str| -> Result<String, HandlerError> {
///     Ok(payload.to_owned())
/// })
/// .with_description("reads a file")
/// .with_argument(Argument::string("dir", "the directory of the file").required());
///
/// assert_eq!(op.id(), "read-file");
/// assert_eq!(op.display_name(), "Read File");
/// assert_eq!(op.schema().required_names(), vec!["dir"]);
/// ```
#[derive(Clone)]
pub struct OperationDescriptor {
    id: String,
    display_name: String,
    description: String,
    kind: OperationKind,
    schema: ArgumentSchema,
    handler: Arc<dyn Handler>,
}

impl OperationDescriptor {
    /// Creates a descriptor whose id is the slug of `name`.
    ///
    /// The description defaults to the name.
    #[must_use]
    pub fn new(kind: OperationKind, name: impl Into<String>, handler: impl Handler + 'static) -> Self {
        let display_name = name.into();
        Self {
            id: slugify(&display_name),
            description: display_name.clone(),
            display_name,
            kind,
            schema: ArgumentSchema::new(),
            handler: Arc::new(handler),
        }
    }

    /// Creates an [`OperationKind::Action`].
    #[must_use]
    pub fn action(name: impl Into<String>, handler: impl Handler + 'static) -> Self {
        Self::new(OperationKind::Action, name, handler)
    }

    /// Creates an action whose handler returns an [`ActionResponse`].
    #[must_use]
    pub fn structured_action<F>(name: impl Into<String>, function: F) -> Self
    where
        F: Fn(&str) -> Result<ActionResponse, HandlerError> + Send + Sync + 'static,
    {
        Self::action(name, structured(function))
    }

    /// Creates an [`OperationKind::NavigationAction`].
    #[must_use]
    pub fn navigation(name: impl Into<String>, handler: impl Handler + 'static) -> Self {
        Self::new(OperationKind::NavigationAction, name, handler)
    }

    /// Creates an [`OperationKind::CronAction`].
    #[must_use]
    pub fn cron<F>(name: impl Into<String>, expression: impl Into<String>, function: F) -> Self
    where
        F: Fn(&str) -> Result<ActionResponse, HandlerError> + Send + Sync + 'static,
    {
        Self::new(
            OperationKind::CronAction {
                expression: expression.into(),
            },
            name,
            structured(function),
        )
    }

    /// Creates an [`OperationKind::Command`] whose success output is empty.
    #[must_use]
    pub fn command<F>(name: impl Into<String>, function: F) -> Self
    where
        F: Fn(&str) -> Result<(), HandlerError> + Send + Sync + 'static,
    {
        Self::new(
            OperationKind::Command,
            name,
            move |payload: &str| -> Result<String, HandlerError> {
                function(payload).map(|()| String::new())
            },
        )
    }

    /// Overrides the id; the value is slugified.
    #[must_use]
    pub fn with_id(mut self, id: &str) -> Self {
        self.id = slugify(id);
        self
    }

    /// Sets the description.
    #[must_use]
    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }

    /// Appends an argument declaration.
    #[must_use]
    pub fn with_argument(mut self, argument: Argument) -> Self {
        self.schema.push(argument);
        self
    }

    /// Replaces the argument schema.
    #[must_use]
    pub fn with_schema(mut self, schema: ArgumentSchema) -> Self {
        self.schema = schema;
        self
    }

    /// Slug id used for dispatch.
    #[must_use]
    pub const fn id(&self) -> &str {
        self.id.as_str()
    }

    /// Human-readable name.
    #[must_use]
    pub const fn display_name(&self) -> &str {
        self.display_name.as_str()
    }

    /// Human-readable description.
    #[must_use]
    pub const fn description(&self) -> &str {
        self.description.as_str()
    }

    /// Operation kind.
    #[must_use]
    pub const fn kind(&self) -> &OperationKind {
        &self.kind
    }

    /// Declared arguments.
    #[must_use]
    pub const fn schema(&self) -> &ArgumentSchema {
        &self.schema
    }

    /// Runs the handler without validating the payload.
    ///
    /// # Errors
    ///
    /// Returns whatever the handler reports.
    pub fn call(&self, payload: &str) -> Result<String, HandlerError> {
        self.handler.handle(payload)
    }

    fn same_handler(&self, other: &Self) -> bool {
        std::ptr::addr_eq(Arc::as_ptr(&self.handler), Arc::as_ptr(&other.handler))
    }
}

impl fmt::Debug for OperationDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("OperationDescriptor")
            .field("id", &self.id)
            .field("display_name", &self.display_name)
            .field("description", &self.description)
            .field("kind", &self.kind)
            .field("schema", &self.schema)
            .finish_non_exhaustive()
    }
}

/// Descriptors are equal when every field matches and both share one handler.
impl PartialEq for OperationDescriptor {
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id
            && self.display_name == other.display_name
            && self.description == other.description
            && self.kind == other.kind
            && self.schema == other.schema
            && self.same_handler(other)
    }
}

fn structured<F>(function: F) -> impl Handler + 'static
where
    F: Fn(&str) -> Result<ActionResponse, HandlerError> + Send + Sync + 'static,
{
    move |payload: &str| -> Result<String, HandlerError> {
        let response = function(payload)?;
        serde_json::to_string(&response).map_err(|error| {
            HandlerError::failed(format!("error while marshaling response: {error}"))
        })
    }
}
