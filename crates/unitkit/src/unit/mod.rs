//! The [`Unit`] facade tying registration, manifests and dispatch together.
//!
//! A unit binary builds one `Unit`, registers its operations and calls
//! [`Unit::respond`] once. Tests drive the same pipeline in memory through
//! [`Unit::test`] and [`Unit::payload`].

use std::io::{self, BufRead, Cursor, Write};
use std::process::ExitCode;

use serde::Deserialize;
use tracing::debug;
use unitkit_config::{Config, ErrorChannel};

use crate::card::Card;
use crate::codec::Exit;
use crate::dispatch::Dispatcher;
use crate::error::{HandlerError, ProfileError, RegistryError};
use crate::manifest::{AssistantProfile, Identity, Layout, Manifest, ManifestSource, Quicklink};
use crate::operation::{ActionResponse, Handler, OperationDescriptor};
use crate::registry::{RegisteredOperation, Registry};
use crate::slug::slugify;
use crate::store::ConfigStore;
use crate::telemetry::LogContext;

/// Log file shared by every unit under the configured log directory.
pub const LOG_FILE_NAME: &str = "units.log";

/// Placeholder offered by simple units until one is set.
pub const DEFAULT_PLACEHOLDER: &str = "How can I help you?";

/// Model advertised by simple units until one is set.
pub const DEFAULT_MODEL: &str = "gpt-3.5-turbo-1106";

/// Manifest layout of a unit.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Style {
    /// Flat tool list for assistant-style hosts.
    Simple,
    /// Actions, commands and cards.
    Compound,
}

/// A process-level unit: identity, registered operations and presentation.
///
/// # Example
///
/// ```
/// use unitkit::{ActionResponse, Unit};
///
/// let mut unit = Unit::compound("File Tools", "Reads and writes files");
/// unit.add_action("Greet", |_payload: &str| {
///     Ok(ActionResponse { html_body: "<p>hello</p>".into(), ..ActionResponse::default() })
/// })
/// .expect("register");
///
/// let output = unit.test(Unit::payload("greet", "{}"));
/// assert_eq!(output, r#"{"html_body":"<p>hello</p>"}"#);
/// ```
#[derive(Debug, Clone)]
pub struct Unit {
    identity: Identity,
    style: Style,
    registry: Registry,
    cards: Vec<Card>,
    profile: AssistantProfile,
}

impl Unit {
    /// Creates a unit with an explicit identity.
    #[must_use]
    pub fn new(style: Style, identity: Identity) -> Self {
        let profile = match style {
            Style::Simple => AssistantProfile {
                model: DEFAULT_MODEL.to_owned(),
                placeholder: DEFAULT_PLACEHOLDER.to_owned(),
                ..AssistantProfile::default()
            },
            Style::Compound => AssistantProfile::default(),
        };
        Self {
            registry: Registry::new(identity.id.clone()),
            identity,
            style,
            cards: Vec::new(),
            profile,
        }
    }

    /// Creates a simple unit whose id is the slug of `name`.
    #[must_use]
    pub fn simple(name: &str, description: &str) -> Self {
        Self::new(Style::Simple, identity_from_name(name, description))
    }

    /// Creates a compound unit whose id is the slug of `name`.
    #[must_use]
    pub fn compound(name: &str, description: &str) -> Self {
        Self::new(Style::Compound, identity_from_name(name, description))
    }

    /// Creates a simple unit from a TOML profile document.
    ///
    /// The id is the slug of `static_id`, or of `name` when no static id is
    /// given. Missing `model` and `placeholder` keys keep their defaults.
    ///
    /// ```
    /// use unitkit::Unit;
    ///
    /// let unit = Unit::from_toml(
    ///     r#"
    ///     name = "File Tools"
    ///     description = "Reads and writes files"
    ///     instructions = "Be brief."
    ///     "#,
    /// )
    /// .expect("valid profile");
    /// assert_eq!(unit.id(), "file-tools");
    /// ```
    ///
    /// # Errors
    ///
    /// Returns [`ProfileError::Parse`] for malformed documents and
    /// [`ProfileError::EmptyId`] when no usable id can be derived.
    pub fn from_toml(document: &str) -> Result<Self, ProfileError> {
        let document: ProfileDocument =
            toml::from_str(document).map_err(|error| ProfileError::Parse {
                message: error.message().to_owned(),
            })?;
        let source = if document.static_id.is_empty() {
            &document.name
        } else {
            &document.static_id
        };
        let id = slugify(source);
        if id.is_empty() {
            return Err(ProfileError::EmptyId {
                name: document.name,
            });
        }

        let mut unit = Self::new(
            Style::Simple,
            Identity {
                id,
                name: document.name,
                description: document.description,
            },
        );
        if !document.model.is_empty() {
            unit.profile.model = document.model;
        }
        if !document.placeholder.is_empty() {
            unit.profile.placeholder = document.placeholder;
        }
        unit.profile.instructions = document.instructions;
        unit.profile.quicklinks = document.quicklinks;
        Ok(unit)
    }

    /// Unit id.
    #[must_use]
    pub const fn id(&self) -> &str {
        self.identity.id.as_str()
    }

    /// Display name.
    #[must_use]
    pub const fn name(&self) -> &str {
        self.identity.name.as_str()
    }

    /// Description.
    #[must_use]
    pub const fn description(&self) -> &str {
        self.identity.description.as_str()
    }

    /// Manifest layout.
    #[must_use]
    pub const fn style(&self) -> Style {
        self.style
    }

    /// Registered operations.
    #[must_use]
    pub const fn registry(&self) -> &Registry {
        &self.registry
    }

    /// Registers any descriptor.
    ///
    /// # Errors
    ///
    /// Returns a [`RegistryError`] for empty or reserved ids.
    pub fn register(
        &mut self,
        descriptor: OperationDescriptor,
    ) -> Result<&RegisteredOperation, RegistryError> {
        self.registry.register(descriptor)
    }

    /// Registers an action returning an [`ActionResponse`].
    ///
    /// # Errors
    ///
    /// Returns a [`RegistryError`] for empty or reserved ids.
    pub fn add_action<F>(
        &mut self,
        name: &str,
        function: F,
    ) -> Result<&RegisteredOperation, RegistryError>
    where
        F: Fn(&str) -> Result<ActionResponse, HandlerError> + Send + Sync + 'static,
    {
        self.register(OperationDescriptor::structured_action(name, function))
    }

    /// Registers a scheduled action.
    ///
    /// # Errors
    ///
    /// Returns a [`RegistryError`] for empty or reserved ids.
    pub fn add_cron<F>(
        &mut self,
        name: &str,
        expression: &str,
        function: F,
    ) -> Result<&RegisteredOperation, RegistryError>
    where
        F: Fn(&str) -> Result<ActionResponse, HandlerError> + Send + Sync + 'static,
    {
        self.register(OperationDescriptor::cron(name, expression, function))
    }

    /// Registers a navigation action with a raw handler.
    ///
    /// # Errors
    ///
    /// Returns a [`RegistryError`] for empty or reserved ids.
    pub fn add_navigation(
        &mut self,
        name: &str,
        handler: impl Handler + 'static,
    ) -> Result<&RegisteredOperation, RegistryError> {
        self.register(OperationDescriptor::navigation(name, handler))
    }

    /// Registers a fire-and-forget command.
    ///
    /// # Errors
    ///
    /// Returns a [`RegistryError`] for empty or reserved ids.
    pub fn add_command<F>(
        &mut self,
        name: &str,
        function: F,
    ) -> Result<&RegisteredOperation, RegistryError>
    where
        F: Fn(&str) -> Result<(), HandlerError> + Send + Sync + 'static,
    {
        self.register(OperationDescriptor::command(name, function))
    }

    /// Routing path of a registered action.
    #[must_use]
    pub fn action_url(&self, id: &str) -> Option<&str> {
        self.registry.action(id).map(RegisteredOperation::url_path)
    }

    /// Adds a default card linking to `action_id`.
    ///
    /// The link is empty when no such action is registered.
    pub fn add_card(&mut self, id: &str, action_id: &str, title: &str, description: &str) {
        let href = self.action_url(action_id).unwrap_or_default().to_owned();
        let card = Card::linked(id, &self.identity.name, title, description, &href);
        self.cards.push(card);
    }

    /// Adds a pre-rendered card.
    pub fn add_custom_card(&mut self, card: Card) {
        self.cards.push(card);
    }

    /// Cards in insertion order.
    #[must_use]
    pub fn cards(&self) -> &[Card] {
        &self.cards
    }

    /// Sets the preferred model.
    pub fn set_model(&mut self, model: impl Into<String>) {
        self.profile.model = model.into();
    }

    /// Sets the input placeholder.
    pub fn set_placeholder(&mut self, placeholder: impl Into<String>) {
        self.profile.placeholder = placeholder.into();
    }

    /// Sets the system instructions.
    pub fn set_instructions(&mut self, instructions: impl Into<String>) {
        self.profile.instructions = instructions.into();
    }

    /// Appends a canned prompt.
    pub fn add_quicklink(&mut self, title: impl Into<String>, content: impl Into<String>) {
        self.profile.quicklinks.push(Quicklink {
            title: title.into(),
            content: content.into(),
        });
    }

    /// Key-value store for this unit under the configured store directory.
    #[must_use]
    pub fn config_store(&self, config: &Config) -> ConfigStore {
        ConfigStore::for_unit(config.store_dir(), self.id())
    }

    /// Runs one request from `input` and writes the response.
    ///
    /// # Errors
    ///
    /// Returns an error only when the response cannot be written.
    pub fn execute(
        &self,
        input: &mut impl BufRead,
        out: &mut impl Write,
        err: &mut impl Write,
        config: &Config,
    ) -> io::Result<Exit> {
        Dispatcher::new(&self.registry, self, config).run(input, out, err)
    }

    /// Serves one request on the process's standard streams, logging to the
    /// configured log file for the duration of the call.
    ///
    /// When the log file cannot be opened the request is still served. In
    /// legacy mode a warning goes to standard error; in strict mode standard
    /// error is reserved for the error response and stays silent.
    #[must_use]
    pub fn respond(&self, config: &Config) -> ExitCode {
        let stdin = io::stdin();
        let mut input = stdin.lock();
        let mut out = io::stdout().lock();
        let mut err = io::stderr().lock();

        let Ok(context) = self.open_log(config, &mut err) else {
            return ExitCode::FAILURE;
        };
        debug!(unit = self.id(), "serving request");

        let exit = self.execute(&mut input, &mut out, &mut err, config);
        drop(context);
        exit.map_or(ExitCode::FAILURE, ExitCode::from)
    }

    /// Runs a request in memory and returns what the host would read.
    ///
    /// Errors use the single-channel encoding so their text is returned too.
    /// No log file is opened.
    #[must_use]
    pub fn test(&self, mut input: impl BufRead) -> String {
        let mut config = Config::default();
        config.error_channel = ErrorChannel::Stdout;
        let mut out = Vec::new();
        let mut err = Vec::new();
        if let Err(error) = self.execute(&mut input, &mut out, &mut err, &config) {
            return error.to_string();
        }
        String::from_utf8_lossy(&out).into_owned()
    }

    /// Builds a request stream for [`Unit::test`].
    #[must_use]
    pub fn payload(operation: &str, data: &str) -> Cursor<String> {
        Cursor::new(format!("{operation}\n\n{data}"))
    }

    fn open_log(&self, config: &Config, err: &mut impl Write) -> io::Result<Option<LogContext>> {
        match LogContext::open(config, self.id(), LOG_FILE_NAME) {
            Ok(context) => Ok(Some(context)),
            Err(error) => {
                if config.error_channel() == ErrorChannel::Stdout {
                    writeln!(err, "warning: {error}")?;
                }
                Ok(None)
            }
        }
    }

    fn layout(&self) -> Layout {
        match self.style {
            Style::Simple => Layout::Simple(self.profile.clone()),
            Style::Compound => Layout::Compound {
                cards: self.cards.clone(),
            },
        }
    }
}

impl ManifestSource for Unit {
    fn manifest(&self, registry: &Registry) -> Manifest {
        Manifest::build(registry, &self.identity, &self.layout())
    }
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct ProfileDocument {
    static_id: String,
    name: String,
    description: String,
    model: String,
    instructions: String,
    placeholder: String,
    quicklinks: Vec<Quicklink>,
}

fn identity_from_name(name: &str, description: &str) -> Identity {
    Identity {
        id: slugify(name),
        name: name.to_owned(),
        description: description.to_owned(),
    }
}
