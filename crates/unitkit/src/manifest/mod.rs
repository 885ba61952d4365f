//! Capability manifests returned by the `describe` operation.
//!
//! A manifest is rebuilt from the registry on every request and never
//! cached. Compound units list their actions and commands as maps keyed by
//! id plus an ordered card list; simple units list every operation as a
//! function-calling tool. Empty collections and empty optional strings are
//! omitted so older hosts keep parsing manifests from newer units.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use unitkit_config::ManifestFormat;

use crate::card::Card;
use crate::cron;
use crate::error::DispatchError;
use crate::operation::OperationKind;
use crate::registry::{RegisteredOperation, Registry};
use crate::schema::ArgumentSchema;

/// Index written for actions outside the display order.
pub const UNORDERED_INDEX: i64 = -1;

/// Id, name and description shared by both manifest layouts.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Identity {
    /// Unit id.
    pub id: String,
    /// Display name.
    pub name: String,
    /// Human-readable description.
    pub description: String,
}

/// Canned prompt offered by hosts of simple units.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Quicklink {
    /// Label shown to the user.
    pub title: String,
    /// Text submitted when chosen.
    pub content: String,
}

/// Presentation settings of a simple unit.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct AssistantProfile {
    /// Model the host should use.
    pub model: String,
    /// System instructions.
    pub instructions: String,
    /// Input placeholder text.
    pub placeholder: String,
    /// Canned prompts.
    pub quicklinks: Vec<Quicklink>,
}

/// Layout selected when a unit describes itself.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Layout {
    /// Flat tool list.
    Simple(AssistantProfile),
    /// Action and command maps plus cards.
    Compound {
        /// Cards in insertion order.
        cards: Vec<Card>,
    },
}

/// Anything that can describe a unit built on a registry.
pub trait ManifestSource {
    /// Builds the manifest for the current registry contents.
    fn manifest(&self, registry: &Registry) -> Manifest;
}

/// Action entry of a compound manifest.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ActionEntry {
    /// Action id.
    pub id: String,
    /// Display index, `-1` for scheduled actions.
    pub index: i64,
    /// Display name.
    pub name: String,
    /// Description.
    pub description: String,
    /// Operation kind.
    pub kind: String,
    /// Cron expression of scheduled actions.
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub cron: String,
    /// Readable form of `cron`.
    #[serde(
        rename = "cronSummary",
        default,
        skip_serializing_if = "String::is_empty"
    )]
    pub cron_summary: String,
}

/// Command entry of a compound manifest.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CommandEntry {
    /// Command id.
    pub id: String,
}

/// Manifest of a compound unit.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CompoundManifest {
    /// Unit identity.
    #[serde(flatten)]
    pub identity: Identity,
    /// Actions keyed by id.
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub actions: BTreeMap<String, ActionEntry>,
    /// Commands keyed by id.
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub commands: BTreeMap<String, CommandEntry>,
    /// Cards in insertion order.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub cards: Vec<Card>,
}

/// Declared type and constraints of one tool parameter.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ToolProperty {
    /// JSON type name.
    #[serde(rename = "type")]
    pub ty: String,
    /// Description.
    pub description: String,
    /// Allowed values.
    #[serde(rename = "enum", default, skip_serializing_if = "Vec::is_empty")]
    pub allowed: Vec<String>,
}

/// JSON-schema style parameter block of a tool.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ToolParameters {
    /// Always `object`.
    #[serde(rename = "type")]
    pub ty: String,
    /// Required parameter names.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub required: Vec<String>,
    /// Parameters keyed by name.
    pub properties: BTreeMap<String, ToolProperty>,
}

impl ToolParameters {
    fn from_schema(schema: &ArgumentSchema) -> Option<Self> {
        if schema.is_empty() {
            return None;
        }
        let properties = schema
            .arguments()
            .iter()
            .map(|argument| {
                (
                    argument.name().to_owned(),
                    ToolProperty {
                        ty: argument.ty().as_str().to_owned(),
                        description: argument.description().to_owned(),
                        allowed: argument.allowed_values().to_vec(),
                    },
                )
            })
            .collect();
        Some(Self {
            ty: "object".to_owned(),
            required: schema
                .required_names()
                .into_iter()
                .map(str::to_owned)
                .collect(),
            properties,
        })
    }
}

/// Callable function exposed by a tool.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ToolFunction {
    /// Operation id the host sends back to invoke it.
    pub name: String,
    /// Description.
    pub description: String,
    /// Parameters, absent when the operation takes none.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub parameters: Option<ToolParameters>,
}

/// One entry in a simple manifest's tool list.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Tool {
    /// Always `function`.
    #[serde(rename = "type")]
    pub ty: String,
    /// The callable.
    pub function: ToolFunction,
}

/// Manifest of a simple unit.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SimpleManifest {
    /// Unit identity.
    #[serde(flatten)]
    pub identity: Identity,
    /// Preferred model.
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub model: String,
    /// System instructions.
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub instructions: String,
    /// Input placeholder.
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub placeholder: String,
    /// Tools in registration order.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub tools: Vec<Tool>,
    /// Canned prompts.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub quicklinks: Vec<Quicklink>,
}

/// A unit's self-description.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(untagged)]
pub enum Manifest {
    /// Flat tool list.
    Simple(SimpleManifest),
    /// Partitioned actions, commands and cards.
    Compound(CompoundManifest),
}

impl Manifest {
    /// Projects the registry into the requested layout.
    #[must_use]
    pub fn build(registry: &Registry, identity: &Identity, layout: &Layout) -> Self {
        match layout {
            Layout::Simple(profile) => Self::Simple(simple(registry, identity, profile)),
            Layout::Compound { cards } => Self::Compound(compound(registry, identity, cards)),
        }
    }

    /// Unit identity.
    #[must_use]
    pub const fn identity(&self) -> &Identity {
        match self {
            Self::Simple(manifest) => &manifest.identity,
            Self::Compound(manifest) => &manifest.identity,
        }
    }

    /// Serialises the manifest in the configured format.
    ///
    /// # Errors
    ///
    /// Returns [`DispatchError::Encoding`] when serialisation fails.
    pub fn encode(&self, format: ManifestFormat) -> Result<String, DispatchError> {
        let encoded = match format {
            ManifestFormat::Json => serde_json::to_string(self).map_err(|e| e.to_string()),
            ManifestFormat::Yaml => serde_saphyr::to_string(self).map_err(|e| e.to_string()),
        };
        encoded.map_err(|message| DispatchError::Encoding {
            subject: "manifest".to_owned(),
            message,
        })
    }
}

fn compound(registry: &Registry, identity: &Identity, cards: &[Card]) -> CompoundManifest {
    let actions = registry
        .actions()
        .into_iter()
        .map(|operation| (operation.id().to_owned(), action_entry(operation)))
        .collect();
    let commands = registry
        .commands()
        .into_iter()
        .map(|operation| {
            (
                operation.id().to_owned(),
                CommandEntry {
                    id: operation.id().to_owned(),
                },
            )
        })
        .collect();

    CompoundManifest {
        identity: identity.clone(),
        actions,
        commands,
        cards: cards.to_vec(),
    }
}

fn action_entry(operation: &RegisteredOperation) -> ActionEntry {
    let descriptor = operation.descriptor();
    let index = operation
        .index()
        .and_then(|index| i64::try_from(index).ok())
        .unwrap_or(UNORDERED_INDEX);
    let (cron, cron_summary) = match descriptor.kind() {
        OperationKind::CronAction { expression } => (expression.clone(), cron::summary(expression)),
        _ => (String::new(), String::new()),
    };

    ActionEntry {
        id: operation.id().to_owned(),
        index,
        name: descriptor.display_name().to_owned(),
        description: descriptor.description().to_owned(),
        kind: descriptor.kind().as_str().to_owned(),
        cron,
        cron_summary,
    }
}

fn simple(registry: &Registry, identity: &Identity, profile: &AssistantProfile) -> SimpleManifest {
    let tools = registry
        .operations()
        .into_iter()
        .map(|operation| Tool {
            ty: "function".to_owned(),
            function: ToolFunction {
                name: operation.id().to_owned(),
                description: operation.descriptor().description().to_owned(),
                parameters: ToolParameters::from_schema(operation.descriptor().schema()),
            },
        })
        .collect();

    SimpleManifest {
        identity: identity.clone(),
        model: profile.model.clone(),
        instructions: profile.instructions.clone(),
        placeholder: profile.placeholder.clone(),
        tools,
        quicklinks: profile.quicklinks.clone(),
    }
}

#[cfg(test)]
mod tests;
