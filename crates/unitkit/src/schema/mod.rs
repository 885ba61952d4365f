//! Argument schemas and payload validation.
//!
//! Every operation may declare an ordered list of [`Argument`]s. When the list
//! is non-empty, the dispatcher validates the payload against it before the
//! handler runs: the payload must be a JSON object, required arguments must be
//! present, present arguments must carry the declared type and one of the
//! allowed values, and undeclared fields are rejected. Operations without a
//! schema receive their payload unvalidated.

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::HandlerError;

/// JSON type expected for an argument.
///
/// # Example
///
/// ```
/// use unitkit::schema::ArgumentType;
///
/// assert_eq!(ArgumentType::Integer.as_str(), "integer");
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ArgumentType {
    /// A JSON string.
    String,
    /// Any JSON number.
    Number,
    /// A JSON number without a fractional part.
    Integer,
    /// `true` or `false`.
    Boolean,
    /// A JSON object.
    Object,
    /// A JSON array.
    Array,
}

impl ArgumentType {
    /// Returns the JSON Schema type name.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::String => "string",
            Self::Number => "number",
            Self::Integer => "integer",
            Self::Boolean => "boolean",
            Self::Object => "object",
            Self::Array => "array",
        }
    }

    fn accepts(self, value: &Value) -> bool {
        match self {
            Self::String => value.is_string(),
            Self::Number => value.is_number(),
            Self::Integer => value.is_i64() || value.is_u64(),
            Self::Boolean => value.is_boolean(),
            Self::Object => value.is_object(),
            Self::Array => value.is_array(),
        }
    }
}

impl std::fmt::Display for ArgumentType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One declared argument of an operation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Argument {
    name: String,
    #[serde(rename = "type")]
    ty: ArgumentType,
    description: String,
    #[serde(default, rename = "enum", skip_serializing_if = "Vec::is_empty")]
    allowed: Vec<String>,
    #[serde(default)]
    required: bool,
}

impl Argument {
    /// Creates an optional argument.
    #[must_use]
    pub fn new(name: impl Into<String>, ty: ArgumentType, description: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ty,
            description: description.into(),
            allowed: Vec::new(),
            required: false,
        }
    }

    /// Creates an optional string argument.
    #[must_use]
    pub fn string(name: impl Into<String>, description: impl Into<String>) -> Self {
        Self::new(name, ArgumentType::String, description)
    }

    /// Marks the argument as required.
    #[must_use]
    pub const fn required(mut self) -> Self {
        self.required = true;
        self
    }

    /// Restricts the argument to the given values.
    #[must_use]
    pub fn allowed<I, S>(mut self, values: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.allowed = values.into_iter().map(Into::into).collect();
        self
    }

    /// Argument name as it appears in the payload.
    #[must_use]
    pub const fn name(&self) -> &str {
        self.name.as_str()
    }

    /// Expected JSON type.
    #[must_use]
    pub const fn ty(&self) -> ArgumentType {
        self.ty
    }

    /// Human-readable description.
    #[must_use]
    pub const fn description(&self) -> &str {
        self.description.as_str()
    }

    /// Allowed values; empty when unrestricted.
    #[must_use]
    pub fn allowed_values(&self) -> &[String] {
        &self.allowed
    }

    /// Whether the argument must be present.
    #[must_use]
    pub const fn is_required(&self) -> bool {
        self.required
    }

    fn check(&self, value: &Value) -> Result<(), String> {
        if !self.ty.accepts(value) {
            return Err(format!(
                "argument '{}' must be of type {}, got {}",
                self.name,
                self.ty,
                json_type_name(value)
            ));
        }
        if self.allowed.is_empty() {
            return Ok(());
        }
        let text = match value {
            Value::String(text) => text.clone(),
            other => other.to_string(),
        };
        if self.allowed.iter().any(|candidate| *candidate == text) {
            Ok(())
        } else {
            Err(format!(
                "argument '{}' must be one of [{}], got '{text}'",
                self.name,
                self.allowed.join(", ")
            ))
        }
    }
}

/// Ordered argument declarations for one operation.
///
/// # Example
///
/// ```
/// use unitkit::schema::{Argument, ArgumentSchema};
///
/// let schema = ArgumentSchema::new()
///     .with(Argument::string("dir", "the directory of the file").required())
///     .with(Argument::string("name", "the file name").required());
///
/// assert!(schema.validate(r#"{"dir":"x","name":"y.txt"}"#).is_ok());
/// assert!(schema.validate(r#"{"dir":"x"}"#).is_err());
/// ```
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ArgumentSchema {
    arguments: Vec<Argument>,
}

impl ArgumentSchema {
    /// Creates an empty schema.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends an argument declaration.
    #[must_use]
    pub fn with(mut self, argument: Argument) -> Self {
        self.push(argument);
        self
    }

    /// Appends an argument declaration in place.
    pub fn push(&mut self, argument: Argument) {
        self.arguments.push(argument);
    }

    /// Declared arguments in declaration order.
    #[must_use]
    pub fn arguments(&self) -> &[Argument] {
        &self.arguments
    }

    /// Names of the required arguments in declaration order.
    #[must_use]
    pub fn required_names(&self) -> Vec<&str> {
        self.arguments
            .iter()
            .filter(|argument| argument.is_required())
            .map(Argument::name)
            .collect()
    }

    /// Returns `true` when no arguments are declared.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.arguments.is_empty()
    }

    /// Validates a raw payload against the declarations.
    ///
    /// An empty schema accepts any payload. A blank payload is treated as an
    /// empty object.
    ///
    /// # Errors
    ///
    /// Returns a description of the first violation found.
    pub fn validate(&self, payload: &str) -> Result<(), String> {
        if self.is_empty() {
            return Ok(());
        }

        let value = parse_json(payload).map_err(|error| format!("payload is not JSON: {error}"))?;
        let Value::Object(fields) = value else {
            return Err(format!(
                "payload must be a JSON object, got {}",
                json_type_name(&value)
            ));
        };

        for argument in &self.arguments {
            match fields.get(argument.name()) {
                Some(field) => argument.check(field)?,
                None if argument.is_required() => {
                    return Err(format!("missing required argument '{}'", argument.name()));
                }
                None => {}
            }
        }

        if let Some(unknown) = fields
            .keys()
            .find(|key| !self.arguments.iter().any(|a| a.name() == key.as_str()))
        {
            return Err(format!("unexpected argument '{unknown}'"));
        }

        Ok(())
    }
}

impl FromIterator<Argument> for ArgumentSchema {
    fn from_iter<T: IntoIterator<Item = Argument>>(iter: T) -> Self {
        Self {
            arguments: iter.into_iter().collect(),
        }
    }
}

/// Decodes a payload into a typed request.
///
/// Handlers call this instead of picking fields out of untyped JSON. A blank
/// payload decodes as `{}`.
///
/// # Errors
///
/// Returns [`HandlerError::InvalidArguments`] when the payload does not match
/// `T`.
pub fn parse_payload<T: DeserializeOwned>(payload: &str) -> Result<T, HandlerError> {
    let text = if payload.trim().is_empty() {
        "{}"
    } else {
        payload
    };
    serde_json::from_str(text).map_err(|error| HandlerError::invalid_arguments(error.to_string()))
}

fn parse_json(payload: &str) -> Result<Value, serde_json::Error> {
    if payload.trim().is_empty() {
        return Ok(Value::Object(serde_json::Map::new()));
    }
    serde_json::from_str(payload)
}

const fn json_type_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

#[cfg(test)]
mod tests;
