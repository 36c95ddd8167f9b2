//! Input schemas for tools.
//!
//! A deliberately small subset of JSON Schema: one object level with
//! primitive-typed properties, optional `enum` literals and a `required`
//! list. Serializes to the JSON Schema shape MCP clients expect and doubles
//! as the structural check run before a handler sees its arguments.

use std::fmt;

use serde::{Serialize, Serializer};
use serde_json::Value;

use crate::core::error::ToolError;

/// JSON type of a schema property.
#[derive(Serialize, Debug, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum SchemaType {
    String,
    Number,
}

impl SchemaType {
    pub fn as_str(&self) -> &'static str {
        match self {
            SchemaType::String => "string",
            SchemaType::Number => "number",
        }
    }

    /// Whether `value` is an instance of this type.
    pub fn matches(&self, value: &Value) -> bool {
        match self {
            SchemaType::String => value.is_string(),
            SchemaType::Number => value.is_number(),
        }
    }
}

impl fmt::Display for SchemaType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Schema for a single named property.
#[derive(Serialize, Debug, Clone, PartialEq)]
pub struct PropertySchema {
    #[serde(rename = "type")]
    pub kind: SchemaType,
    /// Allowed literal values. Advertised only; handlers report values
    /// outside this set themselves.
    #[serde(rename = "enum", skip_serializing_if = "Option::is_none")]
    pub allowed: Option<Vec<String>>,
    pub description: String,
}

impl PropertySchema {
    fn new(kind: SchemaType, description: impl Into<String>) -> Self {
        Self {
            kind,
            allowed: None,
            description: description.into(),
        }
    }

    pub fn string(description: impl Into<String>) -> Self {
        Self::new(SchemaType::String, description)
    }

    pub fn number(description: impl Into<String>) -> Self {
        Self::new(SchemaType::Number, description)
    }

    /// Restrict the advertised values to `values`.
    pub fn one_of<I, S>(mut self, values: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.allowed = Some(values.into_iter().map(Into::into).collect());
        self
    }
}

/// Properties in declaration order, serialized as a JSON object.
#[derive(Debug, Clone, PartialEq, Default)]
struct Properties(Vec<(String, PropertySchema)>);

impl Properties {
    fn insert(&mut self, name: String, schema: PropertySchema) {
        match self.0.iter_mut().find(|(existing, _)| *existing == name) {
            Some((_, slot)) => *slot = schema,
            None => self.0.push((name, schema)),
        }
    }

    #[cfg(test)]
    fn get(&self, name: &str) -> Option<&PropertySchema> {
        self.0.iter().find(|(existing, _)| existing == name).map(|(_, schema)| schema)
    }

    fn iter(&self) -> impl Iterator<Item = (&String, &PropertySchema)> {
        self.0.iter().map(|(name, schema)| (name, schema))
    }
}

impl Serialize for Properties {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_map(self.iter())
    }
}

/// Top-level `{"type": "object", ...}` schema describing a tool's arguments.
#[derive(Serialize, Debug, Clone, PartialEq)]
pub struct ObjectSchema {
    #[serde(rename = "type")]
    kind: &'static str,
    properties: Properties,
    required: Vec<String>,
}

impl Default for ObjectSchema {
    fn default() -> Self {
        Self::new()
    }
}

impl ObjectSchema {
    pub fn new() -> Self {
        Self {
            kind: "object",
            properties: Properties::default(),
            required: Vec::new(),
        }
    }

    /// Declare a property and mark it required.
    pub fn required_property(mut self, name: impl Into<String>, schema: PropertySchema) -> Self {
        let name = name.into();
        if !self.required.contains(&name) {
            self.required.push(name.clone());
        }
        self.properties.insert(name, schema);
        self
    }

    #[cfg(test)]
    pub fn property(&self, name: &str) -> Option<&PropertySchema> {
        self.properties.get(name)
    }

    #[cfg(test)]
    pub fn required(&self) -> &[String] {
        &self.required
    }

    /// Check `args` against this schema.
    ///
    /// Required properties must be present and non-null; every declared
    /// property that is present must match its type. Both checks run in
    /// declaration order. Undeclared properties are ignored and `enum` is
    /// not enforced.
    pub fn validate(&self, args: &Value) -> Result<(), ToolError> {
        let object = args.as_object().ok_or(ToolError::NotAnObject)?;

        for name in &self.required {
            match object.get(name) {
                None | Some(Value::Null) => {
                    return Err(ToolError::MissingParameter(name.clone()));
                }
                Some(_) => {}
            }
        }

        for (name, property) in self.properties.iter() {
            match object.get(name) {
                None | Some(Value::Null) => {}
                Some(value) if property.kind.matches(value) => {}
                Some(_) => {
                    return Err(ToolError::InvalidType {
                        name: name.clone(),
                        expected: property.kind.to_string(),
                    });
                }
            }
        }

        Ok(())
    }
}
