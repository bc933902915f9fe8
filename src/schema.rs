// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

#![allow(clippy::pattern_type_mismatch)]

//! Schema model for chart configuration documents.
//!
//! Schemas are described in JSON and deserialized into a small tagged-variant
//! type system:
//!
//! ```json
//! { "$ref": "Color" }
//! { "anyOf": [ { "type": "string" }, { "$ref": "Gradient" } ], "description": "color" }
//! { "enum": [ "left", "center", "right" ] }
//! { "type": "number", "minimum": 0 }
//! { "type": "tuple", "items": [ { "type": "number" }, { "$ref": "Color" } ] }
//! {
//!   "type": "object",
//!   "properties": { "enabled": { "type": "boolean" } },
//!   "required": [],
//!   "additionalProperties": "warn",
//!   "extends": [ "SeriesOptions" ]
//! }
//! ```
//!
//! Unsupported fields are rejected during deserialization so that no part of a
//! schema is silently ignored. Types are immutable and shared through `Rc`
//! (an `Arc`), so a frozen [`registry::SchemaSet`] can be used from many
//! threads at once.

use crate::ast::Node;
use crate::diagnostic::Diagnostic;
use crate::utils::limits::LimitError;
use crate::Rc;

use core::fmt;
use indexmap::IndexMap;
use serde::{Deserialize, Deserializer};

type String = Rc<str>;

pub mod builtin;
pub mod error;
pub mod registry;
pub mod validate;

pub use error::SchemaError;
pub use registry::{SchemaRegistry, SchemaSet};

/// A type definition used for validation.
///
/// Cheap to clone; the underlying [`Type`] is shared.
#[derive(Debug, Clone)]
pub struct Schema {
    t: Rc<Type>,
}

impl Schema {
    pub fn new(t: Type) -> Self {
        Schema { t: Rc::new(t) }
    }

    pub fn reference(name: &str) -> Self {
        Schema::new(Type::Ref { name: name.into() })
    }

    pub fn any() -> Self {
        Schema::new(Type::Any { description: None })
    }

    /// Returns a reference to the underlying type definition.
    pub fn as_type(&self) -> &Type {
        &self.t
    }

    pub fn ptr_eq(&self, other: &Schema) -> bool {
        Rc::ptr_eq(&self.t, &other.t)
    }

    /// Parse a single schema from JSON text.
    pub fn from_json_str(s: &str) -> Result<Self, SchemaError> {
        serde_json::from_str(s).map_err(|e| SchemaError::Deserialize(e.to_string().into()))
    }

    pub fn description(&self) -> Option<&str> {
        match self.as_type() {
            Type::Any { description }
            | Type::Boolean { description }
            | Type::Function { description }
            | Type::Number { description, .. }
            | Type::Integer { description, .. }
            | Type::String { description, .. }
            | Type::Array { description, .. }
            | Type::Tuple { description, .. }
            | Type::Object { description, .. }
            | Type::AnyOf { description, .. }
            | Type::Enum { description, .. } => description.as_deref(),
            Type::Ref { .. } => None,
        }
    }

    /// Short summary of the expected shape, used in type mismatch messages.
    ///
    /// Unions and enums prefer their `description`; other types are named by kind.
    pub fn describe(&self) -> std::string::String {
        match self.as_type() {
            Type::Any { .. } => "any".to_string(),
            Type::Boolean { .. } => "boolean".to_string(),
            Type::Function { .. } => "function".to_string(),
            Type::Number { .. } => "number".to_string(),
            Type::Integer { .. } => "integer".to_string(),
            Type::String { .. } => "string".to_string(),
            Type::Array { items, .. } => format!("array of {}", items.describe()),
            Type::Tuple { items, .. } => {
                let items: Vec<_> = items.iter().map(|s| s.describe()).collect();
                format!("[{}]", items.join(", "))
            }
            Type::Object { .. } => "object".to_string(),
            Type::AnyOf {
                description: Some(description),
                ..
            }
            | Type::Enum {
                description: Some(description),
                ..
            } => description.to_string(),
            Type::AnyOf { variants, .. } => {
                let variants: Vec<_> = variants.iter().map(|s| s.describe()).collect();
                variants.join(" | ")
            }
            Type::Enum { values, .. } => {
                let values: Vec<_> = values.iter().map(|v| format!("'{v}'")).collect();
                values.join(" | ")
            }
            Type::Ref { name } => name.to_string(),
        }
    }

    /// Validate `node` against this schema, resolving references in `schemas`.
    pub fn validate(
        &self,
        schemas: &SchemaSet,
        node: &Node,
    ) -> Result<Vec<Diagnostic>, LimitError> {
        validate::SchemaValidator::validate(schemas, node, self)
    }
}

impl<'de> Deserialize<'de> for Schema {
    /// `$ref`, `anyOf` and `enum` schemas are recognized by their keyword; any
    /// other schema must carry a `type` tag.
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let v: serde_json::Value = Deserialize::deserialize(deserializer)?;
        if v.get("$ref").is_some() {
            #[derive(Deserialize)]
            #[serde(deny_unknown_fields)]
            struct Reference {
                #[serde(rename = "$ref")]
                name: String,
            }
            let reference: Reference = Deserialize::deserialize(v)
                .map_err(|e| serde::de::Error::custom(format!("{e}")))?;
            return Ok(Schema::new(Type::Ref {
                name: reference.name,
            }));
        }

        if v.get("anyOf").is_some() {
            #[derive(Deserialize)]
            #[serde(deny_unknown_fields)]
            struct AnyOf {
                #[serde(rename = "anyOf")]
                variants: Rc<Vec<Schema>>,
                description: Option<String>,
            }
            let any_of: AnyOf = Deserialize::deserialize(v)
                .map_err(|e| serde::de::Error::custom(format!("{e}")))?;
            return Ok(Schema::new(Type::AnyOf {
                description: any_of.description,
                variants: any_of.variants,
            }));
        }

        if v.get("enum").is_some() {
            #[derive(Deserialize)]
            #[serde(deny_unknown_fields)]
            struct Enum {
                #[serde(rename = "enum")]
                values: Rc<Vec<String>>,
                description: Option<String>,
            }
            let enum_schema: Enum = Deserialize::deserialize(v)
                .map_err(|e| serde::de::Error::custom(format!("{e}")))?;
            return Ok(Schema::new(Type::Enum {
                description: enum_schema.description,
                values: enum_schema.values,
            }));
        }

        let t: Type =
            Deserialize::deserialize(v).map_err(|e| serde::de::Error::custom(format!("{e}")))?;
        Ok(Schema::new(t))
    }
}

#[derive(Debug, Clone, Deserialize)]
// Use `type` when deserializing to discriminate between different types.
#[serde(tag = "type")]
#[serde(rename_all = "camelCase")]
// Raise error if unsupported fields are encountered.
#[serde(deny_unknown_fields)]
pub enum Type {
    /// Accepts any value.
    Any { description: Option<String> },

    /// `true` or `false`. Bare identifiers such as `True` do not qualify.
    Boolean { description: Option<String> },

    /// A function literal.
    Function { description: Option<String> },

    Number {
        description: Option<String>,
        minimum: Option<f64>,
        maximum: Option<f64>,
    },

    /// A number without a fractional part.
    Integer {
        description: Option<String>,
        minimum: Option<f64>,
        maximum: Option<f64>,
    },

    String {
        description: Option<String>,
        pattern: Option<Pattern>,
    },

    /// Homogeneous array.
    Array {
        description: Option<String>,
        items: Schema,
    },

    /// Fixed-length array with one schema per position.
    Tuple {
        description: Option<String>,
        items: Rc<Vec<Schema>>,
    },

    #[serde(rename_all = "camelCase")]
    Object {
        description: Option<String>,
        #[serde(default)]
        properties: Rc<IndexMap<String, Schema>>,
        #[serde(default)]
        required: Rc<Vec<String>>,
        #[serde(default)]
        additional_properties: AdditionalProperties,
        /// Object definitions whose properties are merged in when the set is frozen.
        #[serde(default)]
        extends: Rc<Vec<String>>,
    },

    #[serde(skip)]
    AnyOf {
        description: Option<String>,
        variants: Rc<Vec<Schema>>,
    },

    #[serde(skip)]
    Enum {
        description: Option<String>,
        values: Rc<Vec<String>>,
    },

    #[serde(skip)]
    Ref { name: String },
}

/// What happens to object keys that the schema does not declare.
#[derive(Debug, Clone, Default)]
pub enum AdditionalProperties {
    Allow,
    Warn,
    #[default]
    Deny,
    /// Undeclared keys must match this schema.
    Schema(Schema),
}

impl<'de> Deserialize<'de> for AdditionalProperties {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let value = serde_json::Value::deserialize(deserializer)?;
        match &value {
            serde_json::Value::Bool(true) => Ok(AdditionalProperties::Allow),
            serde_json::Value::Bool(false) => Ok(AdditionalProperties::Deny),
            serde_json::Value::String(s) => match s.as_str() {
                "allow" => Ok(AdditionalProperties::Allow),
                "warn" => Ok(AdditionalProperties::Warn),
                "deny" => Ok(AdditionalProperties::Deny),
                _ => Err(serde::de::Error::custom(format!(
                    "invalid additionalProperties policy `{s}`, expected allow, warn or deny"
                ))),
            },
            _ => {
                let schema: Schema = Deserialize::deserialize(value)
                    .map_err(|e| serde::de::Error::custom(format!("{e}")))?;
                Ok(AdditionalProperties::Schema(schema))
            }
        }
    }
}

/// A compiled `pattern` constraint. Keeps the source text for messages.
#[derive(Clone)]
pub struct Pattern {
    source: String,
    regex: regex::Regex,
}

impl Pattern {
    pub fn new(source: &str) -> Result<Self, regex::Error> {
        Ok(Self {
            source: source.into(),
            regex: regex::Regex::new(source)?,
        })
    }

    pub fn as_str(&self) -> &str {
        &self.source
    }

    pub fn is_match(&self, s: &str) -> bool {
        self.regex.is_match(s)
    }
}

impl fmt::Debug for Pattern {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Pattern({:?})", self.source)
    }
}

impl<'de> Deserialize<'de> for Pattern {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let source = std::string::String::deserialize(deserializer)?;
        Pattern::new(&source)
            .map_err(|e| serde::de::Error::custom(format!("invalid pattern `{source}`: {e}")))
    }
}

/// A versioned collection of named schemas, as stored on disk.
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct SchemaDocument {
    #[serde(default)]
    pub version: Option<String>,
    pub definitions: IndexMap<String, Schema>,
}

impl SchemaDocument {
    pub fn from_json_str(s: &str) -> Result<Self, SchemaError> {
        serde_json::from_str(s).map_err(|e| SchemaError::Deserialize(e.to_string().into()))
    }
}
