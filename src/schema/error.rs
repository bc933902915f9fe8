// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

use crate::Rc;

use thiserror::Error;

type String = Rc<str>;

/// Errors raised while loading or freezing schema definitions.
///
/// All of them are fatal for the registry: a schema set that fails to freeze
/// cannot be used for validation.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum SchemaError {
    #[error("schema `{name}` is already registered")]
    AlreadyExists { name: String },

    #[error("invalid schema name `{name}`: empty or whitespace-only names are not allowed")]
    InvalidName { name: String },

    #[error("failed to parse schema: {0}")]
    Deserialize(String),

    #[error("`{from}` references undefined schema `{name}`")]
    UnresolvedReference { from: String, name: String },

    #[error("`{from}` extends `{name}`, which is not an object definition")]
    InvalidExtends { from: String, name: String },

    #[error("circular extension: {}", cycle.join(" -> "))]
    ExtendsCycle { cycle: Vec<String> },

    #[error("reference cycle does not pass through an array or object: {}", cycle.join(" -> "))]
    UnguardedCycle { cycle: Vec<String> },

    #[error("invalid schema `{name}`: {reason}")]
    Invalid { name: String, reason: String },
}
