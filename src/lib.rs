// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

// Use README.md as crate documentation.
#![doc = include_str!(concat!(env!("CARGO_MANIFEST_DIR"), "/README.md"))]

// Schemas and sources are shared across threads.
pub(crate) use std::sync::Arc as Rc;

pub mod ast;
mod checker;
pub mod diagnostic;
mod error;
pub mod lexer;
pub mod parser;
pub mod schema;
pub mod utils;

pub use checker::Checker;
pub use diagnostic::{Diagnostic, DiagnosticKind, Path, PathSegment, Position, Severity};
pub use error::DocumentError;
pub use schema::{Schema, SchemaError, SchemaRegistry, SchemaSet};
pub use utils::limits::{LimitError, Limits};
