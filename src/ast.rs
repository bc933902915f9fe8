// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

use crate::diagnostic::{Diagnostic, Path, PathSegment, Position};
use crate::lexer::{Source, Span};
use crate::Rc;

use core::fmt;
use indexmap::IndexMap;

#[derive(Debug, Clone, PartialEq)]
pub enum Scalar {
    String(Rc<str>),
    Number(f64),
    Bool(bool),
    Null,
}

#[derive(Debug, Clone)]
pub struct Field {
    /// Span of the surviving occurrence of the key.
    pub key_span: Span,
    pub value: Node,
}

#[derive(Debug, Clone)]
pub struct Object {
    pub span: Span,
    pub fields: IndexMap<Rc<str>, Field>,
}

impl Object {
    pub fn get(&self, key: &str) -> Option<&Node> {
        self.fields.get(key).map(|f| &f.value)
    }

    pub fn len(&self) -> usize {
        self.fields.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    pub fn keys(&self) -> impl Iterator<Item = &Rc<str>> {
        self.fields.keys()
    }
}

// Key order and positions are formatting artifacts.
impl PartialEq for Object {
    fn eq(&self, other: &Self) -> bool {
        self.fields.len() == other.fields.len()
            && self
                .fields
                .iter()
                .all(|(k, f)| other.get(k).is_some_and(|v| *v == f.value))
    }
}

#[derive(Debug, Clone)]
pub enum Node {
    Scalar { span: Span, value: Scalar },
    /// Bare word in value position, e.g. `True` or `undefined`.
    Identifier { span: Span, name: Rc<str> },
    /// A function literal was supplied. The body is not retained.
    Function { span: Span },
    Array { span: Span, items: Vec<Node> },
    Object(Object),
}

impl PartialEq for Node {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Node::Scalar { value: a, .. }, Node::Scalar { value: b, .. }) => a == b,
            (Node::Identifier { name: a, .. }, Node::Identifier { name: b, .. }) => a == b,
            (Node::Function { .. }, Node::Function { .. }) => true,
            (Node::Array { items: a, .. }, Node::Array { items: b, .. }) => a == b,
            (Node::Object(a), Node::Object(b)) => a == b,
            _ => false,
        }
    }
}

impl Node {
    pub fn span(&self) -> &Span {
        match self {
            Node::Scalar { span, .. }
            | Node::Identifier { span, .. }
            | Node::Function { span }
            | Node::Array { span, .. } => span,
            Node::Object(obj) => &obj.span,
        }
    }

    pub fn position(&self) -> Position {
        self.span().position()
    }

    /// Short name of the node kind, as used in type mismatch messages.
    pub fn kind_name(&self) -> &'static str {
        match self {
            Node::Scalar { value, .. } => match value {
                Scalar::String(_) => "string",
                Scalar::Number(_) => "number",
                Scalar::Bool(_) => "boolean",
                Scalar::Null => "null",
            },
            Node::Identifier { .. } => "identifier",
            Node::Function { .. } => "function",
            Node::Array { .. } => "array",
            Node::Object(_) => "object",
        }
    }

    /// Kind name, with the word itself for identifiers: ``identifier `True` ``.
    pub fn describe(&self) -> String {
        match self {
            Node::Identifier { name, .. } => format!("identifier `{name}`"),
            _ => self.kind_name().to_string(),
        }
    }

    pub fn as_object(&self) -> Option<&Object> {
        match self {
            Node::Object(obj) => Some(obj),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Node::Scalar {
                value: Scalar::String(s),
                ..
            } => Some(s),
            _ => None,
        }
    }

    /// Follow `path` from this node.
    pub fn lookup(&self, path: &Path) -> Option<&Node> {
        let mut node = self;
        for segment in path.segments() {
            node = match (node, segment) {
                (Node::Object(obj), PathSegment::Key(key)) => obj.get(key)?,
                (Node::Array { items, .. }, PathSegment::Index(idx)) => items.get(*idx)?,
                _ => return None,
            };
        }
        Some(node)
    }
}

fn write_str_literal(f: &mut fmt::Formatter<'_>, s: &str) -> fmt::Result {
    match serde_json::to_string(s) {
        Ok(quoted) => f.write_str(&quoted),
        Err(_) => Err(fmt::Error),
    }
}

impl fmt::Display for Object {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.fields.is_empty() {
            return f.write_str("{}");
        }
        f.write_str("{ ")?;
        for (idx, (key, field)) in self.fields.iter().enumerate() {
            if idx > 0 {
                f.write_str(", ")?;
            }
            write_str_literal(f, key)?;
            write!(f, ": {}", field.value)?;
        }
        f.write_str(" }")
    }
}

/// Canonical text form. Parses back to an equal tree.
impl fmt::Display for Node {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Node::Scalar { value, .. } => match value {
                Scalar::String(s) => write_str_literal(f, s),
                Scalar::Number(n) => write!(f, "{n}"),
                Scalar::Bool(b) => write!(f, "{b}"),
                Scalar::Null => f.write_str("null"),
            },
            Node::Identifier { name, .. } => f.write_str(name),
            Node::Function { .. } => f.write_str("function () {}"),
            Node::Array { items, .. } => {
                f.write_str("[")?;
                for (idx, item) in items.iter().enumerate() {
                    if idx > 0 {
                        f.write_str(", ")?;
                    }
                    write!(f, "{item}")?;
                }
                f.write_str("]")
            }
            Node::Object(obj) => write!(f, "{obj}"),
        }
    }
}

/// One parsed configuration document.
#[derive(Debug, Clone)]
pub struct Document {
    pub source: Source,
    /// Always a [`Node::Object`].
    pub root: Node,
    /// Non-fatal parse warnings, in source order.
    pub warnings: Vec<Diagnostic>,
}

impl Document {
    pub fn root_object(&self) -> Option<&Object> {
        self.root.as_object()
    }
}
