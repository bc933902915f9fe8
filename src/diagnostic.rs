// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

use crate::Rc;

use core::fmt;
use serde::{Serialize, Serializer};

type String = Rc<str>;

/// A location inside a document. Lines and columns start at 1.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize)]
pub struct Position {
    pub line: u32,
    pub col: u32,
    pub offset: u32,
}

impl fmt::Display for Position {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.line, self.col)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Warning,
    Error,
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Severity::Warning => f.write_str("warning"),
            Severity::Error => f.write_str("error"),
        }
    }
}

/// One step from a container to one of its children.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(untagged)]
pub enum PathSegment {
    Key(String),
    Index(usize),
}

impl From<&str> for PathSegment {
    fn from(key: &str) -> Self {
        PathSegment::Key(key.into())
    }
}

impl From<usize> for PathSegment {
    fn from(index: usize) -> Self {
        PathSegment::Index(index)
    }
}

/// Location of a value relative to the document root.
///
/// Displayed as `data[0].dataLabels.color`; keys that are not plain
/// identifiers use bracket notation (`custom["some-key"]`). The root is the
/// empty path.
#[derive(Debug, Clone, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(transparent)]
pub struct Path(Vec<PathSegment>);

impl Path {
    pub fn root() -> Self {
        Self(vec![])
    }

    pub fn segments(&self) -> &[PathSegment] {
        &self.0
    }

    pub fn is_root(&self) -> bool {
        self.0.is_empty()
    }

    pub fn push(&mut self, segment: impl Into<PathSegment>) {
        self.0.push(segment.into());
    }

    pub fn pop(&mut self) -> Option<PathSegment> {
        self.0.pop()
    }

    pub fn child(&self, segment: impl Into<PathSegment>) -> Self {
        let mut path = self.clone();
        path.push(segment);
        path
    }
}

impl From<Vec<PathSegment>> for Path {
    fn from(segments: Vec<PathSegment>) -> Self {
        Self(segments)
    }
}

impl From<&[PathSegment]> for Path {
    fn from(segments: &[PathSegment]) -> Self {
        Self(segments.to_vec())
    }
}

fn is_plain_key(key: &str) -> bool {
    let mut chars = key.chars();
    match chars.next() {
        Some(c) if c.is_ascii_alphabetic() || c == '_' || c == '$' => {
            chars.all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '$')
        }
        _ => false,
    }
}

impl fmt::Display for Path {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (idx, segment) in self.0.iter().enumerate() {
            match segment {
                PathSegment::Key(key) if is_plain_key(key) => {
                    if idx > 0 {
                        f.write_str(".")?;
                    }
                    f.write_str(key)?;
                }
                PathSegment::Key(key) => write!(f, "[{key:?}]")?,
                PathSegment::Index(index) => write!(f, "[{index}]")?,
            }
        }
        Ok(())
    }
}

/// What went wrong, with the data specific to each kind of problem.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "kind", rename_all = "camelCase")]
pub enum DiagnosticKind {
    /// Malformed token stream. Fatal for the document.
    LexError { reason: String },
    /// Grammar violation. Fatal for the document.
    ParseError { expected: String, found: String },
    /// A key appeared twice in one object; the earlier value was discarded.
    DuplicateKey { key: String, discarded: Position },
    /// Value kind does not match the expected schema type.
    TypeMismatch { expected: String, actual: String },
    /// String is not one of the allowed enum values.
    InvalidEnumValue {
        value: String,
        allowed_values: Rc<Vec<String>>,
    },
    /// Required object property is missing.
    MissingRequiredProperty { property: String },
    /// Object property is not declared by the schema.
    UnknownProperty { property: String },
    /// Tuple length does not match the schema.
    ArityMismatch { expected: usize, actual: usize },
    /// String does not match the required pattern.
    PatternMismatch { value: String, pattern: String },
    /// Numeric value is outside the allowed range.
    OutOfRange {
        value: String,
        min: Option<String>,
        max: Option<String>,
    },
    /// Document nesting or size exceeded the configured limits. Fatal.
    ResourceLimitExceeded { reason: String },
}

impl DiagnosticKind {
    /// Name of the kind, as used in serialized output.
    pub fn name(&self) -> &'static str {
        match self {
            DiagnosticKind::LexError { .. } => "lexError",
            DiagnosticKind::ParseError { .. } => "parseError",
            DiagnosticKind::DuplicateKey { .. } => "duplicateKey",
            DiagnosticKind::TypeMismatch { .. } => "typeMismatch",
            DiagnosticKind::InvalidEnumValue { .. } => "invalidEnumValue",
            DiagnosticKind::MissingRequiredProperty { .. } => "missingRequiredProperty",
            DiagnosticKind::UnknownProperty { .. } => "unknownProperty",
            DiagnosticKind::ArityMismatch { .. } => "arityMismatch",
            DiagnosticKind::PatternMismatch { .. } => "patternMismatch",
            DiagnosticKind::OutOfRange { .. } => "outOfRange",
            DiagnosticKind::ResourceLimitExceeded { .. } => "resourceLimitExceeded",
        }
    }

    /// Whether the problem aborted processing of the whole document.
    pub fn is_fatal(&self) -> bool {
        matches!(
            self,
            DiagnosticKind::LexError { .. }
                | DiagnosticKind::ParseError { .. }
                | DiagnosticKind::ResourceLimitExceeded { .. }
        )
    }
}

impl fmt::Display for DiagnosticKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DiagnosticKind::LexError { reason } => write!(f, "{reason}"),
            DiagnosticKind::ParseError { expected, found } => {
                write!(f, "expecting {expected}, found {found}")
            }
            DiagnosticKind::DuplicateKey { key, discarded } => {
                write!(
                    f,
                    "duplicate key '{key}' overrides the value defined at {discarded}"
                )
            }
            DiagnosticKind::TypeMismatch { expected, actual } => {
                write!(f, "expected {expected}, got {actual}")
            }
            DiagnosticKind::InvalidEnumValue {
                value,
                allowed_values,
            } => {
                let values_json = serde_json::to_string(allowed_values.as_ref())
                    .unwrap_or_else(|_| format!("{allowed_values:?}"));
                write!(
                    f,
                    "value {value} is not in allowed enum values: {values_json}"
                )
            }
            DiagnosticKind::MissingRequiredProperty { property } => {
                write!(f, "missing required property '{property}'")
            }
            DiagnosticKind::UnknownProperty { property } => {
                write!(f, "unknown property '{property}'")
            }
            DiagnosticKind::ArityMismatch { expected, actual } => {
                write!(f, "expected {expected} items, got {actual}")
            }
            DiagnosticKind::PatternMismatch { value, pattern } => {
                write!(f, "string '{value}' does not match pattern '{pattern}'")
            }
            DiagnosticKind::OutOfRange { value, min, max } => {
                let range_desc = match (min, max) {
                    (Some(min), Some(max)) => format!("between {min} and {max}"),
                    (Some(min), None) => format!("at least {min}"),
                    (None, Some(max)) => format!("at most {max}"),
                    (None, None) => "within valid range".to_string(),
                };
                write!(f, "value {value} is out of range: must be {range_desc}")
            }
            DiagnosticKind::ResourceLimitExceeded { reason } => write!(f, "{reason}"),
        }
    }
}

/// One reported issue, produced by the parser or the validator.
///
/// Serializes flat: `severity`, the kind tag with its data, the rendered
/// `message`, `path` and `position`.
#[derive(Debug, Clone, PartialEq)]
pub struct Diagnostic {
    pub severity: Severity,
    pub kind: DiagnosticKind,
    pub path: Path,
    pub position: Position,
}

impl Serialize for Diagnostic {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        #[derive(Serialize)]
        struct Flat<'a> {
            severity: Severity,
            #[serde(flatten)]
            kind: &'a DiagnosticKind,
            message: std::string::String,
            path: &'a Path,
            position: Position,
        }

        Flat {
            severity: self.severity,
            kind: &self.kind,
            message: self.message(),
            path: &self.path,
            position: self.position,
        }
        .serialize(serializer)
    }
}

impl Diagnostic {
    pub fn error(kind: DiagnosticKind, path: Path, position: Position) -> Self {
        Self {
            severity: Severity::Error,
            kind,
            path,
            position,
        }
    }

    pub fn warning(kind: DiagnosticKind, path: Path, position: Position) -> Self {
        Self {
            severity: Severity::Warning,
            kind,
            path,
            position,
        }
    }

    pub fn is_error(&self) -> bool {
        self.severity == Severity::Error
    }

    pub fn message(&self) -> std::string::String {
        self.kind.to_string()
    }
}

impl fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.path.is_root() {
            write!(f, "{} at {}: {}", self.severity, self.position, self.kind)
        } else {
            write!(
                f,
                "{} at {} ('{}'): {}",
                self.severity, self.position, self.path, self.kind
            )
        }
    }
}
