// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

#![allow(clippy::pattern_type_mismatch)]

use crate::ast::{Node, Object, Scalar};
use crate::diagnostic::{Diagnostic, DiagnosticKind, Path};
use crate::schema::{AdditionalProperties, Pattern, Schema, SchemaSet, Type};
use crate::utils::limits::{Budget, LimitError, Limits};
use crate::Rc;

use core::mem;
use indexmap::IndexMap;

type String = Rc<str>;

/// Walks a document tree against a schema and collects every mismatch.
///
/// Validation never stops at the first problem: siblings are validated
/// independently and all their diagnostics are kept, in document order. The
/// only failure is exceeding the configured [`Limits`].
pub struct SchemaValidator<'a> {
    schemas: &'a SchemaSet,
    budget: Budget,
    path: Path,
    diagnostics: Vec<Diagnostic>,
}

impl<'a> SchemaValidator<'a> {
    pub fn new(schemas: &'a SchemaSet, limits: Limits) -> Self {
        Self {
            schemas,
            budget: Budget::new(limits),
            path: Path::root(),
            diagnostics: vec![],
        }
    }

    /// Validates `node` against `schema` with default limits.
    ///
    /// # Example
    /// ```rust,ignore
    /// let schemas = SchemaSet::from_json_str(r#"{ "definitions": {} }"#)?;
    /// let schema = Schema::from_json_str(r#"{ "type": "boolean" }"#)?;
    /// let diagnostics = SchemaValidator::validate(&schemas, &node, &schema)?;
    /// ```
    pub fn validate(
        schemas: &SchemaSet,
        node: &Node,
        schema: &Schema,
    ) -> Result<Vec<Diagnostic>, LimitError> {
        Self::validate_at(schemas, node, schema, Path::root())
    }

    /// Like [`SchemaValidator::validate`], reporting paths relative to `path`.
    pub fn validate_at(
        schemas: &SchemaSet,
        node: &Node,
        schema: &Schema,
        path: Path,
    ) -> Result<Vec<Diagnostic>, LimitError> {
        SchemaValidator::new(schemas, Limits::default()).run(node, schema, path)
    }

    /// Validate one tree. The validator can be reused; counters are reset per run.
    pub fn run(
        &mut self,
        node: &Node,
        schema: &Schema,
        path: Path,
    ) -> Result<Vec<Diagnostic>, LimitError> {
        self.budget = Budget::new(*self.budget.limits());
        self.path = path;
        self.diagnostics.clear();
        self.validate_node(node, schema)?;
        Ok(mem::take(&mut self.diagnostics))
    }

    fn report(&mut self, kind: DiagnosticKind, node: &Node) {
        self.diagnostics
            .push(Diagnostic::error(kind, self.path.clone(), node.position()));
    }

    fn mismatch(&mut self, schema: &Schema, node: &Node) {
        self.report(
            DiagnosticKind::TypeMismatch {
                expected: schema.describe().into(),
                actual: node.describe().into(),
            },
            node,
        );
    }

    fn validate_node(&mut self, node: &Node, schema: &Schema) -> Result<(), LimitError> {
        // References do not consume input, so they are not counted as visits.
        if let Type::Ref { name } = schema.as_type() {
            let schemas = self.schemas;
            return match schemas.resolve(name) {
                Some(resolved) => self.validate_node(node, resolved),
                None => {
                    self.mismatch(schema, node);
                    Ok(())
                }
            };
        }

        self.budget.count_node()?;
        match schema.as_type() {
            Type::Any { .. } => (),
            Type::Boolean { .. } => {
                if !matches!(
                    node,
                    Node::Scalar {
                        value: Scalar::Bool(_),
                        ..
                    }
                ) {
                    self.mismatch(schema, node);
                }
            }
            Type::Function { .. } => {
                if !matches!(node, Node::Function { .. }) {
                    self.mismatch(schema, node);
                }
            }
            Type::Number {
                minimum, maximum, ..
            } => self.validate_number(node, schema, *minimum, *maximum, false),
            Type::Integer {
                minimum, maximum, ..
            } => self.validate_number(node, schema, *minimum, *maximum, true),
            Type::String { pattern, .. } => self.validate_string(node, schema, pattern.as_ref()),
            Type::Enum { values, .. } => self.validate_enum(node, values),
            Type::AnyOf { variants, .. } => self.validate_any_of(node, schema, variants)?,
            Type::Array { items, .. } => self.validate_array(node, schema, items)?,
            Type::Tuple { items, .. } => self.validate_tuple(node, schema, items)?,
            Type::Object {
                properties,
                required,
                additional_properties,
                ..
            } => match node {
                Node::Object(object) => {
                    self.validate_object(object, properties, required, additional_properties)?
                }
                _ => self.mismatch(schema, node),
            },
            Type::Ref { .. } => (),
        }
        Ok(())
    }

    fn validate_number(
        &mut self,
        node: &Node,
        schema: &Schema,
        minimum: Option<f64>,
        maximum: Option<f64>,
        integer: bool,
    ) {
        let n = match node {
            Node::Scalar {
                value: Scalar::Number(n),
                ..
            } if !integer || n.fract() == 0.0 => *n,
            _ => return self.mismatch(schema, node),
        };

        let below = minimum.is_some_and(|min| n < min);
        let above = maximum.is_some_and(|max| n > max);
        if below || above {
            self.report(
                DiagnosticKind::OutOfRange {
                    value: n.to_string().into(),
                    min: minimum.map(|m| m.to_string().into()),
                    max: maximum.map(|m| m.to_string().into()),
                },
                node,
            );
        }
    }

    fn validate_string(&mut self, node: &Node, schema: &Schema, pattern: Option<&Pattern>) {
        let Some(s) = node.as_str() else {
            return self.mismatch(schema, node);
        };
        if let Some(pattern) = pattern {
            if !pattern.is_match(s) {
                self.report(
                    DiagnosticKind::PatternMismatch {
                        value: s.into(),
                        pattern: pattern.as_str().into(),
                    },
                    node,
                );
            }
        }
    }

    fn validate_enum(&mut self, node: &Node, values: &Rc<Vec<String>>) {
        if let Some(s) = node.as_str() {
            if values.iter().any(|v| **v == *s) {
                return;
            }
        }
        let value = match node {
            Node::Scalar { .. } | Node::Identifier { .. } => node.to_string(),
            _ => node.kind_name().to_string(),
        };
        self.report(
            DiagnosticKind::InvalidEnumValue {
                value: value.into(),
                allowed_values: values.clone(),
            },
            node,
        );
    }

    // The first clean alternative wins. Failing that, the first alternative
    // with warnings only. Otherwise one mismatch for the whole union.
    fn validate_any_of(
        &mut self,
        node: &Node,
        schema: &Schema,
        variants: &[Schema],
    ) -> Result<(), LimitError> {
        let saved = mem::take(&mut self.diagnostics);
        let mut fallback = None;
        for (idx, variant) in variants.iter().enumerate() {
            self.validate_node(node, variant)?;
            let diagnostics = mem::take(&mut self.diagnostics);
            if diagnostics.is_empty() {
                tracing::trace!(path = %self.path, alternative = idx, "union alternative matched");
                self.diagnostics = saved;
                return Ok(());
            }
            if fallback.is_none() && !diagnostics.iter().any(Diagnostic::is_error) {
                fallback = Some((idx, diagnostics));
            }
        }

        self.diagnostics = saved;
        match fallback {
            Some((idx, warnings)) => {
                tracing::trace!(path = %self.path, alternative = idx, "union alternative matched with warnings");
                self.diagnostics.extend(warnings);
            }
            None => self.mismatch(schema, node),
        }
        Ok(())
    }

    fn validate_array(&mut self, node: &Node, schema: &Schema, items: &Schema) -> Result<(), LimitError> {
        let Node::Array { items: elements, .. } = node else {
            self.mismatch(schema, node);
            return Ok(());
        };

        self.budget.enter()?;
        for (idx, element) in elements.iter().enumerate() {
            self.path.push(idx);
            self.validate_node(element, items)?;
            self.path.pop();
        }
        self.budget.leave();
        Ok(())
    }

    fn validate_tuple(
        &mut self,
        node: &Node,
        schema: &Schema,
        items: &[Schema],
    ) -> Result<(), LimitError> {
        let Node::Array { items: elements, .. } = node else {
            self.mismatch(schema, node);
            return Ok(());
        };

        if elements.len() != items.len() {
            self.report(
                DiagnosticKind::ArityMismatch {
                    expected: items.len(),
                    actual: elements.len(),
                },
                node,
            );
        }

        self.budget.enter()?;
        for (idx, (element, item)) in elements.iter().zip(items.iter()).enumerate() {
            self.path.push(idx);
            self.validate_node(element, item)?;
            self.path.pop();
        }
        self.budget.leave();
        Ok(())
    }

    fn validate_object(
        &mut self,
        object: &Object,
        properties: &IndexMap<String, Schema>,
        required: &[String],
        additional_properties: &AdditionalProperties,
    ) -> Result<(), LimitError> {
        for property in required {
            if object.get(property).is_none() {
                self.diagnostics.push(Diagnostic::error(
                    DiagnosticKind::MissingRequiredProperty {
                        property: property.clone(),
                    },
                    self.path.clone(),
                    object.span.position(),
                ));
            }
        }

        self.budget.enter()?;
        for (key, field) in object.fields.iter() {
            self.path.push(key.as_ref());
            match properties.get(key) {
                // An explicit null leaves an optional property unset.
                Some(_) if is_null(&field.value) && !required.contains(key) => (),
                Some(property) => self.validate_node(&field.value, property)?,
                None => match additional_properties {
                    AdditionalProperties::Allow => (),
                    AdditionalProperties::Warn => self.diagnostics.push(Diagnostic::warning(
                        DiagnosticKind::UnknownProperty {
                            property: key.clone(),
                        },
                        self.path.clone(),
                        field.key_span.position(),
                    )),
                    AdditionalProperties::Deny => self.diagnostics.push(Diagnostic::error(
                        DiagnosticKind::UnknownProperty {
                            property: key.clone(),
                        },
                        self.path.clone(),
                        field.key_span.position(),
                    )),
                    AdditionalProperties::Schema(schema) => {
                        self.validate_node(&field.value, schema)?
                    }
                },
            }
            self.path.pop();
        }
        self.budget.leave();
        Ok(())
    }
}

fn is_null(node: &Node) -> bool {
    matches!(
        node,
        Node::Scalar {
            value: Scalar::Null,
            ..
        }
    )
}
