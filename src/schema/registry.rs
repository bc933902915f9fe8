// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

use crate::schema::{AdditionalProperties, Schema, SchemaDocument, SchemaError, Type};
use crate::Rc;

use dashmap::DashMap;
use indexmap::IndexMap;
use std::collections::BTreeMap;

type String = Rc<str>;

/// Validates that a schema name is not empty or whitespace-only.
fn validate_name(name: &str) -> Result<(), SchemaError> {
    if name.trim().is_empty() {
        Err(SchemaError::InvalidName { name: name.into() })
    } else {
        Ok(())
    }
}

/// Thread-safe registry of named schemas, filled before validation starts.
///
/// Definitions may reference each other in any order. Once every definition
/// is registered, [`SchemaRegistry::freeze`] checks them and produces the
/// immutable [`SchemaSet`] used for validation.
#[derive(Clone, Default)]
pub struct SchemaRegistry {
    inner: DashMap<String, Schema>,
}

impl SchemaRegistry {
    /// Create a new, empty registry.
    pub fn new() -> Self {
        Self {
            inner: DashMap::new(),
        }
    }

    /// Register a schema with a given name. Returns Err if name already exists.
    pub fn register(&self, name: impl Into<String>, schema: Schema) -> Result<(), SchemaError> {
        let name = name.into();
        validate_name(&name)?;

        use dashmap::mapref::entry::Entry;
        match self.inner.entry(name) {
            Entry::Occupied(e) => Err(SchemaError::AlreadyExists {
                name: e.key().clone(),
            }),
            Entry::Vacant(e) => {
                e.insert(schema);
                Ok(())
            }
        }
    }

    /// Register every definition of a schema document.
    pub fn register_document(&self, document: SchemaDocument) -> Result<(), SchemaError> {
        for (name, schema) in document.definitions {
            self.register(name, schema)?;
        }
        Ok(())
    }

    /// Parse a schema document and register its definitions. Returns the document version.
    pub fn load_json_str(&self, s: &str) -> Result<Option<String>, SchemaError> {
        let document = SchemaDocument::from_json_str(s)?;
        let version = document.version.clone();
        self.register_document(document)?;
        Ok(version)
    }

    /// Retrieve a schema by name, if it exists.
    pub fn get(&self, name: &str) -> Option<Schema> {
        self.inner.get(name).map(|entry| entry.value().clone())
    }

    /// Remove a schema by name. Returns the removed schema if it existed.
    pub fn remove(&self, name: &str) -> Option<Schema> {
        self.inner.remove(name).map(|(_, v)| v)
    }

    /// List all registered schema names, sorted.
    pub fn list_names(&self) -> Vec<String> {
        let mut names: Vec<String> = self.inner.iter().map(|entry| entry.key().clone()).collect();
        names.sort();
        names
    }

    /// Check if a schema with the given name exists.
    pub fn contains(&self, name: &str) -> bool {
        self.inner.contains_key(name)
    }

    pub fn len(&self) -> usize {
        self.inner.len()
    }

    pub fn is_empty(&self) -> bool {
        self.inner.is_empty()
    }

    pub fn clear(&self) {
        self.inner.clear();
    }

    /// Check every definition and build the immutable set used for validation.
    ///
    /// Fails if a reference names no definition, if an `extends` target is not
    /// an object definition or extension is circular, if a union, enum or tuple
    /// is empty, or if references form a cycle that never passes through an
    /// array or object.
    pub fn freeze(&self) -> Result<SchemaSet, SchemaError> {
        let definitions: BTreeMap<String, Schema> = self
            .inner
            .iter()
            .map(|entry| (entry.key().clone(), entry.value().clone()))
            .collect();

        for (name, schema) in definitions.iter() {
            check_schema(&definitions, name, schema)?;
        }

        let mut flattener = Flattener {
            definitions: &definitions,
            done: BTreeMap::new(),
            stack: vec![],
        };
        for name in definitions.keys() {
            flattener.definition(name, name)?;
        }
        let types = flattener.done;

        check_guarded_cycles(&types)?;

        tracing::debug!(definitions = types.len(), "schema set frozen");
        Ok(SchemaSet {
            version: None,
            types,
        })
    }
}

fn check_schema(
    definitions: &BTreeMap<String, Schema>,
    owner: &String,
    schema: &Schema,
) -> Result<(), SchemaError> {
    let invalid = |reason: &str| SchemaError::Invalid {
        name: owner.clone(),
        reason: reason.into(),
    };
    match schema.as_type() {
        Type::Ref { name } => {
            if !definitions.contains_key(name) {
                return Err(SchemaError::UnresolvedReference {
                    from: owner.clone(),
                    name: name.clone(),
                });
            }
        }
        Type::AnyOf { variants, .. } => {
            if variants.is_empty() {
                return Err(invalid("anyOf must have at least one alternative"));
            }
            for variant in variants.iter() {
                check_schema(definitions, owner, variant)?;
            }
        }
        Type::Enum { values, .. } => {
            if values.is_empty() {
                return Err(invalid("enum must have at least one value"));
            }
        }
        Type::Array { items, .. } => check_schema(definitions, owner, items)?,
        Type::Tuple { items, .. } => {
            if items.is_empty() {
                return Err(invalid("tuple must have at least one item"));
            }
            for item in items.iter() {
                check_schema(definitions, owner, item)?;
            }
        }
        Type::Object {
            properties,
            additional_properties,
            ..
        } => {
            for property in properties.values() {
                check_schema(definitions, owner, property)?;
            }
            if let AdditionalProperties::Schema(schema) = additional_properties {
                check_schema(definitions, owner, schema)?;
            }
        }
        Type::Number {
            minimum: Some(min),
            maximum: Some(max),
            ..
        }
        | Type::Integer {
            minimum: Some(min),
            maximum: Some(max),
            ..
        } if min > max => {
            return Err(invalid("minimum is greater than maximum"));
        }
        _ => (),
    }
    Ok(())
}

// Rewrites every definition so that objects carry the properties of the
// definitions they extend.
struct Flattener<'a> {
    definitions: &'a BTreeMap<String, Schema>,
    done: BTreeMap<String, Schema>,
    stack: Vec<String>,
}

impl Flattener<'_> {
    fn definition(&mut self, from: &String, name: &String) -> Result<Schema, SchemaError> {
        if let Some(schema) = self.done.get(name) {
            return Ok(schema.clone());
        }
        if let Some(pos) = self.stack.iter().position(|n| n == name) {
            let mut cycle = self.stack[pos..].to_vec();
            cycle.push(name.clone());
            return Err(SchemaError::ExtendsCycle { cycle });
        }
        let schema = match self.definitions.get(name) {
            Some(schema) => schema.clone(),
            None => {
                return Err(SchemaError::InvalidExtends {
                    from: from.clone(),
                    name: name.clone(),
                })
            }
        };

        self.stack.push(name.clone());
        let flat = self.rewrite(name, &schema)?;
        self.stack.pop();

        self.done.insert(name.clone(), flat.clone());
        Ok(flat)
    }

    fn rewrite(&mut self, owner: &String, schema: &Schema) -> Result<Schema, SchemaError> {
        let t = match schema.as_type() {
            Type::Object {
                description,
                properties,
                required,
                additional_properties,
                extends,
            } => {
                let mut merged_properties = IndexMap::new();
                let mut merged_required: Vec<String> = vec![];
                for base_name in extends.iter() {
                    let base = self.definition(owner, base_name)?;
                    match base.as_type() {
                        Type::Object {
                            properties,
                            required,
                            ..
                        } => {
                            for (key, property) in properties.iter() {
                                merged_properties.insert(key.clone(), property.clone());
                            }
                            merged_required.extend(required.iter().cloned());
                        }
                        _ => {
                            return Err(SchemaError::InvalidExtends {
                                from: owner.clone(),
                                name: base_name.clone(),
                            })
                        }
                    }
                }
                for (key, property) in properties.iter() {
                    merged_properties.insert(key.clone(), self.rewrite(owner, property)?);
                }
                for key in required.iter() {
                    if !merged_required.contains(key) {
                        merged_required.push(key.clone());
                    }
                }
                let additional_properties = match additional_properties {
                    AdditionalProperties::Schema(schema) => {
                        AdditionalProperties::Schema(self.rewrite(owner, schema)?)
                    }
                    policy => policy.clone(),
                };
                Type::Object {
                    description: description.clone(),
                    properties: Rc::new(merged_properties),
                    required: Rc::new(merged_required),
                    additional_properties,
                    extends: Rc::new(vec![]),
                }
            }
            Type::Array { description, items } => Type::Array {
                description: description.clone(),
                items: self.rewrite(owner, items)?,
            },
            Type::Tuple { description, items } => Type::Tuple {
                description: description.clone(),
                items: Rc::new(
                    items
                        .iter()
                        .map(|item| self.rewrite(owner, item))
                        .collect::<Result<Vec<_>, _>>()?,
                ),
            },
            Type::AnyOf {
                description,
                variants,
            } => Type::AnyOf {
                description: description.clone(),
                variants: Rc::new(
                    variants
                        .iter()
                        .map(|variant| self.rewrite(owner, variant))
                        .collect::<Result<Vec<_>, _>>()?,
                ),
            },
            _ => return Ok(schema.clone()),
        };
        Ok(Schema::new(t))
    }
}

// References reachable from `schema` without consuming a level of input.
fn unguarded_refs<'s>(schema: &'s Schema, out: &mut Vec<&'s String>) {
    match schema.as_type() {
        Type::Ref { name } => out.push(name),
        Type::AnyOf { variants, .. } => {
            for variant in variants.iter() {
                unguarded_refs(variant, out);
            }
        }
        _ => (),
    }
}

fn check_guarded_cycles(types: &BTreeMap<String, Schema>) -> Result<(), SchemaError> {
    #[derive(Clone, Copy, PartialEq)]
    enum Mark {
        Visiting,
        Done,
    }

    fn visit(
        types: &BTreeMap<String, Schema>,
        name: &String,
        marks: &mut BTreeMap<String, Mark>,
        stack: &mut Vec<String>,
    ) -> Result<(), SchemaError> {
        match marks.get(name) {
            Some(Mark::Done) => return Ok(()),
            Some(Mark::Visiting) => {
                let pos = stack.iter().position(|n| n == name).unwrap_or(0);
                let mut cycle = stack[pos..].to_vec();
                cycle.push(name.clone());
                return Err(SchemaError::UnguardedCycle { cycle });
            }
            None => (),
        }
        marks.insert(name.clone(), Mark::Visiting);
        stack.push(name.clone());

        let mut refs = vec![];
        if let Some(schema) = types.get(name) {
            unguarded_refs(schema, &mut refs);
        }
        for next in refs {
            visit(types, next, marks, stack)?;
        }

        stack.pop();
        marks.insert(name.clone(), Mark::Done);
        Ok(())
    }

    let mut marks = BTreeMap::new();
    let mut stack = vec![];
    for name in types.keys() {
        visit(types, name, &mut marks, &mut stack)?;
    }
    Ok(())
}

/// Frozen, immutable set of named schemas.
///
/// Shared across threads (usually behind an `Arc`) while documents are validated.
#[derive(Debug, Clone, Default)]
pub struct SchemaSet {
    version: Option<String>,
    types: BTreeMap<String, Schema>,
}

impl SchemaSet {
    /// Load and freeze a schema document in one step.
    pub fn from_json_str(s: &str) -> Result<Self, SchemaError> {
        let registry = SchemaRegistry::new();
        let version = registry.load_json_str(s)?;
        Ok(registry.freeze()?.with_version(version))
    }

    pub fn with_version(mut self, version: Option<String>) -> Self {
        self.version = version;
        self
    }

    pub fn version(&self) -> Option<&str> {
        self.version.as_deref()
    }

    /// Look up a definition by name.
    pub fn resolve(&self, name: &str) -> Option<&Schema> {
        self.types.get(name)
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.types.keys().map(|k| k.as_ref())
    }

    pub fn len(&self) -> usize {
        self.types.len()
    }

    pub fn is_empty(&self) -> bool {
        self.types.is_empty()
    }

    /// Follow references until a non-reference schema is reached.
    pub fn deref<'s>(&'s self, mut schema: &'s Schema) -> Option<&'s Schema> {
        // Pure reference cycles are rejected at freeze time; the bound is a backstop.
        for _ in 0..=self.types.len() {
            match schema.as_type() {
                Type::Ref { name } => schema = self.types.get(name)?,
                _ => return Some(schema),
            }
        }
        None
    }

    /// Resolve a dotted path such as `series.arcdiagram.dataLabels.style`.
    ///
    /// The longest prefix naming a definition is resolved first; the remaining
    /// segments walk object properties, array items (numeric segments select
    /// tuple positions), union alternatives and references.
    pub fn resolve_path(&self, path: &str) -> Option<Schema> {
        let segments: Vec<&str> = path.split('.').collect();
        let (mut schema, rest) = (1..=segments.len()).rev().find_map(|n| {
            let name = segments[..n].join(".");
            self.types
                .get(name.as_str())
                .map(|schema| (schema.clone(), &segments[n..]))
        })?;
        for segment in rest {
            schema = self.step(&schema, segment, &mut Vec::new())?;
        }
        Some(schema)
    }

    // `entered` holds the definitions visited while looking for one segment.
    // Arrays and unions are walked without consuming the segment, so entering
    // the same definition twice means the walk would never end.
    fn step(&self, schema: &Schema, segment: &str, entered: &mut Vec<String>) -> Option<Schema> {
        match schema.as_type() {
            Type::Ref { name } => {
                if entered.contains(name) {
                    return None;
                }
                entered.push(name.clone());
                self.step(self.types.get(name)?, segment, entered)
            }
            Type::Object {
                properties,
                additional_properties,
                ..
            } => match properties.get(segment) {
                Some(property) => Some(property.clone()),
                None => match additional_properties {
                    AdditionalProperties::Schema(schema) => Some(schema.clone()),
                    _ => None,
                },
            },
            Type::Array { items, .. } => match segment.parse::<usize>() {
                Ok(_) => Some(items.clone()),
                Err(_) => self.step(items, segment, entered),
            },
            Type::Tuple { items, .. } => {
                let idx = segment.parse::<usize>().ok()?;
                items.get(idx).cloned()
            }
            Type::AnyOf { variants, .. } => {
                variants
                    .iter()
                    .find_map(|variant| self.step(variant, segment, entered))
            }
            _ => None,
        }
    }
}
