// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

use crate::ast::Document;
use crate::diagnostic::{Diagnostic, DiagnosticKind, Path, Position};
use crate::error::DocumentError;
use crate::lexer::Source;
use crate::parser::Parser;
use crate::schema::validate::SchemaValidator;
use crate::schema::{builtin, Schema, SchemaError, SchemaSet};
use crate::utils::limits::Limits;
use crate::Rc;

#[cfg(feature = "parallel")]
use rayon::prelude::*;

/// Parses configuration documents and validates them against a shared schema set.
///
/// A checker is cheap to clone and can be shared between threads.
#[derive(Debug, Clone)]
pub struct Checker {
    schemas: Rc<SchemaSet>,
    limits: Limits,
}

impl Checker {
    pub fn new(schemas: Rc<SchemaSet>) -> Self {
        Self {
            schemas,
            limits: Limits::default(),
        }
    }

    /// A checker over the bundled chart options schema.
    pub fn with_builtin_schemas() -> Result<Self, SchemaError> {
        Ok(Self::new(builtin::chart_options()?))
    }

    pub fn schemas(&self) -> &Rc<SchemaSet> {
        &self.schemas
    }

    pub fn limits(&self) -> &Limits {
        &self.limits
    }

    pub fn set_limits(&mut self, limits: Limits) {
        self.limits = limits;
    }

    /// Parse one document without validating it.
    pub fn parse(&self, file: &str, text: &str) -> Result<Document, DocumentError> {
        let source = Source::from_contents(file.to_string(), text.to_string()).map_err(|e| {
            DocumentError::Lex {
                file: file.into(),
                path: Path::root(),
                position: Position::default(),
                reason: e.to_string().into(),
            }
        })?;
        let mut parser = Parser::new(&source)?;
        parser.set_limits(self.limits);
        parser.parse()
    }

    /// Check one document against the schema found at `root`, e.g. `series.pie`.
    ///
    /// Returns the parse warnings followed by the validation diagnostics. A
    /// document that fails to parse yields its single fatal diagnostic. Only an
    /// unknown `root` is an error.
    pub fn check(
        &self,
        root: &str,
        file: &str,
        text: &str,
    ) -> Result<Vec<Diagnostic>, SchemaError> {
        let schema = self.root_schema(root, file)?;
        let diagnostics = match self.parse(file, text) {
            Ok(document) => self.check_document(&document, &schema),
            Err(err) => vec![err.to_diagnostic()],
        };
        tracing::debug!(
            file,
            root,
            diagnostics = diagnostics.len(),
            "checked document"
        );
        Ok(diagnostics)
    }

    /// Validate an already parsed document.
    pub fn check_document(&self, document: &Document, schema: &Schema) -> Vec<Diagnostic> {
        let mut diagnostics = document.warnings.clone();
        let mut validator = SchemaValidator::new(&self.schemas, self.limits);
        match validator.run(&document.root, schema, Path::root()) {
            Ok(found) => diagnostics.extend(found),
            Err(err) => diagnostics.push(Diagnostic::error(
                DiagnosticKind::ResourceLimitExceeded {
                    reason: err.to_string().into(),
                },
                Path::root(),
                document.root.position(),
            )),
        }
        diagnostics
    }

    /// Check many `(file, text)` documents against the same root.
    ///
    /// Results are returned in input order. With the `parallel` feature the
    /// documents are checked on the rayon thread pool.
    pub fn check_batch<S: AsRef<str> + Sync>(
        &self,
        root: &str,
        documents: &[(S, S)],
    ) -> Result<Vec<Vec<Diagnostic>>, SchemaError> {
        let schema = self.root_schema(root, "<batch>")?;
        let check_one = |(file, text): &(S, S)| -> Vec<Diagnostic> {
            match self.parse(file.as_ref(), text.as_ref()) {
                Ok(document) => self.check_document(&document, &schema),
                Err(err) => vec![err.to_diagnostic()],
            }
        };

        #[cfg(feature = "parallel")]
        let results = documents.par_iter().map(check_one).collect();
        #[cfg(not(feature = "parallel"))]
        let results = documents.iter().map(check_one).collect();

        tracing::debug!(root, documents = documents.len(), "checked batch");
        Ok(results)
    }

    fn root_schema(&self, root: &str, file: &str) -> Result<Schema, SchemaError> {
        self.schemas
            .resolve_path(root)
            .ok_or_else(|| SchemaError::UnresolvedReference {
                from: file.into(),
                name: root.into(),
            })
    }
}
