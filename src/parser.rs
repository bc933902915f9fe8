// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

use crate::ast::{Document, Field, Node, Object, Scalar};
use crate::diagnostic::{Diagnostic, DiagnosticKind, Path};
use crate::error::DocumentError;
use crate::lexer::{parse_number, unescape, Lexer, Source, Span, Token, TokenKind};
use crate::utils::limits::{Budget, LimitError, Limits};
use crate::Rc;

use indexmap::IndexMap;

#[derive(Clone)]
pub struct Parser<'source> {
    source: Source,
    lexer: Lexer<'source>,
    tok: Token,
    end: u32,
    budget: Budget,
    path: Path,
    warnings: Vec<Diagnostic>,
}

impl<'source> Parser<'source> {
    pub fn new(source: &'source Source) -> Result<Self, DocumentError> {
        let mut lexer = Lexer::new(source);
        let tok = lexer.next_token()?;
        Ok(Self {
            source: source.clone(),
            lexer,
            tok,
            end: 0,
            budget: Budget::new(Limits::default()),
            path: Path::root(),
            warnings: vec![],
        })
    }

    pub fn set_limits(&mut self, limits: Limits) {
        self.budget = Budget::new(limits);
    }

    pub fn token_text(&self) -> &str {
        match self.tok.0 {
            TokenKind::Symbol => self.tok.1.text(),
            _ => "",
        }
    }

    pub fn next_token(&mut self) -> Result<(), DocumentError> {
        self.end = self.tok.1.end;
        self.tok = self
            .lexer
            .next_token()
            .map_err(|e| e.with_path(&self.path))?;
        Ok(())
    }

    fn found(&self) -> String {
        match self.tok.0 {
            TokenKind::Eof => "end of input".to_string(),
            TokenKind::Function => "function literal".to_string(),
            _ => {
                let text = self.tok.1.text();
                match text.char_indices().nth(24) {
                    Some((cut, _)) => format!("`{}...`", &text[..cut]),
                    None => format!("`{text}`"),
                }
            }
        }
    }

    fn error(&self, expected: &str) -> DocumentError {
        DocumentError::Parse {
            file: self.source.file().as_str().into(),
            path: self.path.clone(),
            position: self.tok.1.position(),
            expected: expected.into(),
            found: self.found().into(),
        }
    }

    fn limit_error(&self, span: &Span, error: LimitError) -> DocumentError {
        DocumentError::Limit {
            file: self.source.file().as_str().into(),
            path: self.path.clone(),
            position: span.position(),
            error,
        }
    }

    fn lex_error(&self, span: &Span, reason: &str) -> DocumentError {
        DocumentError::Lex {
            file: self.source.file().as_str().into(),
            path: self.path.clone(),
            position: span.position(),
            reason: reason.into(),
        }
    }

    fn expect(&mut self, text: &str, context: &str) -> Result<(), DocumentError> {
        if self.token_text() == text {
            self.next_token()
        } else {
            Err(self.error(&format!("`{text}` {context}")))
        }
    }

    fn enter(&mut self, span: &Span) -> Result<(), DocumentError> {
        self.budget
            .enter()
            .map_err(|e| self.limit_error(span, e))
    }

    fn parse_key(&mut self) -> Result<(Rc<str>, Span), DocumentError> {
        let span = self.tok.1.clone();
        let key: Rc<str> = match self.tok.0 {
            TokenKind::String => unescape(span.text())
                .map_err(|reason| self.lex_error(&span, reason))?
                .into(),
            TokenKind::Ident | TokenKind::Keyword => span.text().into(),
            // Numeric keys name the property by the number's canonical text.
            TokenKind::Number => match parse_number(span.text()) {
                Some(n) => n.to_string().into(),
                None => return Err(self.lex_error(&span, "number out of range")),
            },
            _ => return Err(self.error("object key")),
        };
        self.next_token()?;
        Ok((key, span))
    }

    fn parse_object(&mut self) -> Result<Object, DocumentError> {
        let mut span = self.tok.1.clone();
        self.expect("{", "at start of object")?;
        self.enter(&span)?;

        let mut fields: IndexMap<Rc<str>, Field> = IndexMap::new();
        while self.token_text() != "}" {
            let (key, key_span) = self.parse_key()?;
            self.expect(":", "after object key")?;

            self.path.push(key.as_ref());
            // Reported before the value is parsed so warnings stay in source order.
            if let Some(existing) = fields.get(&key) {
                self.warnings.push(Diagnostic::warning(
                    DiagnosticKind::DuplicateKey {
                        key: key.clone(),
                        discarded: existing.key_span.position(),
                    },
                    self.path.clone(),
                    key_span.position(),
                ));
            }
            let value = self.parse_value()?;

            // Last occurrence wins; the key keeps its original slot.
            fields.insert(key, Field { key_span, value });
            self.path.pop();

            match self.token_text() {
                "," => self.next_token()?,
                "}" => break,
                _ => return Err(self.error("`,` or `}` in object")),
            }
        }

        self.expect("}", "at end of object")?;
        self.budget.leave();
        span.end = self.end;
        Ok(Object { span, fields })
    }

    fn parse_array(&mut self) -> Result<Node, DocumentError> {
        let mut span = self.tok.1.clone();
        self.expect("[", "at start of array")?;
        self.enter(&span)?;

        let mut items = vec![];
        while self.token_text() != "]" {
            self.path.push(items.len());
            items.push(self.parse_value()?);
            self.path.pop();

            match self.token_text() {
                "," => self.next_token()?,
                "]" => break,
                _ => return Err(self.error("`,` or `]` in array")),
            }
        }

        self.expect("]", "at end of array")?;
        self.budget.leave();
        span.end = self.end;
        Ok(Node::Array { span, items })
    }

    fn parse_value(&mut self) -> Result<Node, DocumentError> {
        let span = self.tok.1.clone();
        if let Err(e) = self.budget.count_node() {
            return Err(self.limit_error(&span, e));
        }

        let node = match self.tok.0 {
            TokenKind::Symbol if span.text() == "{" => return Ok(Node::Object(self.parse_object()?)),
            TokenKind::Symbol if span.text() == "[" => return self.parse_array(),
            TokenKind::String => {
                let value = unescape(span.text()).map_err(|reason| self.lex_error(&span, reason))?;
                Node::Scalar {
                    span,
                    value: Scalar::String(value.into()),
                }
            }
            TokenKind::Number => match parse_number(span.text()) {
                Some(n) => Node::Scalar {
                    span,
                    value: Scalar::Number(n),
                },
                None => return Err(self.lex_error(&span, "number out of range")),
            },
            TokenKind::Keyword => {
                let value = match span.text() {
                    "true" => Scalar::Bool(true),
                    "false" => Scalar::Bool(false),
                    _ => Scalar::Null,
                };
                Node::Scalar { span, value }
            }
            TokenKind::Ident => Node::Identifier {
                name: span.text().into(),
                span,
            },
            TokenKind::Function => Node::Function { span },
            _ => return Err(self.error("value")),
        };
        self.next_token()?;
        Ok(node)
    }

    /// Parse the whole document. The root must be an object and nothing may follow it.
    pub fn parse(mut self) -> Result<Document, DocumentError> {
        if self.token_text() != "{" {
            return Err(self.error("`{` at start of document"));
        }
        let root = self.parse_value()?;
        if self.tok.0 != TokenKind::Eof {
            return Err(self.error("end of input after document"));
        }
        Ok(Document {
            source: self.source,
            root,
            warnings: self.warnings,
        })
    }
}
