// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

use crate::diagnostic::{Diagnostic, DiagnosticKind, Path, Position};
use crate::utils::limits::LimitError;
use crate::Rc;

use thiserror::Error;

type String = Rc<str>;

/// Fatal failure while reading one document. Nothing of the document survives.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum DocumentError {
    #[error("{file}:{position}: {reason}")]
    Lex {
        file: String,
        path: Path,
        position: Position,
        reason: String,
    },

    #[error("{file}:{position}: expecting {expected}, found {found}")]
    Parse {
        file: String,
        path: Path,
        position: Position,
        expected: String,
        found: String,
    },

    #[error("{file}:{position}: {error}")]
    Limit {
        file: String,
        path: Path,
        position: Position,
        error: LimitError,
    },
}

impl DocumentError {
    pub fn position(&self) -> Position {
        match self {
            Self::Lex { position, .. }
            | Self::Parse { position, .. }
            | Self::Limit { position, .. } => *position,
        }
    }

    pub fn path(&self) -> &Path {
        match self {
            Self::Lex { path, .. } | Self::Parse { path, .. } | Self::Limit { path, .. } => path,
        }
    }

    pub(crate) fn with_path(mut self, new_path: &Path) -> Self {
        match &mut self {
            Self::Lex { path, .. } | Self::Parse { path, .. } | Self::Limit { path, .. } => {
                *path = new_path.clone();
            }
        }
        self
    }

    /// The single error diagnostic reported for a document that failed to load.
    pub fn to_diagnostic(&self) -> Diagnostic {
        let kind = match self {
            Self::Lex { reason, .. } => DiagnosticKind::LexError {
                reason: reason.clone(),
            },
            Self::Parse {
                expected, found, ..
            } => DiagnosticKind::ParseError {
                expected: expected.clone(),
                found: found.clone(),
            },
            Self::Limit { error, .. } => DiagnosticKind::ResourceLimitExceeded {
                reason: error.to_string().into(),
            },
        };
        Diagnostic::error(kind, self.path().clone(), self.position())
    }
}
