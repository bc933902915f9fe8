// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

//! Depth and size ceilings enforced while parsing and validating documents.

mod error;

pub use error::LimitError;

use serde::{Deserialize, Serialize};

/// Configured ceilings shared by the parser and the validator.
///
/// Both guards bound the work done on adversarial input: `max_depth` caps the
/// nesting of arrays and objects, `max_nodes` caps the number of AST nodes a
/// parse may produce and the number of node visits a validation may perform
/// (union alternatives revisit their subtree, so validation usually counts more
/// visits than the parse produced nodes).
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase", deny_unknown_fields)]
pub struct Limits {
    /// Maximum nesting depth of arrays and objects.
    pub max_depth: usize,
    /// Maximum number of nodes produced or visited.
    pub max_nodes: usize,
}

impl Limits {
    pub const DEFAULT_MAX_DEPTH: usize = 128;
    pub const DEFAULT_MAX_NODES: usize = 1_000_000;

    /// Parse limits from a JSON configuration fragment such as `{"maxDepth": 64}`.
    pub fn from_json_str(s: &str) -> anyhow::Result<Self> {
        Ok(serde_json::from_str(s)?)
    }

    pub fn unlimited() -> Self {
        Self {
            max_depth: usize::MAX,
            max_nodes: usize::MAX,
        }
    }
}

impl Default for Limits {
    fn default() -> Self {
        Self {
            max_depth: Self::DEFAULT_MAX_DEPTH,
            max_nodes: Self::DEFAULT_MAX_NODES,
        }
    }
}

/// Running counters checked against a [`Limits`] value.
#[derive(Debug, Clone)]
pub struct Budget {
    limits: Limits,
    depth: usize,
    nodes: usize,
}

impl Budget {
    pub fn new(limits: Limits) -> Self {
        Self {
            limits,
            depth: 0,
            nodes: 0,
        }
    }

    pub fn limits(&self) -> &Limits {
        &self.limits
    }

    pub fn depth(&self) -> usize {
        self.depth
    }

    pub fn nodes(&self) -> usize {
        self.nodes
    }

    /// Count one more node.
    #[inline]
    pub fn count_node(&mut self) -> Result<(), LimitError> {
        self.nodes += 1;
        if self.nodes > self.limits.max_nodes {
            return Err(LimitError::NodeLimitExceeded {
                count: self.nodes,
                limit: self.limits.max_nodes,
            });
        }
        Ok(())
    }

    /// Descend one level into a container.
    #[inline]
    pub fn enter(&mut self) -> Result<(), LimitError> {
        self.depth += 1;
        if self.depth > self.limits.max_depth {
            return Err(LimitError::DepthLimitExceeded {
                depth: self.depth,
                limit: self.limits.max_depth,
            });
        }
        Ok(())
    }

    /// Leave a container entered with [`Budget::enter`].
    #[inline]
    pub fn leave(&mut self) {
        self.depth = self.depth.saturating_sub(1);
    }
}
