// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

use core::fmt;

/// Errors reported when a document exceeds the configured depth or size ceilings.
#[derive(Clone, Copy, PartialEq, Eq)]
pub enum LimitError {
    /// Reported when arrays/objects nest deeper than the configured limit.
    DepthLimitExceeded {
        /// Depth reached when the threshold was exceeded.
        depth: usize,
        /// Configured depth limit.
        limit: usize,
    },
    /// Reported when a document produces (or a validation visits) too many nodes.
    NodeLimitExceeded {
        /// Number of nodes counted when the threshold was exceeded.
        count: usize,
        /// Configured node limit.
        limit: usize,
    },
}

impl fmt::Debug for LimitError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::DepthLimitExceeded { depth, limit } => f
                .debug_struct("DepthLimitExceeded")
                .field("depth", depth)
                .field("limit", limit)
                .finish(),
            Self::NodeLimitExceeded { count, limit } => f
                .debug_struct("NodeLimitExceeded")
                .field("count", count)
                .field("limit", limit)
                .finish(),
        }
    }
}

impl fmt::Display for LimitError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::DepthLimitExceeded { depth, limit } => {
                write!(
                    f,
                    "document exceeded nesting depth limit (depth={}, limit={})",
                    depth, limit
                )
            }
            Self::NodeLimitExceeded { count, limit } => {
                write!(
                    f,
                    "document exceeded node count limit (count={}, limit={})",
                    count, limit
                )
            }
        }
    }
}

impl core::error::Error for LimitError {}
