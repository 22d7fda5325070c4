//! Error taxonomy for synthesis and reference resolution.
//!
//! Every error is fatal to the current synthesis pass: callers propagate
//! with `?` and no partial graph is ever returned.

use crate::core::schedule::Cadence;
use thiserror::Error;

/// Result type for synthesis operations.
pub type SynthResult<T> = std::result::Result<T, SynthError>;

/// Errors surfaced by the compiler.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum SynthError {
    /// Malformed input to synthesis — unknown ids, missing fields, bad schema.
    #[error("invalid region spec: {message}")]
    InvalidSpec {
        /// What is wrong with the spec
        message: String,
    },

    /// Dependency cycle in a region graph.
    #[error("dependency cycle detected involving: {}", .members.join(", "))]
    Cycle {
        /// Logical ids of every node stuck on a cycle, in declaration order
        members: Vec<String>,
    },

    /// A capability grant wider than its declared access intent.
    #[error("overbroad grant '{grant}': {reason}")]
    OverbroadGrant {
        /// Logical id of the offending grant
        grant: String,
        /// Why the grant was rejected
        reason: String,
    },

    /// The same (target, cadence) pair bound twice.
    #[error("duplicate trigger: '{target}' every {cadence}")]
    DuplicateTrigger {
        /// Target function id
        target: String,
        /// Cadence of the colliding triggers
        cadence: Cadence,
    },

    /// A cross-region reference read before its producing region realized.
    #[error("unresolved cross-region reference '{name}'")]
    UnresolvedReference {
        /// Namespaced reference name
        name: String,
    },

    /// A published reference value that cannot be parsed as required.
    #[error("malformed reference value: '{raw}'")]
    MalformedReferenceValue {
        /// The offending raw value
        raw: String,
    },

    /// I/O or serialization failure at the durable store boundary.
    #[error("store error: {message}")]
    Store {
        /// Underlying failure
        message: String,
    },
}

impl SynthError {
    /// Shorthand for `InvalidSpec`.
    pub fn invalid(message: impl Into<String>) -> Self {
        Self::InvalidSpec {
            message: message.into(),
        }
    }

    /// Shorthand for `Store`.
    pub fn store(message: impl Into<String>) -> Self {
        Self::Store {
            message: message.into(),
        }
    }
}
