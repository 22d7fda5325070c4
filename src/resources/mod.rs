//! Per-kind resource handling.
//!
//! Each module validates the declaration shape for its kind and builds the
//! node's property map. Grants and triggers are synthesized, never declared,
//! so they have no module here.

pub mod certificate;
pub mod distribution;
pub mod function;
pub mod parameter;
pub mod table;

use crate::core::types::{ResourceDecl, ResourceKind};
use indexmap::IndexMap;

/// Validate a declaration's kind-specific shape. Returns a list of problems
/// (empty = valid); cross-resource checks live in the parser.
pub fn validate_decl(id: &str, decl: &ResourceDecl) -> Vec<String> {
    match decl.kind {
        ResourceKind::Function => function::validate(id, decl),
        ResourceKind::Table => table::validate(id, decl),
        ResourceKind::Certificate => certificate::validate(id, decl),
        ResourceKind::Distribution => distribution::validate(id, decl),
        ResourceKind::Parameter => parameter::validate(id, decl),
        ResourceKind::ScheduledTrigger | ResourceKind::CapabilityGrant => {
            vec![format!(
                "resource '{}' declares synthesized kind '{}' directly",
                id, decl.kind
            )]
        }
    }
}

/// Build the property map for a declared resource.
pub fn properties(decl: &ResourceDecl) -> IndexMap<String, serde_json::Value> {
    match decl.kind {
        ResourceKind::Function => function::properties(decl),
        ResourceKind::Table => table::properties(decl),
        ResourceKind::Certificate => certificate::properties(decl),
        ResourceKind::Distribution => distribution::properties(decl),
        ResourceKind::Parameter => parameter::properties(decl),
        ResourceKind::ScheduledTrigger | ResourceKind::CapabilityGrant => IndexMap::new(),
    }
}
