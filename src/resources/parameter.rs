//! Published parameter declarations — durable named values written at
//! realization time.

use crate::core::types::ResourceDecl;
use indexmap::IndexMap;

/// Validate a parameter declaration.
pub fn validate(id: &str, decl: &ResourceDecl) -> Vec<String> {
    let mut errors = Vec::new();
    match decl.parameter_name {
        None => errors.push(format!("resource '{}' (parameter) has no parameter_name", id)),
        Some(ref name) if !name.starts_with('/') => errors.push(format!(
            "resource '{}' parameter_name '{}' must be namespaced (start with '/')",
            id, name
        )),
        _ => {}
    }
    if decl.value.is_none() {
        errors.push(format!("resource '{}' (parameter) has no value", id));
    }
    errors
}

/// Build the property map for a parameter node.
pub fn properties(decl: &ResourceDecl) -> IndexMap<String, serde_json::Value> {
    let mut props = IndexMap::new();
    if let Some(ref name) = decl.parameter_name {
        props.insert("parameter_name".to_string(), serde_json::json!(name));
    }
    if let Some(ref value) = decl.value {
        props.insert("value".to_string(), serde_json::json!(value));
    }
    props
}
