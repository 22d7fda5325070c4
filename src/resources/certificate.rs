//! TLS certificate declarations — imported by identifier or managed by
//! domain, never both.

use crate::core::types::ResourceDecl;
use indexmap::IndexMap;

/// Validate a certificate declaration.
pub fn validate(id: &str, decl: &ResourceDecl) -> Vec<String> {
    let mut errors = Vec::new();
    match (&decl.arn, &decl.domain) {
        (None, None) => errors.push(format!(
            "resource '{}' (certificate) needs either arn or domain",
            id
        )),
        (Some(_), Some(_)) => errors.push(format!(
            "resource '{}' (certificate) sets both arn and domain",
            id
        )),
        _ => {}
    }
    errors
}

/// Build the property map for a certificate node.
pub fn properties(decl: &ResourceDecl) -> IndexMap<String, serde_json::Value> {
    let mut props = IndexMap::new();
    if let Some(ref arn) = decl.arn {
        props.insert("arn".to_string(), serde_json::json!(arn));
        props.insert("imported".to_string(), serde_json::json!(true));
    }
    if let Some(ref domain) = decl.domain {
        props.insert("domain".to_string(), serde_json::json!(domain));
    }
    props
}
