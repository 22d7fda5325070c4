//! Edge distribution declarations — the public front door of the service.

use crate::core::types::ResourceDecl;
use indexmap::IndexMap;

/// Validate a distribution declaration.
pub fn validate(id: &str, decl: &ResourceDecl) -> Vec<String> {
    let mut errors = Vec::new();
    if decl.origin_host.is_none() {
        errors.push(format!(
            "resource '{}' (distribution) has no origin_host",
            id
        ));
    }
    if !decl.domain_names.is_empty() && decl.certificate.is_none() {
        errors.push(format!(
            "resource '{}' (distribution) serves custom domains without a certificate",
            id
        ));
    }
    errors
}

/// Build the property map for a distribution node.
pub fn properties(decl: &ResourceDecl) -> IndexMap<String, serde_json::Value> {
    let mut props = IndexMap::new();
    if let Some(ref origin) = decl.origin_host {
        props.insert("origin_host".to_string(), serde_json::json!(origin));
    }
    if !decl.domain_names.is_empty() {
        props.insert(
            "domain_names".to_string(),
            serde_json::json!(decl.domain_names),
        );
    }
    if let Some(ref certificate) = decl.certificate {
        props.insert("certificate".to_string(), serde_json::json!(certificate));
    }
    props.insert(
        "cache_disabled".to_string(),
        serde_json::json!(decl.cache_disabled),
    );
    props.insert(
        "redirect_to_https".to_string(),
        serde_json::json!(decl.redirect_to_https),
    );
    if let Some(ref comment) = decl.comment {
        props.insert("comment".to_string(), serde_json::json!(comment));
    }
    props
}
