//! Key-value table declarations.

use crate::core::types::{Billing, KeyType, ResourceDecl};
use indexmap::IndexMap;

/// Validate a table declaration.
pub fn validate(id: &str, decl: &ResourceDecl) -> Vec<String> {
    let mut errors = Vec::new();

    if decl.partition_key.is_none() {
        errors.push(format!("resource '{}' (table) has no partition_key", id));
    }

    match decl.billing {
        Some(Billing::Provisioned) => {
            if decl.read_capacity.is_none() || decl.write_capacity.is_none() {
                errors.push(format!(
                    "resource '{}' (table) is provisioned but missing read/write capacity",
                    id
                ));
            }
            if decl.read_capacity == Some(0) || decl.write_capacity == Some(0) {
                errors.push(format!(
                    "resource '{}' (table) has zero provisioned capacity",
                    id
                ));
            }
        }
        Some(Billing::OnDemand) | None => {
            if decl.read_capacity.is_some() || decl.write_capacity.is_some() {
                errors.push(format!(
                    "resource '{}' (table) sets capacity without provisioned billing",
                    id
                ));
            }
        }
    }

    errors
}

/// Build the property map for a table node.
pub fn properties(decl: &ResourceDecl) -> IndexMap<String, serde_json::Value> {
    let mut props = IndexMap::new();
    if let Some(ref key) = decl.partition_key {
        props.insert("partition_key".to_string(), serde_json::json!(key));
    }
    let key_type = match decl.key_type.unwrap_or(KeyType::String) {
        KeyType::String => "string",
        KeyType::Number => "number",
    };
    props.insert("key_type".to_string(), serde_json::json!(key_type));
    let billing = match decl.billing.unwrap_or(Billing::OnDemand) {
        Billing::Provisioned => "provisioned",
        Billing::OnDemand => "on_demand",
    };
    props.insert("billing".to_string(), serde_json::json!(billing));
    if let Some(rc) = decl.read_capacity {
        props.insert("read_capacity".to_string(), serde_json::json!(rc));
    }
    if let Some(wc) = decl.write_capacity {
        props.insert("write_capacity".to_string(), serde_json::json!(wc));
    }
    props
}

#[cfg(test)]
mod tests {
    use super::*;

    fn decl(yaml: &str) -> ResourceDecl {
        serde_yaml_ng::from_str(yaml).unwrap()
    }

    #[test]
    fn test_validate_provisioned_table() {
        let d = decl(
            r#"
type: table
partition_key: stop_id
key_type: string
billing: provisioned
read_capacity: 1
write_capacity: 1
"#,
        );
        assert!(validate("times-table", &d).is_empty());
    }

    #[test]
    fn test_validate_missing_partition_key() {
        let d = decl("type: table");
        let errors = validate("t", &d);
        assert!(errors.iter().any(|e| e.contains("partition_key")));
    }

    #[test]
    fn test_validate_provisioned_without_capacity() {
        let d = decl(
            r#"
type: table
partition_key: stop_id
billing: provisioned
"#,
        );
        let errors = validate("t", &d);
        assert!(errors.iter().any(|e| e.contains("capacity")));
    }

    #[test]
    fn test_validate_capacity_without_provisioned() {
        let d = decl(
            r#"
type: table
partition_key: stop_id
billing: on_demand
read_capacity: 5
"#,
        );
        let errors = validate("t", &d);
        assert!(errors.iter().any(|e| e.contains("without provisioned")));
    }

    #[test]
    fn test_properties_defaults() {
        let d = decl(
            r#"
type: table
partition_key: stop_id
"#,
        );
        let props = properties(&d);
        assert_eq!(props["key_type"], serde_json::json!("string"));
        assert_eq!(props["billing"], serde_json::json!("on_demand"));
        assert!(!props.contains_key("read_capacity"));
    }
}
