//! Compute function declarations — shape validation, properties, and the
//! access-mode → grant-action mapping.

use crate::core::types::{AccessMode, ResourceDecl};
use indexmap::IndexMap;

/// Validate a function declaration.
pub fn validate(id: &str, decl: &ResourceDecl) -> Vec<String> {
    let mut errors = Vec::new();

    if decl.handler.is_none() {
        errors.push(format!("resource '{}' (function) has no handler", id));
    }
    if decl.runtime.is_none() {
        errors.push(format!("resource '{}' (function) has no runtime", id));
    }
    if decl.timeout == Some(0) {
        errors.push(format!(
            "resource '{}' (function) has a zero timeout",
            id
        ));
    }

    let mut parameter_lookups = 0;
    for intent in &decl.access {
        match intent.mode {
            AccessMode::ParameterLookup => {
                parameter_lookups += 1;
                if intent.target.is_some() {
                    errors.push(format!(
                        "resource '{}' parameter_lookup intent takes parameter paths, not a target",
                        id
                    ));
                }
            }
            _ => {
                // A missing or wildcard target is an overbroad grant, caught
                // at synthesis rather than here.
                if !intent.parameters.is_empty() {
                    errors.push(format!(
                        "resource '{}' access intent ({}) does not take parameter paths",
                        id, intent.mode
                    ));
                }
            }
        }
    }
    if parameter_lookups > 1 {
        errors.push(format!(
            "resource '{}' declares more than one parameter_lookup intent",
            id
        ));
    }

    errors
}

/// The minimal action set for an access mode. Exactly what was asked for,
/// never wider.
pub fn actions_for(mode: AccessMode) -> &'static [&'static str] {
    match mode {
        AccessMode::Read => &["kv:get_item"],
        AccessMode::Write => &["kv:put_item"],
        AccessMode::ReadWrite => &["kv:get_item", "kv:put_item"],
        AccessMode::ParameterLookup => &["param:get"],
    }
}

/// Build the property map for a function node.
pub fn properties(decl: &ResourceDecl) -> IndexMap<String, serde_json::Value> {
    let mut props = IndexMap::new();
    if let Some(ref handler) = decl.handler {
        props.insert("handler".to_string(), serde_json::json!(handler));
    }
    if let Some(ref runtime) = decl.runtime {
        props.insert("runtime".to_string(), serde_json::json!(runtime));
    }
    if let Some(timeout) = decl.timeout {
        props.insert("timeout".to_string(), serde_json::json!(timeout));
    }
    if let Some(memory_mb) = decl.memory_mb {
        props.insert("memory_mb".to_string(), serde_json::json!(memory_mb));
    }
    if let Some(ref architecture) = decl.architecture {
        props.insert("architecture".to_string(), serde_json::json!(architecture));
    }
    if !decl.env.is_empty() {
        props.insert("env".to_string(), serde_json::json!(decl.env));
    }
    if !decl.layers.is_empty() {
        props.insert("layers".to_string(), serde_json::json!(decl.layers));
    }
    if let Some(days) = decl.log_retention_days {
        props.insert("log_retention_days".to_string(), serde_json::json!(days));
    }
    if decl.url {
        props.insert("url".to_string(), serde_json::json!(true));
    }
    props
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::types::ResourceKind;

    fn decl(yaml: &str) -> ResourceDecl {
        serde_yaml_ng::from_str(yaml).unwrap()
    }

    #[test]
    fn test_validate_complete_function() {
        let d = decl(
            r#"
type: function
handler: main.handler
runtime: python3.9
timeout: 30
access:
  - target: times-table
    mode: write
"#,
        );
        assert_eq!(d.kind, ResourceKind::Function);
        assert!(validate("ingest-fn", &d).is_empty());
    }

    #[test]
    fn test_validate_missing_handler_and_runtime() {
        let d = decl("type: function");
        let errors = validate("fn", &d);
        assert!(errors.iter().any(|e| e.contains("no handler")));
        assert!(errors.iter().any(|e| e.contains("no runtime")));
    }

    #[test]
    fn test_validate_zero_timeout() {
        let d = decl(
            r#"
type: function
handler: main.handler
runtime: python3.9
timeout: 0
"#,
        );
        let errors = validate("fn", &d);
        assert!(errors.iter().any(|e| e.contains("zero timeout")));
    }

    #[test]
    fn test_validate_kv_intent_rejects_parameter_paths() {
        let d = decl(
            r#"
type: function
handler: main.handler
runtime: python3.9
access:
  - target: times-table
    mode: read
    parameters: [/svc/build]
"#,
        );
        let errors = validate("fn", &d);
        assert!(errors
            .iter()
            .any(|e| e.contains("does not take parameter paths")));
    }

    #[test]
    fn test_validate_second_parameter_lookup_rejected() {
        let d = decl(
            r#"
type: function
handler: main.handler
runtime: python3.9
access:
  - mode: parameter_lookup
  - mode: parameter_lookup
"#,
        );
        let errors = validate("fn", &d);
        assert!(errors
            .iter()
            .any(|e| e.contains("more than one parameter_lookup")));
    }

    #[test]
    fn test_validate_parameter_lookup_rejects_target() {
        let d = decl(
            r#"
type: function
handler: main.handler
runtime: python3.9
access:
  - target: times-table
    mode: parameter_lookup
"#,
        );
        let errors = validate("fn", &d);
        assert!(errors.iter().any(|e| e.contains("not a target")));
    }

    #[test]
    fn test_write_actions_never_include_read() {
        let actions = actions_for(AccessMode::Write);
        assert_eq!(actions, &["kv:put_item"][..]);
        assert!(!actions.iter().any(|a| a.contains("get")));
    }

    #[test]
    fn test_read_actions_never_include_write() {
        let actions = actions_for(AccessMode::Read);
        assert_eq!(actions, &["kv:get_item"][..]);
        assert!(!actions.iter().any(|a| a.contains("put")));
    }

    #[test]
    fn test_read_write_actions() {
        assert_eq!(
            actions_for(AccessMode::ReadWrite),
            &["kv:get_item", "kv:put_item"][..]
        );
    }

    #[test]
    fn test_parameter_lookup_actions() {
        assert_eq!(
            actions_for(AccessMode::ParameterLookup),
            &["param:get"][..]
        );
    }

    #[test]
    fn test_properties_skip_absent_fields() {
        let d = decl(
            r#"
type: function
handler: main.handler
runtime: python3.9
timeout: 3
url: true
env:
  TIMES_TABLE: "{{node:times-table}}"
"#,
        );
        let props = properties(&d);
        assert_eq!(props["handler"], serde_json::json!("main.handler"));
        assert_eq!(props["timeout"], serde_json::json!(3));
        assert_eq!(props["url"], serde_json::json!(true));
        assert!(!props.contains_key("memory_mb"));
        assert!(!props.contains_key("layers"));
    }
}
