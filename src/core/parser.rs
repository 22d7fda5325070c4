//! Region spec parsing and validation.
//!
//! Parses a region spec YAML document and validates structural constraints:
//! - Version must be "1.0"
//! - depends_on, access, schedule, publish and certificate references must
//!   name declared resources of the right kind
//! - Required fields per resource kind (delegated to `crate::resources`)

use crate::core::error::{SynthError, SynthResult};
use crate::core::types::*;
use crate::resources;
use std::path::Path;

/// Validation finding.
#[derive(Debug, Clone)]
pub struct ValidationError {
    pub message: String,
}

impl std::fmt::Display for ValidationError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.message)
    }
}

/// Parse a region spec file from disk.
pub fn parse_spec_file(path: &Path) -> SynthResult<RegionSpec> {
    let content = std::fs::read_to_string(path)
        .map_err(|e| SynthError::store(format!("failed to read {}: {}", path.display(), e)))?;
    parse_spec(&content)
}

/// Parse a region spec from a string.
pub fn parse_spec(yaml: &str) -> SynthResult<RegionSpec> {
    serde_yaml_ng::from_str(yaml)
        .map_err(|e| SynthError::invalid(format!("YAML parse error: {}", e)))
}

/// Validate a parsed spec. Returns a list of errors (empty = valid).
pub fn validate_spec(spec: &RegionSpec) -> Vec<ValidationError> {
    let mut errors = Vec::new();
    let mut push = |message: String| errors.push(ValidationError { message });

    // Document-level checks
    if spec.version != "1.0" {
        push(format!("version must be \"1.0\", got \"{}\"", spec.version));
    }
    if spec.name.is_empty() {
        push("name must not be empty".to_string());
    }
    if spec.region.is_empty() {
        push("region must not be empty".to_string());
    }

    // Per-resource checks
    for (id, decl) in &spec.resources {
        for message in resources::validate_decl(id, decl) {
            push(message);
        }

        for dep in &decl.depends_on {
            if !spec.resources.contains_key(dep) {
                push(format!("resource '{}' depends on unknown '{}'", id, dep));
            }
            if dep == id {
                push(format!("resource '{}' depends on itself", id));
            }
        }

        for intent in &decl.access {
            if let Some(ref target) = intent.target {
                // A wildcard target is rejected as an overbroad grant at
                // synthesis, not as an unknown id here.
                if target == "*" {
                    continue;
                }
                match spec.resources.get(target) {
                    None => push(format!(
                        "resource '{}' declares access to unknown '{}'",
                        id, target
                    )),
                    Some(t) if t.kind != ResourceKind::Table => push(format!(
                        "resource '{}' declares {} access to '{}', which is a {}, not a table",
                        id, intent.mode, target, t.kind
                    )),
                    Some(_) => {}
                }
            }
        }

        if let Some(ref certificate) = decl.certificate {
            match spec.resources.get(certificate) {
                None => push(format!(
                    "resource '{}' binds unknown certificate '{}'",
                    id, certificate
                )),
                Some(c) if c.kind != ResourceKind::Certificate => push(format!(
                    "resource '{}' binds '{}' as certificate, but it is a {}",
                    id, certificate, c.kind
                )),
                Some(_) => {}
            }
        }
    }

    // Schedule checks
    for schedule in &spec.schedules {
        match spec.resources.get(&schedule.target) {
            None => push(format!(
                "schedule targets unknown resource '{}'",
                schedule.target
            )),
            Some(t) if t.kind != ResourceKind::Function => push(format!(
                "schedule targets '{}', which is a {}, not a function",
                schedule.target, t.kind
            )),
            Some(_) => {}
        }
    }

    // Publication checks
    for publish in &spec.publishes {
        if !publish.name.starts_with('/') {
            push(format!(
                "published reference '{}' must be namespaced (start with '/')",
                publish.name
            ));
        }
        if !spec.resources.contains_key(&publish.node) {
            push(format!(
                "published reference '{}' reads unknown node '{}'",
                publish.name, publish.node
            ));
        }
    }

    for name in &spec.consumes {
        if !name.starts_with('/') {
            push(format!(
                "consumed reference '{}' must be namespaced (start with '/')",
                name
            ));
        }
    }

    errors
}

/// Validate and collapse findings into a single hard failure.
pub fn ensure_valid(spec: &RegionSpec) -> SynthResult<()> {
    let errors = validate_spec(spec);
    if errors.is_empty() {
        return Ok(());
    }
    let joined = errors
        .iter()
        .map(|e| e.message.as_str())
        .collect::<Vec<_>>()
        .join("; ");
    Err(SynthError::invalid(joined))
}
