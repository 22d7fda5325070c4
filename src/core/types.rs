//! Region spec and graph types.
//!
//! Defines the YAML schema for a region's declared resources plus the
//! synthesized graph types (nodes, edges, realized outputs). All spec types
//! derive Serialize/Deserialize for YAML roundtripping.

use crate::core::schedule::Cadence;
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use std::fmt;

// ============================================================================
// Top-level region spec
// ============================================================================

/// Root document — the declared resources of one deployment region.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RegionSpec {
    /// Schema version (must be "1.0")
    pub version: String,

    /// Human-readable service name
    pub name: String,

    /// Deployment region identifier
    pub region: String,

    /// Optional description
    #[serde(default)]
    pub description: Option<String>,

    /// Synth-time template parameters
    #[serde(default)]
    pub params: IndexMap<String, serde_yaml_ng::Value>,

    /// Resource declarations (order-preserving; declaration order is the
    /// topological tie-break)
    pub resources: IndexMap<String, ResourceDecl>,

    /// Recurring-invocation bindings
    #[serde(default)]
    pub schedules: Vec<ScheduleDecl>,

    /// Cross-region references this region produces
    #[serde(default)]
    pub publishes: Vec<PublishDecl>,

    /// Cross-region reference names this region reads
    #[serde(default)]
    pub consumes: Vec<String>,
}

// ============================================================================
// Resource declarations
// ============================================================================

/// A single declared resource.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ResourceDecl {
    /// Resource kind
    #[serde(rename = "type")]
    pub kind: ResourceKind,

    /// Resources that must be realized before this one
    #[serde(default)]
    pub depends_on: Vec<String>,

    // -- Function fields --
    /// Entry point, e.g. "main.handler"
    #[serde(default)]
    pub handler: Option<String>,

    /// Runtime identifier, e.g. "python3.9"
    #[serde(default)]
    pub runtime: Option<String>,

    /// Invocation timeout in seconds
    #[serde(default)]
    pub timeout: Option<u64>,

    /// Memory allocation in MiB
    #[serde(default)]
    pub memory_mb: Option<u32>,

    /// CPU architecture, e.g. "arm64"
    #[serde(default)]
    pub architecture: Option<String>,

    /// Environment variables; values may use `{{node:ID}}` placeholders
    #[serde(default)]
    pub env: IndexMap<String, String>,

    /// Shared library bundles attached to the function
    #[serde(default)]
    pub layers: Vec<String>,

    /// Log retention in days
    #[serde(default)]
    pub log_retention_days: Option<u32>,

    /// Expose a public invocation URL
    #[serde(default)]
    pub url: bool,

    /// Declared storage access intents (grants are synthesized from these)
    #[serde(default)]
    pub access: Vec<AccessIntent>,

    // -- Table fields --
    /// Partition key attribute name
    #[serde(default)]
    pub partition_key: Option<String>,

    /// Partition key type
    #[serde(default)]
    pub key_type: Option<KeyType>,

    /// Billing mode
    #[serde(default)]
    pub billing: Option<Billing>,

    /// Provisioned read capacity units
    #[serde(default)]
    pub read_capacity: Option<u32>,

    /// Provisioned write capacity units
    #[serde(default)]
    pub write_capacity: Option<u32>,

    // -- Certificate fields --
    /// Identifier of a pre-existing certificate to import
    #[serde(default)]
    pub arn: Option<String>,

    /// Domain for a managed certificate
    #[serde(default)]
    pub domain: Option<String>,

    // -- Distribution fields --
    /// Origin host template, typically `{{ref:NAME}}`
    #[serde(default)]
    pub origin_host: Option<String>,

    /// Public domain names served by the distribution
    #[serde(default)]
    pub domain_names: Vec<String>,

    /// Logical id of the certificate node to bind
    #[serde(default)]
    pub certificate: Option<String>,

    /// Disable edge caching
    #[serde(default)]
    pub cache_disabled: bool,

    /// Redirect viewers to HTTPS
    #[serde(default)]
    pub redirect_to_https: bool,

    /// Free-form comment carried into the plan
    #[serde(default)]
    pub comment: Option<String>,

    // -- Parameter fields --
    /// Namespaced parameter name, e.g. "/departures/build"
    #[serde(default)]
    pub parameter_name: Option<String>,

    /// Parameter value template; `{{build.number}}` allowed
    #[serde(default)]
    pub value: Option<String>,
}

/// Resource kind enum. `scheduled_trigger` and `capability_grant` exist only
/// as synthesized nodes and are rejected when declared directly.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ResourceKind {
    Function,
    Table,
    Certificate,
    Distribution,
    Parameter,
    ScheduledTrigger,
    CapabilityGrant,
}

impl fmt::Display for ResourceKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Function => write!(f, "function"),
            Self::Table => write!(f, "table"),
            Self::Certificate => write!(f, "certificate"),
            Self::Distribution => write!(f, "distribution"),
            Self::Parameter => write!(f, "parameter"),
            Self::ScheduledTrigger => write!(f, "scheduled_trigger"),
            Self::CapabilityGrant => write!(f, "capability_grant"),
        }
    }
}

/// Partition key type.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum KeyType {
    String,
    Number,
}

/// Table billing mode.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Billing {
    Provisioned,
    OnDemand,
}

// ============================================================================
// Access intents
// ============================================================================

/// A declared access intent from a function to a storage node. The
/// synthesizer turns each intent into exactly one capability grant with the
/// minimal action set for the declared mode.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AccessIntent {
    /// Target storage node id (required for kv modes)
    #[serde(default)]
    pub target: Option<String>,

    /// Access mode
    pub mode: AccessMode,

    /// Explicit parameter paths for `parameter_lookup`; empty means the
    /// single sanctioned wildcard
    #[serde(default)]
    pub parameters: Vec<String>,
}

/// Access mode for an intent.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AccessMode {
    Read,
    Write,
    ReadWrite,
    ParameterLookup,
}

impl fmt::Display for AccessMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Read => write!(f, "read"),
            Self::Write => write!(f, "write"),
            Self::ReadWrite => write!(f, "read_write"),
            Self::ParameterLookup => write!(f, "parameter_lookup"),
        }
    }
}

// ============================================================================
// Schedules and publications
// ============================================================================

/// A recurring-invocation binding.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScheduleDecl {
    /// Target function id
    pub target: String,

    /// Invocation cadence
    pub cadence: Cadence,
}

/// A cross-region reference this region produces once realized.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PublishDecl {
    /// Namespaced reference name, e.g. "/departures/endpoint"
    pub name: String,

    /// Node whose realized output feeds the reference
    pub node: String,

    /// Output key on that node, e.g. "function_url"
    pub output: String,

    /// Transform applied to the raw output value
    #[serde(default)]
    pub transform: Transform,
}

/// Value transform applied when publishing a reference.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Transform {
    /// Publish the raw output value
    #[default]
    None,
    /// Extract the host component of a `scheme://host/path` URL
    UrlHost,
}

// ============================================================================
// Synthesized graph members
// ============================================================================

/// One node of a synthesized region graph.
///
/// `outputs` is empty at synthesis time and populated only when the external
/// deployment engine records realization results.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResourceNode {
    /// Stable logical identifier, unique within the region graph
    pub logical_id: String,

    /// Node kind
    pub kind: ResourceKind,

    /// Kind-specific configuration
    pub properties: IndexMap<String, serde_json::Value>,

    /// Realized outputs; absent until realization
    #[serde(default)]
    pub outputs: IndexMap<String, String>,
}

impl ResourceNode {
    /// Create a node with empty outputs.
    pub fn new(logical_id: impl Into<String>, kind: ResourceKind) -> Self {
        Self {
            logical_id: logical_id.into(),
            kind,
            properties: IndexMap::new(),
            outputs: IndexMap::new(),
        }
    }

    /// Set a property, builder-style.
    #[must_use]
    pub fn with_prop(mut self, key: &str, value: impl Into<serde_json::Value>) -> Self {
        self.properties.insert(key.to_string(), value.into());
        self
    }
}

/// A directed dependency: `to` must be realized before `from`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct DependencyEdge {
    /// Consumer node
    pub from: String,

    /// Producer node
    pub to: String,
}

impl DependencyEdge {
    /// Create an edge meaning `from` requires `to`.
    pub fn new(from: impl Into<String>, to: impl Into<String>) -> Self {
        Self {
            from: from.into(),
            to: to.into(),
        }
    }
}

/// Per-node realized outputs handed back by the external deployment engine.
pub type RealizedOutputs = IndexMap<String, IndexMap<String, String>>;

// ============================================================================
// Template helper
// ============================================================================

/// Convert a serde_yaml_ng::Value to a string for template resolution.
pub fn yaml_value_to_string(val: &serde_yaml_ng::Value) -> String {
    match val {
        serde_yaml_ng::Value::String(s) => s.clone(),
        serde_yaml_ng::Value::Number(n) => n.to_string(),
        serde_yaml_ng::Value::Bool(b) => b.to_string(),
        serde_yaml_ng::Value::Null => String::new(),
        other => format!("{:?}", other),
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_spec_parse() {
        let yaml = r#"
version: "1.0"
name: departures
region: eu-west-1
params:
  namespace: /departures
resources:
  times-table:
    type: table
    partition_key: stop_id
    key_type: string
    billing: provisioned
    read_capacity: 1
    write_capacity: 1
  ingest-fn:
    type: function
    handler: main.handler
    runtime: python3.9
    timeout: 30
    env:
      TIMES_TABLE: "{{node:times-table}}"
    access:
      - target: times-table
        mode: write
schedules:
  - target: ingest-fn
    cadence: 1m
publishes: []
"#;
        let spec: RegionSpec = serde_yaml_ng::from_str(yaml).unwrap();
        assert_eq!(spec.version, "1.0");
        assert_eq!(spec.region, "eu-west-1");
        assert_eq!(spec.resources.len(), 2);
        assert_eq!(spec.resources["times-table"].kind, ResourceKind::Table);
        assert_eq!(
            spec.resources["ingest-fn"].access[0].mode,
            AccessMode::Write
        );
        assert_eq!(spec.schedules.len(), 1);
    }

    #[test]
    fn test_decl_defaults() {
        let yaml = r#"
type: function
handler: main.handler
"#;
        let decl: ResourceDecl = serde_yaml_ng::from_str(yaml).unwrap();
        assert!(decl.depends_on.is_empty());
        assert!(decl.env.is_empty());
        assert!(decl.layers.is_empty());
        assert!(!decl.url);
        assert!(decl.access.is_empty());
    }

    #[test]
    fn test_kind_display() {
        assert_eq!(ResourceKind::Function.to_string(), "function");
        assert_eq!(
            ResourceKind::ScheduledTrigger.to_string(),
            "scheduled_trigger"
        );
        assert_eq!(
            ResourceKind::CapabilityGrant.to_string(),
            "capability_grant"
        );
    }

    #[test]
    fn test_transform_default_is_none() {
        let yaml = r#"
name: /svc/endpoint
node: web-fn
output: function_url
"#;
        let publish: PublishDecl = serde_yaml_ng::from_str(yaml).unwrap();
        assert_eq!(publish.transform, Transform::None);
    }

    #[test]
    fn test_transform_url_host_parse() {
        let yaml = r#"
name: /svc/endpoint
node: web-fn
output: function_url
transform: url_host
"#;
        let publish: PublishDecl = serde_yaml_ng::from_str(yaml).unwrap();
        assert_eq!(publish.transform, Transform::UrlHost);
    }

    #[test]
    fn test_node_outputs_empty_at_construction() {
        let node = ResourceNode::new("web-fn", ResourceKind::Function)
            .with_prop("handler", "main.handler")
            .with_prop("timeout", 3);
        assert!(node.outputs.is_empty());
        assert_eq!(node.properties["timeout"], serde_json::json!(3));
    }

    #[test]
    fn test_edge_direction() {
        let edge = DependencyEdge::new("ingest-fn", "times-table");
        assert_eq!(edge.from, "ingest-fn");
        assert_eq!(edge.to, "times-table");
    }

    #[test]
    fn test_yaml_value_to_string() {
        assert_eq!(
            yaml_value_to_string(&serde_yaml_ng::Value::String("hello".into())),
            "hello"
        );
        assert_eq!(
            yaml_value_to_string(&serde_yaml_ng::Value::Bool(true)),
            "true"
        );
        assert_eq!(yaml_value_to_string(&serde_yaml_ng::Value::Null), "");
    }

    #[test]
    fn test_access_mode_display() {
        assert_eq!(AccessMode::Write.to_string(), "write");
        assert_eq!(AccessMode::ParameterLookup.to_string(), "parameter_lookup");
    }
}
