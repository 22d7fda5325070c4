//! Template resolution and cross-region reference handling.
//!
//! Resolves `{{params.key}}`, `{{ref:name}}` and `{{build.number}}`
//! templates at synthesis time. `{{node:id}}` placeholders are validated and
//! left intact: they stand for realized outputs that do not exist until the
//! external deployment engine runs, and substituting them is its job.
//!
//! A cross-region reference is a named, durable, write-once value: one
//! region's deployment produces it, the other region's synthesis consumes
//! it through a store reachable from both sides. Resolving before the
//! producing region has realized is a hard ordering failure for the caller
//! to fix by resequencing, not a retryable condition.

use crate::core::error::{SynthError, SynthResult};
use crate::core::types::{yaml_value_to_string, RealizedOutputs, Transform};
use indexmap::IndexMap;
use std::path::{Path, PathBuf};

// ============================================================================
// URL host extraction
// ============================================================================

/// Extract the host component of a `scheme://host/path...` URL. Total and
/// deterministic for any well-formed URL; anything else is rejected with the
/// offending raw value.
pub fn url_host(raw: &str) -> SynthResult<String> {
    let malformed = || SynthError::MalformedReferenceValue {
        raw: raw.to_string(),
    };
    let (scheme, rest) = raw.split_once("://").ok_or_else(malformed)?;
    if scheme.is_empty() {
        return Err(malformed());
    }
    let host = rest
        .split(['/', '?', '#'])
        .next()
        .unwrap_or_default();
    if host.is_empty() {
        return Err(malformed());
    }
    Ok(host.to_string())
}

// ============================================================================
// Durable reference store
// ============================================================================

/// A namespaced key → string value store reachable from both regions.
/// Writes are once per name and deployment cycle; re-putting the identical
/// value is accepted so re-recording an unchanged deploy stays idempotent.
pub trait ReferenceStore {
    /// Read a reference value.
    fn get(&self, name: &str) -> SynthResult<Option<String>>;

    /// Write a reference value (write-once).
    fn put(&mut self, name: &str, value: &str) -> SynthResult<()>;
}

/// In-memory store for tests and single-process synthesis runs.
#[derive(Debug, Default)]
pub struct MemoryStore {
    values: IndexMap<String, String>,
}

impl MemoryStore {
    /// Create an empty store.
    pub fn new() -> Self {
        Self::default()
    }
}

impl ReferenceStore for MemoryStore {
    fn get(&self, name: &str) -> SynthResult<Option<String>> {
        Ok(self.values.get(name).cloned())
    }

    fn put(&mut self, name: &str, value: &str) -> SynthResult<()> {
        match self.values.get(name) {
            Some(existing) if existing != value => Err(SynthError::store(format!(
                "reference '{}' already published with a different value",
                name
            ))),
            _ => {
                self.values.insert(name.to_string(), value.to_string());
                Ok(())
            }
        }
    }
}

/// File-backed store: one file per reference under `<root>/refs/`, written
/// atomically (temp file + rename).
#[derive(Debug)]
pub struct FileStore {
    root: PathBuf,
}

impl FileStore {
    /// Store rooted at a state directory.
    pub fn new(state_dir: &Path) -> Self {
        Self {
            root: state_dir.join("refs"),
        }
    }

    fn path_for(&self, name: &str) -> PathBuf {
        self.root.join(encode_name(name))
    }

    /// Enumerate all stored references as (name, value) pairs.
    pub fn list(&self) -> SynthResult<Vec<(String, String)>> {
        if !self.root.exists() {
            return Ok(Vec::new());
        }
        let mut entries: Vec<(String, String)> = Vec::new();
        let read_dir = std::fs::read_dir(&self.root)
            .map_err(|e| SynthError::store(format!("cannot read {}: {}", self.root.display(), e)))?;
        for entry in read_dir.filter_map(|e| e.ok()) {
            let file_name = entry.file_name().to_string_lossy().to_string();
            if file_name.ends_with(".tmp") {
                continue;
            }
            let value = std::fs::read_to_string(entry.path())
                .map_err(|e| SynthError::store(format!("cannot read reference: {}", e)))?;
            entries.push((decode_name(&file_name), value));
        }
        entries.sort();
        Ok(entries)
    }
}

impl ReferenceStore for FileStore {
    fn get(&self, name: &str) -> SynthResult<Option<String>> {
        let path = self.path_for(name);
        if !path.exists() {
            return Ok(None);
        }
        let value = std::fs::read_to_string(&path)
            .map_err(|e| SynthError::store(format!("cannot read {}: {}", path.display(), e)))?;
        Ok(Some(value))
    }

    fn put(&mut self, name: &str, value: &str) -> SynthResult<()> {
        if let Some(existing) = self.get(name)? {
            if existing != value {
                return Err(SynthError::store(format!(
                    "reference '{}' already published with a different value",
                    name
                )));
            }
            return Ok(());
        }
        std::fs::create_dir_all(&self.root)
            .map_err(|e| SynthError::store(format!("cannot create {}: {}", self.root.display(), e)))?;
        let path = self.path_for(name);
        let tmp = path.with_extension("tmp");
        std::fs::write(&tmp, value)
            .map_err(|e| SynthError::store(format!("cannot write {}: {}", tmp.display(), e)))?;
        std::fs::rename(&tmp, &path)
            .map_err(|e| SynthError::store(format!("cannot rename {}: {}", tmp.display(), e)))?;
        Ok(())
    }
}

/// Encode a reference name into a flat file name. Alphanumerics, `.`, `_`
/// and `-` pass through; everything else (notably `/`) becomes `%XX`.
fn encode_name(name: &str) -> String {
    let mut out = String::with_capacity(name.len());
    for b in name.bytes() {
        match b {
            b'a'..=b'z' | b'A'..=b'Z' | b'0'..=b'9' | b'.' | b'_' | b'-' => {
                out.push(b as char)
            }
            _ => out.push_str(&format!("%{:02X}", b)),
        }
    }
    out
}

fn decode_name(encoded: &str) -> String {
    let bytes = encoded.as_bytes();
    let mut out = Vec::with_capacity(bytes.len());
    let mut i = 0;
    while i < bytes.len() {
        if bytes[i] == b'%' {
            if let (Some(hi), Some(lo)) = (
                bytes.get(i + 1).and_then(|b| (*b as char).to_digit(16)),
                bytes.get(i + 2).and_then(|b| (*b as char).to_digit(16)),
            ) {
                out.push((hi * 16 + lo) as u8);
                i += 3;
                continue;
            }
        }
        out.push(bytes[i]);
        i += 1;
    }
    String::from_utf8_lossy(&out).into_owned()
}

// ============================================================================
// Reference registry
// ============================================================================

/// A reference a region has promised to produce once realized.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PublishedReference {
    /// Namespaced reference name
    pub name: String,
    /// Region whose realization produces the value
    pub producing_region: String,
    /// Node whose realized output feeds the reference
    pub node: String,
    /// Output key on that node
    pub output: String,
    /// Transform applied to the raw output value
    pub transform: Transform,
}

/// Tracks published cross-region references and materializes their values
/// into the durable store when the producing region's outputs arrive.
#[derive(Debug)]
pub struct ReferenceRegistry<S: ReferenceStore> {
    store: S,
    published: Vec<PublishedReference>,
}

impl<S: ReferenceStore> ReferenceRegistry<S> {
    /// Registry over a durable store.
    pub fn new(store: S) -> Self {
        Self {
            store,
            published: Vec::new(),
        }
    }

    /// Register that `region`, once realized, will populate `name` from the
    /// given node output. One producer per name: a second registration must
    /// be identical (re-synthesis) or it is rejected.
    pub fn publish(
        &mut self,
        name: &str,
        region: &str,
        node: &str,
        output: &str,
        transform: Transform,
    ) -> SynthResult<()> {
        let reference = PublishedReference {
            name: name.to_string(),
            producing_region: region.to_string(),
            node: node.to_string(),
            output: output.to_string(),
            transform,
        };
        if let Some(existing) = self.published.iter().find(|r| r.name == name) {
            if *existing != reference {
                return Err(SynthError::invalid(format!(
                    "reference '{}' already published by '{}'",
                    name, existing.producing_region
                )));
            }
            return Ok(());
        }
        self.published.push(reference);
        Ok(())
    }

    /// Evaluate the publications of a realized region against its outputs
    /// and write their values to the store. Returns the (name, value) pairs
    /// materialized by this call.
    pub fn record_outputs(
        &mut self,
        region: &str,
        outputs: &RealizedOutputs,
    ) -> SynthResult<Vec<(String, String)>> {
        let mut materialized = Vec::new();
        for reference in self
            .published
            .iter()
            .filter(|r| r.producing_region == region)
        {
            let node_outputs = outputs.get(&reference.node).ok_or_else(|| {
                SynthError::invalid(format!(
                    "reference '{}' expects outputs from unrealized node '{}'",
                    reference.name, reference.node
                ))
            })?;
            let raw = node_outputs.get(&reference.output).ok_or_else(|| {
                SynthError::invalid(format!(
                    "node '{}' realized without output '{}'",
                    reference.node, reference.output
                ))
            })?;
            let value = match reference.transform {
                Transform::None => raw.clone(),
                Transform::UrlHost => url_host(raw)?,
            };
            self.store.put(&reference.name, &value)?;
            materialized.push((reference.name.clone(), value));
        }
        Ok(materialized)
    }

    /// Read a materialized reference value. Failing here means the caller
    /// sequenced region realization incorrectly; it is not retryable from
    /// inside the compiler.
    pub fn resolve(&self, name: &str) -> SynthResult<String> {
        self.store
            .get(name)?
            .ok_or_else(|| SynthError::UnresolvedReference {
                name: name.to_string(),
            })
    }

}

// ============================================================================
// Template resolution
// ============================================================================

/// Result of resolving one template string: the resolved text plus any
/// `{{node:id}}` placeholders encountered (kept intact for the deployment
/// engine, surfaced here so the synthesizer can add dependency edges).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Resolved {
    /// Template with synth-time placeholders substituted
    pub text: String,
    /// Node ids referenced via `{{node:id}}`
    pub node_refs: Vec<String>,
    /// Cross-region reference names resolved via `{{ref:name}}`
    pub ref_names: Vec<String>,
}

/// Resolve all template variables in a string.
///
/// `build` is the build identifier for this synthesis pass, computed once by
/// the caller so every `{{build.number}}` in the pass agrees.
pub fn resolve_template<S: ReferenceStore>(
    template: &str,
    params: &IndexMap<String, serde_yaml_ng::Value>,
    registry: &ReferenceRegistry<S>,
    build: &str,
) -> SynthResult<Resolved> {
    let mut result = template.to_string();
    let mut node_refs = Vec::new();
    let mut ref_names = Vec::new();
    let mut start = 0;

    while let Some(open) = result[start..].find("{{") {
        let open = start + open;
        let close = result[open..].find("}}").ok_or_else(|| {
            SynthError::invalid(format!("unclosed template at position {}", open))
        })?;
        let close = open + close + 2;
        let key = result[open + 2..close - 2].trim().to_string();

        if let Some(param_key) = key.strip_prefix("params.") {
            let value = params
                .get(param_key)
                .map(yaml_value_to_string)
                .ok_or_else(|| SynthError::invalid(format!("unknown param: {}", param_key)))?;
            result.replace_range(open..close, &value);
            start = open + value.len();
        } else if let Some(name) = key.strip_prefix("ref:") {
            let name = name.trim();
            let value = registry.resolve(name)?;
            ref_names.push(name.to_string());
            result.replace_range(open..close, &value);
            start = open + value.len();
        } else if key == "build.number" {
            result.replace_range(open..close, build);
            start = open + build.len();
        } else if let Some(id) = key.strip_prefix("node:") {
            // Realization-time placeholder: record the edge, keep the text.
            node_refs.push(id.trim().to_string());
            start = close;
        } else {
            return Err(SynthError::invalid(format!(
                "unknown template variable: {}",
                key
            )));
        }
    }

    Ok(Resolved {
        text: result,
        node_refs,
        ref_names,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn params(pairs: &[(&str, &str)]) -> IndexMap<String, serde_yaml_ng::Value> {
        pairs
            .iter()
            .map(|(k, v)| {
                (
                    k.to_string(),
                    serde_yaml_ng::Value::String(v.to_string()),
                )
            })
            .collect()
    }

    fn empty_registry() -> ReferenceRegistry<MemoryStore> {
        ReferenceRegistry::new(MemoryStore::new())
    }

    #[test]
    fn test_url_host_extracts_host() {
        assert_eq!(
            url_host("https://abc123.example-host.internal/").unwrap(),
            "abc123.example-host.internal"
        );
        assert_eq!(
            url_host("https://abc.example/path/deep?q=1").unwrap(),
            "abc.example"
        );
        assert_eq!(url_host("wss://sock.example").unwrap(), "sock.example");
    }

    #[test]
    fn test_url_host_rejects_malformed() {
        for raw in ["not-a-url", "://no-scheme", "https:///nohost", ""] {
            match url_host(raw) {
                Err(SynthError::MalformedReferenceValue { raw: got }) => {
                    assert_eq!(got, raw)
                }
                other => panic!("expected MalformedReferenceValue, got {:?}", other),
            }
        }
    }

    #[test]
    fn test_memory_store_write_once() {
        let mut store = MemoryStore::new();
        store.put("/svc/endpoint", "host-a").unwrap();
        // Identical re-put is idempotent.
        store.put("/svc/endpoint", "host-a").unwrap();
        // Conflicting re-put is rejected.
        assert!(store.put("/svc/endpoint", "host-b").is_err());
        assert_eq!(
            store.get("/svc/endpoint").unwrap(),
            Some("host-a".to_string())
        );
    }

    #[test]
    fn test_file_store_roundtrip() {
        let dir = tempfile::tempdir().unwrap();
        let mut store = FileStore::new(dir.path());
        store.put("/svc/endpoint", "abc.example").unwrap();

        let reread = FileStore::new(dir.path());
        assert_eq!(
            reread.get("/svc/endpoint").unwrap(),
            Some("abc.example".to_string())
        );
        assert_eq!(reread.get("/svc/missing").unwrap(), None);
    }

    #[test]
    fn test_file_store_write_once() {
        let dir = tempfile::tempdir().unwrap();
        let mut store = FileStore::new(dir.path());
        store.put("/svc/endpoint", "abc.example").unwrap();
        store.put("/svc/endpoint", "abc.example").unwrap();
        assert!(store.put("/svc/endpoint", "other.example").is_err());
    }

    #[test]
    fn test_file_store_list() {
        let dir = tempfile::tempdir().unwrap();
        let mut store = FileStore::new(dir.path());
        store.put("/svc/endpoint", "abc.example").unwrap();
        store.put("/svc/build", "1.0.202403051407").unwrap();
        let listed = store.list().unwrap();
        assert_eq!(
            listed,
            vec![
                ("/svc/build".to_string(), "1.0.202403051407".to_string()),
                ("/svc/endpoint".to_string(), "abc.example".to_string()),
            ]
        );
    }

    #[test]
    fn test_name_encoding_roundtrip() {
        for name in ["/svc/endpoint", "plain", "/a/b-c_d.e", "odd name%x"] {
            let encoded = encode_name(name);
            assert!(!encoded.contains('/'));
            assert_eq!(decode_name(&encoded), name);
        }
    }

    #[test]
    fn test_registry_resolve_before_realization_fails() {
        let registry = empty_registry();
        match registry.resolve("/svc/endpoint") {
            Err(SynthError::UnresolvedReference { name }) => {
                assert_eq!(name, "/svc/endpoint")
            }
            other => panic!("expected UnresolvedReference, got {:?}", other),
        }
    }

    #[test]
    fn test_registry_publish_then_record_then_resolve() {
        let mut registry = empty_registry();
        registry
            .publish(
                "/svc/endpoint",
                "eu-west-1",
                "web-fn",
                "function_url",
                Transform::UrlHost,
            )
            .unwrap();

        // Still unresolved: publication registers intent, realization
        // produces the value.
        assert!(registry.resolve("/svc/endpoint").is_err());

        let mut outputs = RealizedOutputs::new();
        let mut values = IndexMap::new();
        values.insert(
            "function_url".to_string(),
            "https://abc123.example-host.internal/".to_string(),
        );
        outputs.insert("web-fn".to_string(), values);

        let materialized = registry.record_outputs("eu-west-1", &outputs).unwrap();
        assert_eq!(
            materialized,
            vec![(
                "/svc/endpoint".to_string(),
                "abc123.example-host.internal".to_string()
            )]
        );
        assert_eq!(
            registry.resolve("/svc/endpoint").unwrap(),
            "abc123.example-host.internal"
        );
    }

    #[test]
    fn test_registry_record_ignores_other_regions() {
        let mut registry = empty_registry();
        registry
            .publish("/svc/endpoint", "eu-west-1", "web-fn", "function_url", Transform::None)
            .unwrap();
        // us-east-1 realization carries no publications; nothing happens.
        let materialized = registry
            .record_outputs("us-east-1", &RealizedOutputs::new())
            .unwrap();
        assert!(materialized.is_empty());
        assert!(registry.resolve("/svc/endpoint").is_err());
    }

    #[test]
    fn test_registry_single_writer_per_name() {
        let mut registry = empty_registry();
        registry
            .publish("/svc/endpoint", "eu-west-1", "web-fn", "function_url", Transform::UrlHost)
            .unwrap();
        // Identical re-registration (re-synthesis) is fine.
        registry
            .publish("/svc/endpoint", "eu-west-1", "web-fn", "function_url", Transform::UrlHost)
            .unwrap();
        // A different producer for the same name is not.
        let err = registry
            .publish("/svc/endpoint", "us-east-1", "other", "url", Transform::None)
            .unwrap_err();
        assert!(err.to_string().contains("already published"));
    }

    #[test]
    fn test_registry_record_missing_node_or_output() {
        let mut registry = empty_registry();
        registry
            .publish("/svc/endpoint", "eu-west-1", "web-fn", "function_url", Transform::None)
            .unwrap();

        let err = registry
            .record_outputs("eu-west-1", &RealizedOutputs::new())
            .unwrap_err();
        assert!(err.to_string().contains("web-fn"));

        let mut outputs = RealizedOutputs::new();
        outputs.insert("web-fn".to_string(), IndexMap::new());
        let err = registry.record_outputs("eu-west-1", &outputs).unwrap_err();
        assert!(err.to_string().contains("function_url"));
    }

    #[test]
    fn test_registry_record_malformed_url() {
        let mut registry = empty_registry();
        registry
            .publish("/svc/endpoint", "eu-west-1", "web-fn", "function_url", Transform::UrlHost)
            .unwrap();
        let mut values = IndexMap::new();
        values.insert("function_url".to_string(), "not-a-url".to_string());
        let mut outputs = RealizedOutputs::new();
        outputs.insert("web-fn".to_string(), values);
        let err = registry.record_outputs("eu-west-1", &outputs).unwrap_err();
        assert!(matches!(
            err,
            SynthError::MalformedReferenceValue { .. }
        ));
    }

    #[test]
    fn test_resolve_params() {
        let registry = empty_registry();
        let resolved = resolve_template(
            "table for {{params.name}}",
            &params(&[("name", "departures")]),
            &registry,
            "1.0.202403051407",
        )
        .unwrap();
        assert_eq!(resolved.text, "table for departures");
        assert!(resolved.node_refs.is_empty());
    }

    #[test]
    fn test_resolve_multiple() {
        let registry = empty_registry();
        let resolved = resolve_template(
            "{{params.a}}-{{params.b}}",
            &params(&[("a", "X"), ("b", "Y")]),
            &registry,
            "1.0.202403051407",
        )
        .unwrap();
        assert_eq!(resolved.text, "X-Y");
    }

    #[test]
    fn test_resolve_unknown_param() {
        let registry = empty_registry();
        let err = resolve_template(
            "{{params.missing}}",
            &params(&[]),
            &registry,
            "1.0.202403051407",
        )
        .unwrap_err();
        assert!(err.to_string().contains("unknown param"));
    }

    #[test]
    fn test_resolve_build_number() {
        let registry = empty_registry();
        let resolved = resolve_template(
            "{{build.number}}",
            &params(&[]),
            &registry,
            "1.0.202403051407",
        )
        .unwrap();
        assert_eq!(resolved.text, "1.0.202403051407");
    }

    #[test]
    fn test_resolve_reference() {
        let mut registry = empty_registry();
        registry
            .publish("/svc/endpoint", "eu-west-1", "web-fn", "function_url", Transform::UrlHost)
            .unwrap();
        let mut values = IndexMap::new();
        values.insert(
            "function_url".to_string(),
            "https://abc.example/".to_string(),
        );
        let mut outputs = RealizedOutputs::new();
        outputs.insert("web-fn".to_string(), values);
        registry.record_outputs("eu-west-1", &outputs).unwrap();

        let resolved = resolve_template(
            "{{ref:/svc/endpoint}}",
            &params(&[]),
            &registry,
            "1.0.202403051407",
        )
        .unwrap();
        assert_eq!(resolved.text, "abc.example");
        assert_eq!(resolved.ref_names, vec!["/svc/endpoint"]);
    }

    #[test]
    fn test_resolve_unresolved_reference_propagates() {
        let registry = empty_registry();
        let err = resolve_template(
            "{{ref:/svc/endpoint}}",
            &params(&[]),
            &registry,
            "1.0.202403051407",
        )
        .unwrap_err();
        assert!(matches!(err, SynthError::UnresolvedReference { .. }));
    }

    #[test]
    fn test_resolve_node_placeholder_kept() {
        let registry = empty_registry();
        let resolved = resolve_template(
            "{{node:times-table}}",
            &params(&[]),
            &registry,
            "1.0.202403051407",
        )
        .unwrap();
        assert_eq!(resolved.text, "{{node:times-table}}");
        assert_eq!(resolved.node_refs, vec!["times-table"]);
    }

    #[test]
    fn test_resolve_unclosed_template() {
        let registry = empty_registry();
        let err = resolve_template("{{params.x", &params(&[]), &registry, "b").unwrap_err();
        assert!(err.to_string().contains("unclosed"));
    }

    #[test]
    fn test_resolve_unknown_variable() {
        let registry = empty_registry();
        let err = resolve_template("{{output.x.arn}}", &params(&[]), &registry, "b").unwrap_err();
        assert!(err.to_string().contains("unknown template variable"));
    }
}
