//! Stack synthesis — region spec in, deployable region graph out.
//!
//! Synthesis is a single synchronous pass: validate the spec, resolve
//! synth-time templates, create the declared nodes, wire explicit and
//! implicit dependency edges, synthesize capability grants from access
//! intents, bind scheduled triggers, and register cross-region
//! publications. Any failure aborts the pass; a partial graph is never
//! returned.

use crate::core::error::{SynthError, SynthResult};
use crate::core::graph::RegionGraph;
use crate::core::parser;
use crate::core::resolver::{resolve_template, ReferenceRegistry, ReferenceStore};
use crate::core::schedule::ScheduleBinder;
use crate::core::types::{
    AccessIntent, AccessMode, RegionSpec, ResourceDecl, ResourceKind, ResourceNode,
};
use crate::core::version;
use crate::resources;
use crate::resources::function;

/// Synthesize a region graph, stamping this pass with the current build
/// identifier. Specs that use `{{build.number}}` vary between passes; all
/// other specs re-synthesize identically.
pub fn synthesize<S: ReferenceStore>(
    spec: &RegionSpec,
    registry: &mut ReferenceRegistry<S>,
) -> SynthResult<RegionGraph> {
    synthesize_with_build(spec, registry, &version::build_number())
}

/// Synthesize with an explicit build identifier. The identifier is computed
/// once per pass so every `{{build.number}}` in the spec agrees.
pub fn synthesize_with_build<S: ReferenceStore>(
    spec: &RegionSpec,
    registry: &mut ReferenceRegistry<S>,
    build: &str,
) -> SynthResult<RegionGraph> {
    parser::ensure_valid(spec)?;

    let mut graph = RegionGraph::new(&spec.region);
    let mut resolved: Vec<(String, ResourceDecl, Vec<String>)> = Vec::new();

    // Resolve synth-time templates and collect realization-time node refs.
    for (id, decl) in &spec.resources {
        let (decl, node_refs, ref_names) = resolve_decl(decl, spec, registry, build)?;

        for name in &ref_names {
            if !spec.consumes.contains(name) {
                return Err(SynthError::invalid(format!(
                    "resource '{}' resolves reference '{}' not listed in consumes",
                    id, name
                )));
            }
        }
        for target in &node_refs {
            if target == id {
                return Err(SynthError::invalid(format!(
                    "resource '{}' references itself",
                    id
                )));
            }
            if !spec.resources.contains_key(target) {
                return Err(SynthError::invalid(format!(
                    "resource '{}' references unknown node '{}'",
                    id, target
                )));
            }
        }

        resolved.push((id.clone(), decl, node_refs));
    }

    // Declared nodes, in declaration order.
    for (id, decl, _) in &resolved {
        let mut node = ResourceNode::new(id, decl.kind);
        node.properties = resources::properties(decl);
        graph.add_node(node)?;
    }

    // Explicit and implicit dependency edges.
    for (id, decl, node_refs) in &resolved {
        for dep in &decl.depends_on {
            graph.add_edge(id, dep)?;
        }
        for target in node_refs {
            graph.add_edge(id, target)?;
        }
        if decl.kind == ResourceKind::Distribution {
            if let Some(ref certificate) = decl.certificate {
                graph.add_edge(id, certificate)?;
            }
        }
    }

    // Capability grants from access intents.
    let mut broad_grants = 0usize;
    for (id, decl, _) in &resolved {
        if decl.kind != ResourceKind::Function {
            continue;
        }
        for intent in &decl.access {
            synthesize_grant(&mut graph, id, intent, &mut broad_grants)?;
        }
    }

    // Scheduled triggers.
    let mut binder = ScheduleBinder::new();
    for schedule in &spec.schedules {
        let (node, edge) = binder.bind(&schedule.target, schedule.cadence)?;
        graph.add_node(node)?;
        graph.add_edge(&edge.from, &edge.to)?;
    }

    // Cross-region publications become visible to the consuming region only
    // after realization; registering them here is pure bookkeeping.
    for publish in &spec.publishes {
        registry.publish(
            &publish.name,
            &spec.region,
            &publish.node,
            &publish.output,
            publish.transform,
        )?;
    }

    // A cyclic graph must never escape the pass.
    graph.topological_order()?;

    Ok(graph)
}

/// Resolve the template-bearing fields of a declaration. Returns the
/// resolved declaration plus the node refs and reference names encountered.
fn resolve_decl<S: ReferenceStore>(
    decl: &ResourceDecl,
    spec: &RegionSpec,
    registry: &ReferenceRegistry<S>,
    build: &str,
) -> SynthResult<(ResourceDecl, Vec<String>, Vec<String>)> {
    let mut resolved = decl.clone();
    let mut node_refs = Vec::new();
    let mut ref_names = Vec::new();

    let mut resolve = |template: &str| -> SynthResult<String> {
        let r = resolve_template(template, &spec.params, registry, build)?;
        node_refs.extend(r.node_refs);
        ref_names.extend(r.ref_names);
        Ok(r.text)
    };

    for value in resolved.env.values_mut() {
        *value = resolve(value)?;
    }
    if let Some(ref origin_host) = resolved.origin_host {
        resolved.origin_host = Some(resolve(origin_host)?);
    }
    if let Some(ref parameter_name) = resolved.parameter_name {
        resolved.parameter_name = Some(resolve(parameter_name)?);
    }
    if let Some(ref value) = resolved.value {
        resolved.value = Some(resolve(value)?);
    }

    Ok((resolved, node_refs, ref_names))
}

/// Synthesize one capability grant node plus its edges. Grants carry exactly
/// the actions the intent's mode asks for and must name explicit resource
/// targets; the only sanctioned wildcard is a single path-less
/// parameter_lookup per region.
fn synthesize_grant(
    graph: &mut RegionGraph,
    grantee: &str,
    intent: &AccessIntent,
    broad_grants: &mut usize,
) -> SynthResult<()> {
    let actions: Vec<&str> = function::actions_for(intent.mode).to_vec();

    match intent.mode {
        AccessMode::ParameterLookup => {
            let grant_id = format!("{}-parameter-lookup", grantee);
            let bootstrap = intent.parameters.is_empty();
            let grant_resources = if bootstrap {
                vec!["*".to_string()]
            } else {
                intent.parameters.clone()
            };
            if bootstrap {
                *broad_grants += 1;
                if *broad_grants > 1 {
                    return Err(SynthError::OverbroadGrant {
                        grant: grant_id,
                        reason: "only one wildcard parameter lookup is sanctioned per region"
                            .to_string(),
                    });
                }
            }
            let mut node = ResourceNode::new(&grant_id, ResourceKind::CapabilityGrant)
                .with_prop("grantee", grantee)
                .with_prop("actions", serde_json::json!(actions))
                .with_prop("resources", serde_json::json!(grant_resources));
            if bootstrap {
                node = node.with_prop("bootstrap", true);
            }
            graph.add_node(node)?;
            graph.add_edge(&grant_id, grantee)?;
        }
        mode => {
            let target = match intent.target.as_deref() {
                Some("*") | Some("") | None => {
                    return Err(SynthError::OverbroadGrant {
                        grant: format!("{}-{}", grantee, mode),
                        reason: "grants must name explicit resource targets, never a wildcard"
                            .to_string(),
                    })
                }
                Some(target) => target,
            };
            let grant_id = format!("{}-{}-{}", grantee, target, mode);
            let node = ResourceNode::new(&grant_id, ResourceKind::CapabilityGrant)
                .with_prop("grantee", grantee)
                .with_prop("actions", serde_json::json!(actions))
                .with_prop("resources", serde_json::json!([target]));
            graph.add_node(node)?;
            graph.add_edge(&grant_id, grantee)?;
            graph.add_edge(&grant_id, target)?;
        }
    }
    Ok(())
}
