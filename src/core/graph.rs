//! Region graph — resource nodes, dependency edges, deterministic ordering.
//!
//! Topological order uses Kahn's algorithm with declaration-order
//! tie-breaking among ready nodes, so re-synthesis of an unchanged spec
//! yields a byte-identical plan. Cycle detection names every node on a
//! cycle and never returns a partial order.

use crate::core::error::{SynthError, SynthResult};
use crate::core::types::{DependencyEdge, RealizedOutputs, ResourceNode};
use crate::trace::fingerprint;
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

/// The dependency graph of resources scoped to one deployment region.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RegionGraph {
    /// Deployment region identifier
    pub region: String,

    /// Nodes in declaration order
    pub nodes: IndexMap<String, ResourceNode>,

    /// Directed dependency edges (`to` realized before `from`)
    pub edges: Vec<DependencyEdge>,
}

impl RegionGraph {
    /// Create an empty graph for a region.
    pub fn new(region: impl Into<String>) -> Self {
        Self {
            region: region.into(),
            nodes: IndexMap::new(),
            edges: Vec::new(),
        }
    }

    /// Add a node. Logical ids are unique within a region graph.
    pub fn add_node(&mut self, node: ResourceNode) -> SynthResult<()> {
        if self.nodes.contains_key(&node.logical_id) {
            return Err(SynthError::invalid(format!(
                "duplicate logical id '{}'",
                node.logical_id
            )));
        }
        self.nodes.insert(node.logical_id.clone(), node);
        Ok(())
    }

    /// Add a dependency edge: `to` must be realized before `from`. Both
    /// endpoints must already exist; identical edges collapse to one.
    pub fn add_edge(&mut self, from: &str, to: &str) -> SynthResult<()> {
        if !self.nodes.contains_key(from) {
            return Err(SynthError::invalid(format!(
                "edge references unknown node '{}'",
                from
            )));
        }
        if !self.nodes.contains_key(to) {
            return Err(SynthError::invalid(format!(
                "edge references unknown node '{}'",
                to
            )));
        }
        let edge = DependencyEdge::new(from, to);
        if !self.edges.contains(&edge) {
            self.edges.push(edge);
        }
        Ok(())
    }

    /// Look up a node by logical id.
    pub fn node(&self, id: &str) -> Option<&ResourceNode> {
        self.nodes.get(id)
    }

    /// Node count.
    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }

    /// Edge count.
    pub fn edge_count(&self) -> usize {
        self.edges.len()
    }

    /// Deployment order: every node exactly once, producers before
    /// consumers, ties broken by declaration order.
    pub fn topological_order(&self) -> SynthResult<Vec<&ResourceNode>> {
        let n = self.nodes.len();
        let mut in_degree = vec![0usize; n];
        // dependents[i] = indices of nodes that must wait for node i
        let mut dependents: Vec<Vec<usize>> = vec![Vec::new(); n];

        for edge in &self.edges {
            // Endpoints are validated at insertion; indices always resolve.
            let from = self.nodes.get_index_of(&edge.from).ok_or_else(|| {
                SynthError::invalid(format!("edge references unknown node '{}'", edge.from))
            })?;
            let to = self.nodes.get_index_of(&edge.to).ok_or_else(|| {
                SynthError::invalid(format!("edge references unknown node '{}'", edge.to))
            })?;
            dependents[to].push(from);
            in_degree[from] += 1;
        }

        // Ready set ordered by declaration index.
        let mut ready: BTreeSet<usize> = in_degree
            .iter()
            .enumerate()
            .filter(|(_, &d)| d == 0)
            .map(|(i, _)| i)
            .collect();

        let mut order = Vec::with_capacity(n);
        while let Some(&i) = ready.iter().next() {
            ready.remove(&i);
            order.push(i);
            for &dep in &dependents[i] {
                in_degree[dep] -= 1;
                if in_degree[dep] == 0 {
                    ready.insert(dep);
                }
            }
        }

        if order.len() != n {
            let remaining: Vec<usize> = (0..n).filter(|i| in_degree[*i] > 0).collect();
            return Err(SynthError::Cycle {
                members: self.cycle_members(&remaining),
            });
        }

        Ok(order
            .into_iter()
            .map(|i| &self.nodes[i])
            .collect())
    }

    /// Narrow the unordered remainder down to the nodes actually on a
    /// cycle: peel off downstream dependents (nodes nothing in the
    /// remainder waits on) until a fixpoint.
    fn cycle_members(&self, remaining: &[usize]) -> Vec<String> {
        let mut members: BTreeSet<usize> = remaining.iter().copied().collect();
        loop {
            let mut waited_on: BTreeSet<usize> = BTreeSet::new();
            for edge in &self.edges {
                let from = self.nodes.get_index_of(&edge.from);
                let to = self.nodes.get_index_of(&edge.to);
                if let (Some(from), Some(to)) = (from, to) {
                    if members.contains(&from) && members.contains(&to) {
                        waited_on.insert(to);
                    }
                }
            }
            let peeled: Vec<usize> = members
                .iter()
                .filter(|i| !waited_on.contains(i))
                .copied()
                .collect();
            if peeled.is_empty() {
                break;
            }
            for i in peeled {
                members.remove(&i);
            }
        }
        members
            .into_iter()
            .map(|i| self.nodes[i].logical_id.clone())
            .collect()
    }

    /// Record realized outputs from the external deployment engine. Outputs
    /// transition absent → present exactly once; a conflicting re-record is
    /// rejected.
    pub fn record_outputs(&mut self, outputs: &RealizedOutputs) -> SynthResult<()> {
        for (id, values) in outputs {
            let node = self.nodes.get_mut(id).ok_or_else(|| {
                SynthError::invalid(format!("outputs recorded for unknown node '{}'", id))
            })?;
            for (key, value) in values {
                match node.outputs.get(key) {
                    None => {
                        node.outputs.insert(key.clone(), value.clone());
                    }
                    Some(existing) if existing == value => {}
                    Some(existing) => {
                        return Err(SynthError::invalid(format!(
                            "output '{}' of '{}' already realized as '{}'",
                            key, id, existing
                        )));
                    }
                }
            }
        }
        Ok(())
    }

    /// Structural fingerprint of the synthesized plan. Outputs are excluded:
    /// two passes over the same spec fingerprint identically whether or not
    /// the first was realized.
    pub fn fingerprint(&self) -> String {
        let nodes: Vec<serde_json::Value> = self
            .nodes
            .values()
            .map(|n| {
                serde_json::json!({
                    "logical_id": n.logical_id,
                    "kind": n.kind.to_string(),
                    "properties": n.properties,
                })
            })
            .collect();
        let edges: Vec<serde_json::Value> = self
            .edges
            .iter()
            .map(|e| serde_json::json!({"from": e.from, "to": e.to}))
            .collect();
        let doc = serde_json::json!({
            "region": self.region,
            "nodes": nodes,
            "edges": edges,
        });
        fingerprint::hash_string(&doc.to_string())
    }
}
