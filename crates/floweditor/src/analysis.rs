//! Referential diagnostics over the three stores.
//!
//! The stores only reference each other by id, so a document can end up
//! with edges or sub-steps pointing at nothing. `diagnose` reports those
//! and a few shape properties of the connection graph; it never mutates.

use crate::graph::GraphState;
use flowcore::{Connection, SubStepContainer};
use petgraph::algo::tarjan_scc;
use petgraph::graph::{DiGraph, NodeIndex};
use petgraph::Direction;
use serde::Serialize;
use std::collections::{HashMap, HashSet};

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct Diagnostics {
    /// Connection ids whose source or target is not in any store
    pub dangling_connections: Vec<String>,
    /// Sub-step ids whose parent container or parent node is gone
    pub orphan_sub_steps: Vec<String>,
    /// Each entry lists the entity ids of one connection cycle
    pub cycles: Vec<Vec<String>>,
    /// Targets with more than one inbound edge, with the edge count
    pub multi_inbound_targets: Vec<(String, usize)>,
}

impl Diagnostics {
    /// No dangling references. Cycles and fan-in are allowed.
    pub fn is_consistent(&self) -> bool {
        self.dangling_connections.is_empty() && self.orphan_sub_steps.is_empty()
    }
}

/// Every id a connection may legitimately point at
pub fn known_endpoints(graph: &GraphState, sub_steps: &[SubStepContainer]) -> HashSet<String> {
    let mut ids = graph.entity_ids();
    ids.extend(graph.containers.iter().map(|c| c.id.clone()));
    for sub_step in sub_steps {
        ids.insert(sub_step.id.clone());
        ids.extend(sub_step.node_ids());
    }
    ids
}

pub fn orphan_sub_steps(graph: &GraphState, sub_steps: &[SubStepContainer]) -> Vec<String> {
    sub_steps
        .iter()
        .filter(|s| {
            graph
                .find_node(&s.parent_container_id, &s.parent_node_id)
                .is_none()
        })
        .map(|s| s.id.clone())
        .collect()
}

pub fn diagnose(
    graph: &GraphState,
    sub_steps: &[SubStepContainer],
    connections: &[Connection],
) -> Diagnostics {
    let known = known_endpoints(graph, sub_steps);

    let dangling_connections: Vec<String> = connections
        .iter()
        .filter(|c| !known.contains(&c.source_id) || !known.contains(&c.target_id))
        .map(|c| c.id.clone())
        .collect();

    let edges = build_graph(connections);
    let cycles = find_cycles(&edges);

    let mut multi_inbound_targets: Vec<(String, usize)> = edges
        .node_indices()
        .filter_map(|idx| {
            let inbound = edges.edges_directed(idx, Direction::Incoming).count();
            (inbound > 1).then(|| (edges[idx].clone(), inbound))
        })
        .collect();
    multi_inbound_targets.sort();

    let diagnostics = Diagnostics {
        dangling_connections,
        orphan_sub_steps: orphan_sub_steps(graph, sub_steps),
        cycles,
        multi_inbound_targets,
    };
    tracing::debug!(
        dangling = diagnostics.dangling_connections.len(),
        orphans = diagnostics.orphan_sub_steps.len(),
        cycles = diagnostics.cycles.len(),
        "diagnostics computed"
    );
    diagnostics
}

/// Directed graph over connection endpoints, one edge per connection
fn build_graph(connections: &[Connection]) -> DiGraph<String, String> {
    let mut graph = DiGraph::new();
    let mut index: HashMap<&str, NodeIndex> = HashMap::new();

    for conn in connections {
        let from = *index
            .entry(conn.source_id.as_str())
            .or_insert_with(|| graph.add_node(conn.source_id.clone()));
        let to = *index
            .entry(conn.target_id.as_str())
            .or_insert_with(|| graph.add_node(conn.target_id.clone()));
        graph.add_edge(from, to, conn.id.clone());
    }
    graph
}

fn find_cycles(graph: &DiGraph<String, String>) -> Vec<Vec<String>> {
    tarjan_scc(graph)
        .into_iter()
        .filter(|component| match component.as_slice() {
            [single] => graph.contains_edge(*single, *single),
            _ => true,
        })
        .map(|component| {
            let mut ids: Vec<String> = component.iter().map(|idx| graph[*idx].clone()).collect();
            ids.sort();
            ids
        })
        .collect()
}
