//! Attack path enumeration: depth-first from each internet-adjacent root.
//!
//! Edge data is not trusted to be a tree or even acyclic. Each root's
//! descent owns one visited set shared by all of its branches, so a node is
//! expanded at most once per root. Broken references yield nothing, and a
//! node whose children all yield nothing becomes the end of its own path.

use std::collections::HashSet;

use threatgraph_core::AggregateId;

use crate::graph::ProviderGraph;

/// Node ids along one path, root first.
pub type RawPath = Vec<AggregateId>;

/// Enumerate every path reachable from `root`.
pub fn enumerate_attack_paths(graph: &ProviderGraph, root: AggregateId) -> Vec<RawPath> {
    let mut visited = HashSet::new();
    descend(graph, root, &mut visited)
}

/// Enumerate paths for every depth-1 root, each with its own visited set.
pub fn enumerate_all_roots(graph: &ProviderGraph) -> Vec<(AggregateId, Vec<RawPath>)> {
    graph
        .roots()
        .iter()
        .map(|&root| (root, enumerate_attack_paths(graph, root)))
        .collect()
}

fn descend(
    graph: &ProviderGraph,
    current: AggregateId,
    visited: &mut HashSet<AggregateId>,
) -> Vec<RawPath> {
    if !visited.insert(current) {
        return Vec::new();
    }

    // Broken reference.
    if graph.node(current).is_none() {
        return Vec::new();
    }

    let children = graph.children(current);
    if children.is_empty() {
        return vec![vec![current]];
    }

    let mut paths = Vec::new();
    for &child in children {
        for tail in descend(graph, child, visited) {
            let mut path = Vec::with_capacity(tail.len() + 1);
            path.push(current);
            path.extend(tail);
            paths.push(path);
        }
    }

    if paths.is_empty() {
        paths.push(vec![current]);
    }
    paths
}
