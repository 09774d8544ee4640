//! Provider threat graph assembly.
//!
//! Internally every aggregate node is rendered once and collects all the
//! paths that end at it. The dashboard expects one resource entry per path,
//! so the node is repeated at output time, each copy carrying one path.

use std::collections::{BTreeMap, HashMap};

use threatgraph_core::{AggregateId, CloudProvider, ProviderThreatGraph, ResourceDetail, ThreatPath, ThreatResource};

use crate::aggregation::resource_details;
use crate::algorithms::enumerate_all_roots;
use crate::graph::{AggregateNode, ProviderGraph, SignalTotals};
use crate::identity::identity;

/// One aggregate node rendered for display.
#[derive(Debug, Clone)]
pub struct ThreatNode {
    pub label: String,
    pub id: String,
    pub nodes: BTreeMap<String, ResourceDetail>,
    pub totals: SignalTotals,
    pub count: i64,
    pub node_type: String,
    /// Every path terminating at this node, in discovery order.
    pub paths: Vec<ThreatPath>,
}

impl ThreatNode {
    pub fn from_aggregate(node: &AggregateNode) -> Self {
        Self {
            label: node.node_type.label().to_string(),
            id: identity(node),
            nodes: resource_details(node),
            totals: node.totals,
            count: node.member_ids.len() as i64,
            node_type: node.node_type.as_str().to_string(),
            paths: Vec::new(),
        }
    }

    /// Output entry for this node carrying only `path`.
    fn to_resource(&self, path: ThreatPath) -> ThreatResource {
        ThreatResource {
            label: self.label.clone(),
            id: self.id.clone(),
            nodes: self.nodes.clone(),
            vulnerability_count: self.totals.vulnerabilities,
            secrets_count: self.totals.secrets,
            compliance_count: self.totals.compliance,
            cloud_compliance_count: self.totals.cloud_compliance,
            count: self.count,
            node_type: self.node_type.clone(),
            attack_path: vec![path],
        }
    }
}

/// Rendered nodes of one provider plus the order paths were attached in.
#[derive(Debug)]
pub struct ProviderAssembly {
    pub provider: CloudProvider,
    nodes: HashMap<AggregateId, ThreatNode>,
    /// (terminal node, index into its `paths`) per attached path.
    emitted: Vec<(AggregateId, usize)>,
}

impl ProviderAssembly {
    /// Render every node of the graph, with no paths yet.
    pub fn new(graph: &ProviderGraph) -> Self {
        let nodes = graph
            .nodes
            .iter()
            .map(|(&id, node)| (id, ThreatNode::from_aggregate(node)))
            .collect();

        Self {
            provider: graph.provider,
            nodes,
            emitted: Vec::new(),
        }
    }

    /// Attach a root-first id path to its terminal node.
    ///
    /// Ids are resolved to identities by id. Returns false, attaching
    /// nothing, when the path is empty or any hop is unknown.
    pub fn attach_path(&mut self, path: &[AggregateId]) -> bool {
        let Some(&terminal) = path.last() else {
            return false;
        };

        let identities: Option<Vec<String>> = path
            .iter()
            .map(|id| self.nodes.get(id).map(|n| n.id.clone()))
            .collect();
        let Some(identities) = identities else {
            tracing::debug!(provider = %self.provider, "Skipping path through unknown node");
            return false;
        };

        let Some(node) = self.nodes.get_mut(&terminal) else {
            return false;
        };
        node.paths.push(ThreatPath::from_internet(identities));
        self.emitted.push((terminal, node.paths.len() - 1));
        true
    }

    pub fn node(&self, id: AggregateId) -> Option<&ThreatNode> {
        self.nodes.get(&id)
    }

    pub fn path_count(&self) -> usize {
        self.emitted.len()
    }

    /// Flatten into the output record, one resource per attached path.
    pub fn into_output(self) -> ProviderThreatGraph {
        let resources = self
            .emitted
            .iter()
            .filter_map(|&(id, index)| {
                let node = self.nodes.get(&id)?;
                let path = node.paths.get(index)?.clone();
                Some(node.to_resource(path))
            })
            .collect();

        ProviderThreatGraph::with_resources(resources)
    }
}

/// Enumerate every root's paths and assemble the provider's output record.
pub fn build_provider_threat_graph(graph: &ProviderGraph) -> ProviderThreatGraph {
    assemble(graph).into_output()
}

/// Enumerate and attach every path without flattening.
pub fn assemble(graph: &ProviderGraph) -> ProviderAssembly {
    let mut assembly = ProviderAssembly::new(graph);
    for (root, paths) in enumerate_all_roots(graph) {
        tracing::trace!(provider = %graph.provider, root = %root, paths = paths.len(), "Enumerated root");
        for path in &paths {
            assembly.attach_path(path);
        }
    }
    assembly
}
