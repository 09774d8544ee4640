//! In-memory provider graph built from the store's aggregate records.
//!
//! Each record is classified into an [`AggregateNode`]; records without a
//! depth are not part of the threat graph and are dropped. The graph is
//! read-only once built.

use std::collections::{BTreeMap, HashMap, HashSet};

use serde_json::Value;
use threatgraph_core::{AggregateId, CloudProvider, NodeType};
use threatgraph_graph::queries::{self, AggregateRecord};

use crate::error::IngestionError;
use crate::types::GraphStats;

/// Depth of the nodes directly reachable from the internet.
pub const ROOT_DEPTH: u32 = 1;

/// The four security signals counted per resource.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Signal {
    Vulnerabilities,
    Secrets,
    Compliance,
    CloudCompliance,
}

impl Signal {
    pub const ALL: [Signal; 4] = [
        Signal::Vulnerabilities,
        Signal::Secrets,
        Signal::Compliance,
        Signal::CloudCompliance,
    ];

    /// Record key of the per-member collected counts.
    pub fn member_key(&self) -> &'static str {
        match self {
            Self::Vulnerabilities => queries::MEMBER_VULNERABILITIES,
            Self::Secrets => queries::MEMBER_SECRETS,
            Self::Compliance => queries::MEMBER_COMPLIANCE,
            Self::CloudCompliance => queries::MEMBER_CLOUD_COMPLIANCE,
        }
    }

    /// Record key of the store-computed total.
    pub fn sum_key(&self) -> &'static str {
        match self {
            Self::Vulnerabilities => queries::SUM_VULNERABILITIES,
            Self::Secrets => queries::SUM_SECRETS,
            Self::Compliance => queries::SUM_COMPLIANCE,
            Self::CloudCompliance => queries::SUM_CLOUD_COMPLIANCE,
        }
    }
}

/// Totals across all members, as computed by the store.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SignalTotals {
    pub vulnerabilities: i64,
    pub secrets: i64,
    pub compliance: i64,
    pub cloud_compliance: i64,
}

/// A bucket of concrete resources sharing type, depth and provider.
#[derive(Debug, Clone)]
pub struct AggregateNode {
    pub id: AggregateId,
    pub node_type: NodeType,
    /// Distance from the internet entry point.
    pub depth: u32,
    /// Raw provider value of the group.
    pub cloud_provider: String,
    pub member_ids: Vec<String>,
    /// Per-member counts, aligned with `member_ids` or empty.
    pub member_vuln_counts: Vec<i64>,
    pub member_secret_counts: Vec<i64>,
    pub member_compliance_counts: Vec<i64>,
    pub member_cloud_compliance_counts: Vec<i64>,
    pub totals: SignalTotals,
    /// Outgoing edges to other aggregate nodes.
    pub children: Vec<AggregateId>,
}

impl AggregateNode {
    pub fn member_counts(&self, signal: Signal) -> &[i64] {
        match signal {
            Signal::Vulnerabilities => &self.member_vuln_counts,
            Signal::Secrets => &self.member_secret_counts,
            Signal::Compliance => &self.member_compliance_counts,
            Signal::CloudCompliance => &self.member_cloud_compliance_counts,
        }
    }

    /// Whether a signal's counts line up with `member_ids`.
    pub fn is_aligned(&self, signal: Signal) -> bool {
        self.member_counts(signal).len() == self.member_ids.len()
    }

    fn member_counts_mut(&mut self, signal: Signal) -> &mut Vec<i64> {
        match signal {
            Signal::Vulnerabilities => &mut self.member_vuln_counts,
            Signal::Secrets => &mut self.member_secret_counts,
            Signal::Compliance => &mut self.member_compliance_counts,
            Signal::CloudCompliance => &mut self.member_cloud_compliance_counts,
        }
    }
}

/// How strictly aggregate records are validated.
#[derive(Debug, Clone)]
pub struct IngestOptions {
    /// Reject count arrays whose length is neither 0 nor the member count.
    /// When false they are kept and degrade to zeros at render time.
    pub strict_member_arrays: bool,
}

impl Default for IngestOptions {
    fn default() -> Self {
        Self {
            strict_member_arrays: true,
        }
    }
}

/// All aggregate nodes of one provider bucket.
#[derive(Debug, Clone)]
pub struct ProviderGraph {
    pub provider: CloudProvider,
    /// Node data by store id.
    pub nodes: HashMap<AggregateId, AggregateNode>,
    /// Node ids per depth, in record order.
    pub depths: BTreeMap<u32, Vec<AggregateId>>,
}

impl ProviderGraph {
    /// Build from already classified nodes.
    pub fn from_nodes(provider: CloudProvider, nodes: Vec<AggregateNode>) -> Self {
        let mut by_id = HashMap::with_capacity(nodes.len());
        let mut depths: BTreeMap<u32, Vec<AggregateId>> = BTreeMap::new();

        for node in nodes {
            depths.entry(node.depth).or_default().push(node.id);
            by_id.insert(node.id, node);
        }

        Self {
            provider,
            nodes: by_id,
            depths,
        }
    }

    /// Build from the store's records for one provider.
    pub fn from_records(
        provider: CloudProvider,
        records: Vec<AggregateRecord>,
        options: &IngestOptions,
    ) -> Result<Self, IngestionError> {
        let total = records.len();
        let mut nodes = Vec::with_capacity(total);
        let mut seen = HashSet::with_capacity(total);

        for record in records {
            let id = AggregateId(record.id);
            if !seen.insert(id) {
                return Err(IngestionError::malformed(id, "duplicate record id"));
            }
            match classify_record(record, options)? {
                Some(node) => {
                    if CloudProvider::classify(&node.cloud_provider) != Some(provider) {
                        tracing::warn!(
                            provider = %provider,
                            node_id = %node.id,
                            cloud_provider = %node.cloud_provider,
                            "Aggregate node provider does not match its bucket"
                        );
                    }
                    nodes.push(node);
                }
                None => tracing::debug!(node_id = %id, "Discarding aggregate record without depth"),
            }
        }

        let graph = Self::from_nodes(provider, nodes);
        tracing::debug!(
            provider = %provider,
            records = total,
            nodes = graph.node_count(),
            "Built provider graph"
        );
        Ok(graph)
    }

    pub fn node(&self, id: AggregateId) -> Option<&AggregateNode> {
        self.nodes.get(&id)
    }

    /// Outgoing edges of a node; empty for unknown ids.
    pub fn children(&self, id: AggregateId) -> &[AggregateId] {
        self.nodes
            .get(&id)
            .map(|n| n.children.as_slice())
            .unwrap_or(&[])
    }

    /// Internet-adjacent nodes (depth 1), in record order.
    pub fn roots(&self) -> &[AggregateId] {
        self.depths
            .get(&ROOT_DEPTH)
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }

    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }

    pub fn edge_count(&self) -> usize {
        self.nodes.values().map(|n| n.children.len()).sum()
    }

    pub fn stats(&self) -> GraphStats {
        GraphStats {
            provider: self.provider,
            total_nodes: self.node_count(),
            total_edges: self.edge_count(),
            root_count: self.roots().len(),
            max_depth: self.depths.keys().next_back().copied(),
        }
    }
}

/// Turn one record into a node, or `None` if it carries no depth.
fn classify_record(
    record: AggregateRecord,
    options: &IngestOptions,
) -> Result<Option<AggregateNode>, IngestionError> {
    let id = AggregateId(record.id);
    let props = record
        .properties
        .as_object()
        .ok_or_else(|| IngestionError::malformed(id, "properties are not a map"))?;

    let Some(raw_depth) = int_property(props, queries::DEPTH, id)? else {
        return Ok(None);
    };
    let depth = u32::try_from(raw_depth)
        .map_err(|_| IngestionError::malformed(id, format!("invalid depth {raw_depth}")))?;

    let node_type = string_property(props, queries::NODE_TYPE, id)?
        .ok_or_else(|| IngestionError::malformed(id, "missing node_type"))?;
    let cloud_provider = string_property(props, queries::CLOUD_PROVIDER, id)?.unwrap_or_default();
    let member_ids = string_list(props, queries::MEMBER_IDS, id)?;

    let mut node = AggregateNode {
        id,
        node_type: NodeType::parse(&node_type),
        depth,
        cloud_provider,
        member_ids,
        member_vuln_counts: Vec::new(),
        member_secret_counts: Vec::new(),
        member_compliance_counts: Vec::new(),
        member_cloud_compliance_counts: Vec::new(),
        totals: SignalTotals {
            vulnerabilities: int_property(props, Signal::Vulnerabilities.sum_key(), id)?.unwrap_or(0),
            secrets: int_property(props, Signal::Secrets.sum_key(), id)?.unwrap_or(0),
            compliance: int_property(props, Signal::Compliance.sum_key(), id)?.unwrap_or(0),
            cloud_compliance: int_property(props, Signal::CloudCompliance.sum_key(), id)?
                .unwrap_or(0),
        },
        children: record.children.into_iter().map(AggregateId).collect(),
    };

    for signal in Signal::ALL {
        let counts = int_list(props, signal.member_key(), id)?;
        if options.strict_member_arrays && !counts.is_empty() && counts.len() != node.member_ids.len() {
            return Err(IngestionError::MemberArrayLength {
                node_id: id,
                field: signal.member_key(),
                expected: node.member_ids.len(),
                actual: counts.len(),
            });
        }
        *node.member_counts_mut(signal) = counts;
    }

    Ok(Some(node))
}

// ── Property Readers ─────────────────────────────────────────────
//
// Absent and null both read as "not set".

type Props = serde_json::Map<String, Value>;

fn present<'a>(props: &'a Props, key: &str) -> Option<&'a Value> {
    props.get(key).filter(|v| !v.is_null())
}

fn int_property(props: &Props, key: &str, id: AggregateId) -> Result<Option<i64>, IngestionError> {
    match present(props, key) {
        None => Ok(None),
        Some(v) => v
            .as_i64()
            .map(Some)
            .ok_or_else(|| IngestionError::malformed(id, format!("{key} is not an integer: {v}"))),
    }
}

fn string_property(
    props: &Props,
    key: &str,
    id: AggregateId,
) -> Result<Option<String>, IngestionError> {
    match present(props, key) {
        None => Ok(None),
        Some(v) => v
            .as_str()
            .map(|s| Some(s.to_string()))
            .ok_or_else(|| IngestionError::malformed(id, format!("{key} is not a string: {v}"))),
    }
}

fn list<'a>(props: &'a Props, key: &str, id: AggregateId) -> Result<&'a [Value], IngestionError> {
    match present(props, key) {
        None => Ok(&[]),
        Some(v) => v
            .as_array()
            .map(Vec::as_slice)
            .ok_or_else(|| IngestionError::malformed(id, format!("{key} is not a list"))),
    }
}

fn string_list(props: &Props, key: &str, id: AggregateId) -> Result<Vec<String>, IngestionError> {
    list(props, key, id)?
        .iter()
        .map(|v| {
            v.as_str()
                .map(str::to_string)
                .ok_or_else(|| IngestionError::malformed(id, format!("{key} holds a non-string: {v}")))
        })
        .collect()
}

fn int_list(props: &Props, key: &str, id: AggregateId) -> Result<Vec<i64>, IngestionError> {
    list(props, key, id)?
        .iter()
        .map(|v| {
            v.as_i64()
                .ok_or_else(|| IngestionError::malformed(id, format!("{key} holds a non-integer: {v}")))
        })
        .collect()
}
