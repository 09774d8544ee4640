//! Core domain types for the threat graph.
//!
//! These types describe the provider partition the graph is split into, the
//! aggregate nodes the store hands back, and the output schema consumed by
//! the dashboard API layer. Output field names are part of the external
//! contract and must not change.

use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::ThreatGraphError;

/// Display identity of the public internet at the head of every attack path.
pub const INTERNET_SENTINEL: &str = "The Internet";

/// Raw `cloud_provider` value carried by the internet node itself.
pub const INTERNET_PROVIDER: &str = "internet";

// ── Provider Partition ────────────────────────────────────────────

/// The fixed partition the threat graph is split into.
///
/// `Others` is the catch-all for anything not attributed to a recognized
/// provider and not itself the internet.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[serde(rename_all = "lowercase")]
pub enum CloudProvider {
    Aws,
    Azure,
    Gcp,
    Others,
}

impl CloudProvider {
    pub const ALL: [CloudProvider; 4] = [
        CloudProvider::Aws,
        CloudProvider::Azure,
        CloudProvider::Gcp,
        CloudProvider::Others,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Aws => "aws",
            Self::Azure => "azure",
            Self::Gcp => "gcp",
            Self::Others => "others",
        }
    }

    /// Named providers, i.e. everything but the catch-all bucket.
    pub fn named() -> impl Iterator<Item = CloudProvider> {
        Self::ALL.into_iter().filter(|p| *p != Self::Others)
    }

    /// Bucket a raw `cloud_provider` property falls into, or `None` for the
    /// internet node.
    pub fn classify(raw: &str) -> Option<CloudProvider> {
        if raw == INTERNET_PROVIDER {
            return None;
        }
        Some(
            Self::named()
                .find(|p| p.as_str() == raw)
                .unwrap_or(Self::Others),
        )
    }
}

impl fmt::Display for CloudProvider {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for CloudProvider {
    type Err = ThreatGraphError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let lower = s.to_lowercase();
        Self::ALL
            .into_iter()
            .find(|p| p.as_str() == lower)
            .ok_or_else(|| ThreatGraphError::InvalidProvider(s.to_string()))
    }
}

// ── Aggregate Nodes ───────────────────────────────────────────────

/// Identifier the store assigns to an aggregate node.
///
/// Only stable within one query result set; use the content identity for
/// anything that must survive across invocations.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct AggregateId(pub i64);

impl fmt::Display for AggregateId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// The kind of resource an aggregate node buckets.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum NodeType {
    Host,
    Container,
    Internet,
    /// Any cloud resource kind; carries the raw type string.
    CloudResource(String),
}

impl NodeType {
    pub fn parse(raw: &str) -> Self {
        match raw {
            "host" => Self::Host,
            "container" => Self::Container,
            "internet" => Self::Internet,
            other => Self::CloudResource(other.to_string()),
        }
    }

    /// Raw type string as stored in the graph.
    pub fn as_str(&self) -> &str {
        match self {
            Self::Host => "host",
            Self::Container => "container",
            Self::Internet => "internet",
            Self::CloudResource(kind) => kind,
        }
    }

    /// Display label shown by the dashboard.
    pub fn label(&self) -> &'static str {
        match self {
            Self::Host => "Compute Instance",
            Self::Container => "Container",
            Self::Internet => INTERNET_SENTINEL,
            Self::CloudResource(_) => "CloudResource",
        }
    }
}

// ── Output Schema ─────────────────────────────────────────────────

/// One attacker route: the internet sentinel followed by node identities.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(transparent)]
pub struct ThreatPath(pub Vec<String>);

impl ThreatPath {
    /// Start a path at the internet sentinel.
    pub fn from_internet<I, S>(identities: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let mut hops = vec![INTERNET_SENTINEL.to_string()];
        hops.extend(identities.into_iter().map(Into::into));
        Self(hops)
    }

    pub fn hops(&self) -> &[String] {
        &self.0
    }
}

/// Presentation record for one concrete member resource.
///
/// Scan ids are part of the schema but are not populated here.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Default)]
pub struct ResourceDetail {
    pub node_id: String,
    pub image_name: String,
    pub name: String,
    pub vulnerability_count: i64,
    pub vulnerability_scan_id: String,
    pub secrets_count: i64,
    pub secrets_scan_id: String,
    pub compliance_count: i64,
    pub compliance_scan_id: String,
    pub cloud_compliance_count: i64,
    pub cloud_compliance_scan_id: String,
}

/// One aggregate node rendered for display, carrying the paths that end at it.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ThreatResource {
    pub label: String,
    pub id: String,
    pub nodes: BTreeMap<String, ResourceDetail>,
    pub vulnerability_count: i64,
    pub secrets_count: i64,
    pub compliance_count: i64,
    pub cloud_compliance_count: i64,
    pub count: i64,
    pub node_type: String,
    pub attack_path: Vec<ThreatPath>,
}

/// Everything reachable from the internet within one provider bucket.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Default)]
pub struct ProviderThreatGraph {
    pub resources: Vec<ThreatResource>,
    pub compliance_count: i64,
    pub secrets_count: i64,
    pub vulnerability_count: i64,
    pub cloud_compliance_count: i64,
}

impl ProviderThreatGraph {
    /// Provider record with the given resources.
    ///
    /// Provider-level totals are not rolled up and stay at zero.
    pub fn with_resources(resources: Vec<ThreatResource>) -> Self {
        Self {
            resources,
            ..Self::default()
        }
    }
}

/// The full threat graph keyed by provider bucket.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(transparent)]
pub struct ThreatGraph(pub BTreeMap<CloudProvider, ProviderThreatGraph>);

impl ThreatGraph {
    /// A graph with an empty record for every provider bucket.
    pub fn empty() -> Self {
        Self(
            CloudProvider::ALL
                .into_iter()
                .map(|p| (p, ProviderThreatGraph::default()))
                .collect(),
        )
    }

    pub fn insert(&mut self, provider: CloudProvider, graph: ProviderThreatGraph) {
        self.0.insert(provider, graph);
    }

    pub fn get(&self, provider: CloudProvider) -> Option<&ProviderThreatGraph> {
        self.0.get(&provider)
    }

    /// Total number of flattened resource entries across providers.
    pub fn resource_count(&self) -> usize {
        self.0.values().map(|p| p.resources.len()).sum()
    }
}
