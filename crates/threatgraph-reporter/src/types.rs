//! Diagnostic types for the reporter.

use serde::{Deserialize, Serialize};

use threatgraph_core::CloudProvider;

/// Shape of one provider's aggregate graph.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct GraphStats {
    pub provider: CloudProvider,
    pub total_nodes: usize,
    pub total_edges: usize,
    /// Internet-adjacent (depth 1) nodes.
    pub root_count: usize,
    pub max_depth: Option<u32>,
}
