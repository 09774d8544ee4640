//! Content-derived identity for aggregate nodes.
//!
//! Store ids change between queries, so the dashboard keys nodes by a
//! SHA-256 digest over the sorted member ids instead. The internet node is
//! always the fixed sentinel.

use sha2::{Digest, Sha256};
use threatgraph_core::{NodeType, INTERNET_SENTINEL};

use crate::graph::AggregateNode;

/// Stable identity of an aggregate node.
pub fn identity(node: &AggregateNode) -> String {
    if node.node_type == NodeType::Internet {
        return INTERNET_SENTINEL.to_string();
    }
    member_digest(&node.member_ids)
}

/// Hex SHA-256 of the member ids concatenated in lexicographic order.
pub fn member_digest<S: AsRef<str>>(member_ids: &[S]) -> String {
    let mut sorted: Vec<&str> = member_ids.iter().map(AsRef::as_ref).collect();
    sorted.sort_unstable();

    let mut hasher = Sha256::new();
    for id in sorted {
        hasher.update(id.as_bytes());
    }
    format!("{:x}", hasher.finalize())
}
