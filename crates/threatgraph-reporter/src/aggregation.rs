//! Per-resource detail records for an aggregate node.

use std::collections::BTreeMap;

use threatgraph_core::ResourceDetail;

use crate::graph::{AggregateNode, Signal};

/// Build the member id → detail map by zipping member ids with the
/// per-member counts.
///
/// A count array that does not line up with the members reads as zero for
/// every member of that signal instead of failing the node.
pub fn resource_details(node: &AggregateNode) -> BTreeMap<String, ResourceDetail> {
    for signal in Signal::ALL {
        let counts = node.member_counts(signal);
        if !counts.is_empty() && !node.is_aligned(signal) {
            tracing::debug!(
                node_id = %node.id,
                signal = ?signal,
                members = node.member_ids.len(),
                counts = counts.len(),
                "Misaligned member counts, reading as zero"
            );
        }
    }

    node.member_ids
        .iter()
        .enumerate()
        .map(|(i, member_id)| {
            let count = |signal| member_count(node, signal, i);
            let detail = ResourceDetail {
                node_id: member_id.clone(),
                image_name: String::new(),
                name: member_id.clone(),
                vulnerability_count: count(Signal::Vulnerabilities),
                vulnerability_scan_id: String::new(),
                secrets_count: count(Signal::Secrets),
                secrets_scan_id: String::new(),
                compliance_count: count(Signal::Compliance),
                compliance_scan_id: String::new(),
                cloud_compliance_count: count(Signal::CloudCompliance),
                cloud_compliance_scan_id: String::new(),
            };
            (member_id.clone(), detail)
        })
        .collect()
}

fn member_count(node: &AggregateNode, signal: Signal, index: usize) -> i64 {
    if !node.is_aligned(signal) {
        return 0;
    }
    node.member_counts(signal).get(index).copied().unwrap_or(0)
}
