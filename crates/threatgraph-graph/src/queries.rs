//! Aggregation query over the threat graph.
//!
//! Groups every resource node by `(node_type, depth, cloud_provider)` with
//! `apoc.nodes.group`, summing the per-node signal counts and collecting the
//! member ids and per-member counts in matching order. One query per
//! provider bucket.

use neo4rs::{query, Query};

use threatgraph_core::types::INTERNET_PROVIDER;
use threatgraph_core::CloudProvider;

use crate::client::{GraphClient, GraphError};

// ── Grouped Property Names ───────────────────────────────────────

pub const NODE_TYPE: &str = "node_type";
pub const DEPTH: &str = "depth";
pub const CLOUD_PROVIDER: &str = "cloud_provider";
pub const SUM_VULNERABILITIES: &str = "sum_sum_cve";
pub const SUM_SECRETS: &str = "sum_sum_secrets";
pub const SUM_COMPLIANCE: &str = "sum_sum_compliance";
pub const SUM_CLOUD_COMPLIANCE: &str = "sum_sum_cloud_compliance";
pub const MEMBER_IDS: &str = "collect_node_id";
pub const MEMBER_VULNERABILITIES: &str = "collect_num_cve";
pub const MEMBER_SECRETS: &str = "collect_num_secrets";
pub const MEMBER_COMPLIANCE: &str = "collect_num_compliance";
pub const MEMBER_CLOUD_COMPLIANCE: &str = "collect_num_cloud_compliance";

/// Every property lifted from a grouped node into its record.
pub const AGGREGATE_KEYS: &[&str] = &[
    NODE_TYPE,
    DEPTH,
    CLOUD_PROVIDER,
    SUM_VULNERABILITIES,
    SUM_SECRETS,
    SUM_COMPLIANCE,
    SUM_CLOUD_COMPLIANCE,
    MEMBER_IDS,
    MEMBER_VULNERABILITIES,
    MEMBER_SECRETS,
    MEMBER_COMPLIANCE,
    MEMBER_CLOUD_COMPLIANCE,
];

/// One grouped node as returned by the store.
#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
pub struct AggregateRecord {
    /// Store-assigned id, only meaningful within this result set.
    pub id: i64,
    /// Grouped properties, keyed by the names above.
    pub properties: serde_json::Value,
    /// End ids of the group's outgoing relationships, in result order.
    pub children: Vec<i64>,
}

const GROUPING_CALL: &str = "CALL apoc.nodes.group(
               $labels,
               ['node_type', 'depth', 'cloud_provider'],
               [{`*`: 'count', sum_cve: 'sum', sum_secrets: 'sum',
                 sum_compliance: 'sum', sum_cloud_compliance: 'sum',
                 node_id: 'collect', num_cve: 'collect', num_secrets: 'collect',
                 num_compliance: 'collect', num_cloud_compliance: 'collect'},
                {`*`: 'count'}],
               {selfRels: false})
             YIELD node, relationships
             WHERE apoc.any.property(node, 'depth') IS NOT NULL";

/// Cypher text for one provider bucket.
///
/// Named providers group cloud resources and nodes and match the provider
/// exactly; the catch-all groups nodes only and excludes both the named
/// providers and the internet.
pub fn aggregate_cypher(provider: CloudProvider) -> String {
    let filter = match provider {
        CloudProvider::Others => {
            "AND NOT apoc.any.property(node, 'cloud_provider') IN $named
               AND apoc.any.property(node, 'cloud_provider') <> $internet"
        }
        _ => "AND apoc.any.property(node, 'cloud_provider') = $provider",
    };
    format!("{GROUPING_CALL}\n               {filter}\n             RETURN node, relationships")
}

/// Node labels grouped for a provider bucket.
pub fn grouped_labels(provider: CloudProvider) -> Vec<String> {
    match provider {
        CloudProvider::Others => vec!["Node".to_string()],
        _ => vec!["CloudResource".to_string(), "Node".to_string()],
    }
}

/// Parameterized aggregation query for one provider bucket.
pub fn aggregate_query(provider: CloudProvider) -> Query {
    let named: Vec<String> = CloudProvider::named()
        .map(|p| p.as_str().to_string())
        .collect();

    query(&aggregate_cypher(provider))
        .param("labels", grouped_labels(provider))
        .param("provider", provider.as_str().to_string())
        .param("named", named)
        .param("internet", INTERNET_PROVIDER.to_string())
}

impl GraphClient {
    /// Fetch the grouped aggregate nodes and their edges for one provider.
    pub async fn fetch_provider_aggregates(
        &self,
        provider: CloudProvider,
    ) -> Result<Vec<AggregateRecord>, GraphError> {
        let rows = self.query_rows(aggregate_query(provider)).await?;
        let mut records = Vec::with_capacity(rows.len());

        for row in rows {
            let node: neo4rs::Node = row.get("node").map_err(|e| {
                GraphError::Serialization(format!("Failed to deserialize grouped node: {e}"))
            })?;
            let relationships: Vec<neo4rs::Relation> = row.get("relationships").map_err(|e| {
                GraphError::Serialization(format!("Failed to deserialize group relationships: {e}"))
            })?;

            records.push(AggregateRecord {
                id: node.id(),
                properties: lift_properties(&node)?,
                children: relationships.iter().map(|r| r.end_node_id()).collect(),
            });
        }

        tracing::debug!(provider = %provider, records = records.len(), "Fetched aggregate nodes");
        Ok(records)
    }
}

/// Convert a grouped neo4rs::Node into a JSON property map.
///
/// Only the aggregation keys are lifted. Values keep the type the store
/// returned so that the ingestion step can reject malformed ones. A present
/// value of an unsupported shape (mixed lists, float lists, maps) is an
/// error; null reads as absent.
fn lift_properties(node: &neo4rs::Node) -> Result<serde_json::Value, GraphError> {
    let present = node.keys();
    let mut props = serde_json::Map::new();

    for key in AGGREGATE_KEYS {
        if !present.contains(key) {
            continue;
        }
        match lift_value(node, key) {
            Some(value) => {
                props.insert((*key).to_string(), value);
            }
            None if is_null(node, key) => {}
            None => {
                return Err(GraphError::Serialization(format!(
                    "Grouped node {}: {key} has unsupported type",
                    node.id()
                )))
            }
        }
    }
    Ok(serde_json::Value::Object(props))
}

fn lift_value(node: &neo4rs::Node, key: &str) -> Option<serde_json::Value> {
    if let Ok(v) = node.get::<i64>(key) {
        return Some(v.into());
    }
    if let Ok(v) = node.get::<String>(key) {
        return Some(v.into());
    }
    if let Ok(v) = node.get::<f64>(key) {
        return Some(v.into());
    }
    if let Ok(v) = node.get::<Vec<i64>>(key) {
        return Some(v.into());
    }
    if let Ok(v) = node.get::<Vec<String>>(key) {
        return Some(v.into());
    }
    if let Ok(v) = node.get::<bool>(key) {
        return Some(v.into());
    }
    None
}

fn is_null(node: &neo4rs::Node, key: &str) -> bool {
    matches!(node.get::<Option<i64>>(key), Ok(None))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn named_provider_matches_exactly() {
        let cypher = aggregate_cypher(CloudProvider::Aws);
        assert!(cypher.contains("apoc.nodes.group"));
        assert!(cypher.contains("= $provider"));
        assert!(!cypher.contains("$named"));
        assert!(cypher.contains("selfRels: false"));
        assert!(cypher.ends_with("RETURN node, relationships"));
    }

    #[test]
    fn catch_all_excludes_named_and_internet() {
        let cypher = aggregate_cypher(CloudProvider::Others);
        assert!(cypher.contains("NOT apoc.any.property(node, 'cloud_provider') IN $named"));
        assert!(cypher.contains("<> $internet"));
        assert!(!cypher.contains("= $provider"));
    }

    #[test]
    fn every_bucket_requires_depth() {
        for provider in CloudProvider::ALL {
            let cypher = aggregate_cypher(provider);
            assert!(cypher.contains("apoc.any.property(node, 'depth') IS NOT NULL"));
        }
    }

    #[test]
    fn catch_all_groups_nodes_only() {
        assert_eq!(grouped_labels(CloudProvider::Others), vec!["Node"]);
        assert_eq!(grouped_labels(CloudProvider::Gcp), vec!["CloudResource", "Node"]);
    }

    #[test]
    fn record_roundtrips_through_json() {
        let record = AggregateRecord {
            id: -12,
            properties: serde_json::json!({ "node_type": "host", "depth": 1 }),
            children: vec![-13, -14],
        };
        let json = serde_json::to_string(&record).unwrap();
        let back: AggregateRecord = serde_json::from_str(&json).unwrap();
        assert_eq!(back.id, -12);
        assert_eq!(back.children, vec![-13, -14]);
        assert_eq!(back.properties["node_type"], "host");
    }

    // ── Property Lifting ─────────────────────────────────────────

    use neo4rs::{BoltInteger, BoltList, BoltMap, BoltNode, BoltNull, BoltString, BoltType};

    fn list(items: Vec<BoltType>) -> BoltType {
        let mut list = BoltList::new();
        for item in items {
            list.push(item);
        }
        BoltType::List(list)
    }

    fn grouped_node(props: Vec<(&str, BoltType)>) -> neo4rs::Node {
        let mut map = BoltMap::new();
        for (key, value) in props {
            map.put(BoltString::from(key), value);
        }
        neo4rs::Node::new(BoltNode::new(BoltInteger::new(42), BoltList::new(), map))
    }

    #[test]
    fn lifts_scalars_and_lists() {
        let node = grouped_node(vec![
            (NODE_TYPE, BoltType::from("host")),
            (DEPTH, BoltType::from(1_i64)),
            (SUM_VULNERABILITIES, BoltType::from(5_i64)),
            (MEMBER_IDS, list(vec![BoltType::from("i-1"), BoltType::from("i-2")])),
            (MEMBER_VULNERABILITIES, list(vec![BoltType::from(2_i64), BoltType::from(3_i64)])),
            ("unrelated", BoltType::from("ignored")),
        ]);

        let props = lift_properties(&node).unwrap();
        assert_eq!(
            props,
            serde_json::json!({
                "node_type": "host",
                "depth": 1,
                "sum_sum_cve": 5,
                "collect_node_id": ["i-1", "i-2"],
                "collect_num_cve": [2, 3],
            })
        );
    }

    #[test]
    fn absent_and_null_keys_are_left_out() {
        let node = grouped_node(vec![
            (NODE_TYPE, BoltType::from("container")),
            (DEPTH, BoltType::Null(BoltNull)),
        ]);

        let props = lift_properties(&node).unwrap();
        let obj = props.as_object().unwrap();
        assert_eq!(obj.len(), 1);
        assert!(obj.get(DEPTH).is_none());
        assert!(obj.get(MEMBER_IDS).is_none());
    }

    #[test]
    fn mixed_member_ids_are_rejected() {
        let node = grouped_node(vec![
            (NODE_TYPE, BoltType::from("host")),
            (DEPTH, BoltType::from(1_i64)),
            (MEMBER_IDS, list(vec![BoltType::from("i-1"), BoltType::from(7_i64)])),
        ]);

        let err = lift_properties(&node).unwrap_err();
        match err {
            GraphError::Serialization(msg) => assert!(msg.contains(MEMBER_IDS), "{msg}"),
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn float_counts_are_rejected() {
        let node = grouped_node(vec![
            (NODE_TYPE, BoltType::from("host")),
            (DEPTH, BoltType::from(1_i64)),
            (MEMBER_IDS, list(vec![BoltType::from("i-1"), BoltType::from("i-2")])),
            (MEMBER_VULNERABILITIES, list(vec![BoltType::from(2.0_f64), BoltType::from(3.0_f64)])),
        ]);

        let err = lift_properties(&node).unwrap_err();
        assert!(matches!(err, GraphError::Serialization(ref msg) if msg.contains(MEMBER_VULNERABILITIES)));
    }
}
