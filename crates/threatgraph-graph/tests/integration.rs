//! Integration tests for threatgraph-graph against a live Neo4j instance with APOC.
//!
//! These tests require `docker compose up` to be running.
//! Run with: cargo test --package threatgraph-graph --test integration -- --ignored
//!
//! Skipped automatically if Neo4j is not available.

use std::time::{SystemTime, UNIX_EPOCH};

use threatgraph_core::CloudProvider;
use threatgraph_graph::{queries, AggregateRecord, GraphClient, GraphConfig};

async fn connect_or_skip() -> Option<GraphClient> {
    let config = GraphConfig::default();
    match GraphClient::connect(&config).await {
        Ok(client) => Some(client),
        Err(e) => {
            eprintln!("Skipping integration test (Neo4j not available): {e}");
            None
        }
    }
}

/// A provider value unique to this run, so seeded groups land in their own
/// bucket of the catch-all query.
fn unique_provider() -> String {
    let nanos = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_nanos())
        .unwrap_or_default();
    format!("itest-{nanos}")
}

async fn cleanup(client: &GraphClient, provider: &str) {
    let q = neo4rs::query("MATCH (n:Node {cloud_provider: $cp}) DETACH DELETE n")
        .param("cp", provider.to_string());
    let _ = client.run(q).await;
}

async fn seed_node(client: &GraphClient, provider: &str, node_id: &str, node_type: &str, depth: i64, cves: i64) {
    let q = neo4rs::query(
        "CREATE (:Node {
           node_id: $node_id, node_type: $node_type, depth: $depth,
           cloud_provider: $cp, sum_cve: $cves, num_cve: $cves,
           sum_secrets: 0, num_secrets: 0
         })",
    )
    .param("node_id", node_id.to_string())
    .param("node_type", node_type.to_string())
    .param("depth", depth)
    .param("cp", provider.to_string())
    .param("cves", cves);
    client.run(q).await.unwrap();
}

async fn connect_nodes(client: &GraphClient, provider: &str, from: &str, to: &str) {
    let q = neo4rs::query(
        "MATCH (a:Node {node_id: $from, cloud_provider: $cp}),
               (b:Node {node_id: $to, cloud_provider: $cp})
         CREATE (a)-[:CONNECTS]->(b)",
    )
    .param("from", from.to_string())
    .param("to", to.to_string())
    .param("cp", provider.to_string());
    client.run(q).await.unwrap();
}

fn seeded_records(records: Vec<AggregateRecord>, provider: &str) -> Vec<AggregateRecord> {
    records
        .into_iter()
        .filter(|r| r.properties.get(queries::CLOUD_PROVIDER).and_then(|v| v.as_str()) == Some(provider))
        .collect()
}

#[tokio::test]
#[ignore = "requires live Neo4j with APOC; run with: cargo test --package threatgraph-graph --test integration -- --ignored"]
async fn test_groups_by_type_and_depth() {
    let Some(client) = connect_or_skip().await else {
        return;
    };
    let cp = unique_provider();
    cleanup(&client, &cp).await;

    seed_node(&client, &cp, "h-1", "host", 1, 2).await;
    seed_node(&client, &cp, "h-2", "host", 1, 3).await;
    seed_node(&client, &cp, "c-1", "container", 2, 7).await;

    let records = client
        .fetch_provider_aggregates(CloudProvider::Others)
        .await
        .unwrap();
    let records = seeded_records(records, &cp);
    assert_eq!(records.len(), 2);

    let hosts = records
        .iter()
        .find(|r| r.properties[queries::NODE_TYPE] == "host")
        .unwrap();
    assert_eq!(hosts.properties[queries::DEPTH], 1);
    assert_eq!(hosts.properties[queries::SUM_VULNERABILITIES], 5);

    let mut members: Vec<String> = hosts.properties[queries::MEMBER_IDS]
        .as_array()
        .unwrap()
        .iter()
        .map(|v| v.as_str().unwrap().to_string())
        .collect();
    members.sort();
    assert_eq!(members, vec!["h-1", "h-2"]);
    assert_eq!(hosts.properties[queries::MEMBER_VULNERABILITIES].as_array().unwrap().len(), 2);

    cleanup(&client, &cp).await;
}

#[tokio::test]
#[ignore = "requires live Neo4j with APOC"]
async fn test_group_edges_point_at_other_groups() {
    let Some(client) = connect_or_skip().await else {
        return;
    };
    let cp = unique_provider();
    cleanup(&client, &cp).await;

    seed_node(&client, &cp, "h-1", "host", 1, 0).await;
    seed_node(&client, &cp, "c-1", "container", 2, 1).await;
    connect_nodes(&client, &cp, "h-1", "c-1").await;

    let records = client
        .fetch_provider_aggregates(CloudProvider::Others)
        .await
        .unwrap();
    let records = seeded_records(records, &cp);

    let host = records
        .iter()
        .find(|r| r.properties[queries::NODE_TYPE] == "host")
        .unwrap();
    let container = records
        .iter()
        .find(|r| r.properties[queries::NODE_TYPE] == "container")
        .unwrap();
    assert_eq!(host.children, vec![container.id]);
    assert!(container.children.is_empty());

    cleanup(&client, &cp).await;
}

#[tokio::test]
#[ignore = "requires live Neo4j with APOC"]
async fn test_named_bucket_excludes_catch_all() {
    let Some(client) = connect_or_skip().await else {
        return;
    };
    let cp = unique_provider();
    cleanup(&client, &cp).await;

    seed_node(&client, &cp, "h-1", "host", 1, 0).await;

    let records = client
        .fetch_provider_aggregates(CloudProvider::Aws)
        .await
        .unwrap();
    assert!(seeded_records(records, &cp).is_empty());

    let count = client
        .query_one(
            neo4rs::query("MATCH (n:Node {cloud_provider: $cp}) RETURN count(n) AS cnt")
                .param("cp", cp.clone()),
        )
        .await
        .unwrap()
        .and_then(|row| row.get::<i64>("cnt").ok());
    assert_eq!(count, Some(1));

    cleanup(&client, &cp).await;
}
