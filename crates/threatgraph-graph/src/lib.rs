//! threatgraph-graph: Neo4j client for the threat graph.
//!
//! Owns the connection to the backing store and the aggregation query that
//! collapses the full topology into depth- and type-bucketed aggregate
//! nodes. Everything downstream works on the returned records in memory.

pub mod client;
pub mod queries;

pub use client::{GraphClient, GraphConfig, GraphError};
pub use queries::AggregateRecord;
