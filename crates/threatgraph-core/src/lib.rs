//! threatgraph-core: Shared types, configuration, and error handling for the threat graph.
//!
//! This crate provides the foundational types used across all threat graph components:
//! - The cloud provider partition the graph is split into
//! - Aggregate node identifiers and node types
//! - The output schema consumed by the dashboard API layer
//! - Layered configuration loading
//! - Common error types

pub mod config;
pub mod error;
pub mod types;

pub use error::ThreatGraphError;
pub use types::{
    AggregateId, CloudProvider, NodeType, ProviderThreatGraph, ResourceDetail, ThreatGraph,
    ThreatPath, ThreatResource, INTERNET_SENTINEL,
};
