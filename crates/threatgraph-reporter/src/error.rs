//! Error types for the threatgraph-reporter crate.

use thiserror::Error;

use threatgraph_core::{AggregateId, CloudProvider};

/// Failure to turn the store's aggregate records into a provider graph.
#[derive(Error, Debug)]
pub enum IngestionError {
    #[error("Graph error: {0}")]
    Graph(#[from] threatgraph_graph::GraphError),

    #[error("Malformed aggregate record {node_id}: {reason}")]
    MalformedRecord { node_id: AggregateId, reason: String },

    #[error("Aggregate record {node_id}: {field} has {actual} entries, expected 0 or {expected}")]
    MemberArrayLength {
        node_id: AggregateId,
        field: &'static str,
        expected: usize,
        actual: usize,
    },
}

impl IngestionError {
    pub(crate) fn malformed(node_id: AggregateId, reason: impl Into<String>) -> Self {
        Self::MalformedRecord {
            node_id,
            reason: reason.into(),
        }
    }
}

#[derive(Error, Debug)]
pub enum ReporterError {
    #[error("Ingestion failed for provider {provider}: {source}")]
    Ingestion {
        provider: CloudProvider,
        #[source]
        source: IngestionError,
    },

    #[error("Computation timeout for provider {provider}: exceeded {max_millis}ms limit")]
    Timeout { provider: CloudProvider, max_millis: u64 },
}

impl ReporterError {
    /// Provider whose computation failed.
    pub fn provider(&self) -> CloudProvider {
        match self {
            Self::Ingestion { provider, .. } | Self::Timeout { provider, .. } => *provider,
        }
    }
}

pub type Result<T> = std::result::Result<T, ReporterError>;
