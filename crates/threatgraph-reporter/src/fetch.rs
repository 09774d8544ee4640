//! Aggregate record fetching.
//!
//! The engine only needs the grouped records for one provider at a time, so
//! the store sits behind [`AggregateSource`]. [`GraphClient`] is the real
//! implementation; tests substitute in-memory sources.

use std::future::Future;

use threatgraph_core::CloudProvider;
use threatgraph_graph::{AggregateRecord, GraphClient, GraphError};

use crate::error::IngestionError;
use crate::graph::{IngestOptions, ProviderGraph};

/// Anything that can hand back a provider's aggregate records.
pub trait AggregateSource {
    fn fetch_provider_aggregates(
        &self,
        provider: CloudProvider,
    ) -> impl Future<Output = Result<Vec<AggregateRecord>, GraphError>> + Send;
}

impl AggregateSource for GraphClient {
    async fn fetch_provider_aggregates(
        &self,
        provider: CloudProvider,
    ) -> Result<Vec<AggregateRecord>, GraphError> {
        GraphClient::fetch_provider_aggregates(self, provider).await
    }
}

/// Fetch a provider's records and build its in-memory graph.
///
/// Does not retry; a failed store call fails the provider.
pub async fn fetch_provider_graph<S: AggregateSource>(
    source: &S,
    provider: CloudProvider,
    options: &IngestOptions,
) -> Result<ProviderGraph, IngestionError> {
    let records = source.fetch_provider_aggregates(provider).await?;
    ProviderGraph::from_records(provider, records, options)
}
