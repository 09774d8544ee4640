//! threatgraph-reporter: Attack path reconstruction for the threat graph.
//!
//! Pulls each provider's aggregate nodes from the store, builds an
//! in-memory graph, enumerates every path from the internet-adjacent roots
//! and assembles the per-provider records the dashboard consumes.

pub mod aggregation;
pub mod algorithms;
pub mod assemble;
pub mod config;
pub mod error;
pub mod fetch;
pub mod graph;
pub mod identity;
pub mod types;

pub use config::ReporterConfig;
pub use error::{IngestionError, ReporterError};
pub use fetch::AggregateSource;
pub use graph::{IngestOptions, ProviderGraph};
pub use types::GraphStats;

use std::collections::BTreeMap;
use std::future::Future;
use std::time::{Duration, Instant};

use threatgraph_core::{CloudProvider, ProviderThreatGraph, ThreatGraph};

/// The threat graph computation engine.
pub struct ThreatGraphReporter<S> {
    source: S,
    options: IngestOptions,
    provider_timeout: Option<Duration>,
}

impl<S: AggregateSource> ThreatGraphReporter<S> {
    /// Create an engine with strict ingestion and no deadline.
    pub fn new(source: S) -> Self {
        Self {
            source,
            options: IngestOptions::default(),
            provider_timeout: None,
        }
    }

    /// Apply reporter settings.
    pub fn with_config(mut self, config: ReporterConfig) -> Self {
        self.options = config.ingest_options();
        self.provider_timeout = config.provider_timeout();
        self
    }

    pub fn with_ingest_options(mut self, options: IngestOptions) -> Self {
        self.options = options;
        self
    }

    /// Fail a provider whose computation runs longer than `limit`.
    pub fn with_provider_timeout(mut self, limit: Duration) -> Self {
        self.provider_timeout = Some(limit);
        self
    }

    /// Build one provider's in-memory aggregate graph.
    pub async fn provider_graph(&self, provider: CloudProvider) -> error::Result<ProviderGraph> {
        self.bounded(provider, self.fetch(provider)).await
    }

    /// Every provider's aggregate graph, before path enumeration.
    pub async fn raw_threat_graph(&self) -> error::Result<BTreeMap<CloudProvider, ProviderGraph>> {
        let (aws, azure, gcp, others) = tokio::try_join!(
            self.provider_graph(CloudProvider::Aws),
            self.provider_graph(CloudProvider::Azure),
            self.provider_graph(CloudProvider::Gcp),
            self.provider_graph(CloudProvider::Others),
        )?;

        Ok(BTreeMap::from([
            (CloudProvider::Aws, aws),
            (CloudProvider::Azure, azure),
            (CloudProvider::Gcp, gcp),
            (CloudProvider::Others, others),
        ]))
    }

    /// Node, edge and root counts for every provider.
    pub async fn stats(&self) -> error::Result<Vec<GraphStats>> {
        let graphs = self.raw_threat_graph().await?;
        Ok(graphs.values().map(ProviderGraph::stats).collect())
    }

    /// Compute one provider's output record.
    pub async fn provider_threat_graph(
        &self,
        provider: CloudProvider,
    ) -> error::Result<ProviderThreatGraph> {
        self.bounded(provider, async {
            let start = Instant::now();
            let graph = self.fetch(provider).await?;
            let assembly = assemble::assemble(&graph);

            tracing::info!(
                provider = %provider,
                nodes = graph.node_count(),
                edges = graph.edge_count(),
                roots = graph.roots().len(),
                paths = assembly.path_count(),
                elapsed_ms = start.elapsed().as_millis() as u64,
                "Computed provider threat graph"
            );
            Ok(assembly.into_output())
        })
        .await
    }

    /// Compute the full threat graph.
    ///
    /// Providers run concurrently. Any provider failing fails the whole
    /// call; no partial graph is returned.
    pub async fn threat_graph(&self) -> error::Result<ThreatGraph> {
        let start = Instant::now();
        let (aws, azure, gcp, others) = tokio::try_join!(
            self.provider_threat_graph(CloudProvider::Aws),
            self.provider_threat_graph(CloudProvider::Azure),
            self.provider_threat_graph(CloudProvider::Gcp),
            self.provider_threat_graph(CloudProvider::Others),
        )?;

        let mut graph = ThreatGraph::empty();
        graph.insert(CloudProvider::Aws, aws);
        graph.insert(CloudProvider::Azure, azure);
        graph.insert(CloudProvider::Gcp, gcp);
        graph.insert(CloudProvider::Others, others);

        tracing::info!(
            resources = graph.resource_count(),
            elapsed_ms = start.elapsed().as_millis() as u64,
            "Computed threat graph"
        );
        Ok(graph)
    }

    async fn fetch(&self, provider: CloudProvider) -> error::Result<ProviderGraph> {
        fetch::fetch_provider_graph(&self.source, provider, &self.options)
            .await
            .map_err(|source| ReporterError::Ingestion { provider, source })
    }

    /// Apply the per-provider deadline, if any.
    async fn bounded<T>(
        &self,
        provider: CloudProvider,
        work: impl Future<Output = error::Result<T>>,
    ) -> error::Result<T> {
        let Some(limit) = self.provider_timeout else {
            return work.await;
        };

        match tokio::time::timeout(limit, work).await {
            Ok(result) => result,
            Err(_) => {
                let max_millis = limit.as_millis() as u64;
                tracing::warn!(provider = %provider, max_millis, "Provider computation timed out");
                Err(ReporterError::Timeout {
                    provider,
                    max_millis,
                })
            }
        }
    }
}
