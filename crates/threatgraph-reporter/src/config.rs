//! Configuration for the threat graph reporter.

use std::time::Duration;

use serde::Deserialize;

use crate::graph::IngestOptions;

/// Reporter settings.
///
/// Loaded from the `[reporter]` section of `threatgraph.toml` or
/// `THREATGRAPH__REPORTER__` environment variables.
#[derive(Debug, Clone, Deserialize)]
pub struct ReporterConfig {
    /// Reject count arrays that do not line up with the member ids
    /// (default: true). When false they render as zeros.
    #[serde(default = "default_true")]
    pub strict_member_arrays: bool,

    /// Per-provider deadline in seconds. Unset means no deadline.
    #[serde(default)]
    pub provider_timeout_secs: Option<u64>,

    /// Pretty-print JSON output.
    #[serde(default)]
    pub pretty: bool,
}

impl Default for ReporterConfig {
    fn default() -> Self {
        Self {
            strict_member_arrays: default_true(),
            provider_timeout_secs: None,
            pretty: false,
        }
    }
}

impl ReporterConfig {
    pub fn ingest_options(&self) -> IngestOptions {
        IngestOptions {
            strict_member_arrays: self.strict_member_arrays,
        }
    }

    pub fn provider_timeout(&self) -> Option<Duration> {
        self.provider_timeout_secs.map(Duration::from_secs)
    }
}

fn default_true() -> bool {
    true
}
