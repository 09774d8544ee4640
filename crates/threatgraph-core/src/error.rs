use thiserror::Error;

/// Top-level error type for the threat graph.
#[derive(Error, Debug)]
pub enum ThreatGraphError {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Unknown cloud provider: {0}")]
    InvalidProvider(String),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl From<config::ConfigError> for ThreatGraphError {
    fn from(err: config::ConfigError) -> Self {
        Self::Config(err.to_string())
    }
}

pub type Result<T> = std::result::Result<T, ThreatGraphError>;
