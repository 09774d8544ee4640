//! Configuration management for threat graph services.
//!
//! Configuration is loaded from (in priority order):
//! 1. Environment variables (`<PREFIX>__SECTION__KEY`)
//! 2. Config file (`<file_prefix>.toml`, `.yaml` or `.json`, optional)
//! 3. Defaults supplied by each section's `Default` impl

use serde::de::DeserializeOwned;

use crate::error::Result;

/// Environment prefix shared by every threat graph binary.
pub const ENV_PREFIX: &str = "THREATGRAPH";

/// Build the layered configuration: optional file, then environment.
pub fn load_layered(file_prefix: &str, env_prefix: &str) -> Result<config::Config> {
    let cfg = config::Config::builder()
        .add_source(config::File::with_name(file_prefix).required(false))
        .add_source(
            config::Environment::with_prefix(env_prefix)
                .prefix_separator("__")
                .separator("__")
                .try_parsing(true),
        )
        .build()?;
    Ok(cfg)
}

/// Deserialize a named section, falling back to its defaults when absent.
///
/// A section that is present but malformed is an error rather than a
/// silent fallback.
pub fn section_or_default<T>(cfg: &config::Config, section: &str) -> Result<T>
where
    T: DeserializeOwned + Default,
{
    match cfg.get::<T>(section) {
        Ok(value) => Ok(value),
        Err(config::ConfigError::NotFound(_)) => {
            tracing::debug!(section, "Config section absent, using defaults");
            Ok(T::default())
        }
        Err(e) => Err(e.into()),
    }
}
