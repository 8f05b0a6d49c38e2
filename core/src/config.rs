// Typed runtime configuration.
//
// Discovery of the configuration file and CLI flag handling belong to the
// process bootstrap; this crate only defines the shape it consumes.

use serde::Deserialize;

use crate::{CluegetterError, Result};

/// Gateway instance configuration.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Numeric id of this gateway instance on the bus.
    pub instance: u64,
    /// Hostname reported in outgoing announcements.
    pub hostname: String,
    pub bayes: BayesConfig,
}

/// Settings for the distributed learning pipeline.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct BayesConfig {
    pub enabled: bool,
    /// Capacity of each per-operation local queue.
    pub queue_size: usize,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            instance: 0,
            hostname: "localhost".to_string(),
            bayes: BayesConfig::default(),
        }
    }
}

impl Default for BayesConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            queue_size: 64,
        }
    }
}

impl Config {
    /// Parses a configuration from TOML source.
    pub fn from_toml_str(source: &str) -> Result<Self> {
        toml::from_str(source).map_err(|e| CluegetterError::Config(e.to_string()))
    }
}
