//! Configuration for collection indexing.

use serde::{Deserialize, Serialize};
use std::path::Path;

use crate::error::{CoordError, Result};
use crate::sparse::DuplicatePolicy;

/// Configuration for building a collection index.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct IndexConfig {
    /// Which record wins when two land on the same cell.
    pub duplicate_policy: DuplicatePolicy,

    /// Store orthogonal time as separate runtime and offset axes.
    pub prefer_orthogonal: bool,

    /// Variables whose final density is below this are logged as a poor fit.
    pub min_density: f32,

    /// Scan partitions on the rayon thread pool.
    pub parallel_scan: bool,
}

impl Default for IndexConfig {
    fn default() -> Self {
        Self {
            duplicate_policy: DuplicatePolicy::First,
            prefer_orthogonal: true,
            min_density: 0.0,
            parallel_scan: true,
        }
    }
}

impl IndexConfig {
    /// Load configuration from environment variables.
    pub fn from_env() -> Self {
        let mut config = Self::default();

        if let Ok(val) = std::env::var("COORD_DUPLICATE_POLICY") {
            if let Ok(policy) = val.parse() {
                config.duplicate_policy = policy;
            }
        }

        if let Ok(val) = std::env::var("COORD_PREFER_ORTHOGONAL") {
            config.prefer_orthogonal = parse_flag(&val);
        }

        if let Ok(val) = std::env::var("COORD_MIN_DENSITY") {
            if let Ok(density) = val.parse() {
                config.min_density = density;
            }
        }

        if let Ok(val) = std::env::var("COORD_PARALLEL_SCAN") {
            config.parallel_scan = parse_flag(&val);
        }

        config
    }

    /// Parse a YAML document; missing keys take their defaults.
    pub fn from_yaml_str(yaml: &str) -> Result<Self> {
        let config: Self = serde_yaml::from_str(yaml)?;
        config.validate().map_err(CoordError::InvalidConfig)?;
        Ok(config)
    }

    pub fn from_yaml_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path).map_err(|e| {
            CoordError::invalid_config(format!("Failed to read {}: {}", path.display(), e))
        })?;
        Self::from_yaml_str(&content)
    }

    /// Validate the configuration.
    pub fn validate(&self) -> std::result::Result<(), String> {
        if !(0.0..=1.0).contains(&self.min_density) {
            return Err(format!(
                "min_density must be within [0, 1], got {}",
                self.min_density
            ));
        }
        Ok(())
    }
}

fn parse_flag(val: &str) -> bool {
    val.to_lowercase() == "true" || val == "1"
}
