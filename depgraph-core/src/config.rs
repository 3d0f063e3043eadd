//! Build configuration.
//!
//! Settings can come from JSON, from the environment, or be set in code:
//!
//! ```rust
//! use depgraph_core::BuildConfig;
//!
//! let config = BuildConfig::from_json(r#"{ "degree_of_parallelism": 4 }"#).unwrap();
//! assert_eq!(config.background_workers(), 3);
//! ```

use std::thread;

use serde::{Deserialize, Serialize};

use crate::error::{GraphError, Result};
use crate::work::DEFAULT_WORKER_NAME;

/// Environment variable overriding [`BuildConfig::degree_of_parallelism`].
pub const PARALLELISM_ENV: &str = "DEPGRAPH_DEGREE_OF_PARALLELISM";

/// Settings for a graph build.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct BuildConfig {
    /// Total number of threads taking part in discovery, counting the
    /// calling thread.
    pub degree_of_parallelism: usize,

    /// Worker threads are named `{worker_name_prefix}-{index}`.
    pub worker_name_prefix: String,
}

impl Default for BuildConfig {
    fn default() -> Self {
        Self {
            degree_of_parallelism: thread::available_parallelism().map_or(1, |n| n.get()),
            worker_name_prefix: DEFAULT_WORKER_NAME.to_string(),
        }
    }
}

impl BuildConfig {
    /// Parse a JSON object. Missing fields take their defaults.
    pub fn from_json(json: &str) -> Result<Self> {
        Ok(serde_json::from_str(json)?)
    }

    /// Apply overrides from the process environment.
    pub fn with_env_overrides(self) -> Result<Self> {
        self.with_overrides(|name| std::env::var(name).ok())
    }

    fn with_overrides(mut self, lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        if let Some(value) = lookup(PARALLELISM_ENV) {
            self.degree_of_parallelism = value.trim().parse().map_err(|_| {
                GraphError::Config(format!(
                    "{PARALLELISM_ENV} must be a non-negative integer, got {value:?}"
                ))
            })?;
        }
        Ok(self)
    }

    pub fn with_degree_of_parallelism(mut self, degree_of_parallelism: usize) -> Self {
        self.degree_of_parallelism = degree_of_parallelism;
        self
    }

    /// Number of background workers: one fewer than the degree of
    /// parallelism, since the calling thread counts as one.
    pub fn background_workers(&self) -> usize {
        self.degree_of_parallelism.saturating_sub(1)
    }
}
