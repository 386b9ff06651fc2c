// src/config.rs
// =============================================================================
// Crawler configuration.
//
// Every field has its own default so a config file only needs the keys it
// wants to change. The CLI builds on top of this: file values first, then
// flags override them.
// =============================================================================

use std::path::Path;

use serde::{Deserialize, Serialize};
use thiserror::Error;
use tokio::sync::Semaphore;

/// Settings for one crawl.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CrawlerConfig {
    /// Depth budget for the seed page. 0 fetches nothing, 1 only the seed.
    #[serde(default = "default_max_depth")]
    pub max_depth: usize,

    /// Upper bound on simultaneous fetches. `None` means unbounded.
    #[serde(default)]
    pub max_concurrency: Option<usize>,

    #[serde(default = "default_user_agent")]
    pub user_agent: String,

    /// Per-request timeout. `None` leaves requests unbounded.
    #[serde(default)]
    pub request_timeout_secs: Option<u64>,
}

impl Default for CrawlerConfig {
    fn default() -> Self {
        Self {
            max_depth: default_max_depth(),
            max_concurrency: None,
            user_agent: default_user_agent(),
            request_timeout_secs: None,
        }
    }
}

fn default_max_depth() -> usize {
    2
}

fn default_user_agent() -> String {
    format!("link-crawler/{}", env!("CARGO_PKG_VERSION"))
}

/// Errors loading or validating a config.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config {path}: {source}")]
    Read {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse config {path}: {source}")]
    Parse {
        path: String,
        #[source]
        source: serde_json::Error,
    },

    #[error("maxConcurrency must be at least 1")]
    ZeroConcurrency,

    #[error("maxConcurrency {value} exceeds the limit of {max}")]
    ConcurrencyTooHigh { value: usize, max: usize },
}

impl CrawlerConfig {
    /// Loads a JSON config file. Missing keys take their defaults.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let raw = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.display().to_string(),
            source,
        })?;

        let config: Self = serde_json::from_str(&raw).map_err(|source| ConfigError::Parse {
            path: path.display().to_string(),
            source,
        })?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        match self.max_concurrency {
            Some(0) => Err(ConfigError::ZeroConcurrency),
            Some(value) if value > Semaphore::MAX_PERMITS => Err(ConfigError::ConcurrencyTooHigh {
                value,
                max: Semaphore::MAX_PERMITS,
            }),
            _ => Ok(()),
        }
    }
}
