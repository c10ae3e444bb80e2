//! Index configuration.
//!
//! Read from a JSON file and/or environment variables:
//! - `P8_TRIALS_INDEX`: index directory (default `~/.p8/trials/index`)
//! - `P8_DEFAULT_EMBEDDING`: embedding provider (default `hashing:384`)
//! - `P8_TRIALS_METRIC`: `squared_euclidean` or `cosine`
//! - `P8_TRIALS_TOP_K`: default number of search results (default 5)
//! - `P8_TRIALS_RECORDS`: JSONL record file used by the CLI

use crate::index::DistanceMetric;
use crate::types::error::{IndexError, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

pub const ENV_INDEX_PATH: &str = "P8_TRIALS_INDEX";
pub const ENV_EMBEDDING: &str = "P8_DEFAULT_EMBEDDING";
pub const ENV_METRIC: &str = "P8_TRIALS_METRIC";
pub const ENV_TOP_K: &str = "P8_TRIALS_TOP_K";
pub const ENV_RECORDS_PATH: &str = "P8_TRIALS_RECORDS";

/// Semantic index configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct IndexConfig {
    /// Directory holding the persisted index
    pub store_path: PathBuf,

    /// Embedding provider, e.g. `hashing:384` (see `ProviderFactory::create`)
    pub embedding: String,

    /// Distance metric for new indexes
    pub metric: DistanceMetric,

    /// Results returned when the caller gives no `k`
    pub default_top_k: usize,

    /// JSONL primary store (CLI only)
    pub records_path: Option<PathBuf>,
}

impl Default for IndexConfig {
    fn default() -> Self {
        Self {
            store_path: PathBuf::from("~/.p8/trials/index"),
            embedding: "hashing:384".to_string(),
            metric: DistanceMetric::SquaredEuclidean,
            default_top_k: 5,
            records_path: None,
        }
    }
}

impl IndexConfig {
    /// Load configuration from a JSON file; missing keys take defaults.
    ///
    /// # Errors
    ///
    /// Returns `IndexError::Config` if the file is unreadable or invalid
    pub fn load(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path).map_err(|e| {
            IndexError::Config(format!("Cannot read {}: {}", path.display(), e))
        })?;
        let config: Self = serde_json::from_str(&content)
            .map_err(|e| IndexError::Config(format!("Invalid config: {}", e)))?;
        config.validate()?;
        Ok(config)
    }

    /// Defaults overlaid with environment variables.
    pub fn from_env() -> Result<Self> {
        Self::default().with_env_overrides()
    }

    /// Overlay environment variables on this config.
    pub fn with_env_overrides(self) -> Result<Self> {
        self.apply_overrides(|key| std::env::var(key).ok())
    }

    fn apply_overrides<F>(mut self, lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(path) = lookup(ENV_INDEX_PATH) {
            self.store_path = PathBuf::from(path);
        }
        if let Some(embedding) = lookup(ENV_EMBEDDING) {
            self.embedding = embedding;
        }
        if let Some(metric) = lookup(ENV_METRIC) {
            self.metric = parse_metric(&metric)?;
        }
        if let Some(top_k) = lookup(ENV_TOP_K) {
            self.default_top_k = top_k.parse().map_err(|_| {
                IndexError::Config(format!(
                    "{} must be a positive integer, got {}",
                    ENV_TOP_K, top_k
                ))
            })?;
        }
        if let Some(records) = lookup(ENV_RECORDS_PATH) {
            self.records_path = Some(PathBuf::from(records));
        }
        self.validate()?;
        Ok(self)
    }

    /// Check value ranges.
    pub fn validate(&self) -> Result<()> {
        if self.default_top_k == 0 {
            return Err(IndexError::Config(
                "default_top_k must be at least 1".to_string(),
            ));
        }
        if self.embedding.trim().is_empty() {
            return Err(IndexError::Config("embedding must not be empty".to_string()));
        }
        Ok(())
    }

    /// Index directory with `~` expanded.
    pub fn resolved_store_path(&self) -> PathBuf {
        expand_path(&self.store_path)
    }

    /// Record file with `~` expanded.
    pub fn resolved_records_path(&self) -> Option<PathBuf> {
        self.records_path.as_deref().map(expand_path)
    }
}

/// Parse a metric name as accepted on the command line and in env vars.
pub fn parse_metric(value: &str) -> Result<DistanceMetric> {
    match value.trim().to_ascii_lowercase().as_str() {
        "squared_euclidean" | "l2" | "euclidean" => Ok(DistanceMetric::SquaredEuclidean),
        "cosine" => Ok(DistanceMetric::Cosine),
        other => Err(IndexError::Config(format!("Unknown metric: {}", other))),
    }
}

fn expand_path(path: &Path) -> PathBuf {
    match path.to_str() {
        Some(raw) => PathBuf::from(shellexpand::tilde(raw).into_owned()),
        None => path.to_path_buf(),
    }
}
