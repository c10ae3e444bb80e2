//! Embedding provider trait and factory.

use crate::embeddings::hashing::{HashingEmbedder, DEFAULT_DIMENSIONS};
use crate::types::{IndexError, Result};
use async_trait::async_trait;
use std::sync::Arc;

/// Default local sentence-transformer model.
pub const DEFAULT_LOCAL_MODEL: &str = "sentence-transformers/all-MiniLM-L6-v2";

/// Embedding provider trait.
///
/// Implementations are deterministic for a fixed model and always return vectors
/// of length [`EmbeddingProvider::dimensions`].
#[async_trait]
pub trait EmbeddingProvider: Send + Sync {
    /// Generate embedding for single text.
    ///
    /// # Errors
    ///
    /// Returns `IndexError::EmbeddingError` if generation fails
    async fn embed(&self, text: &str) -> Result<Vec<f32>>;

    /// Generate embeddings for batch of texts, in input order.
    ///
    /// # Errors
    ///
    /// Returns `IndexError::EmbeddingError` if generation fails
    async fn embed_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>>;

    /// Get embedding dimensionality.
    fn dimensions(&self) -> usize;

    /// Model identifier, persisted alongside the index.
    fn model_name(&self) -> &str;
}

/// Factory for creating embedding providers.
pub struct ProviderFactory;

impl ProviderFactory {
    /// Create provider from config string.
    ///
    /// # Arguments
    ///
    /// * `config` - Provider config: `"hashing"`, `"hashing:<dims>"`,
    ///   `"local:<model>"` or a bare model name (local)
    ///
    /// # Errors
    ///
    /// Returns `IndexError::Config` if the config is malformed and
    /// `IndexError::ModelUnavailable` if the model cannot be loaded
    pub fn create(config: &str) -> Result<Arc<dyn EmbeddingProvider>> {
        let config = config.trim();
        let (kind, arg) = match config.split_once(':') {
            Some((kind, arg)) => (kind, Some(arg)),
            None => (config, None),
        };

        match kind {
            "hashing" => {
                let dimensions = match arg {
                    Some(dims) => dims.parse::<usize>().map_err(|_| {
                        IndexError::Config(format!("Invalid hashing dimensions: {}", dims))
                    })?,
                    None => DEFAULT_DIMENSIONS,
                };
                Ok(Arc::new(HashingEmbedder::new(dimensions)?))
            }
            "local" => Self::local(arg.unwrap_or(DEFAULT_LOCAL_MODEL)),
            "" => Err(IndexError::Config("Empty embedding provider config".to_string())),
            _ => Self::local(config),
        }
    }

    #[cfg(feature = "local-models")]
    fn local(model_name: &str) -> Result<Arc<dyn EmbeddingProvider>> {
        Ok(Arc::new(crate::embeddings::local::LocalEmbedder::new(model_name)?))
    }

    #[cfg(not(feature = "local-models"))]
    fn local(model_name: &str) -> Result<Arc<dyn EmbeddingProvider>> {
        Err(IndexError::ModelUnavailable(format!(
            "{} requires the `local-models` feature",
            model_name
        )))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_create_hashing_provider() {
        let provider = ProviderFactory::create("hashing:64").unwrap();
        assert_eq!(provider.dimensions(), 64);
        assert_eq!(provider.model_name(), "hashing-64");

        let provider = ProviderFactory::create("hashing").unwrap();
        assert_eq!(provider.dimensions(), DEFAULT_DIMENSIONS);
    }

    #[test]
    fn test_create_rejects_bad_config() {
        assert!(matches!(
            ProviderFactory::create("hashing:abc"),
            Err(IndexError::Config(_))
        ));
        assert!(matches!(ProviderFactory::create(""), Err(IndexError::Config(_))));
    }

    #[cfg(not(feature = "local-models"))]
    #[test]
    fn test_local_model_unavailable_without_feature() {
        let result = ProviderFactory::create("local:sentence-transformers/all-MiniLM-L6-v2");
        assert!(matches!(result, Err(IndexError::ModelUnavailable(_))));
    }
}
