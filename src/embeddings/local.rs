//! Local embedding models using embed_anything.
//!
//! Model weights are cached under `HF_HOME` (defaults to `~/.p8/models`).

use crate::embeddings::provider::EmbeddingProvider;
use crate::types::{IndexError, Result};
use async_trait::async_trait;
use embed_anything::embed_query;
use embed_anything::embeddings::embed::{Embedder, TextEmbedder};
use embed_anything::embeddings::local::bert::BertEmbedder;
use std::path::PathBuf;
use std::sync::Arc;

/// Local sentence-transformer provider.
pub struct LocalEmbedder {
    embedder: Arc<Embedder>,
    model_name: String,
    dimensions: usize,
}

impl LocalEmbedder {
    /// Get model cache directory (~/.p8/models/).
    fn model_cache_dir() -> Result<PathBuf> {
        let home = std::env::var("HOME")
            .map_err(|_| IndexError::ModelUnavailable("HOME not set".to_string()))?;
        let cache_dir = PathBuf::from(home).join(".p8").join("models");
        std::fs::create_dir_all(&cache_dir).map_err(|e| {
            IndexError::ModelUnavailable(format!("Failed to create cache dir: {}", e))
        })?;
        Ok(cache_dir)
    }

    /// Load a local model.
    ///
    /// # Arguments
    ///
    /// * `model_name` - Hugging Face model id (e.g., "sentence-transformers/all-MiniLM-L6-v2")
    ///
    /// # Errors
    ///
    /// Returns `IndexError::ModelUnavailable` if model loading fails
    pub fn new(model_name: &str) -> Result<Self> {
        // MiniLM family and the default are all 384 dims
        let dimensions = if model_name.contains("mpnet") { 768 } else { 384 };

        if std::env::var("HF_HOME").is_err() {
            if let Ok(cache_dir) = Self::model_cache_dir() {
                std::env::set_var("HF_HOME", cache_dir);
            }
        }

        let bert = BertEmbedder::new(model_name.to_string(), None, None)
            .map_err(|e| IndexError::ModelUnavailable(format!("Failed to load {}: {}", model_name, e)))?;

        tracing::info!(model = model_name, dimensions, "Loaded local embedding model");

        Ok(Self {
            embedder: Arc::new(Embedder::Text(TextEmbedder::Bert(Box::new(bert)))),
            model_name: model_name.to_string(),
            dimensions,
        })
    }
}

#[async_trait]
impl EmbeddingProvider for LocalEmbedder {
    async fn embed(&self, text: &str) -> Result<Vec<f32>> {
        let embeddings = self.embed_batch(&[text.to_string()]).await?;
        embeddings
            .into_iter()
            .next()
            .ok_or_else(|| IndexError::EmbeddingError("No embedding generated".to_string()))
    }

    async fn embed_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
        if texts.is_empty() {
            return Ok(Vec::new());
        }

        let text_refs: Vec<&str> = texts.iter().map(|s| s.as_str()).collect();
        let embeddings = embed_query(&text_refs, &self.embedder, None)
            .await
            .map_err(|e| IndexError::EmbeddingError(format!("Embedding failed: {}", e)))?;

        embeddings
            .into_iter()
            .map(|emb| {
                emb.embedding
                    .to_dense()
                    .map_err(|e| IndexError::EmbeddingError(format!("Dense conversion failed: {}", e)))
            })
            .collect()
    }

    fn dimensions(&self) -> usize {
        self.dimensions
    }

    fn model_name(&self) -> &str {
        &self.model_name
    }
}
