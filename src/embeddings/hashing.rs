//! Feature-hashing embedder.
//!
//! Tokens are lowercased runs of alphanumeric characters. Each token is hashed
//! with SHA-256; the first 8 bytes (big-endian) pick the bucket and the low bit of
//! byte 8 picks the sign. The summed vector is L2-normalized, so squared Euclidean
//! distances between embeddings fall in [0, 4].
//!
//! No model download, fully deterministic across platforms and releases.

use crate::embeddings::provider::EmbeddingProvider;
use crate::types::{IndexError, Result};
use async_trait::async_trait;
use rayon::prelude::*;
use sha2::{Digest, Sha256};

/// Default dimensionality (matches all-MiniLM-L6-v2).
pub const DEFAULT_DIMENSIONS: usize = 384;

/// Deterministic bag-of-words embedder using signed feature hashing.
#[derive(Debug, Clone)]
pub struct HashingEmbedder {
    dimensions: usize,
    model_name: String,
}

impl HashingEmbedder {
    /// Create new hashing embedder.
    ///
    /// # Errors
    ///
    /// Returns `IndexError::ModelUnavailable` if `dimensions` is zero
    pub fn new(dimensions: usize) -> Result<Self> {
        if dimensions == 0 {
            return Err(IndexError::ModelUnavailable(
                "hashing embedder needs at least one dimension".to_string(),
            ));
        }

        Ok(Self {
            dimensions,
            model_name: format!("hashing-{}", dimensions),
        })
    }

    /// Embed synchronously (CPU only).
    pub fn embed_sync(&self, text: &str) -> Vec<f32> {
        let mut vector = vec![0.0f32; self.dimensions];

        for token in tokenize(text) {
            let digest = Sha256::digest(token.as_bytes());
            let mut head = [0u8; 8];
            head.copy_from_slice(&digest[..8]);
            let bucket = (u64::from_be_bytes(head) % self.dimensions as u64) as usize;
            let sign = if digest[8] & 1 == 0 { 1.0 } else { -1.0 };
            vector[bucket] += sign;
        }

        let norm = vector.iter().map(|x| x * x).sum::<f32>().sqrt();
        if norm > 0.0 {
            for x in vector.iter_mut() {
                *x /= norm;
            }
        }

        vector
    }
}

fn tokenize(text: &str) -> impl Iterator<Item = String> + '_ {
    text.split(|c: char| !c.is_alphanumeric())
        .filter(|token| !token.is_empty())
        .map(str::to_lowercase)
}

#[async_trait]
impl EmbeddingProvider for HashingEmbedder {
    async fn embed(&self, text: &str) -> Result<Vec<f32>> {
        Ok(self.embed_sync(text))
    }

    async fn embed_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
        Ok(texts.par_iter().map(|text| self.embed_sync(text)).collect())
    }

    fn dimensions(&self) -> usize {
        self.dimensions
    }

    fn model_name(&self) -> &str {
        &self.model_name
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn squared_l2(a: &[f32], b: &[f32]) -> f32 {
        a.iter().zip(b).map(|(x, y)| (x - y) * (x - y)).sum()
    }

    #[test]
    fn test_zero_dimensions_rejected() {
        assert!(matches!(
            HashingEmbedder::new(0),
            Err(IndexError::ModelUnavailable(_))
        ));
    }

    #[test]
    fn test_deterministic_and_normalized() {
        let embedder = HashingEmbedder::new(DEFAULT_DIMENSIONS).unwrap();
        let a = embedder.embed_sync("Obesity Treatment Trial");
        let b = embedder.embed_sync("obesity   treatment, TRIAL!");

        assert_eq!(a.len(), DEFAULT_DIMENSIONS);
        assert_eq!(a, b);

        let norm: f32 = a.iter().map(|x| x * x).sum::<f32>().sqrt();
        assert!((norm - 1.0).abs() < 1e-5);
    }

    #[test]
    fn test_empty_text_is_zero_vector() {
        let embedder = HashingEmbedder::new(16).unwrap();
        assert!(embedder.embed_sync("  --  ").iter().all(|x| *x == 0.0));
    }

    #[test]
    fn test_shared_tokens_are_closer() {
        let embedder = HashingEmbedder::new(DEFAULT_DIMENSIONS).unwrap();
        let query = embedder.embed_sync("obesity");
        let obesity = embedder.embed_sync("Obesity Treatment Trial weight loss study");
        let diabetes = embedder.embed_sync("Diabetes Study glucose management");

        assert!(squared_l2(&query, &obesity) < squared_l2(&query, &diabetes));
    }

    #[tokio::test]
    async fn test_batch_matches_single() {
        let embedder = HashingEmbedder::new(32).unwrap();
        let texts = vec!["Rust is fast".to_string(), "Python is easy".to_string()];

        let batch = embedder.embed_batch(&texts).await.unwrap();
        assert_eq!(batch.len(), 2);
        assert_eq!(batch[0], embedder.embed(&texts[0]).await.unwrap());
        assert_eq!(batch[1], embedder.embed(&texts[1]).await.unwrap());
    }
}
