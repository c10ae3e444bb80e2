//! Semantic index service.
//!
//! [`SemanticIndex`] is the single resource tying the embedder, the primary
//! record store and the durable index store together. Construct it once, share it
//! through an `Arc`, and drive it through its lifecycle:
//!
//! 1. `initialize()` - load the persisted pair or rebuild it from the record store
//! 2. `on_record_created()` / `refresh_all()` - keep it in step with the store
//! 3. `query()` / `search()` - read-only, concurrent
//! 4. `flush()` - persist outstanding changes before shutdown
//!
//! # Concurrency
//!
//! The (vectors, ledger) pair sits behind one `RwLock`: queries share the read
//! lock, mutations replace or append under the write lock, so readers never see
//! the halves at different lengths. A writer gate serializes mutations end to end
//! (embed, swap, persist); embeddings are computed before the write lock is taken.
//!
//! # Example
//!
//! ```rust,ignore
//! let records = Arc::new(InMemoryRecordStore::with_records(trials));
//! let index = SemanticIndex::from_config(&IndexConfig::from_env()?, records)?;
//! index.initialize().await?;
//! let matches = index.query("obesity", 5).await?;
//! ```

mod query;
pub mod report;
mod sync;

pub use report::{IndexStats, PersistStatus, RebuildReason, SyncAction, SyncReport};

use crate::config::IndexConfig;
use crate::embeddings::{EmbeddingProvider, ProviderFactory};
use crate::index::{DistanceMetric, VectorIndex};
use crate::records::RecordStore;
use crate::storage::IndexStore;
use crate::types::{IndexError, Result};
use std::sync::Arc;
use tokio::sync::{Mutex, RwLock};

/// In-memory pair plus lifecycle flags.
///
/// The pair is shared with in-flight saves; mutations go through
/// `Arc::make_mut`, which copies only while a save still holds a snapshot.
#[derive(Debug)]
struct IndexState {
    index: Arc<VectorIndex>,
    initialized: bool,
    dirty: bool,
}

/// Semantic vector index over trial records.
pub struct SemanticIndex {
    embedder: Arc<dyn EmbeddingProvider>,
    records: Arc<dyn RecordStore>,
    store: IndexStore,
    metric: DistanceMetric,
    state: RwLock<IndexState>,
    /// Held for the whole of every mutation
    writer: Mutex<()>,
}

impl SemanticIndex {
    /// Create an uninitialized service.
    ///
    /// # Arguments
    ///
    /// * `embedder` - Provider used for both indexing and queries
    /// * `records` - Primary record store
    /// * `store` - Durable location of the index
    pub fn new(
        embedder: Arc<dyn EmbeddingProvider>,
        records: Arc<dyn RecordStore>,
        store: IndexStore,
    ) -> Self {
        let metric = DistanceMetric::default();
        let state = IndexState {
            index: Arc::new(VectorIndex::new(embedder.dimensions(), metric)),
            initialized: false,
            dirty: false,
        };

        Self {
            embedder,
            records,
            store,
            metric,
            state: RwLock::new(state),
            writer: Mutex::new(()),
        }
    }

    /// Use `metric` for indexes built by this service.
    pub fn with_metric(mut self, metric: DistanceMetric) -> Self {
        self.metric = metric;
        self.state.get_mut().index = Arc::new(VectorIndex::new(self.embedder.dimensions(), metric));
        self
    }

    /// Build a service from configuration.
    ///
    /// # Errors
    ///
    /// Returns `IndexError::Config` or `IndexError::ModelUnavailable` if the
    /// embedding provider cannot be created
    pub fn from_config(config: &IndexConfig, records: Arc<dyn RecordStore>) -> Result<Self> {
        config.validate()?;
        let embedder = ProviderFactory::create(&config.embedding)?;
        let store = IndexStore::new(config.resolved_store_path());
        Ok(Self::new(embedder, records, store).with_metric(config.metric))
    }

    pub fn store(&self) -> &IndexStore {
        &self.store
    }

    pub fn metric(&self) -> DistanceMetric {
        self.metric
    }

    pub fn model_name(&self) -> &str {
        self.embedder.model_name()
    }

    /// Whether the pair has been loaded or built.
    pub async fn is_initialized(&self) -> bool {
        self.state.read().await.initialized
    }

    fn store_label(&self) -> String {
        self.store.path().display().to_string()
    }

    /// Embed one text, checking the provider honored its dimension.
    async fn embed_one(&self, text: &str) -> Result<Vec<f32>> {
        let embedding = self.embedder.embed(text).await?;
        if embedding.len() != self.embedder.dimensions() {
            return Err(IndexError::DimensionMismatch {
                expected: self.embedder.dimensions(),
                actual: embedding.len(),
            });
        }
        Ok(embedding)
    }

    /// Embed a batch in input order.
    async fn embed_all(&self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
        if texts.is_empty() {
            return Ok(Vec::new());
        }

        let embeddings = self.embedder.embed_batch(texts).await?;
        if embeddings.len() != texts.len() {
            return Err(IndexError::EmbeddingError(format!(
                "Provider returned {} embeddings for {} texts",
                embeddings.len(),
                texts.len()
            )));
        }
        Ok(embeddings)
    }
}

impl std::fmt::Debug for SemanticIndex {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SemanticIndex")
            .field("model", &self.embedder.model_name())
            .field("store", &self.store.path())
            .field("metric", &self.metric)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::embeddings::HashingEmbedder;
    use crate::records::InMemoryRecordStore;
    use crate::types::TrialRecord;
    use tempfile::tempdir;

    #[tokio::test]
    async fn test_saves_share_the_pair_without_copying() {
        let dir = tempdir().unwrap();
        let records = Arc::new(InMemoryRecordStore::with_records(vec![TrialRecord::new(
            "Obesity Treatment Trial",
            "GLP-1",
            "Weight loss",
        )
        .with_id("a")]));
        let service = SemanticIndex::new(
            Arc::new(HashingEmbedder::new(32).unwrap()),
            records,
            IndexStore::new(dir.path()),
        );
        service.initialize().await.unwrap();

        let record = TrialRecord::new("Diabetes Study", "Type 2", "Glucose").with_id("b");
        service.on_record_created(&record).await.unwrap();

        // The save snapshot is released once the append returns
        assert_eq!(Arc::strong_count(&service.state.read().await.index), 1);

        // A held snapshot is not affected by later appends
        let snapshot = Arc::clone(&service.state.read().await.index);
        service.on_record_created(&record).await.unwrap();
        assert_eq!(snapshot.len(), 2);
        assert_eq!(service.state.read().await.index.len(), 3);
        assert_eq!(service.store().load().unwrap().index.len(), 3);
    }
}
