//! In-memory vector index: similarity index + identifier ledger.
//!
//! [`VectorIndex`] owns both halves and only exposes operations that keep their
//! lengths equal. Positions are assigned in insertion order and never reused.

pub mod flat;
pub mod ledger;

pub use flat::{DistanceMetric, Neighbor, SimilarityIndex};
pub use ledger::IdLedger;

use crate::types::{IndexError, RecordId, Result, SearchResult};

/// Divisor of the distance → similarity rescaling.
///
/// `similarity = 1 - distance / SIMILARITY_SCALE`. Uncalibrated: scores are not
/// probabilities and are not bounded to [0, 1] for large distances.
pub const SIMILARITY_SCALE: f32 = 10.0;

/// Convert a raw distance into a similarity score.
pub fn similarity_from_distance(distance: f32) -> f32 {
    1.0 - distance / SIMILARITY_SCALE
}

/// Paired similarity index and identifier ledger.
#[derive(Debug, Clone, PartialEq)]
pub struct VectorIndex {
    vectors: SimilarityIndex,
    ledger: IdLedger,
}

impl VectorIndex {
    /// Create empty pair bound to `dimension`.
    pub fn new(dimension: usize, metric: DistanceMetric) -> Self {
        Self {
            vectors: SimilarityIndex::with_metric(dimension, metric),
            ledger: IdLedger::new(),
        }
    }

    /// Assemble a pair from separately loaded halves.
    ///
    /// # Errors
    ///
    /// Returns `IndexError::StoreCorrupt` if the halves differ in length
    pub fn from_parts(vectors: SimilarityIndex, ledger: IdLedger) -> Result<Self> {
        if vectors.len() != ledger.len() {
            return Err(IndexError::corrupt(format!(
                "index holds {} vectors but ledger holds {} ids",
                vectors.len(),
                ledger.len()
            )));
        }
        Ok(Self { vectors, ledger })
    }

    /// Append embeddings and their record ids at the next free positions.
    ///
    /// Either both halves grow by `ids.len()` or neither changes.
    ///
    /// # Errors
    ///
    /// Returns `IndexError::DimensionMismatch` if any embedding has the wrong length,
    /// `IndexError::Internal` if `ids` and `embeddings` differ in count
    pub fn append(&mut self, ids: Vec<RecordId>, embeddings: &[Vec<f32>]) -> Result<()> {
        if ids.len() != embeddings.len() {
            return Err(IndexError::Internal(format!(
                "{} ids for {} embeddings",
                ids.len(),
                embeddings.len()
            )));
        }

        self.vectors.insert(embeddings)?;
        self.ledger.append(ids);
        Ok(())
    }

    /// Nearest records to `query`, ascending by distance (ties by position).
    ///
    /// # Errors
    ///
    /// Returns `IndexError::DimensionMismatch` if the query has the wrong length
    pub fn nearest(&self, query: &[f32], k: usize) -> Result<Vec<SearchResult>> {
        self.vectors
            .search(query, k)?
            .into_iter()
            .map(|neighbor| {
                let record_id = self.ledger.get(neighbor.position).cloned().ok_or_else(|| {
                    IndexError::Internal(format!(
                        "no ledger entry for position {}",
                        neighbor.position
                    ))
                })?;

                Ok(SearchResult {
                    record_id,
                    similarity_score: similarity_from_distance(neighbor.distance),
                    position: neighbor.position,
                    distance: neighbor.distance,
                })
            })
            .collect()
    }

    pub fn len(&self) -> usize {
        self.ledger.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ledger.is_empty()
    }

    pub fn dimension(&self) -> usize {
        self.vectors.dimension()
    }

    pub fn metric(&self) -> DistanceMetric {
        self.vectors.metric()
    }

    pub fn vectors(&self) -> &SimilarityIndex {
        &self.vectors
    }

    pub fn ledger(&self) -> &IdLedger {
        &self.ledger
    }
}
