//! Exact (brute-force) similarity index.
//!
//! Vectors are stored contiguously in insertion order; a vector's position is its
//! key. Search scans every vector and keeps the k best in a bounded max-heap,
//! ordering by `(distance, position)` so equal distances resolve to the earlier
//! insertion.

use crate::types::{IndexError, Result};
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::collections::BinaryHeap;

/// Distance metric used by [`SimilarityIndex`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum DistanceMetric {
    /// Sum of squared componentwise differences
    #[default]
    SquaredEuclidean,
    /// `1 - cosine similarity` (zero vectors have distance 1)
    Cosine,
}

impl DistanceMetric {
    /// Distance between two equal-length vectors.
    pub fn distance(&self, a: &[f32], b: &[f32]) -> f32 {
        match self {
            Self::SquaredEuclidean => a
                .iter()
                .zip(b)
                .map(|(x, y)| {
                    let d = x - y;
                    d * d
                })
                .sum(),
            Self::Cosine => {
                let dot: f32 = a.iter().zip(b).map(|(x, y)| x * y).sum();
                let mag_a = a.iter().map(|x| x * x).sum::<f32>().sqrt();
                let mag_b = b.iter().map(|x| x * x).sum::<f32>().sqrt();
                if mag_a == 0.0 || mag_b == 0.0 {
                    1.0
                } else {
                    1.0 - dot / (mag_a * mag_b)
                }
            }
        }
    }

    /// Stable on-disk tag.
    pub fn to_tag(self) -> u8 {
        match self {
            Self::SquaredEuclidean => 0,
            Self::Cosine => 1,
        }
    }

    pub fn from_tag(tag: u8) -> Option<Self> {
        match tag {
            0 => Some(Self::SquaredEuclidean),
            1 => Some(Self::Cosine),
            _ => None,
        }
    }
}

/// A `(position, distance)` search hit.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Neighbor {
    pub position: usize,
    pub distance: f32,
}

impl Eq for Neighbor {}

impl Ord for Neighbor {
    fn cmp(&self, other: &Self) -> Ordering {
        self.distance
            .total_cmp(&other.distance)
            .then(self.position.cmp(&other.position))
    }
}

impl PartialOrd for Neighbor {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

/// Append-only exact nearest-neighbor index over fixed-dimension vectors.
#[derive(Debug, Clone, PartialEq)]
pub struct SimilarityIndex {
    dimension: usize,
    metric: DistanceMetric,
    /// Row-major `len * dimension` floats
    data: Vec<f32>,
}

impl SimilarityIndex {
    /// Create an empty squared-Euclidean index bound to `dimension`.
    pub fn new(dimension: usize) -> Self {
        Self::with_metric(dimension, DistanceMetric::default())
    }

    pub fn with_metric(dimension: usize, metric: DistanceMetric) -> Self {
        Self {
            dimension,
            metric,
            data: Vec::new(),
        }
    }

    /// Rebuild an index from raw row-major data.
    ///
    /// # Errors
    ///
    /// Returns `IndexError::StoreCorrupt` if `data` is not a whole number of rows
    pub fn from_raw(dimension: usize, metric: DistanceMetric, data: Vec<f32>) -> Result<Self> {
        if dimension == 0 && !data.is_empty() {
            return Err(IndexError::corrupt("vector data present for zero dimension"));
        }
        if dimension > 0 && data.len() % dimension != 0 {
            return Err(IndexError::corrupt(format!(
                "{} floats is not a multiple of dimension {}",
                data.len(),
                dimension
            )));
        }
        Ok(Self {
            dimension,
            metric,
            data,
        })
    }

    /// Append vectors in order.
    ///
    /// All vectors are checked before any is stored, so a failed insert leaves the
    /// index unchanged.
    ///
    /// # Errors
    ///
    /// Returns `IndexError::DimensionMismatch` for the first vector whose length
    /// differs from the index dimension
    pub fn insert(&mut self, vectors: &[Vec<f32>]) -> Result<()> {
        if let Some(bad) = vectors.iter().find(|v| v.len() != self.dimension) {
            return Err(IndexError::DimensionMismatch {
                expected: self.dimension,
                actual: bad.len(),
            });
        }

        self.data.reserve(vectors.len() * self.dimension);
        for vector in vectors {
            self.data.extend_from_slice(vector);
        }
        Ok(())
    }

    /// Find the `min(k, len)` nearest vectors, ascending by distance.
    ///
    /// # Errors
    ///
    /// Returns `IndexError::DimensionMismatch` if the query length differs from
    /// the index dimension
    pub fn search(&self, query: &[f32], k: usize) -> Result<Vec<Neighbor>> {
        if query.len() != self.dimension {
            return Err(IndexError::DimensionMismatch {
                expected: self.dimension,
                actual: query.len(),
            });
        }

        let k = k.min(self.len());
        if k == 0 {
            return Ok(Vec::new());
        }

        let mut heap = BinaryHeap::with_capacity(k + 1);
        for (position, vector) in self.iter().enumerate() {
            let candidate = Neighbor {
                position,
                distance: self.metric.distance(query, vector),
            };

            if heap.len() < k {
                heap.push(candidate);
            } else if let Some(worst) = heap.peek() {
                if candidate < *worst {
                    heap.pop();
                    heap.push(candidate);
                }
            }
        }

        Ok(heap.into_sorted_vec())
    }

    /// Number of stored vectors.
    pub fn len(&self) -> usize {
        if self.dimension == 0 {
            0
        } else {
            self.data.len() / self.dimension
        }
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    pub fn dimension(&self) -> usize {
        self.dimension
    }

    pub fn metric(&self) -> DistanceMetric {
        self.metric
    }

    /// Vector at `position`.
    pub fn get(&self, position: usize) -> Option<&[f32]> {
        if position >= self.len() {
            return None;
        }
        let start = position * self.dimension;
        Some(&self.data[start..start + self.dimension])
    }

    /// Iterate vectors in position order.
    pub fn iter(&self) -> impl Iterator<Item = &[f32]> + '_ {
        self.data.chunks_exact(self.dimension.max(1))
    }

    /// Raw row-major data (for persistence).
    pub fn as_slice(&self) -> &[f32] {
        &self.data
    }
}
