//! Read path: similarity search and record resolution.

use super::{IndexStats, SemanticIndex};
use crate::otel::{background_span, record_background_metrics, BackgroundJobType};
use crate::types::{IndexError, Result, SearchResult, TrialMatch};
use std::time::Instant;
use tracing::Instrument;

impl SemanticIndex {
    /// Records most similar to `text`, best first.
    ///
    /// Ids whose record no longer exists in the primary store are skipped, as are
    /// ids whose lookup fails (logged at warn), so fewer than `k` matches may come
    /// back.
    ///
    /// # Arguments
    ///
    /// * `text` - Free-text query
    /// * `k` - Maximum number of matches
    ///
    /// # Errors
    ///
    /// Returns embedding errors, or initialization errors on first use
    pub async fn query(&self, text: &str, k: usize) -> Result<Vec<TrialMatch>> {
        let results = self.search(text, k).await?;

        let mut matches = Vec::with_capacity(results.len());
        for result in results {
            match self.records.get(&result.record_id).await {
                Ok(Some(record)) => matches.push(TrialMatch {
                    record,
                    similarity_score: result.similarity_score,
                }),
                Ok(None) => {
                    tracing::debug!(record_id = %result.record_id, "Indexed record no longer exists");
                }
                Err(e) => {
                    tracing::warn!(
                        record_id = %result.record_id,
                        error = %e,
                        "Record lookup failed, skipping match"
                    );
                }
            }
        }

        Ok(matches)
    }

    /// Nearest indexed ids for `text` without resolving records.
    ///
    /// Ascending by distance, ties broken by index position. At most
    /// `min(k, indexed vectors)` results; empty for `k == 0` or an empty index.
    ///
    /// # Errors
    ///
    /// Returns embedding errors, or initialization errors on first use
    pub async fn search(&self, text: &str, k: usize) -> Result<Vec<SearchResult>> {
        if k == 0 {
            return Ok(Vec::new());
        }
        self.ensure_initialized().await?;

        let span = background_span(BackgroundJobType::Query, self.embedder.model_name());
        async {
            let start = Instant::now();
            let query = self.embed_one(text).await?;

            let results = {
                let state = self.state.read().await;
                if state.index.is_empty() {
                    Vec::new()
                } else {
                    state.index.nearest(&query, k)?
                }
            };

            record_background_metrics(
                Some(results.len()),
                Some(start.elapsed().as_millis() as u64),
                "success",
            );
            Ok::<_, IndexError>(results)
        }
        .instrument(span)
        .await
    }

    /// Current index size, shape and persistence state.
    pub async fn stats(&self) -> IndexStats {
        let state = self.state.read().await;
        IndexStats {
            vectors: state.index.vectors().len(),
            ledger_entries: state.index.ledger().len(),
            dimension: state.index.dimension(),
            metric: state.index.metric(),
            model: self.embedder.model_name().to_string(),
            store_path: self.store.path().to_path_buf(),
            dirty: state.dirty,
            initialized: state.initialized,
        }
    }
}
