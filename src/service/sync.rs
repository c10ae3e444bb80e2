//! Keeping the index in step with the record store.

use super::{PersistStatus, RebuildReason, SemanticIndex, SyncAction, SyncReport};
use crate::index::VectorIndex;
use crate::otel::{background_span, record_background_metrics, BackgroundJobType};
use crate::storage::{Manifest, StoredIndex};
use crate::types::{IndexError, Result, TrialRecord};
use std::sync::Arc;
use std::time::Instant;
use tracing::Instrument;

impl SemanticIndex {
    /// Load the persisted index, rebuilding from the record store when needed.
    ///
    /// Rebuilds when nothing is persisted, when the persisted pair is corrupt
    /// (logged at warn), or when it was produced by a different embedder or metric.
    /// Calling it on an initialized service does nothing.
    ///
    /// # Errors
    ///
    /// - `IndexError::RecordStore` if records cannot be listed for a rebuild
    /// - `IndexError::EmbeddingError` / `IndexError::DimensionMismatch` from embedding
    ///
    /// Persistence failures do not fail the call; see [`SyncReport::persist`].
    pub async fn initialize(&self) -> Result<SyncReport> {
        let _gate = self.writer.lock().await;
        self.initialize_locked().await
    }

    /// Index a record that was just created in the primary store.
    ///
    /// The record is embedded, appended at the next position and the pair is
    /// persisted. Appending the same record twice indexes it twice.
    ///
    /// # Errors
    ///
    /// Returns embedding errors; the pair is unchanged when it fails
    pub async fn on_record_created(&self, record: &TrialRecord) -> Result<SyncReport> {
        let _gate = self.writer.lock().await;

        if !self.state.read().await.initialized {
            let report = self.initialize_locked().await?;
            // A rebuild that already picked the record up must not index it again
            if matches!(report.action, SyncAction::Rebuilt { .. })
                && self.state.read().await.index.ledger().occurrences(&record.id) > 0
            {
                return Ok(report);
            }
        }

        let span = background_span(BackgroundJobType::IndexAppend, record.id.as_str());
        async {
            let start = Instant::now();
            let embedding = self.embed_one(&record.subject_text()).await?;

            let (position, vectors) = {
                let mut state = self.state.write().await;
                let position = state.index.len();
                Arc::make_mut(&mut state.index)
                    .append(vec![record.id.clone()], std::slice::from_ref(&embedding))?;
                state.dirty = true;
                (position, state.index.len())
            };

            tracing::debug!(record_id = %record.id, position, "Appended record to index");

            let persist = self.persist_locked().await;
            record_background_metrics(
                Some(1),
                Some(start.elapsed().as_millis() as u64),
                status_label(&persist),
            );

            Ok::<_, IndexError>(SyncReport {
                action: SyncAction::Appended { position },
                vectors,
                persist,
            })
        }
        .instrument(span)
        .await
    }

    /// Discard the current pair and rebuild it from every record.
    ///
    /// # Errors
    ///
    /// Same as [`SemanticIndex::initialize`]; the previous pair stays in place on error
    pub async fn refresh_all(&self) -> Result<SyncReport> {
        let _gate = self.writer.lock().await;
        self.rebuild_locked(RebuildReason::Manual).await
    }

    /// Persist outstanding in-memory changes.
    ///
    /// # Errors
    ///
    /// Returns `IndexError::PersistenceWriteFailure` if the write fails; the
    /// service stays dirty and can be flushed again
    pub async fn flush(&self) -> Result<PersistStatus> {
        let _gate = self.writer.lock().await;

        {
            let state = self.state.read().await;
            if !state.initialized || !state.dirty {
                return Ok(PersistStatus::Unchanged);
            }
        }

        match self.persist_locked().await {
            PersistStatus::Failed { error } => Err(IndexError::PersistenceWriteFailure(error)),
            status => Ok(status),
        }
    }

    /// Initialize if no one has yet; used by the query path.
    pub(super) async fn ensure_initialized(&self) -> Result<()> {
        if self.state.read().await.initialized {
            return Ok(());
        }

        let _gate = self.writer.lock().await;
        if !self.state.read().await.initialized {
            self.initialize_locked().await?;
        }
        Ok(())
    }

    async fn initialize_locked(&self) -> Result<SyncReport> {
        {
            let state = self.state.read().await;
            if state.initialized {
                return Ok(SyncReport {
                    action: SyncAction::Unchanged,
                    vectors: state.index.len(),
                    persist: PersistStatus::Unchanged,
                });
            }
        }

        match self.load_stored().await {
            Ok(stored) => match self.incompatibility(&stored.manifest) {
                Some(detail) => {
                    tracing::info!(
                        path = %self.store.path().display(),
                        detail = %detail,
                        "Persisted index does not match the active embedder, rebuilding"
                    );
                    self.rebuild_locked(RebuildReason::Incompatible { detail }).await
                }
                None => {
                    let vectors = stored.index.len();
                    let mut state = self.state.write().await;
                    state.index = Arc::new(stored.index);
                    state.initialized = true;
                    state.dirty = false;

                    tracing::info!(
                        path = %self.store.path().display(),
                        generation = stored.manifest.generation,
                        vectors,
                        "Loaded persisted index"
                    );

                    Ok(SyncReport {
                        action: SyncAction::Loaded,
                        vectors,
                        persist: PersistStatus::Unchanged,
                    })
                }
            },
            Err(IndexError::StoreNotFound(path)) => {
                tracing::info!(path = %path.display(), "No persisted index, building from records");
                self.rebuild_locked(RebuildReason::StoreNotFound).await
            }
            Err(IndexError::StoreCorrupt(detail)) => {
                tracing::warn!(
                    path = %self.store.path().display(),
                    error = %detail,
                    "Persisted index is corrupt, rebuilding from records"
                );
                self.rebuild_locked(RebuildReason::StoreCorrupt { detail }).await
            }
            Err(e) => Err(e),
        }
    }

    /// Re-embed every record into a fresh pair, swap it in and persist.
    async fn rebuild_locked(&self, reason: RebuildReason) -> Result<SyncReport> {
        let span = background_span(BackgroundJobType::IndexBuild, &self.store_label());
        async {
            let start = Instant::now();
            let records = self.records.list_all().await?;

            let texts: Vec<String> = records.iter().map(TrialRecord::subject_text).collect();
            let embeddings = self
                .embed_all(&texts)
                .instrument(background_span(
                    BackgroundJobType::EmbeddingGeneration,
                    self.embedder.model_name(),
                ))
                .await?;

            let mut index = VectorIndex::new(self.embedder.dimensions(), self.metric);
            index.append(records.into_iter().map(|r| r.id).collect(), &embeddings)?;
            let vectors = index.len();

            {
                let mut state = self.state.write().await;
                state.index = Arc::new(index);
                state.initialized = true;
                state.dirty = true;
            }

            tracing::info!(vectors, reason = ?reason, "Rebuilt index from records");

            let persist = self.persist_locked().await;
            record_background_metrics(
                Some(vectors),
                Some(start.elapsed().as_millis() as u64),
                status_label(&persist),
            );

            Ok::<_, IndexError>(SyncReport {
                action: SyncAction::Rebuilt { reason },
                vectors,
                persist,
            })
        }
        .instrument(span)
        .await
    }

    /// Write the current pair as a new generation.
    ///
    /// Never fails the caller: a failed write is logged, leaves the service dirty
    /// and is reported as [`PersistStatus::Failed`].
    async fn persist_locked(&self) -> PersistStatus {
        let snapshot = Arc::clone(&self.state.read().await.index);
        let count = snapshot.len();
        let store = self.store.clone();
        let model = self.embedder.model_name().to_string();

        let span = background_span(BackgroundJobType::IndexSave, &self.store_label());
        let result = async {
            let start = Instant::now();
            let result = tokio::task::spawn_blocking(move || store.save(&snapshot, &model))
                .await
                .map_err(|e| IndexError::persist(format!("Save task failed: {}", e)))
                .and_then(|saved| saved);

            record_background_metrics(
                Some(count),
                Some(start.elapsed().as_millis() as u64),
                if result.is_ok() { "success" } else { "failed" },
            );
            result
        }
        .instrument(span)
        .await;

        match result {
            Ok(manifest) => {
                self.state.write().await.dirty = false;
                tracing::debug!(generation = manifest.generation, count, "Persisted index");
                PersistStatus::Saved {
                    generation: manifest.generation,
                }
            }
            Err(e) => {
                self.state.write().await.dirty = true;
                tracing::warn!(
                    path = %self.store.path().display(),
                    error = %e,
                    "Failed to persist index, keeping in-memory state"
                );
                PersistStatus::Failed {
                    error: e.to_string(),
                }
            }
        }
    }

    async fn load_stored(&self) -> Result<StoredIndex> {
        let store = self.store.clone();
        let span = background_span(BackgroundJobType::IndexLoad, &self.store_label());
        async {
            let start = Instant::now();
            let result = tokio::task::spawn_blocking(move || store.load())
                .await
                .map_err(|e| IndexError::Internal(format!("Load task failed: {}", e)))
                .and_then(|loaded| loaded);

            let status = match &result {
                Ok(_) => "success",
                Err(IndexError::StoreNotFound(_)) => "missing",
                Err(_) => "failed",
            };
            record_background_metrics(
                result.as_ref().ok().map(|stored| stored.index.len()),
                Some(start.elapsed().as_millis() as u64),
                status,
            );
            result
        }
        .instrument(span)
        .await
    }

    /// Reason a persisted manifest cannot be reused with the active embedder.
    fn incompatibility(&self, manifest: &Manifest) -> Option<String> {
        if manifest.model != self.embedder.model_name() {
            return Some(format!(
                "model {} persisted, {} active",
                manifest.model,
                self.embedder.model_name()
            ));
        }
        if manifest.dimension != self.embedder.dimensions() {
            return Some(format!(
                "dimension {} persisted, {} active",
                manifest.dimension,
                self.embedder.dimensions()
            ));
        }
        if manifest.metric != self.metric {
            return Some(format!(
                "metric {:?} persisted, {:?} active",
                manifest.metric, self.metric
            ));
        }
        None
    }
}

fn status_label(persist: &PersistStatus) -> &'static str {
    if persist.is_failed() {
        "partial"
    } else {
        "success"
    }
}
