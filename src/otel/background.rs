//! Background job instrumentation.
//!
//! For index builds, appends, saves, loads, embedding and queries.
//! Uses INTERNAL span kind since these are not client operations.

use tracing::field::Empty;
use tracing::{span, Level, Span};

/// Background job types.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BackgroundJobType {
    /// Full rebuild from the record store
    IndexBuild,
    /// Incremental append of one record
    IndexAppend,
    /// Index save to disk
    IndexSave,
    /// Index load from disk
    IndexLoad,
    /// Generate embeddings
    EmbeddingGeneration,
    /// Similarity query
    Query,
}

impl BackgroundJobType {
    /// Get job type as string.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::IndexBuild => "index.build",
            Self::IndexAppend => "index.append",
            Self::IndexSave => "index.save",
            Self::IndexLoad => "index.load",
            Self::EmbeddingGeneration => "embedding.generate",
            Self::Query => "index.query",
        }
    }
}

/// Create background job span.
///
/// `job.batch_size`, `job.duration_ms` and `job.status` are declared empty and
/// filled in by [`record_background_metrics`].
///
/// # Arguments
///
/// * `job_type` - Type of background job
/// * `target` - Job target (index path, model name, ...)
pub fn background_span(job_type: BackgroundJobType, target: &str) -> Span {
    span!(
        Level::INFO,
        "background.job",
        otel.name = %format!("{} {}", job_type.as_str(), target),
        otel.kind = "internal",
        job.type = job_type.as_str(),
        job.target = target,
        job.batch_size = Empty,
        job.duration_ms = Empty,
        job.status = Empty,
    )
}

/// Record background job metrics on the current span.
///
/// # Arguments
///
/// * `batch_size` - Number of items processed (optional)
/// * `duration_ms` - Processing duration in milliseconds (optional)
/// * `status` - Job status ("success", "failed", "partial")
pub fn record_background_metrics(batch_size: Option<usize>, duration_ms: Option<u64>, status: &str) {
    let span = Span::current();
    if let Some(size) = batch_size {
        span.record("job.batch_size", size);
    }
    if let Some(duration) = duration_ms {
        span.record("job.duration_ms", duration);
    }
    span.record("job.status", status);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_job_type_names() {
        assert_eq!(BackgroundJobType::IndexBuild.as_str(), "index.build");
        assert_eq!(BackgroundJobType::IndexAppend.as_str(), "index.append");
        assert_eq!(BackgroundJobType::EmbeddingGeneration.as_str(), "embedding.generate");
    }

    #[test]
    fn test_record_metrics_without_subscriber() {
        let span = background_span(BackgroundJobType::IndexSave, "trials");
        let _guard = span.enter();
        record_background_metrics(Some(2), Some(5), "success");
    }
}
