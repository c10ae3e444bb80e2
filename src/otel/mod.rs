//! Tracing instrumentation for index jobs.
//!
//! **Span naming**: `{job.type} {target}`
//! - Example: `index.build trials`, `index.save trials`
//!
//! # Example
//!
//! ```rust,ignore
//! use percolate_trials::otel::{background_span, BackgroundJobType};
//!
//! let span = background_span(BackgroundJobType::IndexBuild, "trials");
//! let _guard = span.enter();
//! ```

pub mod background;

pub use background::{background_span, record_background_metrics, BackgroundJobType};
