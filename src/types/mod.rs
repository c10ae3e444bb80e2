//! Core types: errors, records and search results.

pub mod error;
pub mod record;

pub use error::{IndexError, Result};
pub use record::{RecordId, SearchResult, TrialMatch, TrialPhase, TrialRecord, TrialStatus};
