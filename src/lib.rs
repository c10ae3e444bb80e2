//! Percolate Trials - semantic index over clinical trial records
//!
//! Free-text similarity search over trial records held in an external primary
//! store:
//! - Deterministic embeddings (feature hashing, or local sentence-transformers)
//! - Exact nearest-neighbor search with an id ledger parallel to the vectors
//! - Atomic, generation-based persistence that survives restarts and crashes
//! - Synchronization with the record store (cold start, append, full refresh)
//!
//! Entry point is [`service::SemanticIndex`].

pub mod config;
pub mod embeddings;
pub mod index;
pub mod otel;
pub mod records;
pub mod service;
pub mod storage;
pub mod types;

pub use config::IndexConfig;
pub use records::{InMemoryRecordStore, JsonlRecordStore, RecordStore};
pub use service::{IndexStats, PersistStatus, RebuildReason, SemanticIndex, SyncAction, SyncReport};
pub use types::{IndexError, RecordId, Result, SearchResult, TrialMatch, TrialRecord};
