//! Outcomes of synchronization operations.

use crate::index::DistanceMetric;
use serde::Serialize;
use std::path::PathBuf;

/// Why the index was rebuilt from the record store.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum RebuildReason {
    /// Nothing persisted yet
    StoreNotFound,
    /// Persisted pair unreadable or inconsistent
    StoreCorrupt { detail: String },
    /// Persisted vectors came from another model, dimension or metric
    Incompatible { detail: String },
    /// Explicit `refresh_all`
    Manual,
}

/// What a synchronization operation did to the in-memory pair.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SyncAction {
    /// Restored from the persisted store
    Loaded,
    /// Re-embedded every record
    Rebuilt { reason: RebuildReason },
    /// One record appended at `position`
    Appended { position: usize },
    /// Already initialized; nothing to do
    Unchanged,
}

/// Result of writing the pair to the store.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum PersistStatus {
    /// Published as `generation`
    Saved { generation: u64 },
    /// Nothing needed writing
    Unchanged,
    /// Write failed; the in-memory pair is still valid and marked dirty
    Failed { error: String },
}

impl PersistStatus {
    pub fn is_failed(&self) -> bool {
        matches!(self, Self::Failed { .. })
    }
}

/// Report returned by `initialize`, `on_record_created` and `refresh_all`.
///
/// A `Failed` persist status is a partial success: the index change took effect
/// in memory but is not yet durable.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SyncReport {
    pub action: SyncAction,

    /// Indexed vectors after the operation
    pub vectors: usize,

    pub persist: PersistStatus,
}

/// Snapshot of the index state.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct IndexStats {
    pub vectors: usize,
    pub ledger_entries: usize,
    pub dimension: usize,
    pub metric: DistanceMetric,
    pub model: String,
    pub store_path: PathBuf,

    /// In-memory changes not yet persisted
    pub dirty: bool,
    pub initialized: bool,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_report_serialization() {
        let report = SyncReport {
            action: SyncAction::Rebuilt {
                reason: RebuildReason::StoreNotFound,
            },
            vectors: 3,
            persist: PersistStatus::Saved { generation: 1 },
        };

        assert_eq!(
            serde_json::to_value(&report).unwrap(),
            json!({
                "action": {"rebuilt": {"reason": "store_not_found"}},
                "vectors": 3,
                "persist": {"saved": {"generation": 1}}
            })
        );
    }

    #[test]
    fn test_failed_status() {
        assert!(PersistStatus::Failed {
            error: "disk full".to_string()
        }
        .is_failed());
        assert!(!PersistStatus::Unchanged.is_failed());
    }
}
