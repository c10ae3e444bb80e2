//! In-memory record store.

use crate::records::RecordStore;
use crate::types::{RecordId, Result, TrialRecord};
use async_trait::async_trait;
use tokio::sync::RwLock;

/// Insertion-ordered in-memory store, mainly for tests and embedding callers.
#[derive(Debug, Default)]
pub struct InMemoryRecordStore {
    records: RwLock<Vec<TrialRecord>>,
}

impl InMemoryRecordStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_records(records: Vec<TrialRecord>) -> Self {
        Self {
            records: RwLock::new(records),
        }
    }

    /// Insert or replace by id. Replacing keeps the original position.
    pub async fn upsert(&self, record: TrialRecord) {
        let mut records = self.records.write().await;
        match records.iter_mut().find(|r| r.id == record.id) {
            Some(existing) => *existing = record,
            None => records.push(record),
        }
    }

    /// Remove by id, returning the removed record.
    pub async fn remove(&self, id: &RecordId) -> Option<TrialRecord> {
        let mut records = self.records.write().await;
        let position = records.iter().position(|r| &r.id == id)?;
        Some(records.remove(position))
    }

    pub async fn len(&self) -> usize {
        self.records.read().await.len()
    }
}

#[async_trait]
impl RecordStore for InMemoryRecordStore {
    async fn list_all(&self) -> Result<Vec<TrialRecord>> {
        Ok(self.records.read().await.clone())
    }

    async fn get(&self, id: &RecordId) -> Result<Option<TrialRecord>> {
        Ok(self.records.read().await.iter().find(|r| &r.id == id).cloned())
    }
}
