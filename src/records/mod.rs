//! Primary record store interface and adapters.
//!
//! The index never owns records; it only reads them through [`RecordStore`].

pub mod jsonl;
pub mod memory;

pub use jsonl::JsonlRecordStore;
pub use memory::InMemoryRecordStore;

use crate::types::{RecordId, Result, TrialRecord};
use async_trait::async_trait;

/// Read access to the primary record store.
#[async_trait]
pub trait RecordStore: Send + Sync {
    /// All records, in a stable order.
    ///
    /// # Errors
    ///
    /// Returns `IndexError::RecordStore` if the store cannot be read
    async fn list_all(&self) -> Result<Vec<TrialRecord>>;

    /// Record by id, `None` if it no longer exists.
    ///
    /// # Errors
    ///
    /// Returns `IndexError::RecordStore` if the store cannot be read
    async fn get(&self, id: &RecordId) -> Result<Option<TrialRecord>>;
}
