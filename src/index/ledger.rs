//! Identifier ledger: position → record id.

use crate::types::RecordId;
use serde::{Deserialize, Serialize};

/// Append-only ordered list of record ids, parallel to a [`SimilarityIndex`].
///
/// Duplicates are allowed: indexing the same record twice yields two entries.
///
/// [`SimilarityIndex`]: crate::index::SimilarityIndex
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct IdLedger {
    ids: Vec<RecordId>,
}

impl IdLedger {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn append<I>(&mut self, ids: I)
    where
        I: IntoIterator<Item = RecordId>,
    {
        self.ids.extend(ids);
    }

    pub fn get(&self, position: usize) -> Option<&RecordId> {
        self.ids.get(position)
    }

    pub fn len(&self) -> usize {
        self.ids.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ids.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &RecordId> + '_ {
        self.ids.iter()
    }

    /// Number of positions holding `id`.
    pub fn occurrences(&self, id: &RecordId) -> usize {
        self.ids.iter().filter(|existing| *existing == id).count()
    }
}

impl From<Vec<RecordId>> for IdLedger {
    fn from(ids: Vec<RecordId>) -> Self {
        Self { ids }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_append_keeps_order_and_duplicates() {
        let mut ledger = IdLedger::new();
        ledger.append(vec![RecordId::from("a"), RecordId::from("b")]);
        ledger.append(std::iter::once(RecordId::from("a")));

        assert_eq!(ledger.len(), 3);
        assert_eq!(ledger.get(0), Some(&RecordId::from("a")));
        assert_eq!(ledger.get(2), Some(&RecordId::from("a")));
        assert_eq!(ledger.get(3), None);
        assert_eq!(ledger.occurrences(&RecordId::from("a")), 2);
    }

    #[test]
    fn test_serializes_as_plain_list() {
        let ledger = IdLedger::from(vec![RecordId::from("test-1"), RecordId::from("test-2")]);
        let json = serde_json::to_string(&ledger).unwrap();
        assert_eq!(json, r#"["test-1","test-2"]"#);

        let back: IdLedger = serde_json::from_str(&json).unwrap();
        assert_eq!(back, ledger);
    }
}
