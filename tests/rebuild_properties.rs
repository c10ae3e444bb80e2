use percolate_trials::embeddings::HashingEmbedder;
use percolate_trials::records::InMemoryRecordStore;
use percolate_trials::storage::IndexStore;
use percolate_trials::{SemanticIndex, TrialRecord};
use proptest::prelude::*;
use std::collections::BTreeSet;
use std::sync::Arc;
use tempfile::tempdir;

fn records_strategy() -> impl Strategy<Value = Vec<(String, String)>> {
    prop::collection::vec(("[a-z]{1,8}( [a-z]{1,8}){0,3}", "[a-z]{1,8}( [a-z]{1,8}){0,5}"), 1..12)
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(24))]

    #[test]
    fn test_rebuild_then_query_covers_every_record(
        texts in records_strategy(),
        query in "[a-z]{1,8}",
    ) {
        let records: Vec<TrialRecord> = texts
            .iter()
            .enumerate()
            .map(|(i, (title, description))| {
                TrialRecord::new(title.as_str(), description.as_str(), "outcome")
                    .with_id(format!("rec-{}", i))
            })
            .collect();
        let expected: BTreeSet<String> =
            records.iter().map(|r| r.id.as_str().to_string()).collect();

        let dir = tempdir().unwrap();
        let runtime = tokio::runtime::Runtime::new().unwrap();
        let (found, reloaded) = runtime.block_on(async {
            let store = Arc::new(InMemoryRecordStore::with_records(records.clone()));
            let embedder = Arc::new(HashingEmbedder::new(64).unwrap());
            let index = SemanticIndex::new(embedder.clone(), store.clone(), IndexStore::new(dir.path()));
            index.refresh_all().await.unwrap();
            let found = index.search(&query, records.len()).await.unwrap();

            let restarted = SemanticIndex::new(embedder, store, IndexStore::new(dir.path()));
            restarted.initialize().await.unwrap();
            let reloaded = restarted.search(&query, records.len()).await.unwrap();
            (found, reloaded)
        });

        let found_ids: BTreeSet<String> =
            found.iter().map(|r| r.record_id.as_str().to_string()).collect();
        prop_assert_eq!(found.len(), records.len());
        prop_assert_eq!(found_ids, expected);
        prop_assert_eq!(found, reloaded);
    }
}
