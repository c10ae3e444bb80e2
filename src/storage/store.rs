//! Durable index store.
//!
//! # Layout
//!
//! ```text
//! <root>/CURRENT                  manifest of the live generation (JSON)
//! <root>/gen-000007/vectors.bin   vector file (see `storage::format`)
//! <root>/gen-000007/ids.json      identifier ledger as a JSON list
//! ```
//!
//! A save writes a complete new generation directory, fsyncs it, then publishes it
//! by replacing `CURRENT` (write to `CURRENT.tmp` + rename). Readers only follow
//! `CURRENT`, so a crash at any point leaves either the previous or the new pair
//! visible. Superseded generations are removed after publishing.

use crate::index::{DistanceMetric, IdLedger, VectorIndex};
use crate::storage::format::{read_vectors, write_vectors};
use crate::types::error::{IndexError, Result};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fs::{self, File};
use std::io::Write;
use std::path::{Path, PathBuf};

/// Manifest file name.
pub const CURRENT_FILE: &str = "CURRENT";

const VECTORS_FILE: &str = "vectors.bin";
const LEDGER_FILE: &str = "ids.json";
const GENERATION_PREFIX: &str = "gen-";
const MANIFEST_VERSION: u32 = 1;

/// Description of the published generation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Manifest {
    pub version: u32,
    pub generation: u64,
    pub dimension: usize,
    pub count: usize,
    pub metric: DistanceMetric,
    /// Embedding model the vectors were produced with
    pub model: String,
    pub saved_at: DateTime<Utc>,
}

/// Index loaded from disk together with its manifest.
#[derive(Debug, Clone)]
pub struct StoredIndex {
    pub index: VectorIndex,
    pub manifest: Manifest,
}

/// Saves and loads a [`VectorIndex`] as one unit under a directory.
#[derive(Debug, Clone)]
pub struct IndexStore {
    root: PathBuf,
}

impl IndexStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn path(&self) -> &Path {
        &self.root
    }

    /// Whether a generation has been published.
    pub fn exists(&self) -> bool {
        self.root.join(CURRENT_FILE).is_file()
    }

    /// Persist `index` as a new generation.
    ///
    /// # Arguments
    ///
    /// * `index` - Vectors and ledger to persist
    /// * `model` - Embedding model name recorded in the manifest
    ///
    /// # Returns
    ///
    /// The published manifest
    ///
    /// # Errors
    ///
    /// Returns `IndexError::PersistenceWriteFailure` if anything fails; the
    /// previously published generation stays intact
    pub fn save(&self, index: &VectorIndex, model: &str) -> Result<Manifest> {
        self.save_generation(index, model).map_err(|e| match e {
            IndexError::PersistenceWriteFailure(_) => e,
            other => IndexError::persist(format!("{}: {}", self.root.display(), other)),
        })
    }

    fn save_generation(&self, index: &VectorIndex, model: &str) -> Result<Manifest> {
        fs::create_dir_all(&self.root)?;

        let generation = self.next_generation()?;
        let dir = self.generation_dir(generation);
        if dir.exists() {
            // Leftover from an interrupted save; never published
            fs::remove_dir_all(&dir)?;
        }
        fs::create_dir(&dir)?;

        write_vectors(&dir.join(VECTORS_FILE), index.vectors())?;
        write_synced(&dir.join(LEDGER_FILE), &serde_json::to_vec(index.ledger())?)?;
        // Generation contents and its entry in the root must be durable before
        // CURRENT can point at it
        sync_dir(&dir)?;
        sync_dir(&self.root)?;

        let manifest = Manifest {
            version: MANIFEST_VERSION,
            generation,
            dimension: index.dimension(),
            count: index.len(),
            metric: index.metric(),
            model: model.to_string(),
            saved_at: Utc::now(),
        };
        self.write_atomic(CURRENT_FILE, &serde_json::to_vec_pretty(&manifest)?)?;

        self.remove_stale_generations(generation);

        tracing::debug!(
            path = %self.root.display(),
            generation,
            count = manifest.count,
            "Published index generation"
        );

        Ok(manifest)
    }

    /// Load the published generation.
    ///
    /// # Errors
    ///
    /// - `IndexError::StoreNotFound` if nothing has been published at the root
    /// - `IndexError::StoreCorrupt` if the manifest, vectors or ledger are
    ///   unreadable or disagree on dimension or length
    pub fn load(&self) -> Result<StoredIndex> {
        let current = self.root.join(CURRENT_FILE);
        if !current.is_file() {
            return Err(IndexError::StoreNotFound(self.root.clone()));
        }

        let manifest_bytes = fs::read(&current)
            .map_err(|e| IndexError::corrupt(format!("Failed to read manifest: {}", e)))?;
        let manifest: Manifest = serde_json::from_slice(&manifest_bytes)
            .map_err(|e| IndexError::corrupt(format!("Invalid manifest: {}", e)))?;
        if manifest.version != MANIFEST_VERSION {
            return Err(IndexError::corrupt(format!(
                "Unsupported manifest version {}",
                manifest.version
            )));
        }

        let dir = self.generation_dir(manifest.generation);
        let vectors = read_vectors(&dir.join(VECTORS_FILE))?;

        let ledger_bytes = fs::read(dir.join(LEDGER_FILE))
            .map_err(|e| IndexError::corrupt(format!("Failed to read ledger: {}", e)))?;
        let ledger: IdLedger = serde_json::from_slice(&ledger_bytes)
            .map_err(|e| IndexError::corrupt(format!("Invalid ledger: {}", e)))?;

        if vectors.dimension() != manifest.dimension {
            return Err(IndexError::corrupt(format!(
                "Manifest dimension {} but vector file dimension {}",
                manifest.dimension,
                vectors.dimension()
            )));
        }
        if vectors.metric() != manifest.metric {
            return Err(IndexError::corrupt("Manifest metric differs from vector file"));
        }
        if vectors.len() != manifest.count || ledger.len() != manifest.count {
            return Err(IndexError::corrupt(format!(
                "Manifest count {}, vector file holds {}, ledger holds {}",
                manifest.count,
                vectors.len(),
                ledger.len()
            )));
        }

        let index = VectorIndex::from_parts(vectors, ledger)?;
        Ok(StoredIndex { index, manifest })
    }

    /// Directory of the published generation, if any.
    pub fn current_generation_dir(&self) -> Option<PathBuf> {
        let bytes = fs::read(self.root.join(CURRENT_FILE)).ok()?;
        let manifest: Manifest = serde_json::from_slice(&bytes).ok()?;
        Some(self.generation_dir(manifest.generation))
    }

    fn generation_dir(&self, generation: u64) -> PathBuf {
        self.root
            .join(format!("{}{:06}", GENERATION_PREFIX, generation))
    }

    /// Generation numbers present on disk.
    fn generations(&self) -> Result<Vec<u64>> {
        let mut generations = Vec::new();
        for entry in fs::read_dir(&self.root)? {
            let entry = entry?;
            let name = entry.file_name();
            if let Some(number) = name
                .to_str()
                .and_then(|n| n.strip_prefix(GENERATION_PREFIX))
                .and_then(|n| n.parse::<u64>().ok())
            {
                generations.push(number);
            }
        }
        Ok(generations)
    }

    fn next_generation(&self) -> Result<u64> {
        Ok(self.generations()?.into_iter().max().map_or(1, |g| g + 1))
    }

    fn write_atomic(&self, name: &str, bytes: &[u8]) -> Result<()> {
        let tmp = self.root.join(format!("{}.tmp", name));
        write_synced(&tmp, bytes)?;
        fs::rename(&tmp, self.root.join(name))?;
        sync_dir(&self.root)
    }

    fn remove_stale_generations(&self, keep: u64) {
        let generations = match self.generations() {
            Ok(generations) => generations,
            Err(e) => {
                tracing::debug!(error = %e, "Skipping generation cleanup");
                return;
            }
        };

        for generation in generations.into_iter().filter(|g| *g != keep) {
            let dir = self.generation_dir(generation);
            if let Err(e) = fs::remove_dir_all(&dir) {
                tracing::debug!(path = %dir.display(), error = %e, "Failed to remove stale generation");
            }
        }
    }
}

fn write_synced(path: &Path, bytes: &[u8]) -> Result<()> {
    let mut file = File::create(path)?;
    file.write_all(bytes)?;
    file.sync_all()?;
    Ok(())
}

/// Flush a directory's entries (creates, renames) to disk.
#[cfg(unix)]
fn sync_dir(path: &Path) -> Result<()> {
    File::open(path)?.sync_all()?;
    Ok(())
}

/// No directory fsync on this platform.
#[cfg(not(unix))]
fn sync_dir(_path: &Path) -> Result<()> {
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::RecordId;
    use tempfile::tempdir;

    fn two_record_index() -> VectorIndex {
        let mut index = VectorIndex::new(3, DistanceMetric::SquaredEuclidean);
        index
            .append(
                vec![RecordId::from("test-1"), RecordId::from("test-2")],
                &[vec![1.0, 0.0, 0.0], vec![0.0, 1.0, 0.0]],
            )
            .unwrap();
        index
    }

    #[test]
    fn test_load_missing_store() {
        let dir = tempdir().unwrap();

        let store = IndexStore::new(dir.path().join("never-created"));
        assert!(matches!(store.load(), Err(IndexError::StoreNotFound(_))));

        // Existing but empty directory
        let store = IndexStore::new(dir.path());
        assert!(!store.exists());
        assert!(matches!(store.load(), Err(IndexError::StoreNotFound(_))));
    }

    #[test]
    fn test_save_load_roundtrip() {
        let dir = tempdir().unwrap();
        let store = IndexStore::new(dir.path().join("index"));
        let index = two_record_index();

        let manifest = store.save(&index, "hashing-3").unwrap();
        assert_eq!(manifest.generation, 1);
        assert_eq!(manifest.count, 2);

        let loaded = store.load().unwrap();
        assert_eq!(loaded.index, index);
        assert_eq!(loaded.manifest.model, "hashing-3");
        assert_eq!(
            loaded.index.nearest(&[0.0, 1.0, 0.0], 2).unwrap(),
            index.nearest(&[0.0, 1.0, 0.0], 2).unwrap()
        );
    }

    #[test]
    fn test_publish_leaves_no_temporary_manifest() {
        let dir = tempdir().unwrap();
        let store = IndexStore::new(dir.path().join("index"));
        store.save(&two_record_index(), "hashing-3").unwrap();

        assert!(store.exists());
        assert!(!store.path().join(format!("{}.tmp", CURRENT_FILE)).exists());
        assert!(store.current_generation_dir().unwrap().join(LEDGER_FILE).is_file());
    }

    #[cfg(unix)]
    #[test]
    fn test_sync_dir() {
        let dir = tempdir().unwrap();
        assert!(sync_dir(dir.path()).is_ok());
        assert!(matches!(
            sync_dir(&dir.path().join("missing")),
            Err(IndexError::Io(_))
        ));
    }

    #[test]
    fn test_resave_replaces_generation() {
        let dir = tempdir().unwrap();
        let store = IndexStore::new(dir.path());
        let mut index = two_record_index();

        store.save(&index, "m").unwrap();
        index
            .append(vec![RecordId::from("test-3")], &[vec![0.0, 0.0, 1.0]])
            .unwrap();
        let manifest = store.save(&index, "m").unwrap();

        assert_eq!(manifest.generation, 2);
        assert_eq!(store.load().unwrap().index.len(), 3);
        assert!(!dir.path().join("gen-000001").exists());
        assert!(dir.path().join("gen-000002").is_dir());
        assert!(!dir.path().join("CURRENT.tmp").exists());
    }

    #[test]
    fn test_ledger_shorter_than_vectors_is_corrupt() {
        let dir = tempdir().unwrap();
        let store = IndexStore::new(dir.path());
        store.save(&two_record_index(), "m").unwrap();

        let gen_dir = store.current_generation_dir().unwrap();
        fs::write(gen_dir.join(LEDGER_FILE), r#"["test-1"]"#).unwrap();

        match store.load() {
            Err(IndexError::StoreCorrupt(msg)) => assert!(msg.contains("ledger holds 1")),
            other => panic!("expected StoreCorrupt, got {:?}", other.map(|s| s.manifest)),
        }
    }

    #[test]
    fn test_missing_generation_is_corrupt() {
        let dir = tempdir().unwrap();
        let store = IndexStore::new(dir.path());
        store.save(&two_record_index(), "m").unwrap();

        fs::remove_dir_all(store.current_generation_dir().unwrap()).unwrap();
        assert!(matches!(store.load(), Err(IndexError::StoreCorrupt(_))));
    }

    #[test]
    fn test_garbage_manifest_is_corrupt() {
        let dir = tempdir().unwrap();
        fs::write(dir.path().join(CURRENT_FILE), b"not json").unwrap();

        let store = IndexStore::new(dir.path());
        assert!(matches!(store.load(), Err(IndexError::StoreCorrupt(_))));
    }

    #[test]
    fn test_save_into_file_path_fails() {
        let dir = tempdir().unwrap();
        let blocker = dir.path().join("blocker");
        fs::write(&blocker, b"occupied").unwrap();

        let store = IndexStore::new(&blocker);
        assert!(matches!(
            store.save(&two_record_index(), "m"),
            Err(IndexError::PersistenceWriteFailure(_))
        ));
        assert!(matches!(store.load(), Err(IndexError::StoreNotFound(_))));
    }

    #[test]
    fn test_interrupted_generation_is_ignored() {
        let dir = tempdir().unwrap();
        let store = IndexStore::new(dir.path());
        store.save(&two_record_index(), "m").unwrap();

        // Unpublished partial generation
        let partial = dir.path().join("gen-000002");
        fs::create_dir(&partial).unwrap();
        fs::write(partial.join(VECTORS_FILE), b"TRIAL").unwrap();

        let loaded = store.load().unwrap();
        assert_eq!(loaded.manifest.generation, 1);
        assert_eq!(loaded.index.len(), 2);
    }
}
