//! JSONL-file record store: one `TrialRecord` JSON object per line.
//!
//! The file is re-read on every call, so edits made by other processes are
//! visible on the next listing.

use crate::records::RecordStore;
use crate::types::{IndexError, RecordId, Result, TrialRecord};
use async_trait::async_trait;
use std::path::{Path, PathBuf};
use tokio::fs;
use tokio::io::AsyncWriteExt;

/// Record store backed by a JSON Lines file.
#[derive(Debug, Clone)]
pub struct JsonlRecordStore {
    path: PathBuf,
}

impl JsonlRecordStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Validate and append a record.
    ///
    /// # Errors
    ///
    /// Returns `IndexError::Validation` for invalid records or duplicate ids,
    /// `IndexError::RecordStore` if the file cannot be written
    pub async fn append(&self, record: &TrialRecord) -> Result<()> {
        record.validate()?;
        if self.get(&record.id).await?.is_some() {
            return Err(IndexError::validation(format!(
                "record {} already exists",
                record.id
            )));
        }

        let mut line = serde_json::to_string(record)?;
        line.push('\n');

        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent).await.map_err(|e| self.store_error(e))?;
        }

        let mut file = fs::OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)
            .await
            .map_err(|e| self.store_error(e))?;
        file.write_all(line.as_bytes())
            .await
            .map_err(|e| self.store_error(e))?;
        file.flush().await.map_err(|e| self.store_error(e))?;
        Ok(())
    }

    /// Parse one stored line. Stored records must carry their id; a default
    /// would be regenerated on every read and never resolve again.
    fn parse_line(&self, number: usize, line: &str) -> Result<TrialRecord> {
        let value: serde_json::Value = serde_json::from_str(line)
            .map_err(|e| self.store_error(format!("line {}: {}", number, e)))?;

        match value.get("id") {
            Some(serde_json::Value::String(id)) if !id.trim().is_empty() => {}
            _ => {
                return Err(self.store_error(format!("line {}: record has no id", number)));
            }
        }

        serde_json::from_value(value)
            .map_err(|e| self.store_error(format!("line {}: {}", number, e)))
    }

    fn store_error(&self, e: impl std::fmt::Display) -> IndexError {
        IndexError::record_store(format!("{}: {}", self.path.display(), e))
    }
}

#[async_trait]
impl RecordStore for JsonlRecordStore {
    async fn list_all(&self) -> Result<Vec<TrialRecord>> {
        let content = match fs::read_to_string(&self.path).await {
            Ok(content) => content,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => return Err(self.store_error(e)),
        };

        content
            .lines()
            .enumerate()
            .filter(|(_, line)| !line.trim().is_empty())
            .map(|(number, line)| self.parse_line(number + 1, line))
            .collect()
    }

    async fn get(&self, id: &RecordId) -> Result<Option<TrialRecord>> {
        Ok(self.list_all().await?.into_iter().find(|r| &r.id == id))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[tokio::test]
    async fn test_missing_file_lists_nothing() {
        let dir = tempdir().unwrap();
        let store = JsonlRecordStore::new(dir.path().join("trials.jsonl"));
        assert!(store.list_all().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_append_and_list() {
        let dir = tempdir().unwrap();
        let store = JsonlRecordStore::new(dir.path().join("data").join("trials.jsonl"));

        let a = TrialRecord::new("Obesity Treatment Trial", "GLP-1", "Weight loss").with_id("a");
        let b = TrialRecord::new("Diabetes Study", "Type 2", "Glucose").with_id("b");
        store.append(&a).await.unwrap();
        store.append(&b).await.unwrap();

        let all = store.list_all().await.unwrap();
        assert_eq!(all.len(), 2);
        assert_eq!(all[0].id, RecordId::from("a"));
        assert_eq!(all[1], b);

        assert!(matches!(store.append(&a).await, Err(IndexError::Validation(_))));
    }

    #[tokio::test]
    async fn test_line_without_id_is_rejected() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("trials.jsonl");
        std::fs::write(
            &path,
            concat!(
                r#"{"id": "kept", "title": "Diabetes Study", "description": "Type 2", "primary_outcome": "Glucose"}"#,
                "\n",
                r#"{"title": "Obesity Treatment Trial", "description": "GLP-1", "primary_outcome": "Weight loss"}"#,
                "\n",
            ),
        )
        .unwrap();

        let store = JsonlRecordStore::new(&path);
        for _ in 0..2 {
            match store.list_all().await {
                Err(IndexError::RecordStore(msg)) => assert!(msg.contains("line 2")),
                other => panic!("expected record store error, got {:?}", other),
            }
        }
        assert!(store.get(&RecordId::from("kept")).await.is_err());
    }

    #[tokio::test]
    async fn test_listed_ids_are_stable() {
        let dir = tempdir().unwrap();
        let store = JsonlRecordStore::new(dir.path().join("trials.jsonl"));
        store
            .append(&TrialRecord::new("Obesity Treatment Trial", "GLP-1", "Weight loss"))
            .await
            .unwrap();

        let first: Vec<RecordId> = store.list_all().await.unwrap().into_iter().map(|r| r.id).collect();
        let second: Vec<RecordId> = store.list_all().await.unwrap().into_iter().map(|r| r.id).collect();
        assert_eq!(first, second);
        assert!(store.get(&first[0]).await.unwrap().is_some());
    }

    #[tokio::test]
    async fn test_malformed_line_is_store_error() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("trials.jsonl");
        std::fs::write(&path, "{not json}\n").unwrap();

        let store = JsonlRecordStore::new(&path);
        assert!(matches!(store.list_all().await, Err(IndexError::RecordStore(_))));
    }
}
