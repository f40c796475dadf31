//! Durable record of lead identifiers that have already been handled.
//!
//! On disk the state is a single JSON document:
//!
//! ```json
//! {"processed": ["L-1", "L-2"], "updated_at": "2024-05-01T10:00:00Z"}
//! ```
//!
//! `updated_at` is informational and optional on read. Writes go to a sibling
//! temp file which is then renamed over the real one.
use crate::errors::{AppError, ResultExt};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::path::{Path, PathBuf};

#[derive(Debug, Serialize, Deserialize)]
struct StateFile {
    processed: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    updated_at: Option<DateTime<Utc>>,
}

/// Reads and writes the processed-id state file.
#[derive(Debug, Clone)]
pub struct StateStore {
    path: PathBuf,
}

impl StateStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Loads the processed set.
    ///
    /// Never fails: a missing file is a fresh start, an unreadable or corrupt
    /// file is logged and also treated as a fresh start.
    pub async fn load(&self) -> HashSet<String> {
        let raw = match tokio::fs::read_to_string(&self.path).await {
            Ok(raw) => raw,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                tracing::info!(
                    "No state file at {}, starting with an empty processed set",
                    self.path.display()
                );
                return HashSet::new();
            }
            Err(e) => {
                tracing::warn!(
                    "Could not read state file {}: {}; starting fresh",
                    self.path.display(),
                    e
                );
                return HashSet::new();
            }
        };

        match serde_json::from_str::<StateFile>(&raw) {
            Ok(state) => {
                let processed: HashSet<String> = state.processed.into_iter().collect();
                tracing::info!("Loaded {} processed lead ids", processed.len());
                processed
            }
            Err(e) => {
                tracing::warn!(
                    "State file {} is corrupt ({}); starting fresh",
                    self.path.display(),
                    e
                );
                HashSet::new()
            }
        }
    }

    /// Writes the processed set. Ids are sorted so the file diffs cleanly.
    pub async fn save(&self, processed: &HashSet<String>) -> Result<(), AppError> {
        let mut ids: Vec<String> = processed.iter().cloned().collect();
        ids.sort();

        let body = serde_json::to_vec_pretty(&StateFile {
            processed: ids,
            updated_at: Some(Utc::now()),
        })?;

        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            tokio::fs::create_dir_all(parent)
                .await
                .with_context(|| format!("Creating state directory {}", parent.display()))?;
        }

        let tmp = self.temp_path();
        tokio::fs::write(&tmp, &body)
            .await
            .with_context(|| format!("Writing {}", tmp.display()))?;
        tokio::fs::rename(&tmp, &self.path)
            .await
            .with_context(|| format!("Replacing {}", self.path.display()))?;

        tracing::debug!(
            "Saved {} processed lead ids to {}",
            processed.len(),
            self.path.display()
        );
        Ok(())
    }

    fn temp_path(&self) -> PathBuf {
        let mut name = self
            .path
            .file_name()
            .map(|n| n.to_os_string())
            .unwrap_or_else(|| "processed_leads.json".into());
        name.push(".tmp");
        self.path.with_file_name(name)
    }
}

/// In-memory processed set backed by a [`StateStore`].
///
/// The in-memory set is the source of truth for the rest of the run; a failed
/// save is logged and does not roll back the insert.
#[derive(Debug)]
pub struct ProcessedSet {
    ids: HashSet<String>,
    store: StateStore,
}

impl ProcessedSet {
    /// Loads the set from `store`.
    pub async fn load(store: StateStore) -> Self {
        let ids = store.load().await;
        Self { ids, store }
    }

    pub fn contains(&self, id: &str) -> bool {
        self.ids.contains(id)
    }

    pub fn ids(&self) -> &HashSet<String> {
        &self.ids
    }

    pub fn len(&self) -> usize {
        self.ids.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ids.is_empty()
    }

    /// Records `id` and persists the whole set. Returns whether the save succeeded.
    pub async fn mark(&mut self, id: &str) -> bool {
        self.ids.insert(id.to_string());

        match self.store.save(&self.ids).await {
            Ok(()) => true,
            Err(e) => {
                tracing::warn!("Failed to save state file after lead {}: {}", id, e);
                false
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn set(ids: &[&str]) -> HashSet<String> {
        ids.iter().map(|s| s.to_string()).collect()
    }

    #[tokio::test]
    async fn test_round_trip_in_fresh_store() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("processed_leads.json");

        StateStore::new(&path).save(&set(&["A", "B"])).await.unwrap();

        let reloaded = StateStore::new(&path).load().await;
        assert_eq!(reloaded, set(&["A", "B"]));
    }

    #[tokio::test]
    async fn test_missing_file_is_empty() {
        let dir = tempfile::tempdir().unwrap();
        let store = StateStore::new(dir.path().join("nope.json"));
        assert_eq!(store.path(), dir.path().join("nope.json"));
        assert!(store.load().await.is_empty());
    }

    #[tokio::test]
    async fn test_corrupt_file_is_empty() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("processed_leads.json");
        tokio::fs::write(&path, b"{\"processed\": [\"A\",").await.unwrap();

        assert!(StateStore::new(&path).load().await.is_empty());
    }

    #[tokio::test]
    async fn test_wrong_shape_is_empty() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("processed_leads.json");
        tokio::fs::write(&path, b"[\"A\", \"B\"]").await.unwrap();

        assert!(StateStore::new(&path).load().await.is_empty());
    }

    #[tokio::test]
    async fn test_legacy_file_without_timestamp_loads() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("processed_leads.json");
        tokio::fs::write(&path, br#"{"processed": ["x", "y", "x"]}"#)
            .await
            .unwrap();

        assert_eq!(StateStore::new(&path).load().await, set(&["x", "y"]));
    }

    #[tokio::test]
    async fn test_saved_ids_are_sorted_and_no_temp_left() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("state").join("processed_leads.json");

        StateStore::new(&path)
            .save(&set(&["c", "a", "b"]))
            .await
            .unwrap();

        let raw = tokio::fs::read_to_string(&path).await.unwrap();
        let value: serde_json::Value = serde_json::from_str(&raw).unwrap();
        assert_eq!(value["processed"], serde_json::json!(["a", "b", "c"]));
        assert!(!path.with_file_name("processed_leads.json.tmp").exists());
    }

    #[tokio::test]
    async fn test_mark_keeps_memory_when_save_fails() {
        let dir = tempfile::tempdir().unwrap();
        // A directory where the file should be makes the rename fail.
        let path = dir.path().join("blocked");
        std::fs::create_dir(&path).unwrap();
        std::fs::write(path.join("occupant"), b"x").unwrap();

        let mut processed = ProcessedSet::load(StateStore::new(&path)).await;
        assert!(!processed.mark("L-1").await);
        assert!(processed.contains("L-1"));
        assert_eq!(processed.len(), 1);
    }
}
