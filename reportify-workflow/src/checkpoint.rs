//! Checkpoint persistence
//!
//! The engine treats the store as an opaque key-value collaborator with
//! at-least-once durability: a [`RunRecord`] is saved after every node
//! transition, so a suspended or failed run can always be inspected and
//! resumed from its last persisted state.

use crate::state::RunRecord;
use async_trait::async_trait;
use reportify_core::{ReportError, ReportResult};
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use tokio::sync::RwLock;
use tracing::{debug, info, warn};

#[async_trait]
pub trait CheckpointStore: Send + Sync {
    async fn save(&self, record: &RunRecord) -> ReportResult<()>;
    async fn load(&self, run_id: &str) -> ReportResult<Option<RunRecord>>;
    async fn delete(&self, run_id: &str) -> ReportResult<()>;
    async fn list(&self) -> ReportResult<Vec<String>>;
}

/// In-memory store for tests and throwaway runs.
#[derive(Default)]
pub struct MemoryCheckpointStore {
    records: RwLock<HashMap<String, RunRecord>>,
}

impl MemoryCheckpointStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl CheckpointStore for MemoryCheckpointStore {
    async fn save(&self, record: &RunRecord) -> ReportResult<()> {
        self.records
            .write()
            .await
            .insert(record.run_id.clone(), record.clone());
        Ok(())
    }

    async fn load(&self, run_id: &str) -> ReportResult<Option<RunRecord>> {
        Ok(self.records.read().await.get(run_id).cloned())
    }

    async fn delete(&self, run_id: &str) -> ReportResult<()> {
        self.records.write().await.remove(run_id);
        Ok(())
    }

    async fn list(&self) -> ReportResult<Vec<String>> {
        Ok(self.records.read().await.keys().cloned().collect())
    }
}

/// File-backed store: one pretty-printed JSON file per run.
pub struct FileCheckpointStore {
    storage_dir: PathBuf,
}

impl FileCheckpointStore {
    pub fn new<P: AsRef<Path>>(storage_dir: P) -> ReportResult<Self> {
        let storage_dir = storage_dir.as_ref().to_path_buf();

        std::fs::create_dir_all(&storage_dir)
            .map_err(|e| ReportError::checkpoint(format!("Failed to create store dir: {}", e)))?;

        info!("Checkpoint store initialized at: {}", storage_dir.display());

        Ok(Self { storage_dir })
    }

    fn record_path(&self, run_id: &str) -> PathBuf {
        self.storage_dir.join(format!("{}.json", run_id))
    }
}

#[async_trait]
impl CheckpointStore for FileCheckpointStore {
    async fn save(&self, record: &RunRecord) -> ReportResult<()> {
        let path = self.record_path(&record.run_id);
        let json = serde_json::to_string_pretty(record)
            .map_err(|e| ReportError::checkpoint(format!("Failed to serialize run: {}", e)))?;

        tokio::fs::write(&path, json)
            .await
            .map_err(|e| ReportError::checkpoint(format!("Failed to write run file: {}", e)))?;

        debug!(run_id = %record.run_id, path = %path.display(), "Saved run checkpoint");
        Ok(())
    }

    async fn load(&self, run_id: &str) -> ReportResult<Option<RunRecord>> {
        let path = self.record_path(run_id);
        if !path.exists() {
            return Ok(None);
        }

        let json = tokio::fs::read_to_string(&path)
            .await
            .map_err(|e| ReportError::checkpoint(format!("Failed to read run file: {}", e)))?;

        let record: RunRecord = serde_json::from_str(&json)
            .map_err(|e| ReportError::checkpoint(format!("Failed to parse run file: {}", e)))?;

        Ok(Some(record))
    }

    async fn delete(&self, run_id: &str) -> ReportResult<()> {
        let path = self.record_path(run_id);
        if path.exists() {
            tokio::fs::remove_file(&path)
                .await
                .map_err(|e| ReportError::checkpoint(format!("Failed to delete run file: {}", e)))?;
            debug!(run_id, "Deleted run checkpoint");
        }
        Ok(())
    }

    async fn list(&self) -> ReportResult<Vec<String>> {
        let mut run_ids = Vec::new();

        let mut entries = tokio::fs::read_dir(&self.storage_dir)
            .await
            .map_err(|e| ReportError::checkpoint(format!("Failed to read store dir: {}", e)))?;

        while let Some(entry) = entries
            .next_entry()
            .await
            .map_err(|e| ReportError::checkpoint(format!("Failed to read store dir: {}", e)))?
        {
            let path = entry.path();
            if path.extension().and_then(|s| s.to_str()) == Some("json") {
                match path.file_stem().and_then(|s| s.to_str()) {
                    Some(stem) => run_ids.push(stem.to_string()),
                    None => warn!(path = %path.display(), "Skipping unreadable checkpoint file"),
                }
            }
        }

        Ok(run_ids)
    }
}
