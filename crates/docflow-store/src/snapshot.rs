//! Snapshot storage backends.
//!
//! The store persists one JSON document `{version, saved_at, flows,
//! projects, contacts}` through the [`SnapshotStorage`] trait. The file
//! backend writes atomically (tmp + rename) so a crash mid-write never
//! truncates the previous snapshot.

use std::path::{Path, PathBuf};

use async_trait::async_trait;
use tokio::sync::Mutex;
use tracing::{debug, warn};

use docflow_core::{Error, Result, Snapshot, SnapshotStorage};

/// File-backed snapshot storage.
pub struct FileSnapshotStorage {
    path: PathBuf,
}

impl FileSnapshotStorage {
    pub fn new(path: impl AsRef<Path>) -> Self {
        Self {
            path: path.as_ref().to_path_buf(),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

#[async_trait]
impl SnapshotStorage for FileSnapshotStorage {
    async fn load(&self) -> Result<Option<Snapshot>> {
        let raw = match tokio::fs::read(&self.path).await {
            Ok(raw) => raw,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                debug!(path = %self.path.display(), "no snapshot file, starting empty");
                return Ok(None);
            }
            Err(e) => return Err(e.into()),
        };
        let snapshot: Snapshot = serde_json::from_slice(&raw)
            .map_err(|e| Error::Snapshot(format!("corrupt snapshot {}: {}", self.path.display(), e)))?;
        Ok(Some(snapshot))
    }

    async fn save(&self, snapshot: &Snapshot) -> Result<()> {
        let raw = serde_json::to_vec_pretty(snapshot)?;
        let tmp = self.path.with_extension("json.tmp");
        tokio::fs::write(&tmp, &raw).await?;
        if let Err(e) = tokio::fs::rename(&tmp, &self.path).await {
            warn!(path = %self.path.display(), error = %e, "snapshot rename failed");
            return Err(e.into());
        }
        debug!(
            path = %self.path.display(),
            flows = snapshot.flows.len(),
            "snapshot written"
        );
        Ok(())
    }
}

/// In-memory snapshot storage for tests. Records how many saves occurred
/// so debounce coalescing is observable.
#[derive(Default)]
pub struct MemorySnapshotStorage {
    state: Mutex<MemoryState>,
}

#[derive(Default)]
struct MemoryState {
    snapshot: Option<Snapshot>,
    save_count: u64,
}

impl MemorySnapshotStorage {
    pub fn new() -> Self {
        Self::default()
    }

    /// Seed the storage with a snapshot, as if one had been persisted by
    /// a previous run.
    pub fn with_snapshot(snapshot: Snapshot) -> Self {
        Self {
            state: Mutex::new(MemoryState {
                snapshot: Some(snapshot),
                save_count: 0,
            }),
        }
    }

    pub async fn save_count(&self) -> u64 {
        self.state.lock().await.save_count
    }

    pub async fn last_snapshot(&self) -> Option<Snapshot> {
        self.state.lock().await.snapshot.clone()
    }
}

#[async_trait]
impl SnapshotStorage for MemorySnapshotStorage {
    async fn load(&self) -> Result<Option<Snapshot>> {
        Ok(self.state.lock().await.snapshot.clone())
    }

    async fn save(&self, snapshot: &Snapshot) -> Result<()> {
        let mut state = self.state.lock().await;
        state.snapshot = Some(snapshot.clone());
        state.save_count += 1;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use docflow_core::defaults;

    #[tokio::test]
    async fn test_file_storage_load_missing_returns_none() {
        let dir = tempfile::tempdir().unwrap();
        let storage = FileSnapshotStorage::new(dir.path().join("state.json"));
        assert!(storage.load().await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_file_storage_roundtrip() {
        let dir = tempfile::tempdir().unwrap();
        let storage = FileSnapshotStorage::new(dir.path().join("state.json"));

        let snapshot = Snapshot::empty();
        storage.save(&snapshot).await.unwrap();

        let loaded = storage.load().await.unwrap().expect("snapshot should exist");
        assert_eq!(loaded.version, defaults::SNAPSHOT_VERSION);
        assert!(loaded.flows.is_empty());
    }

    #[tokio::test]
    async fn test_file_storage_corrupt_snapshot_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("state.json");
        tokio::fs::write(&path, b"{not json").await.unwrap();

        let storage = FileSnapshotStorage::new(&path);
        let err = storage.load().await.unwrap_err();
        assert!(err.to_string().contains("corrupt snapshot"));
    }

    #[tokio::test]
    async fn test_old_snapshot_backfills_missing_fields() {
        // A snapshot written before kind/source/events/version existed.
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("state.json");
        let old = serde_json::json!({
            "version": 1,
            "saved_at": "2024-01-01T00:00:00Z",
            "flows": [{
                "id": "f1",
                "group_id": "f1",
                "template_file_id": "t1",
                "created_by_user_id": "u1",
                "created_at": "2024-01-01T00:00:00Z",
                "updated_at": "2024-01-01T00:00:00Z"
            }],
            "projects": [],
            "contacts": []
        });
        tokio::fs::write(&path, old.to_string()).await.unwrap();

        let storage = FileSnapshotStorage::new(&path);
        let loaded = storage.load().await.unwrap().unwrap();
        let flow = &loaded.flows[0];
        assert_eq!(flow.status, docflow_core::FlowStatus::InProgress);
        assert_eq!(flow.kind, docflow_core::FlowKind::Other);
        assert!(flow.events.is_empty());
        assert_eq!(flow.version, 0);
    }

    #[tokio::test]
    async fn test_memory_storage_counts_saves() {
        let storage = MemorySnapshotStorage::new();
        assert_eq!(storage.save_count().await, 0);
        storage.save(&Snapshot::empty()).await.unwrap();
        storage.save(&Snapshot::empty()).await.unwrap();
        assert_eq!(storage.save_count().await, 2);
    }
}
