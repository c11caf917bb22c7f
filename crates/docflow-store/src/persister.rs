//! Debounced snapshot writer.
//!
//! Mutations mark the store dirty and wake this task; it sleeps for the
//! configured window and then writes one snapshot, so a burst of mutations
//! coalesces into a single durable write (last-state-wins). This trades
//! strict per-mutation durability for reduced I/O: a crash inside the
//! window can lose the most recent mutations, and the window length is the
//! explicit durability contract.

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::mpsc;
use tracing::{debug, error, info};

use docflow_core::defaults;

use crate::store::FlowStore;

/// Configuration for the snapshot persister.
#[derive(Debug, Clone)]
pub struct PersisterConfig {
    /// Debounce window in milliseconds. The durability window: mutations
    /// newer than this may be lost on crash.
    pub debounce_ms: u64,
}

impl Default for PersisterConfig {
    fn default() -> Self {
        Self {
            debounce_ms: defaults::SNAPSHOT_DEBOUNCE_MS,
        }
    }
}

impl PersisterConfig {
    /// Create config from environment variables (with defaults).
    ///
    /// | Variable | Default | Description |
    /// |----------|---------|-------------|
    /// | `DOCFLOW_SNAPSHOT_DEBOUNCE_MS` | `200` | Snapshot debounce window |
    pub fn from_env() -> Self {
        let debounce_ms = std::env::var("DOCFLOW_SNAPSHOT_DEBOUNCE_MS")
            .ok()
            .and_then(|v| v.parse::<u64>().ok())
            .unwrap_or(defaults::SNAPSHOT_DEBOUNCE_MS);
        Self { debounce_ms }
    }
}

/// Handle for controlling a running persister.
pub struct PersisterHandle {
    shutdown_tx: mpsc::Sender<()>,
    task: tokio::task::JoinHandle<()>,
}

impl PersisterHandle {
    /// Stop the persister, flushing any pending state first.
    pub async fn shutdown(self) {
        let _ = self.shutdown_tx.send(()).await;
        let _ = self.task.await;
    }
}

/// Spawn the debounced writer for a store.
pub fn spawn_persister(store: Arc<FlowStore>, config: PersisterConfig) -> PersisterHandle {
    let (shutdown_tx, mut shutdown_rx) = mpsc::channel::<()>(1);
    let window = Duration::from_millis(config.debounce_ms);

    let task = tokio::spawn(async move {
        info!(debounce_ms = config.debounce_ms, "snapshot persister started");
        loop {
            tokio::select! {
                _ = store.wait_dirty() => {
                    tokio::time::sleep(window).await;
                    if store.take_dirty() {
                        let snapshot = store.snapshot().await;
                        if let Err(e) = store.storage().save(&snapshot).await {
                            error!(error = %e, "snapshot write failed");
                        } else {
                            debug!(flows = snapshot.flows.len(), "debounced snapshot written");
                        }
                    }
                }
                _ = shutdown_rx.recv() => {
                    if store.take_dirty() {
                        if let Err(e) = store.flush().await {
                            error!(error = %e, "final snapshot write failed");
                        }
                    }
                    info!("snapshot persister stopped");
                    return;
                }
            }
        }
    });

    PersisterHandle { shutdown_tx, task }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::snapshot::MemorySnapshotStorage;
    use docflow_core::CreateFlowRequest;

    fn create_req(id: &str) -> CreateFlowRequest {
        CreateFlowRequest {
            id: id.to_string(),
            template_file_id: "T1".to_string(),
            created_by_user_id: "U1".to_string(),
            ..Default::default()
        }
    }

    #[tokio::test]
    async fn test_burst_of_mutations_coalesces_into_one_write() {
        let storage = Arc::new(MemorySnapshotStorage::new());
        let store = Arc::new(FlowStore::load(storage.clone()).await.unwrap());
        let handle = spawn_persister(store.clone(), PersisterConfig { debounce_ms: 50 });

        // Three mutations inside one debounce window.
        store.create_flow(create_req("f1")).await.unwrap();
        store.create_flow(create_req("f2")).await.unwrap();
        store.create_flow(create_req("f3")).await.unwrap();

        tokio::time::sleep(Duration::from_millis(150)).await;
        assert_eq!(storage.save_count().await, 1);
        let snapshot = storage.last_snapshot().await.unwrap();
        assert_eq!(snapshot.flows.len(), 3);

        handle.shutdown().await;
    }

    #[tokio::test]
    async fn test_separate_bursts_write_separately() {
        let storage = Arc::new(MemorySnapshotStorage::new());
        let store = Arc::new(FlowStore::load(storage.clone()).await.unwrap());
        let handle = spawn_persister(store.clone(), PersisterConfig { debounce_ms: 30 });

        store.create_flow(create_req("f1")).await.unwrap();
        tokio::time::sleep(Duration::from_millis(100)).await;
        store.create_flow(create_req("f2")).await.unwrap();
        tokio::time::sleep(Duration::from_millis(100)).await;

        assert_eq!(storage.save_count().await, 2);
        handle.shutdown().await;
    }

    #[tokio::test]
    async fn test_shutdown_flushes_pending_state() {
        let storage = Arc::new(MemorySnapshotStorage::new());
        let store = Arc::new(FlowStore::load(storage.clone()).await.unwrap());
        // Long window so the write is still pending at shutdown.
        let handle = spawn_persister(store.clone(), PersisterConfig { debounce_ms: 10_000 });

        store.create_flow(create_req("f1")).await.unwrap();
        handle.shutdown().await;

        let snapshot = storage.last_snapshot().await.unwrap();
        assert_eq!(snapshot.flows.len(), 1);
    }
}
