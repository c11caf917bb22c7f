//! # docflow-store
//!
//! The authoritative, persisted repository of Flow, Project, and Contact
//! entities: state machine, append-only per-flow event log, and debounced
//! snapshot persistence through an injectable storage backend.

pub mod persister;
pub mod snapshot;
pub mod store;

pub use persister::{spawn_persister, PersisterConfig, PersisterHandle};
pub use snapshot::{FileSnapshotStorage, MemorySnapshotStorage};
pub use store::FlowStore;
