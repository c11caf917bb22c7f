//! Orchestration services sitting between the HTTP handlers and the store
//! and external-service layers.

pub mod bulk;
pub mod payload;
pub mod status;

pub use bulk::{BulkCreateReport, BulkCreateRequest, BulkFailure, BulkFlowCreator};
pub use payload::{extract_refs, PayloadRefs};
pub use status::StatusResolver;
