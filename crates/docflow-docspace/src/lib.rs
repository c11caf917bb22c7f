//! # docflow-docspace
//!
//! Client and reconciliation layer for the external document-collaboration
//! service: the reqwest-backed [`DocSpaceClient`], the
//! [`RoomFolderResolver`], the [`LinkProvisioner`], the
//! [`ReconciliationPoller`], and a scriptable [`MockDocumentService`] for
//! tests.

pub mod client;
pub mod links;
pub mod mock;
pub mod poller;
pub mod resolver;

pub use client::{DocSpaceClient, DocSpaceConfig};
pub use links::LinkProvisioner;
pub use mock::MockDocumentService;
pub use poller::{FindCriteria, PollerConfig, ReconciliationPoller};
pub use resolver::{ResolverConfig, RoomFolderResolver, RoomFolders};
