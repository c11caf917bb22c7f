//! Webhook-driven status resolution.
//!
//! Candidate flows surfaced by a webhook are re-checked against the
//! external service's current state: a tracked file sitting in the room's
//! "complete" subfolder completes the flow; a file that no longer exists
//! upstream cancels it; anything else is left untouched. Transitions go
//! through the store's fail-soft operations, so a race with a user-driven
//! transition resolves benignly.

use std::sync::Arc;

use tracing::{debug, info, warn};

use docflow_core::{Actor, CompleteFlowRequest, DocumentService, Flow, Result};
use docflow_docspace::{ResolverConfig, RoomFolderResolver};
use docflow_store::FlowStore;

pub struct StatusResolver {
    store: Arc<FlowStore>,
    service: Arc<dyn DocumentService>,
}

impl StatusResolver {
    pub fn new(store: Arc<FlowStore>, service: Arc<dyn DocumentService>) -> Self {
        Self { store, service }
    }

    /// Resolve a batch of candidate flows, returning how many transitioned.
    /// Per-flow failures are logged and skipped; resolution never fails the
    /// webhook that triggered it.
    pub async fn resolve_all(&self, flows: &[Flow]) -> usize {
        let mut transitioned = 0;
        for flow in flows {
            match self.resolve_one(flow).await {
                Ok(true) => transitioned += 1,
                Ok(false) => debug!(flow_id = %flow.id, "flow unchanged by resolution"),
                Err(e) => warn!(flow_id = %flow.id, error = %e, "status resolution failed"),
            }
        }
        transitioned
    }

    async fn resolve_one(&self, flow: &Flow) -> Result<bool> {
        let Some(file_id) = flow
            .result_file_id
            .as_deref()
            .or(flow.file_id.as_deref())
        else {
            return Ok(false);
        };

        if let Some(room_id) = flow.project_room_id.as_deref() {
            let resolver = RoomFolderResolver::new(
                self.service.clone(),
                ResolverConfig {
                    room_id: Some(room_id.to_string()),
                    title_candidates: Vec::new(),
                },
            );
            let room = resolver.resolve_room().await?;
            let folders = resolver.resolve_folders(&room).await?;

            if let Some(complete_folder_id) = &folders.complete_folder_id {
                let contents = self.service.get_folder_contents(complete_folder_id).await?;
                if let Some(done) = contents.files.iter().find(|f| f.id == file_id) {
                    let web_url = self
                        .service
                        .get_file_info(file_id)
                        .await
                        .ok()
                        .flatten()
                        .and_then(|i| i.web_url);
                    let result = CompleteFlowRequest {
                        result_file_id: Some(done.id.clone()),
                        result_file_title: Some(done.title.clone()),
                        result_file_url: web_url,
                    };
                    let updated = self
                        .store
                        .complete_flow(&flow.id, &Actor::system(), result)
                        .await;
                    info!(flow_id = %flow.id, file_id, "flow completed by webhook resolution");
                    return Ok(updated.is_some());
                }
            }
        }

        if self.service.get_file_info(file_id).await?.is_none() {
            info!(flow_id = %flow.id, file_id, "tracked file gone upstream, canceling flow");
            let updated = self.store.cancel_flow(&flow.id, &Actor::system()).await;
            return Ok(updated.is_some());
        }

        Ok(false)
    }
}
