//! Bulk flow creation.
//!
//! Units run strictly sequentially: each unit's reconciliation depends on a
//! clean before/after folder snapshot, and running units concurrently would
//! corrupt the diff. A failed unit is recorded in the report and the
//! remaining units continue; the caller decides what to do with partial
//! results.

use std::sync::Arc;

use chrono::Utc;
use serde::{Deserialize, Serialize};
use tracing::{info, warn};
use uuid::Uuid;

use docflow_core::{
    defaults, CopyFilesRequest, CreateFlowRequest, DocumentService, Error, Flow, FlowKind,
    FlowSource, Result,
};
use docflow_docspace::{
    FindCriteria, LinkProvisioner, PollerConfig, ReconciliationPoller, ResolverConfig,
    RoomFolderResolver,
};
use docflow_store::FlowStore;

/// Request for creating `count` share-link flows from one template.
#[derive(Debug, Clone, Deserialize)]
pub struct BulkCreateRequest {
    pub count: u32,
    pub template_file_id: String,
    #[serde(default)]
    pub template_title: Option<String>,
    /// Base for generated titles; falls back to the template title.
    #[serde(default)]
    pub title_base: Option<String>,
    #[serde(default)]
    pub project_room_id: Option<String>,
    pub created_by_user_id: String,
    #[serde(default)]
    pub created_by_name: Option<String>,
}

/// One failed unit, by 1-based sequence number.
#[derive(Debug, Serialize)]
pub struct BulkFailure {
    pub index: u32,
    pub error: String,
}

/// Partial-results report: successfully created flows plus per-unit
/// failures.
#[derive(Debug, Default, Serialize)]
pub struct BulkCreateReport {
    pub created: Vec<Flow>,
    pub failed: Vec<BulkFailure>,
}

/// Orchestrates creating many flows from one template, chaining
/// reconciliation, link provisioning, and the store per unit.
pub struct BulkFlowCreator {
    store: Arc<FlowStore>,
    service: Arc<dyn DocumentService>,
    resolver_config: ResolverConfig,
    poller_config: PollerConfig,
}

impl BulkFlowCreator {
    pub fn new(
        store: Arc<FlowStore>,
        service: Arc<dyn DocumentService>,
        resolver_config: ResolverConfig,
        poller_config: PollerConfig,
    ) -> Self {
        Self {
            store,
            service,
            resolver_config,
            poller_config,
        }
    }

    /// Create the requested flows. Room resolution failure aborts the whole
    /// request; unit failures are reported, not fatal.
    pub async fn create(&self, req: BulkCreateRequest) -> Result<BulkCreateReport> {
        if req.count == 0 {
            return Err(Error::Validation("count must be >= 1".to_string()));
        }

        let mut resolver_config = self.resolver_config.clone();
        if req.project_room_id.is_some() {
            resolver_config.room_id = req.project_room_id.clone();
        }
        let resolver = RoomFolderResolver::new(self.service.clone(), resolver_config);
        let room = resolver.resolve_room().await?;
        let folders = resolver.resolve_folders(&room).await?;
        let dest = folders
            .in_process_folder_id
            .clone()
            .unwrap_or_else(|| room.id.clone());
        // The service may route newly-filled files to the room root rather
        // than the in-process folder; check both when they differ.
        let alt = (dest != room.id).then(|| room.id.clone());

        let poller =
            ReconciliationPoller::with_config(self.service.clone(), self.poller_config.clone());
        let provisioner = LinkProvisioner::new(self.service.clone());

        let group_id = Uuid::new_v4().to_string();
        let date = Utc::now().format("%Y%m%d").to_string();
        let base = req
            .title_base
            .clone()
            .or_else(|| req.template_title.clone())
            .unwrap_or_else(|| "Request".to_string());

        let mut report = BulkCreateReport::default();
        for seq in 1..=req.count {
            let title = format!("{} - Link {}-{:03}", base, date, seq);
            match self
                .create_unit(
                    &poller,
                    &provisioner,
                    &req,
                    &room.id,
                    &dest,
                    alt.as_deref(),
                    &group_id,
                    &title,
                )
                .await
            {
                Ok(flow) => {
                    info!(flow_id = %flow.id, group_id = %group_id, index = seq, "bulk unit created");
                    report.created.push(flow);
                }
                Err(e) => {
                    warn!(index = seq, error = %e, "bulk unit failed, continuing");
                    report.failed.push(BulkFailure {
                        index: seq,
                        error: e.to_string(),
                    });
                }
            }
        }
        Ok(report)
    }

    #[allow(clippy::too_many_arguments)]
    async fn create_unit(
        &self,
        poller: &ReconciliationPoller,
        provisioner: &LinkProvisioner,
        req: &BulkCreateRequest,
        room_id: &str,
        dest_folder_id: &str,
        alt_folder_id: Option<&str>,
        group_id: &str,
        title: &str,
    ) -> Result<Flow> {
        let criteria = FindCriteria {
            expected_title: Some(title.to_string()),
            expected_extension: None,
        };
        let copy = CopyFilesRequest {
            file_ids: vec![req.template_file_id.clone()],
            dest_folder_id: dest_folder_id.to_string(),
            title_hint: Some(title.to_string()),
        };
        let service = self.service.clone();
        let file = poller
            .reconcile(dest_folder_id, alt_folder_id, &criteria, move || async move {
                service.copy_files(copy).await
            })
            .await?;

        let link = provisioner
            .ensure_link(&file.id, defaults::link_access::FILL_FORMS, Some(title))
            .await?;

        let create = CreateFlowRequest {
            id: Uuid::new_v4().to_string(),
            group_id: Some(group_id.to_string()),
            kind: FlowKind::FillSign,
            source: Some(FlowSource::BulkLink),
            template_file_id: req.template_file_id.clone(),
            template_title: req.template_title.clone(),
            file_id: Some(file.id.clone()),
            file_title: Some(file.title.clone()),
            project_room_id: Some(room_id.to_string()),
            created_by_user_id: req.created_by_user_id.clone(),
            created_by_name: req.created_by_name.clone(),
            open_url: link.url.clone(),
            link_request_token: link.request_token.clone(),
            ..Default::default()
        };
        self.store
            .create_flow(create)
            .await
            .ok_or_else(|| Error::Validation("flow creation rejected by the store".to_string()))
    }
}
