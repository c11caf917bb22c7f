//! Flow routes: creation, listing, transitions, and the audit log.

use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::Json;
use chrono::{DateTime, Utc};
use serde::Deserialize;
use tracing::info;
use uuid::Uuid;

use docflow_core::{
    defaults, Actor, CompleteFlowRequest, CopyFilesRequest, CreateFlowRequest, Flow, FlowEvent,
    FlowKind, FlowSource,
};
use docflow_docspace::{FindCriteria, LinkProvisioner, ReconciliationPoller, RoomFolderResolver};

use crate::handlers::ApiError;
use crate::services::bulk::{BulkCreateReport, BulkCreateRequest, BulkFlowCreator};
use crate::state::AppState;

fn flow_not_found(id: &str) -> ApiError {
    docflow_core::Error::FlowNotFound(id.to_string()).into()
}

// =============================================================================
// CREATION
// =============================================================================

/// Parameters for creating one flow from a template.
#[derive(Debug, Deserialize)]
pub struct CreateFlowParams {
    pub template_file_id: String,
    #[serde(default)]
    pub template_title: Option<String>,
    /// Desired working-copy title; falls back to the template title.
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub kind: FlowKind,
    #[serde(default)]
    pub project_room_id: Option<String>,
    pub created_by_user_id: String,
    #[serde(default)]
    pub created_by_name: Option<String>,
    #[serde(default)]
    pub recipient_emails: Vec<String>,
    #[serde(default)]
    pub stage_index: Option<u32>,
    #[serde(default)]
    pub due_date: Option<DateTime<Utc>>,
}

/// Create one flow: resolve the room, instantiate the template into the
/// working folder, provision a fill link, then record the flow.
pub async fn create_flow(
    State(state): State<AppState>,
    Json(params): Json<CreateFlowParams>,
) -> Result<(StatusCode, Json<Flow>), ApiError> {
    let mut resolver_config = state.resolver_config.clone();
    if params.project_room_id.is_some() {
        resolver_config.room_id = params.project_room_id.clone();
    }
    let resolver = RoomFolderResolver::new(state.service.clone(), resolver_config);
    let room = resolver.resolve_room().await?;
    let folders = resolver.resolve_folders(&room).await?;

    let title = params
        .title
        .clone()
        .or_else(|| params.template_title.clone())
        .unwrap_or_else(|| "Request".to_string());
    let dest = folders
        .in_process_folder_id
        .clone()
        .unwrap_or_else(|| room.id.clone());
    let alt = (dest != room.id).then(|| room.id.clone());

    let poller = ReconciliationPoller::with_config(state.service.clone(), state.poller_config.clone());
    let criteria = FindCriteria {
        expected_title: Some(title.clone()),
        expected_extension: None,
    };
    let copy = CopyFilesRequest {
        file_ids: vec![params.template_file_id.clone()],
        dest_folder_id: dest.clone(),
        title_hint: Some(title.clone()),
    };
    let service = state.service.clone();
    let file = poller
        .reconcile(&dest, alt.as_deref(), &criteria, move || async move {
            service.copy_files(copy).await
        })
        .await?;

    let link = LinkProvisioner::new(state.service.clone())
        .ensure_link(&file.id, defaults::link_access::FILL_FORMS, Some(&title))
        .await?;

    let req = CreateFlowRequest {
        id: Uuid::new_v4().to_string(),
        group_id: None,
        kind: params.kind,
        source: Some(FlowSource::Manual),
        template_file_id: params.template_file_id,
        template_title: params.template_title,
        file_id: Some(file.id),
        file_title: Some(file.title),
        project_room_id: Some(room.id),
        created_by_user_id: params.created_by_user_id,
        created_by_name: params.created_by_name,
        recipient_emails: params.recipient_emails,
        stage_index: params.stage_index,
        due_date: params.due_date,
        open_url: link.url,
        link_request_token: link.request_token,
    };
    let flow = state
        .store
        .create_flow(req)
        .await
        .ok_or_else(|| ApiError::BadRequest("invalid flow creation request".to_string()))?;
    info!(flow_id = %flow.id, "flow created");
    Ok((StatusCode::CREATED, Json(flow)))
}

pub async fn bulk_create(
    State(state): State<AppState>,
    Json(req): Json<BulkCreateRequest>,
) -> Result<Json<BulkCreateReport>, ApiError> {
    let creator = BulkFlowCreator::new(
        state.store.clone(),
        state.service.clone(),
        state.resolver_config.clone(),
        state.poller_config.clone(),
    );
    let report = creator.create(req).await?;
    Ok(Json(report))
}

// =============================================================================
// READS
// =============================================================================

#[derive(Debug, Default, Deserialize)]
pub struct ListFlowsQuery {
    pub user: Option<String>,
    /// Recipient email also credited to `user` listings.
    pub email: Option<String>,
    pub room: Option<String>,
    pub group: Option<String>,
}

pub async fn list_flows(
    State(state): State<AppState>,
    Query(q): Query<ListFlowsQuery>,
) -> Json<Vec<Flow>> {
    let flows = if let Some(user) = &q.user {
        state
            .store
            .list_flows_for_user(user, q.email.as_deref())
            .await
    } else if let Some(room) = &q.room {
        state.store.list_flows_for_room(room).await
    } else if let Some(group) = &q.group {
        state.store.list_flows_for_group(group).await
    } else {
        state.store.list_flows().await
    };
    Json(flows)
}

pub async fn get_flow(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<Flow>, ApiError> {
    state
        .store
        .get_flow(&id)
        .await
        .map(Json)
        .ok_or_else(|| flow_not_found(&id))
}

pub async fn get_flow_events(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<Vec<FlowEvent>>, ApiError> {
    state
        .store
        .get_flow_events(&id)
        .await
        .map(Json)
        .ok_or_else(|| flow_not_found(&id))
}

// =============================================================================
// TRANSITIONS
// =============================================================================

/// Optional actor attribution carried by transition requests.
#[derive(Debug, Default, Deserialize)]
pub struct TransitionParams {
    #[serde(default)]
    pub actor: Actor,
}

fn actor_from(body: Option<Json<TransitionParams>>) -> Actor {
    body.map(|Json(p)| p.actor).unwrap_or_default()
}

pub async fn cancel_flow(
    State(state): State<AppState>,
    Path(id): Path<String>,
    body: Option<Json<TransitionParams>>,
) -> Result<Json<Flow>, ApiError> {
    state
        .store
        .cancel_flow(&id, &actor_from(body))
        .await
        .map(Json)
        .ok_or_else(|| flow_not_found(&id))
}

pub async fn reopen_flow(
    State(state): State<AppState>,
    Path(id): Path<String>,
    body: Option<Json<TransitionParams>>,
) -> Result<Json<Flow>, ApiError> {
    state
        .store
        .reopen_flow(&id, &actor_from(body))
        .await
        .map(Json)
        .ok_or_else(|| flow_not_found(&id))
}

/// Completion body: actor attribution plus optional result-file data.
#[derive(Debug, Default, Deserialize)]
pub struct CompleteParams {
    #[serde(default)]
    pub actor: Actor,
    #[serde(flatten)]
    pub result: CompleteFlowRequest,
}

pub async fn complete_flow(
    State(state): State<AppState>,
    Path(id): Path<String>,
    body: Option<Json<CompleteParams>>,
) -> Result<Json<Flow>, ApiError> {
    let params = body.map(|Json(p)| p).unwrap_or_default();
    state
        .store
        .complete_flow(&id, &params.actor, params.result)
        .await
        .map(Json)
        .ok_or_else(|| flow_not_found(&id))
}

pub async fn archive_flow(
    State(state): State<AppState>,
    Path(id): Path<String>,
    body: Option<Json<TransitionParams>>,
) -> Result<Json<Flow>, ApiError> {
    state
        .store
        .archive_flow(&id, &actor_from(body))
        .await
        .map(Json)
        .ok_or_else(|| flow_not_found(&id))
}

pub async fn unarchive_flow(
    State(state): State<AppState>,
    Path(id): Path<String>,
    body: Option<Json<TransitionParams>>,
) -> Result<Json<Flow>, ApiError> {
    state
        .store
        .unarchive_flow(&id, &actor_from(body))
        .await
        .map(Json)
        .ok_or_else(|| flow_not_found(&id))
}
