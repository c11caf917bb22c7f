//! Project routes. Direct CRUD, no state machine; archive state is the
//! only mutable part.

use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::Json;
use serde::Deserialize;

use docflow_core::Project;

use crate::handlers::flows::TransitionParams;
use crate::handlers::ApiError;
use crate::state::AppState;

fn project_not_found(id: &str) -> ApiError {
    ApiError::NotFound(format!("Project {} not found", id))
}

#[derive(Debug, Deserialize)]
pub struct CreateProjectParams {
    pub title: String,
    pub room_id: String,
    #[serde(default)]
    pub room_url: Option<String>,
}

pub async fn create_project(
    State(state): State<AppState>,
    Json(params): Json<CreateProjectParams>,
) -> Result<(StatusCode, Json<Project>), ApiError> {
    let project = state
        .store
        .create_project(&params.title, &params.room_id, params.room_url)
        .await
        .ok_or_else(|| ApiError::BadRequest("title and room_id must be non-empty".to_string()))?;
    Ok((StatusCode::CREATED, Json(project)))
}

pub async fn list_projects(State(state): State<AppState>) -> Json<Vec<Project>> {
    Json(state.store.list_projects().await)
}

pub async fn get_project(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<Project>, ApiError> {
    state
        .store
        .get_project(&id)
        .await
        .map(Json)
        .ok_or_else(|| project_not_found(&id))
}

pub async fn archive_project(
    State(state): State<AppState>,
    Path(id): Path<String>,
    body: Option<Json<TransitionParams>>,
) -> Result<Json<Project>, ApiError> {
    let actor = body.map(|Json(p)| p.actor).unwrap_or_default();
    state
        .store
        .set_project_archived(&id, true, &actor)
        .await
        .map(Json)
        .ok_or_else(|| project_not_found(&id))
}

pub async fn unarchive_project(
    State(state): State<AppState>,
    Path(id): Path<String>,
    body: Option<Json<TransitionParams>>,
) -> Result<Json<Project>, ApiError> {
    let actor = body.map(|Json(p)| p.actor).unwrap_or_default();
    state
        .store
        .set_project_archived(&id, false, &actor)
        .await
        .map(Json)
        .ok_or_else(|| project_not_found(&id))
}

pub async fn delete_project(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<StatusCode, ApiError> {
    if state.store.delete_project(&id).await {
        Ok(StatusCode::NO_CONTENT)
    } else {
        Err(project_not_found(&id))
    }
}
