//! Contact routes. Owner-scoped address book: every operation carries the
//! owning user id and never sees another owner's entries.

use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::Json;
use serde::Deserialize;

use docflow_core::Contact;

use crate::handlers::ApiError;
use crate::state::AppState;

fn contact_not_found(id: &str) -> ApiError {
    ApiError::NotFound(format!("Contact {} not found", id))
}

#[derive(Debug, Deserialize)]
pub struct OwnerQuery {
    pub owner: String,
}

pub async fn list_contacts(
    State(state): State<AppState>,
    Query(q): Query<OwnerQuery>,
) -> Json<Vec<Contact>> {
    Json(state.store.list_contacts(&q.owner).await)
}

#[derive(Debug, Deserialize)]
pub struct CreateContactParams {
    pub owner_user_id: String,
    pub name: String,
    pub email: String,
    #[serde(default)]
    pub tags: Vec<String>,
}

pub async fn create_contact(
    State(state): State<AppState>,
    Json(params): Json<CreateContactParams>,
) -> Result<(StatusCode, Json<Contact>), ApiError> {
    let contact = state
        .store
        .create_contact(
            &params.owner_user_id,
            &params.name,
            &params.email,
            &params.tags,
        )
        .await
        .ok_or_else(|| {
            ApiError::BadRequest("owner, name, and email must be non-empty".to_string())
        })?;
    Ok((StatusCode::CREATED, Json(contact)))
}

#[derive(Debug, Deserialize)]
pub struct UpdateContactParams {
    pub owner_user_id: String,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub tags: Option<Vec<String>>,
}

pub async fn update_contact(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Json(params): Json<UpdateContactParams>,
) -> Result<Json<Contact>, ApiError> {
    state
        .store
        .update_contact(
            &params.owner_user_id,
            &id,
            params.name.as_deref(),
            params.email.as_deref(),
            params.tags.as_deref(),
        )
        .await
        .map(Json)
        .ok_or_else(|| contact_not_found(&id))
}

pub async fn delete_contact(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Query(q): Query<OwnerQuery>,
) -> Result<StatusCode, ApiError> {
    if state.store.delete_contact(&q.owner, &id).await {
        Ok(StatusCode::NO_CONTENT)
    } else {
        Err(contact_not_found(&id))
    }
}
