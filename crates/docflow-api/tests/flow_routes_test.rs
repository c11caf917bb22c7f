//! Flow, project, and contact routes through the full router.

use std::sync::Arc;

use axum::body::Body;
use axum::http::{Method, Request, StatusCode};
use http_body_util::BodyExt;
use tower::ServiceExt;

use docflow_api::{build_router, AppState};
use docflow_core::CreateFlowRequest;
use docflow_docspace::{MockDocumentService, PollerConfig, ResolverConfig};
use docflow_store::{FlowStore, MemorySnapshotStorage};

async fn make_state() -> (AppState, Arc<FlowStore>) {
    let storage = Arc::new(MemorySnapshotStorage::new());
    let store = Arc::new(FlowStore::load(storage).await.unwrap());
    let state = AppState {
        store: store.clone(),
        service: Arc::new(MockDocumentService::new()),
        resolver_config: ResolverConfig::default(),
        poller_config: PollerConfig {
            attempts: 2,
            delay_ms: 1,
        },
        webhook_secret: None,
    };
    (state, store)
}

async fn seed_flow(store: &FlowStore, id: &str) {
    store
        .create_flow(CreateFlowRequest {
            id: id.to_string(),
            template_file_id: "T1".to_string(),
            created_by_user_id: "U1".to_string(),
            ..Default::default()
        })
        .await
        .unwrap();
}

async fn send(
    state: AppState,
    method: Method,
    uri: &str,
    body: Option<serde_json::Value>,
) -> (StatusCode, serde_json::Value) {
    let request = match body {
        Some(json) => Request::builder()
            .method(method)
            .uri(uri)
            .header("content-type", "application/json")
            .body(Body::from(json.to_string()))
            .unwrap(),
        None => Request::builder()
            .method(method)
            .uri(uri)
            .body(Body::empty())
            .unwrap(),
    };
    let response = build_router(state).oneshot(request).await.unwrap();
    let status = response.status();
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    let json = if bytes.is_empty() {
        serde_json::Value::Null
    } else {
        serde_json::from_slice(&bytes).unwrap()
    };
    (status, json)
}

#[tokio::test]
async fn test_health_endpoint() {
    let (state, _) = make_state().await;
    let (status, json) = send(state, Method::GET, "/health", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["status"], "ok");
}

#[tokio::test]
async fn test_cancel_and_reopen_flow() {
    let (state, store) = make_state().await;
    seed_flow(&store, "F1").await;

    let (status, json) = send(
        state.clone(),
        Method::POST,
        "/api/flows/F1/cancel",
        Some(serde_json::json!({ "actor": { "user_id": "U1" } })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["status"], "Canceled");
    assert_eq!(json["canceled_by_user_id"], "U1");

    let (status, json) = send(state, Method::POST, "/api/flows/F1/reopen", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["status"], "InProgress");
}

#[tokio::test]
async fn test_transition_on_unknown_flow_returns_404() {
    let (state, _) = make_state().await;
    let (status, _) = send(state, Method::POST, "/api/flows/nope/cancel", None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_complete_then_archive_flow() {
    let (state, store) = make_state().await;
    seed_flow(&store, "F1").await;

    let (status, json) = send(
        state.clone(),
        Method::POST,
        "/api/flows/F1/complete",
        Some(serde_json::json!({
            "actor": { "user_id": "U2" },
            "result_file_id": "RF1",
            "result_file_title": "Result.pdf"
        })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["status"], "Completed");
    assert_eq!(json["result_file_id"], "RF1");

    let (status, json) = send(state.clone(), Method::POST, "/api/flows/F1/archive", None).await;
    assert_eq!(status, StatusCode::OK);
    assert!(json["archived_at"].is_string());

    // Audit log carries one event per successful transition.
    let (status, json) = send(state, Method::GET, "/api/flows/F1/events", None).await;
    assert_eq!(status, StatusCode::OK);
    let kinds: Vec<&str> = json
        .as_array()
        .unwrap()
        .iter()
        .map(|e| e["type"].as_str().unwrap())
        .collect();
    assert_eq!(kinds, vec!["created", "completed", "archived"]);
}

#[tokio::test]
async fn test_cancel_is_a_no_op_on_completed_flow() {
    let (state, store) = make_state().await;
    seed_flow(&store, "F1").await;
    send(
        state.clone(),
        Method::POST,
        "/api/flows/F1/complete",
        None,
    )
    .await;

    let (status, json) = send(state, Method::POST, "/api/flows/F1/cancel", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["status"], "Completed");
}

#[tokio::test]
async fn test_list_flows_filters() {
    let (state, store) = make_state().await;
    store
        .create_flow(CreateFlowRequest {
            id: "F1".to_string(),
            group_id: Some("G1".to_string()),
            template_file_id: "T1".to_string(),
            created_by_user_id: "U1".to_string(),
            project_room_id: Some("R1".to_string()),
            ..Default::default()
        })
        .await
        .unwrap();
    store
        .create_flow(CreateFlowRequest {
            id: "F2".to_string(),
            template_file_id: "T1".to_string(),
            created_by_user_id: "U2".to_string(),
            recipient_emails: vec!["alice@example.com".to_string()],
            ..Default::default()
        })
        .await
        .unwrap();

    let (_, json) = send(state.clone(), Method::GET, "/api/flows", None).await;
    assert_eq!(json.as_array().unwrap().len(), 2);

    let (_, json) = send(state.clone(), Method::GET, "/api/flows?user=U1", None).await;
    assert_eq!(json.as_array().unwrap().len(), 1);
    assert_eq!(json[0]["id"], "F1");

    // Recipient email credits the flow to the user's listing too.
    let (_, json) = send(
        state.clone(),
        Method::GET,
        "/api/flows?user=U9&email=alice@example.com",
        None,
    )
    .await;
    assert_eq!(json.as_array().unwrap().len(), 1);
    assert_eq!(json[0]["id"], "F2");

    let (_, json) = send(state.clone(), Method::GET, "/api/flows?room=R1", None).await;
    assert_eq!(json.as_array().unwrap().len(), 1);

    let (_, json) = send(state, Method::GET, "/api/flows?group=G1", None).await;
    assert_eq!(json.as_array().unwrap().len(), 1);
}

#[tokio::test]
async fn test_project_crud_routes() {
    let (state, _) = make_state().await;

    let (status, json) = send(
        state.clone(),
        Method::POST,
        "/api/projects",
        Some(serde_json::json!({ "title": "Onboarding", "room_id": "R1" })),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
    let id = json["id"].as_str().unwrap().to_string();

    let (status, _) = send(
        state.clone(),
        Method::POST,
        &format!("/api/projects/{}/archive", id),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::OK);

    let (status, json) = send(state.clone(), Method::GET, &format!("/api/projects/{}", id), None).await;
    assert_eq!(status, StatusCode::OK);
    assert!(json["archived_at"].is_string());

    let (status, _) = send(
        state.clone(),
        Method::DELETE,
        &format!("/api/projects/{}", id),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::NO_CONTENT);

    let (status, _) = send(state, Method::GET, &format!("/api/projects/{}", id), None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_contact_routes_are_owner_scoped() {
    let (state, _) = make_state().await;

    let (status, json) = send(
        state.clone(),
        Method::POST,
        "/api/contacts",
        Some(serde_json::json!({
            "owner_user_id": "U1",
            "name": "Alice",
            "email": " Alice@Example.com "
        })),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(json["email"], "alice@example.com");
    let id = json["id"].as_str().unwrap().to_string();

    let (_, json) = send(state.clone(), Method::GET, "/api/contacts?owner=U1", None).await;
    assert_eq!(json.as_array().unwrap().len(), 1);

    let (_, json) = send(state.clone(), Method::GET, "/api/contacts?owner=U2", None).await;
    assert_eq!(json.as_array().unwrap().len(), 0);

    // A different owner cannot delete the entry.
    let (status, _) = send(
        state.clone(),
        Method::DELETE,
        &format!("/api/contacts/{}?owner=U2", id),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let (status, _) = send(
        state,
        Method::DELETE,
        &format!("/api/contacts/{}?owner=U1", id),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::NO_CONTENT);
}
