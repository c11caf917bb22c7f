//! End-to-end webhook-driven status resolution: a room notification
//! completes flows whose tracked file reached the complete folder and
//! cancels flows whose file disappeared upstream.

use std::sync::Arc;

use axum::body::Body;
use axum::http::{Method, Request, StatusCode};
use http_body_util::BodyExt;
use tower::ServiceExt;

use docflow_api::{build_router, AppState};
use docflow_core::{
    defaults, CreateFlowRequest, FileInfo, FileItem, FlowKind, FlowStatus, FolderContents,
    SubfolderItem,
};
use docflow_core::RoomSummary;
use docflow_docspace::{MockDocumentService, PollerConfig, ResolverConfig};
use docflow_store::{FlowStore, MemorySnapshotStorage};

fn flow_request(id: &str, file_id: &str, kind: FlowKind) -> CreateFlowRequest {
    CreateFlowRequest {
        id: id.to_string(),
        kind,
        template_file_id: "T1".to_string(),
        file_id: Some(file_id.to_string()),
        project_room_id: Some("R1".to_string()),
        created_by_user_id: "U1".to_string(),
        ..Default::default()
    }
}

async fn setup() -> (AppState, Arc<FlowStore>) {
    let service = Arc::new(MockDocumentService::new());
    service.add_room(RoomSummary {
        id: "R1".to_string(),
        title: "Document Flows".to_string(),
        room_type: None,
    });
    service.script_folder(
        "R1",
        vec![FolderContents {
            id: "R1".to_string(),
            title: "Document Flows".to_string(),
            files: Vec::new(),
            folders: vec![SubfolderItem {
                id: "C1".to_string(),
                title: "Fertig".to_string(),
                folder_type: Some(defaults::folder_type::COMPLETE),
            }],
        }],
    );
    service.script_folder(
        "C1",
        vec![FolderContents {
            id: "C1".to_string(),
            title: "Fertig".to_string(),
            files: vec![FileItem {
                id: "F-done".to_string(),
                title: "Filled form".to_string(),
                file_extension: Some(".pdf".to_string()),
            }],
            folders: Vec::new(),
        }],
    );
    service.add_file(FileInfo {
        id: "F-done".to_string(),
        title: "Filled form".to_string(),
        folder_id: Some("C1".to_string()),
        web_url: Some("https://mock/doc/F-done".to_string()),
    });

    let storage = Arc::new(MemorySnapshotStorage::new());
    let store = Arc::new(FlowStore::load(storage).await.unwrap());
    store
        .create_flow(flow_request("A", "F-done", FlowKind::FillSign))
        .await
        .unwrap();
    store
        .create_flow(flow_request("B", "F-gone", FlowKind::FillSign))
        .await
        .unwrap();
    store
        .create_flow(flow_request("C", "F-other", FlowKind::SharedSign))
        .await
        .unwrap();

    let state = AppState {
        store: store.clone(),
        service,
        resolver_config: ResolverConfig::default(),
        poller_config: PollerConfig {
            attempts: 2,
            delay_ms: 1,
        },
        webhook_secret: None,
    };
    (state, store)
}

#[tokio::test]
async fn test_room_notification_resolves_flow_statuses() {
    let (state, store) = setup().await;

    let request = Request::builder()
        .method(Method::POST)
        .uri("/webhooks/docspace")
        .header("content-type", "application/json")
        .body(Body::from(r#"{"roomId":"R1"}"#))
        .unwrap();
    let response = build_router(state).oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    let json: serde_json::Value = serde_json::from_slice(&bytes).unwrap();

    // Externally-managed signature flows are never considered.
    assert_eq!(json["flowsConsidered"], 2);

    let done = store.get_flow("A").await.unwrap();
    assert_eq!(done.status, FlowStatus::Completed);
    assert_eq!(done.result_file_id.as_deref(), Some("F-done"));
    assert_eq!(done.result_file_title.as_deref(), Some("Filled form"));
    assert_eq!(
        done.result_file_url.as_deref(),
        Some("https://mock/doc/F-done")
    );

    let gone = store.get_flow("B").await.unwrap();
    assert_eq!(gone.status, FlowStatus::Canceled);

    let excluded = store.get_flow("C").await.unwrap();
    assert_eq!(excluded.status, FlowStatus::InProgress);
}

#[tokio::test]
async fn test_file_notification_matches_by_tracked_file_id() {
    let (state, store) = setup().await;

    let request = Request::builder()
        .method(Method::POST)
        .uri("/webhooks/docspace")
        .header("content-type", "application/json")
        .body(Body::from(r#"{"data":{"file":{"id":"F-done"}}}"#))
        .unwrap();
    let response = build_router(state).oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let done = store.get_flow("A").await.unwrap();
    assert_eq!(done.status, FlowStatus::Completed);
    // Flow B tracks a different file and was not named by the payload.
    let other = store.get_flow("B").await.unwrap();
    assert_eq!(other.status, FlowStatus::InProgress);
}
