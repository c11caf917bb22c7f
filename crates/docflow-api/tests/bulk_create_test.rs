//! Bulk flow creation against the scriptable mock service.

use std::sync::Arc;

use chrono::Utc;

use docflow_api::services::bulk::{BulkCreateRequest, BulkFlowCreator};
use docflow_core::{defaults, FileItem, FlowSource, FlowStatus, FolderContents, SubfolderItem};
use docflow_core::RoomSummary;
use docflow_docspace::{MockDocumentService, PollerConfig, ResolverConfig};
use docflow_store::{FlowStore, MemorySnapshotStorage};

fn file(id: &str, title: &str) -> FileItem {
    FileItem {
        id: id.to_string(),
        title: title.to_string(),
        file_extension: Some(".pdf".to_string()),
    }
}

fn listing(folder_id: &str, files: Vec<FileItem>, folders: Vec<SubfolderItem>) -> FolderContents {
    FolderContents {
        id: folder_id.to_string(),
        title: folder_id.to_string(),
        files,
        folders,
    }
}

fn expected_title(base: &str, seq: u32) -> String {
    format!("{} - Link {}-{:03}", base, Utc::now().format("%Y%m%d"), seq)
}

/// Mock with room R1 whose in-process folder is IP. Listings for IP are
/// scripted so that unit `n`'s file appears on the listing right after its
/// before-capture, for `count` units.
fn setup_service(count: u32, base: &str) -> Arc<MockDocumentService> {
    let service = Arc::new(MockDocumentService::new());
    service.add_room(RoomSummary {
        id: "R1".to_string(),
        title: "Document Flows".to_string(),
        room_type: None,
    });
    let in_process = SubfolderItem {
        id: "IP".to_string(),
        title: "In process".to_string(),
        folder_type: Some(defaults::folder_type::IN_PROCESS),
    };
    service.script_folder("R1", vec![listing("R1", Vec::new(), vec![in_process])]);

    let mut ip_script = Vec::new();
    let mut present: Vec<FileItem> = Vec::new();
    for seq in 1..=count {
        // Before-capture for this unit, then the listing where its copy
        // has appeared.
        ip_script.push(listing("IP", present.clone(), Vec::new()));
        present.push(file(&format!("copy-{}", seq), &expected_title(base, seq)));
        ip_script.push(listing("IP", present.clone(), Vec::new()));
    }
    service.script_folder("IP", ip_script);
    service
}

fn fast_poller() -> PollerConfig {
    PollerConfig {
        attempts: 3,
        delay_ms: 1,
    }
}

async fn make_store() -> Arc<FlowStore> {
    let storage = Arc::new(MemorySnapshotStorage::new());
    Arc::new(FlowStore::load(storage).await.unwrap())
}

#[tokio::test]
async fn test_bulk_creates_sequentially_titled_flows() {
    let service = setup_service(3, "Contract");
    let store = make_store().await;
    let creator = BulkFlowCreator::new(
        store.clone(),
        service.clone(),
        ResolverConfig {
            room_id: Some("R1".to_string()),
            title_candidates: Vec::new(),
        },
        fast_poller(),
    );

    let report = creator
        .create(BulkCreateRequest {
            count: 3,
            template_file_id: "T1".to_string(),
            template_title: Some("Contract".to_string()),
            title_base: None,
            project_room_id: None,
            created_by_user_id: "U1".to_string(),
            created_by_name: None,
        })
        .await
        .unwrap();

    assert_eq!(report.created.len(), 3);
    assert!(report.failed.is_empty());

    let group_id = report.created[0].group_id.clone();
    for (i, flow) in report.created.iter().enumerate() {
        let seq = (i + 1) as u32;
        assert_eq!(
            flow.file_title.as_deref(),
            Some(expected_title("Contract", seq).as_str())
        );
        assert_eq!(flow.group_id, group_id);
        assert_eq!(flow.source, Some(FlowSource::BulkLink));
        assert_eq!(flow.status, FlowStatus::InProgress);
        assert!(flow.open_url.is_some());
    }

    // Every unit copied the template and provisioned one link.
    assert_eq!(service.copy_requests().len(), 3);
    assert_eq!(service.upsert_calls().len(), 3);
    assert_eq!(store.list_flows_for_group(&group_id).await.len(), 3);
}

#[tokio::test]
async fn test_bulk_reports_partial_results_on_unit_failure() {
    // Unit 1's copy appears; unit 2's never does.
    let service = setup_service(1, "Contract");
    let store = make_store().await;
    let creator = BulkFlowCreator::new(
        store.clone(),
        service,
        ResolverConfig {
            room_id: Some("R1".to_string()),
            title_candidates: Vec::new(),
        },
        PollerConfig {
            attempts: 2,
            delay_ms: 1,
        },
    );

    let report = creator
        .create(BulkCreateRequest {
            count: 2,
            template_file_id: "T1".to_string(),
            template_title: Some("Contract".to_string()),
            title_base: None,
            project_room_id: None,
            created_by_user_id: "U1".to_string(),
            created_by_name: None,
        })
        .await
        .unwrap();

    assert_eq!(report.created.len(), 1);
    assert_eq!(report.failed.len(), 1);
    assert_eq!(report.failed[0].index, 2);
    assert!(report.failed[0].error.contains("Reconciliation"));

    // The surviving flow is intact in the store.
    assert_eq!(store.list_flows().await.len(), 1);
}

#[tokio::test]
async fn test_bulk_rejects_zero_count() {
    let service = setup_service(1, "Contract");
    let store = make_store().await;
    let creator = BulkFlowCreator::new(
        store,
        service,
        ResolverConfig {
            room_id: Some("R1".to_string()),
            title_candidates: Vec::new(),
        },
        fast_poller(),
    );

    let err = creator
        .create(BulkCreateRequest {
            count: 0,
            template_file_id: "T1".to_string(),
            template_title: None,
            title_base: None,
            project_room_id: None,
            created_by_user_id: "U1".to_string(),
            created_by_name: None,
        })
        .await
        .unwrap_err();
    assert!(matches!(err, docflow_core::Error::Validation(_)));
}
