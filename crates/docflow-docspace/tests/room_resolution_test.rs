//! Room resolution against the scriptable mock service: pinned-id
//! verification, candidate title matching, and the substring fallback.

use std::sync::Arc;

use docflow_core::{Error, RoomSummary};
use docflow_docspace::{MockDocumentService, ResolverConfig, RoomFolderResolver};

fn room(id: &str, title: &str) -> RoomSummary {
    RoomSummary {
        id: id.to_string(),
        title: title.to_string(),
        room_type: None,
    }
}

fn resolver(service: Arc<MockDocumentService>, config: ResolverConfig) -> RoomFolderResolver {
    RoomFolderResolver::new(service, config)
}

#[tokio::test]
async fn test_configured_room_id_is_verified_not_searched() {
    let service = Arc::new(MockDocumentService::new());
    // Title matches no candidate; the pinned id must still win.
    service.add_room(room("R9", "Projektraum"));

    let resolved = resolver(
        service,
        ResolverConfig {
            room_id: Some("R9".to_string()),
            title_candidates: Vec::new(),
        },
    )
    .resolve_room()
    .await
    .unwrap();
    assert_eq!(resolved.id, "R9");
    assert_eq!(resolved.title, "Projektraum");
}

#[tokio::test]
async fn test_configured_room_id_unreachable_is_an_error() {
    let service = Arc::new(MockDocumentService::new());
    let err = resolver(
        service,
        ResolverConfig {
            room_id: Some("gone".to_string()),
            title_candidates: Vec::new(),
        },
    )
    .resolve_room()
    .await
    .unwrap_err();
    assert!(matches!(err, Error::Upstream { status: 404, .. }));
}

#[tokio::test]
async fn test_exact_title_match_is_case_insensitive_and_beats_substring() {
    let service = Arc::new(MockDocumentService::new());
    // Listed first, but only a substring match for "Flows".
    service.add_room(room("R1", "Team Flows Hub"));
    service.add_room(room("R2", "document flows"));

    let resolved = resolver(service, ResolverConfig::default())
        .resolve_room()
        .await
        .unwrap();
    assert_eq!(resolved.id, "R2");
}

#[tokio::test]
async fn test_substring_fallback_when_no_exact_match() {
    let service = Arc::new(MockDocumentService::new());
    service.add_room(room("R1", "Shared Workflow Space"));

    let resolved = resolver(service, ResolverConfig::default())
        .resolve_room()
        .await
        .unwrap();
    assert_eq!(resolved.id, "R1");
}

#[tokio::test]
async fn test_configured_candidates_override_builtins() {
    let service = Arc::new(MockDocumentService::new());
    service.add_room(room("R1", "Document Flows"));
    service.add_room(room("R2", "Vertragsraum"));

    let resolved = resolver(
        service,
        ResolverConfig {
            room_id: None,
            title_candidates: vec!["Vertragsraum".to_string()],
        },
    )
    .resolve_room()
    .await
    .unwrap();
    assert_eq!(resolved.id, "R2");
}

#[tokio::test]
async fn test_no_match_error_names_candidates_tried() {
    let service = Arc::new(MockDocumentService::new());
    service.add_room(room("R1", "Accounting"));

    let err = resolver(service, ResolverConfig::default())
        .resolve_room()
        .await
        .unwrap_err();
    let msg = err.to_string();
    assert!(matches!(err, Error::NotFound(_)));
    assert!(msg.contains("Document Flows"));
    assert!(msg.contains("Workflow"));
}
