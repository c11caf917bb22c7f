//! Core traits for docflow abstractions.
//!
//! These traits define the seams toward the external document service and
//! the snapshot persistence backend, enabling pluggable implementations
//! and testability.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::error::Result;
use crate::models::Snapshot;

// =============================================================================
// EXTERNAL DOCUMENT SERVICE
// =============================================================================

/// Credential scope used for an external-service call. Link upserts retry
/// once under `Admin` when the `User` scope hits an authorization boundary.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CredentialScope {
    User,
    Admin,
}

/// Summary of a room visible under the caller's credentials.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RoomSummary {
    pub id: String,
    pub title: String,
    #[serde(default)]
    pub room_type: Option<i32>,
}

/// A file entry inside a folder listing.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FileItem {
    pub id: String,
    pub title: String,
    #[serde(default)]
    pub file_extension: Option<String>,
}

/// A subfolder entry inside a folder listing. `folder_type` is the stable
/// numeric code some folders carry in addition to their display title.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SubfolderItem {
    pub id: String,
    pub title: String,
    #[serde(default)]
    pub folder_type: Option<i32>,
}

/// Contents of one folder: its own metadata plus file and subfolder entries.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FolderContents {
    pub id: String,
    pub title: String,
    #[serde(default)]
    pub files: Vec<FileItem>,
    #[serde(default)]
    pub folders: Vec<SubfolderItem>,
}

/// Basic metadata for a single file.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FileInfo {
    pub id: String,
    pub title: String,
    #[serde(default)]
    pub folder_id: Option<String>,
    #[serde(default)]
    pub web_url: Option<String>,
}

/// Request for an asynchronous file-copy operation. The result is visible
/// only via subsequent folder listing, not synchronously.
#[derive(Debug, Clone, Serialize)]
pub struct CopyFilesRequest {
    pub file_ids: Vec<String>,
    pub dest_folder_id: String,
    /// Desired title for the copy, when the service supports renaming
    /// during copy. Reconciliation still verifies by listing.
    pub title_hint: Option<String>,
}

/// An externally-visible share link on a file.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExternalLink {
    #[serde(default)]
    pub id: Option<String>,
    #[serde(default)]
    pub title: Option<String>,
    pub access: i32,
    pub internal: bool,
    pub primary: bool,
    #[serde(default)]
    pub url: Option<String>,
    #[serde(default)]
    pub request_token: Option<String>,
}

/// Upsert request for a share link. When `link_id` is set the existing link
/// is updated in place; when omitted a new link is created.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UpsertLinkRequest {
    pub access: i32,
    pub internal: bool,
    pub primary: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub link_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
}

/// The external document-collaboration service, as consumed by docflow.
///
/// Only the operations the reconciliation/provisioning/resolution layers
/// need are modeled; everything else about the service is out of scope.
#[async_trait]
pub trait DocumentService: Send + Sync {
    /// List rooms visible under the given credential scope.
    async fn list_rooms(&self, scope: CredentialScope) -> Result<Vec<RoomSummary>>;

    /// Fetch a room's metadata. Errors if the room is unreachable.
    async fn get_room_info(&self, room_id: &str) -> Result<RoomSummary>;

    /// List a folder's contents.
    async fn get_folder_contents(&self, folder_id: &str) -> Result<FolderContents>;

    /// Issue an asynchronous copy operation. Returns once the operation is
    /// accepted; the created entity must be discovered by re-listing.
    async fn copy_files(&self, req: CopyFilesRequest) -> Result<()>;

    /// Fetch basic file metadata. `Ok(None)` when the file no longer
    /// exists upstream.
    async fn get_file_info(&self, file_id: &str) -> Result<Option<FileInfo>>;

    /// List the external share links of a file.
    async fn get_external_links(
        &self,
        file_id: &str,
        scope: CredentialScope,
    ) -> Result<Vec<ExternalLink>>;

    /// Create or update an external share link on a file.
    async fn upsert_external_link(
        &self,
        file_id: &str,
        req: UpsertLinkRequest,
        scope: CredentialScope,
    ) -> Result<ExternalLink>;
}

// =============================================================================
// SNAPSHOT PERSISTENCE
// =============================================================================

/// Durable storage backend for the state snapshot. The store never talks
/// to the filesystem directly; the backend is injected so tests can run
/// in memory and deployments can choose their own durability.
#[async_trait]
pub trait SnapshotStorage: Send + Sync {
    /// Load the persisted snapshot. `Ok(None)` on first start.
    async fn load(&self) -> Result<Option<Snapshot>>;

    /// Persist the snapshot, replacing any previous one.
    async fn save(&self, snapshot: &Snapshot) -> Result<()>;
}
