//! HTTP client for the external document-collaboration service.
//!
//! Maps the consumed subset of the service's REST API onto the
//! [`DocumentService`] trait. Non-success responses are passed through as
//! [`Error::Upstream`] with the original status and body to aid debugging.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::{Client, RequestBuilder, StatusCode};
use serde::de::DeserializeOwned;
use serde::Deserialize;
use tracing::{debug, info};

use docflow_core::{
    defaults, CopyFilesRequest, CredentialScope, DocumentService, Error, ExternalLink, FileInfo,
    FolderContents, Result, RoomSummary, UpsertLinkRequest,
};

/// Configuration for the external service client.
#[derive(Debug, Clone)]
pub struct DocSpaceConfig {
    pub base_url: String,
    /// Bearer token for the regular user scope.
    pub user_token: String,
    /// Bearer token for the elevated scope used by the link-provisioning
    /// authorization fallback. Absent means no fallback is possible.
    pub admin_token: Option<String>,
    /// Pinned room id. When set, room resolution verifies it instead of
    /// searching by title.
    pub room_id: Option<String>,
    pub timeout_secs: u64,
}

impl DocSpaceConfig {
    /// Create config from environment variables.
    ///
    /// | Variable | Default | Description |
    /// |----------|---------|-------------|
    /// | `DOCSPACE_BASE_URL` | — (required) | Service base URL |
    /// | `DOCSPACE_USER_TOKEN` | — (required) | User-scope bearer token |
    /// | `DOCSPACE_ADMIN_TOKEN` | unset | Admin-scope bearer token |
    /// | `DOCSPACE_ROOM_ID` | unset | Pinned room id |
    /// | `DOCSPACE_TIMEOUT_SECS` | `30` | Request timeout |
    pub fn from_env() -> Result<Self> {
        let base_url = std::env::var("DOCSPACE_BASE_URL")
            .map_err(|_| Error::Config("DOCSPACE_BASE_URL is not set".to_string()))?;
        let user_token = std::env::var("DOCSPACE_USER_TOKEN")
            .map_err(|_| Error::Config("DOCSPACE_USER_TOKEN is not set".to_string()))?;
        let admin_token = std::env::var("DOCSPACE_ADMIN_TOKEN").ok();
        let room_id = std::env::var("DOCSPACE_ROOM_ID").ok().filter(|s| !s.is_empty());
        let timeout_secs = std::env::var("DOCSPACE_TIMEOUT_SECS")
            .ok()
            .and_then(|v| v.parse::<u64>().ok())
            .unwrap_or(defaults::DOCSPACE_TIMEOUT_SECS);
        Ok(Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            user_token,
            admin_token,
            room_id,
            timeout_secs,
        })
    }
}

/// The service wraps every payload in a `{"response": ...}` envelope.
#[derive(Debug, Deserialize)]
struct Envelope<T> {
    response: T,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct WireRoom {
    id: serde_json::Value,
    title: String,
    #[serde(default)]
    room_type: Option<i32>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct WireFile {
    id: serde_json::Value,
    title: String,
    #[serde(default)]
    file_exst: Option<String>,
    #[serde(default)]
    folder_id: Option<serde_json::Value>,
    #[serde(default)]
    web_url: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct WireFolder {
    id: serde_json::Value,
    title: String,
    #[serde(default)]
    room_type: Option<i32>,
    #[serde(default, rename = "type")]
    folder_type: Option<i32>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct WireFolderContents {
    current: WireFolder,
    #[serde(default)]
    files: Vec<WireFile>,
    #[serde(default)]
    folders: Vec<WireFolder>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct WireLink {
    #[serde(default)]
    id: Option<serde_json::Value>,
    #[serde(default)]
    title: Option<String>,
    pub access: i32,
    #[serde(default)]
    pub internal: bool,
    #[serde(default)]
    pub primary: bool,
    #[serde(default)]
    shared_to: Option<WireSharedTo>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct WireSharedTo {
    #[serde(default)]
    share_link: Option<String>,
    #[serde(default)]
    request_token: Option<String>,
}

/// Ids arrive as either numbers or strings depending on entity age.
fn id_string(v: &serde_json::Value) -> String {
    match v {
        serde_json::Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

impl From<WireRoom> for RoomSummary {
    fn from(w: WireRoom) -> Self {
        RoomSummary {
            id: id_string(&w.id),
            title: w.title,
            room_type: w.room_type,
        }
    }
}

impl WireLink {
    fn into_link(self) -> ExternalLink {
        let (url, request_token) = self
            .shared_to
            .map(|s| (s.share_link, s.request_token))
            .unwrap_or((None, None));
        ExternalLink {
            id: self.id.as_ref().map(id_string),
            title: self.title,
            access: self.access,
            internal: self.internal,
            primary: self.primary,
            url,
            request_token,
        }
    }
}

/// Reqwest-backed implementation of [`DocumentService`].
pub struct DocSpaceClient {
    client: Client,
    config: DocSpaceConfig,
}

impl DocSpaceClient {
    pub fn new(config: DocSpaceConfig) -> Result<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(|e| Error::Config(format!("failed to build HTTP client: {}", e)))?;
        info!(base_url = %config.base_url, "document service client initialized");
        Ok(Self { client, config })
    }

    pub fn config(&self) -> &DocSpaceConfig {
        &self.config
    }

    fn token(&self, scope: CredentialScope) -> Result<&str> {
        match scope {
            CredentialScope::User => Ok(&self.config.user_token),
            CredentialScope::Admin => self.config.admin_token.as_deref().ok_or_else(|| {
                Error::Config("admin credential scope requested but no admin token configured".to_string())
            }),
        }
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.config.base_url, path)
    }

    async fn send<T: DeserializeOwned>(&self, req: RequestBuilder) -> Result<T> {
        let resp = req.send().await?;
        let status = resp.status();
        if !status.is_success() {
            let body = resp.text().await.unwrap_or_default();
            return Err(Error::Upstream {
                status: status.as_u16(),
                body,
            });
        }
        let envelope: Envelope<T> = resp.json().await?;
        Ok(envelope.response)
    }
}

#[async_trait]
impl DocumentService for DocSpaceClient {
    async fn list_rooms(&self, scope: CredentialScope) -> Result<Vec<RoomSummary>> {
        #[derive(Deserialize)]
        struct Rooms {
            #[serde(default)]
            folders: Vec<WireRoom>,
        }
        let rooms: Rooms = self
            .send(
                self.client
                    .get(self.url("/api/2.0/files/rooms"))
                    .bearer_auth(self.token(scope)?),
            )
            .await?;
        Ok(rooms.folders.into_iter().map(Into::into).collect())
    }

    async fn get_room_info(&self, room_id: &str) -> Result<RoomSummary> {
        let room: WireRoom = self
            .send(
                self.client
                    .get(self.url(&format!("/api/2.0/files/rooms/{}", room_id)))
                    .bearer_auth(self.token(CredentialScope::User)?),
            )
            .await?;
        Ok(room.into())
    }

    async fn get_folder_contents(&self, folder_id: &str) -> Result<FolderContents> {
        let contents: WireFolderContents = self
            .send(
                self.client
                    .get(self.url(&format!("/api/2.0/files/{}", folder_id)))
                    .bearer_auth(self.token(CredentialScope::User)?),
            )
            .await?;
        Ok(FolderContents {
            id: id_string(&contents.current.id),
            title: contents.current.title,
            files: contents
                .files
                .into_iter()
                .map(|f| docflow_core::FileItem {
                    id: id_string(&f.id),
                    title: f.title,
                    file_extension: f.file_exst,
                })
                .collect(),
            folders: contents
                .folders
                .into_iter()
                .map(|f| docflow_core::SubfolderItem {
                    folder_type: f.folder_type.or(f.room_type),
                    id: id_string(&f.id),
                    title: f.title,
                })
                .collect(),
        })
    }

    async fn copy_files(&self, req: CopyFilesRequest) -> Result<()> {
        debug!(dest = %req.dest_folder_id, files = req.file_ids.len(), "issuing copy operation");
        // The operation is asynchronous upstream; the response only
        // acknowledges acceptance. Results are discovered by re-listing.
        let _: serde_json::Value = self
            .send(
                self.client
                    .post(self.url("/api/2.0/files/fileops/copy"))
                    .bearer_auth(self.token(CredentialScope::User)?)
                    .json(&serde_json::json!({
                        "fileIds": req.file_ids,
                        "destFolderId": req.dest_folder_id,
                        "conflictResolveType": "Duplicate",
                        "deleteAfter": false,
                        "toFillOut": req.title_hint.is_some(),
                    })),
            )
            .await?;
        Ok(())
    }

    async fn get_file_info(&self, file_id: &str) -> Result<Option<FileInfo>> {
        let result: Result<WireFile> = self
            .send(
                self.client
                    .get(self.url(&format!("/api/2.0/files/file/{}", file_id)))
                    .bearer_auth(self.token(CredentialScope::User)?),
            )
            .await;
        match result {
            Ok(f) => Ok(Some(FileInfo {
                id: id_string(&f.id),
                title: f.title,
                folder_id: f.folder_id.as_ref().map(id_string),
                web_url: f.web_url,
            })),
            Err(Error::Upstream { status, .. }) if status == StatusCode::NOT_FOUND.as_u16() => {
                Ok(None)
            }
            Err(e) => Err(e),
        }
    }

    async fn get_external_links(
        &self,
        file_id: &str,
        scope: CredentialScope,
    ) -> Result<Vec<ExternalLink>> {
        let links: Vec<WireLink> = self
            .send(
                self.client
                    .get(self.url(&format!("/api/2.0/files/file/{}/links", file_id)))
                    .bearer_auth(self.token(scope)?),
            )
            .await?;
        Ok(links.into_iter().map(WireLink::into_link).collect())
    }

    async fn upsert_external_link(
        &self,
        file_id: &str,
        req: UpsertLinkRequest,
        scope: CredentialScope,
    ) -> Result<ExternalLink> {
        let link: WireLink = self
            .send(
                self.client
                    .put(self.url(&format!("/api/2.0/files/file/{}/links", file_id)))
                    .bearer_auth(self.token(scope)?)
                    .json(&req),
            )
            .await?;
        Ok(link.into_link())
    }
}
