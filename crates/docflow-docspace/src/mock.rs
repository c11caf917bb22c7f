//! Scriptable in-memory document service for tests.
//!
//! Folder listings are scripted as per-call sequences so tests can model
//! the eventual appearance of an asynchronously-copied file: each
//! `get_folder_contents` call consumes the next scripted listing, and the
//! last one repeats once the script is exhausted.

use std::collections::HashMap;
use std::sync::Mutex;

use async_trait::async_trait;

use docflow_core::{
    CopyFilesRequest, CredentialScope, DocumentService, Error, ExternalLink, FileInfo,
    FolderContents, Result, RoomSummary, UpsertLinkRequest,
};

#[derive(Default)]
struct MockState {
    rooms: Vec<RoomSummary>,
    room_infos: HashMap<String, RoomSummary>,
    /// folder id -> remaining scripted listings (front consumed first).
    folder_scripts: HashMap<String, Vec<FolderContents>>,
    files: HashMap<String, FileInfo>,
    links: HashMap<String, Vec<ExternalLink>>,
    copy_requests: Vec<CopyFilesRequest>,
    upsert_calls: Vec<(String, CredentialScope)>,
    reject_user_upsert: bool,
    next_link_id: u32,
    list_calls: HashMap<String, u32>,
}

/// In-memory [`DocumentService`] implementation for tests.
#[derive(Default)]
pub struct MockDocumentService {
    state: Mutex<MockState>,
}

impl MockDocumentService {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_room(&self, room: RoomSummary) {
        let mut state = self.state.lock().unwrap();
        state.room_infos.insert(room.id.clone(), room.clone());
        state.rooms.push(room);
    }

    /// Script the sequence of listings returned for a folder. The last
    /// listing repeats after the script runs out.
    pub fn script_folder(&self, folder_id: &str, listings: Vec<FolderContents>) {
        self.state
            .lock()
            .unwrap()
            .folder_scripts
            .insert(folder_id.to_string(), listings);
    }

    pub fn add_file(&self, info: FileInfo) {
        self.state.lock().unwrap().files.insert(info.id.clone(), info);
    }

    pub fn set_links(&self, file_id: &str, links: Vec<ExternalLink>) {
        self.state
            .lock()
            .unwrap()
            .links
            .insert(file_id.to_string(), links);
    }

    /// Make user-scope upserts fail with 403 so the admin fallback path
    /// is exercised.
    pub fn reject_user_upserts(&self) {
        self.state.lock().unwrap().reject_user_upsert = true;
    }

    pub fn copy_requests(&self) -> Vec<CopyFilesRequest> {
        self.state.lock().unwrap().copy_requests.clone()
    }

    pub fn upsert_calls(&self) -> Vec<(String, CredentialScope)> {
        self.state.lock().unwrap().upsert_calls.clone()
    }

    /// Number of `get_folder_contents` calls seen for one folder.
    pub fn list_calls(&self, folder_id: &str) -> u32 {
        self.state
            .lock()
            .unwrap()
            .list_calls
            .get(folder_id)
            .copied()
            .unwrap_or(0)
    }
}

#[async_trait]
impl DocumentService for MockDocumentService {
    async fn list_rooms(&self, _scope: CredentialScope) -> Result<Vec<RoomSummary>> {
        Ok(self.state.lock().unwrap().rooms.clone())
    }

    async fn get_room_info(&self, room_id: &str) -> Result<RoomSummary> {
        self.state
            .lock()
            .unwrap()
            .room_infos
            .get(room_id)
            .cloned()
            .ok_or_else(|| Error::Upstream {
                status: 404,
                body: format!("room {} not found", room_id),
            })
    }

    async fn get_folder_contents(&self, folder_id: &str) -> Result<FolderContents> {
        let mut state = self.state.lock().unwrap();
        *state.list_calls.entry(folder_id.to_string()).or_insert(0) += 1;
        let script = state
            .folder_scripts
            .get_mut(folder_id)
            .ok_or_else(|| Error::Upstream {
                status: 404,
                body: format!("folder {} not found", folder_id),
            })?;
        let listing = if script.len() > 1 {
            script.remove(0)
        } else {
            script
                .first()
                .cloned()
                .ok_or_else(|| Error::Internal(format!("empty script for folder {}", folder_id)))?
        };
        Ok(listing)
    }

    async fn copy_files(&self, req: CopyFilesRequest) -> Result<()> {
        self.state.lock().unwrap().copy_requests.push(req);
        Ok(())
    }

    async fn get_file_info(&self, file_id: &str) -> Result<Option<FileInfo>> {
        Ok(self.state.lock().unwrap().files.get(file_id).cloned())
    }

    async fn get_external_links(
        &self,
        file_id: &str,
        _scope: CredentialScope,
    ) -> Result<Vec<ExternalLink>> {
        Ok(self
            .state
            .lock()
            .unwrap()
            .links
            .get(file_id)
            .cloned()
            .unwrap_or_default())
    }

    async fn upsert_external_link(
        &self,
        file_id: &str,
        req: UpsertLinkRequest,
        scope: CredentialScope,
    ) -> Result<ExternalLink> {
        let mut state = self.state.lock().unwrap();
        state.upsert_calls.push((file_id.to_string(), scope));

        if scope == CredentialScope::User && state.reject_user_upsert {
            return Err(Error::Upstream {
                status: 403,
                body: "forbidden".to_string(),
            });
        }

        let link_id = match &req.link_id {
            Some(id) => id.clone(),
            None => {
                state.next_link_id += 1;
                format!("link-{}", state.next_link_id)
            }
        };
        let link = ExternalLink {
            id: Some(link_id.clone()),
            title: req.title.clone(),
            access: req.access,
            internal: req.internal,
            primary: req.primary,
            url: Some(format!("https://mock/share/{}", link_id)),
            request_token: Some(format!("token-{}", link_id)),
        };

        let links = state.links.entry(file_id.to_string()).or_default();
        if let Some(existing) = links
            .iter_mut()
            .find(|l| l.id.as_deref() == Some(link_id.as_str()))
        {
            *existing = link.clone();
        } else {
            links.push(link.clone());
        }
        Ok(link)
    }
}
