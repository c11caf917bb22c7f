//! The authoritative flow repository and its state machine.
//!
//! All entity mutation happens behind one exclusive async lock held across
//! each read-modify-write, so a webhook-driven resolution and a user-driven
//! transition for the same flow serialize rather than clobbering each
//! other. Transition operations fail soft — when a transition is not legal
//! from the current state they return the flow unchanged — because webhook
//! resolution calls them speculatively.

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use chrono::Utc;
use tokio::sync::{Notify, RwLock};
use tracing::{debug, info};

use docflow_core::{
    normalize_emails, normalize_tags, Actor, CompleteFlowRequest, Contact, CreateFlowRequest,
    Flow, FlowEvent, FlowEventKind, FlowStatus, Project, Result, Snapshot, SnapshotStorage,
    defaults,
};

struct Entities {
    flows: HashMap<String, Flow>,
    projects: HashMap<String, Project>,
    contacts: HashMap<String, Contact>,
}

impl Entities {
    fn from_snapshot(snapshot: Snapshot) -> Self {
        Self {
            flows: snapshot.flows.into_iter().map(|f| (f.id.clone(), f)).collect(),
            projects: snapshot
                .projects
                .into_iter()
                .map(|p| (p.id.clone(), p))
                .collect(),
            contacts: snapshot
                .contacts
                .into_iter()
                .map(|c| (c.id.clone(), c))
                .collect(),
        }
    }

    fn to_snapshot(&self) -> Snapshot {
        Snapshot {
            version: defaults::SNAPSHOT_VERSION,
            saved_at: Utc::now(),
            flows: self.flows.values().cloned().collect(),
            projects: self.projects.values().cloned().collect(),
            contacts: self.contacts.values().cloned().collect(),
        }
    }
}

/// The persisted repository of Flow, Project, and Contact entities.
///
/// Mutations mark the store dirty and wake the persister task, which
/// coalesces a burst of mutations into one snapshot write after the
/// debounce window (see [`crate::persister`]).
pub struct FlowStore {
    entities: RwLock<Entities>,
    storage: Arc<dyn SnapshotStorage>,
    dirty: AtomicBool,
    wakeup: Notify,
}

impl FlowStore {
    /// Load the snapshot from storage and build the store. Entities
    /// persisted by older versions are back-filled with defaults by serde.
    pub async fn load(storage: Arc<dyn SnapshotStorage>) -> Result<Self> {
        let snapshot = storage.load().await?.unwrap_or_else(Snapshot::empty);
        info!(
            flows = snapshot.flows.len(),
            projects = snapshot.projects.len(),
            contacts = snapshot.contacts.len(),
            "flow store loaded"
        );
        Ok(Self {
            entities: RwLock::new(Entities::from_snapshot(snapshot)),
            storage,
            dirty: AtomicBool::new(false),
            wakeup: Notify::new(),
        })
    }

    fn mark_dirty(&self) {
        self.dirty.store(true, Ordering::SeqCst);
        self.wakeup.notify_one();
    }

    pub(crate) async fn wait_dirty(&self) {
        self.wakeup.notified().await;
    }

    pub(crate) fn take_dirty(&self) -> bool {
        self.dirty.swap(false, Ordering::SeqCst)
    }

    /// Serialize the current state. Used by the persister and by shutdown.
    pub async fn snapshot(&self) -> Snapshot {
        self.entities.read().await.to_snapshot()
    }

    /// Write the current state through to storage immediately, bypassing
    /// the debounce window. Used at shutdown.
    pub async fn flush(&self) -> Result<()> {
        let snapshot = self.snapshot().await;
        self.dirty.store(false, Ordering::SeqCst);
        self.storage.save(&snapshot).await
    }

    pub(crate) fn storage(&self) -> Arc<dyn SnapshotStorage> {
        self.storage.clone()
    }

    // =========================================================================
    // FLOW CREATION
    // =========================================================================

    /// Create a flow. Returns `None` when a required field (`id`,
    /// `template_file_id`, `created_by_user_id`) is empty or the id is
    /// already taken — callers must translate `None` into a user-facing
    /// validation error.
    pub async fn create_flow(&self, req: CreateFlowRequest) -> Option<Flow> {
        if req.id.trim().is_empty()
            || req.template_file_id.trim().is_empty()
            || req.created_by_user_id.trim().is_empty()
        {
            debug!("flow creation rejected: missing required field");
            return None;
        }

        let mut entities = self.entities.write().await;
        if entities.flows.contains_key(&req.id) {
            debug!(flow_id = %req.id, "flow creation rejected: id already exists");
            return None;
        }

        let now = Utc::now();
        let mut flow = Flow {
            group_id: req.group_id.clone().unwrap_or_else(|| req.id.clone()),
            id: req.id,
            kind: req.kind,
            source: req.source,
            template_file_id: req.template_file_id,
            template_title: req.template_title,
            file_id: req.file_id,
            file_title: req.file_title,
            result_file_id: None,
            result_file_title: None,
            result_file_url: None,
            project_room_id: req.project_room_id,
            created_by_name: req.created_by_name.clone(),
            created_by_user_id: req.created_by_user_id.clone(),
            recipient_emails: normalize_emails(&req.recipient_emails),
            stage_index: req.stage_index,
            due_date: req.due_date,
            open_url: req.open_url,
            link_request_token: req.link_request_token,
            status: FlowStatus::InProgress,
            archived_at: None,
            archived_by_user_id: None,
            archived_by_name: None,
            trashed_at: None,
            canceled_at: None,
            canceled_by_user_id: None,
            reopened_at: None,
            reopened_by_user_id: None,
            completed_at: None,
            completed_by_user_id: None,
            events: Vec::new(),
            created_at: now,
            updated_at: now,
            version: 0,
        };
        flow.push_event(FlowEvent::new(
            FlowEventKind::Created,
            Some(req.created_by_user_id),
            req.created_by_name,
        ));

        entities.flows.insert(flow.id.clone(), flow.clone());
        drop(entities);
        self.mark_dirty();
        Some(flow)
    }

    // =========================================================================
    // FLOW TRANSITIONS
    // =========================================================================

    /// InProgress → Canceled. No-op when already Canceled or Completed
    /// (Completed is protected from cancellation).
    pub async fn cancel_flow(&self, id: &str, actor: &Actor) -> Option<Flow> {
        let mut entities = self.entities.write().await;
        let flow = entities.flows.get_mut(id)?;
        if flow.status != FlowStatus::InProgress {
            return Some(flow.clone());
        }

        flow.status = FlowStatus::Canceled;
        flow.canceled_at = Some(Utc::now());
        flow.canceled_by_user_id = actor.user_id.clone();
        Self::touch(flow, FlowEventKind::Canceled, actor);
        let result = flow.clone();
        drop(entities);
        self.mark_dirty();
        Some(result)
    }

    /// Canceled → InProgress only. No-op from InProgress or Completed.
    pub async fn reopen_flow(&self, id: &str, actor: &Actor) -> Option<Flow> {
        let mut entities = self.entities.write().await;
        let flow = entities.flows.get_mut(id)?;
        if flow.status != FlowStatus::Canceled {
            return Some(flow.clone());
        }

        flow.status = FlowStatus::InProgress;
        flow.reopened_at = Some(Utc::now());
        flow.reopened_by_user_id = actor.user_id.clone();
        Self::touch(flow, FlowEventKind::Reopened, actor);
        let result = flow.clone();
        drop(entities);
        self.mark_dirty();
        Some(result)
    }

    /// Any non-Canceled status → Completed. No-op when Canceled.
    /// Re-completing preserves the original `completed_at`; supplied result
    /// fields still overwrite, so late-arriving result data is not lost.
    pub async fn complete_flow(
        &self,
        id: &str,
        actor: &Actor,
        req: CompleteFlowRequest,
    ) -> Option<Flow> {
        let mut entities = self.entities.write().await;
        let flow = entities.flows.get_mut(id)?;
        if flow.status == FlowStatus::Canceled {
            return Some(flow.clone());
        }

        let has_new_result = req.result_file_id.is_some()
            || req.result_file_title.is_some()
            || req.result_file_url.is_some();
        let already_completed = flow.status == FlowStatus::Completed;

        if already_completed && !has_new_result {
            return Some(flow.clone());
        }

        if let Some(v) = req.result_file_id {
            flow.result_file_id = Some(v);
        }
        if let Some(v) = req.result_file_title {
            flow.result_file_title = Some(v);
        }
        if let Some(v) = req.result_file_url {
            flow.result_file_url = Some(v);
        }

        if !already_completed {
            flow.status = FlowStatus::Completed;
            flow.completed_at = Some(Utc::now());
            flow.completed_by_user_id = actor.user_id.clone();
            let mut event = FlowEvent::new(
                FlowEventKind::Completed,
                actor.user_id.clone(),
                actor.name.clone(),
            );
            if has_new_result {
                event = event.with_details(serde_json::json!({
                    "result_file_id": flow.result_file_id,
                    "result_file_title": flow.result_file_title,
                    "result_file_url": flow.result_file_url,
                }));
            }
            flow.push_event(event);
            flow.updated_at = Utc::now();
            flow.version += 1;
        } else {
            // Result-data refresh on an already-completed flow: bump
            // version and updated_at without a second "completed" event.
            flow.version += 1;
            flow.updated_at = Utc::now();
        }

        let result = flow.clone();
        drop(entities);
        self.mark_dirty();
        Some(result)
    }

    /// Allowed only when status is terminal and `archived_at` is null.
    pub async fn archive_flow(&self, id: &str, actor: &Actor) -> Option<Flow> {
        let mut entities = self.entities.write().await;
        let flow = entities.flows.get_mut(id)?;
        let terminal = matches!(flow.status, FlowStatus::Completed | FlowStatus::Canceled);
        if !terminal || flow.archived_at.is_some() {
            return Some(flow.clone());
        }

        flow.archived_at = Some(Utc::now());
        flow.archived_by_user_id = actor.user_id.clone();
        flow.archived_by_name = actor.name.clone();
        Self::touch(flow, FlowEventKind::Archived, actor);
        let result = flow.clone();
        drop(entities);
        self.mark_dirty();
        Some(result)
    }

    /// Allowed only when `archived_at` is set.
    pub async fn unarchive_flow(&self, id: &str, actor: &Actor) -> Option<Flow> {
        let mut entities = self.entities.write().await;
        let flow = entities.flows.get_mut(id)?;
        if flow.archived_at.is_none() {
            return Some(flow.clone());
        }

        flow.archived_at = None;
        flow.archived_by_user_id = None;
        flow.archived_by_name = None;
        Self::touch(flow, FlowEventKind::Unarchived, actor);
        let result = flow.clone();
        drop(entities);
        self.mark_dirty();
        Some(result)
    }

    fn touch(flow: &mut Flow, kind: FlowEventKind, actor: &Actor) {
        flow.push_event(FlowEvent::new(
            kind,
            actor.user_id.clone(),
            actor.name.clone(),
        ));
        flow.updated_at = Utc::now();
        flow.version += 1;
    }

    // =========================================================================
    // FLOW READS
    // =========================================================================

    pub async fn get_flow(&self, id: &str) -> Option<Flow> {
        self.entities.read().await.flows.get(id).cloned()
    }

    pub async fn get_flow_events(&self, id: &str) -> Option<Vec<FlowEvent>> {
        self.entities
            .read()
            .await
            .flows
            .get(id)
            .map(|f| f.events.clone())
    }

    /// Flows the user created or is a recipient of, reverse-chronological.
    pub async fn list_flows_for_user(&self, user_id: &str, email: Option<&str>) -> Vec<Flow> {
        let email = email.map(|e| e.trim().to_lowercase());
        let entities = self.entities.read().await;
        let mut flows: Vec<Flow> = entities
            .flows
            .values()
            .filter(|f| {
                f.created_by_user_id == user_id
                    || email
                        .as_deref()
                        .is_some_and(|e| f.recipient_emails.iter().any(|r| r == e))
            })
            .cloned()
            .collect();
        flows.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        flows
    }

    /// Flows attached to one external room, reverse-chronological.
    pub async fn list_flows_for_room(&self, room_id: &str) -> Vec<Flow> {
        let entities = self.entities.read().await;
        let mut flows: Vec<Flow> = entities
            .flows
            .values()
            .filter(|f| f.project_room_id.as_deref() == Some(room_id))
            .cloned()
            .collect();
        flows.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        flows
    }

    /// Flows in a group, chronological ascending.
    pub async fn list_flows_for_group(&self, group_id: &str) -> Vec<Flow> {
        let entities = self.entities.read().await;
        let mut flows: Vec<Flow> = entities
            .flows
            .values()
            .filter(|f| f.group_id == group_id)
            .cloned()
            .collect();
        flows.sort_by(|a, b| a.created_at.cmp(&b.created_at));
        flows
    }

    /// All flows, reverse-chronological.
    pub async fn list_flows(&self) -> Vec<Flow> {
        let entities = self.entities.read().await;
        let mut flows: Vec<Flow> = entities.flows.values().cloned().collect();
        flows.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        flows
    }

    /// Trackable flows matching any of the candidate room/file ids,
    /// deduplicated by flow id. Used by webhook resolution.
    pub async fn find_trackable_flows(
        &self,
        room_ids: &[String],
        file_ids: &[String],
    ) -> Vec<Flow> {
        let entities = self.entities.read().await;
        let mut out: Vec<Flow> = Vec::new();
        for flow in entities.flows.values() {
            if !flow.is_trackable() {
                continue;
            }
            let room_hit = flow
                .project_room_id
                .as_deref()
                .is_some_and(|r| room_ids.iter().any(|c| c == r));
            let file_hit = file_ids.iter().any(|c| {
                flow.file_id.as_deref() == Some(c.as_str())
                    || flow.result_file_id.as_deref() == Some(c.as_str())
            });
            if room_hit || file_hit {
                out.push(flow.clone());
            }
        }
        out.sort_by(|a, b| a.id.cmp(&b.id));
        out
    }

    // =========================================================================
    // PROJECTS
    // =========================================================================

    pub async fn create_project(
        &self,
        title: &str,
        room_id: &str,
        room_url: Option<String>,
    ) -> Option<Project> {
        if title.trim().is_empty() || room_id.trim().is_empty() {
            return None;
        }
        let now = Utc::now();
        let project = Project {
            id: uuid::Uuid::new_v4().to_string(),
            title: title.trim().to_string(),
            room_id: room_id.to_string(),
            room_url,
            archived_at: None,
            archived_by_user_id: None,
            created_at: now,
            updated_at: now,
        };
        self.entities
            .write()
            .await
            .projects
            .insert(project.id.clone(), project.clone());
        self.mark_dirty();
        Some(project)
    }

    pub async fn get_project(&self, id: &str) -> Option<Project> {
        self.entities.read().await.projects.get(id).cloned()
    }

    pub async fn list_projects(&self) -> Vec<Project> {
        let entities = self.entities.read().await;
        let mut projects: Vec<Project> = entities.projects.values().cloned().collect();
        projects.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        projects
    }

    /// Archive state is the only mutable part of a project; `room_id`
    /// never changes.
    pub async fn set_project_archived(
        &self,
        id: &str,
        archived: bool,
        actor: &Actor,
    ) -> Option<Project> {
        let mut entities = self.entities.write().await;
        let project = entities.projects.get_mut(id)?;
        if archived {
            project.archived_at = Some(Utc::now());
            project.archived_by_user_id = actor.user_id.clone();
        } else {
            project.archived_at = None;
            project.archived_by_user_id = None;
        }
        project.updated_at = Utc::now();
        let result = project.clone();
        drop(entities);
        self.mark_dirty();
        Some(result)
    }

    pub async fn delete_project(&self, id: &str) -> bool {
        let removed = self.entities.write().await.projects.remove(id).is_some();
        if removed {
            self.mark_dirty();
        }
        removed
    }

    // =========================================================================
    // CONTACTS
    // =========================================================================

    pub async fn create_contact(
        &self,
        owner_user_id: &str,
        name: &str,
        email: &str,
        tags: &[String],
    ) -> Option<Contact> {
        let email_norm = email.trim().to_lowercase();
        if owner_user_id.trim().is_empty() || name.trim().is_empty() || email_norm.is_empty() {
            return None;
        }
        let now = Utc::now();
        let contact = Contact {
            id: uuid::Uuid::new_v4().to_string(),
            owner_user_id: owner_user_id.to_string(),
            name: name.trim().to_string(),
            email: email_norm,
            tags: normalize_tags(tags),
            created_at: now,
            updated_at: now,
        };
        self.entities
            .write()
            .await
            .contacts
            .insert(contact.id.clone(), contact.clone());
        self.mark_dirty();
        Some(contact)
    }

    /// Contacts visible to one owner only.
    pub async fn list_contacts(&self, owner_user_id: &str) -> Vec<Contact> {
        let entities = self.entities.read().await;
        let mut contacts: Vec<Contact> = entities
            .contacts
            .values()
            .filter(|c| c.owner_user_id == owner_user_id)
            .cloned()
            .collect();
        contacts.sort_by(|a, b| a.name.cmp(&b.name));
        contacts
    }

    pub async fn update_contact(
        &self,
        owner_user_id: &str,
        id: &str,
        name: Option<&str>,
        email: Option<&str>,
        tags: Option<&[String]>,
    ) -> Option<Contact> {
        let mut entities = self.entities.write().await;
        let contact = entities.contacts.get_mut(id)?;
        if contact.owner_user_id != owner_user_id {
            return None;
        }
        if let Some(name) = name {
            if !name.trim().is_empty() {
                contact.name = name.trim().to_string();
            }
        }
        if let Some(email) = email {
            let norm = email.trim().to_lowercase();
            if !norm.is_empty() {
                contact.email = norm;
            }
        }
        if let Some(tags) = tags {
            contact.tags = normalize_tags(tags);
        }
        contact.updated_at = Utc::now();
        let result = contact.clone();
        drop(entities);
        self.mark_dirty();
        Some(result)
    }

    pub async fn delete_contact(&self, owner_user_id: &str, id: &str) -> bool {
        let mut entities = self.entities.write().await;
        let owned = entities
            .contacts
            .get(id)
            .is_some_and(|c| c.owner_user_id == owner_user_id);
        if !owned {
            return false;
        }
        entities.contacts.remove(id);
        drop(entities);
        self.mark_dirty();
        true
    }
}
