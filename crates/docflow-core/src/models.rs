//! Core data models for docflow.
//!
//! These types are shared across all docflow crates and represent the
//! tracked domain entities: flows, projects, contacts, and the snapshot
//! document they persist into.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;

use crate::defaults;

// =============================================================================
// FLOW TYPES
// =============================================================================

/// Lifecycle status of a flow. Archived/unarchived is an orthogonal flag
/// on the terminal states, not a status of its own.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum FlowStatus {
    InProgress,
    Completed,
    Canceled,
}

impl Default for FlowStatus {
    fn default() -> Self {
        FlowStatus::InProgress
    }
}

/// Classification of the document-processing request a flow tracks.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum FlowKind {
    Approval,
    FillSign,
    /// Externally-managed signature flow. Excluded from webhook-driven
    /// status resolution.
    SharedSign,
    Other,
}

impl Default for FlowKind {
    fn default() -> Self {
        FlowKind::Other
    }
}

/// How the flow was created.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum FlowSource {
    Manual,
    BulkLink,
}

/// Kind of entry in a flow's append-only event log.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum FlowEventKind {
    Created,
    Canceled,
    Reopened,
    Completed,
    Archived,
    Unarchived,
}

/// One entry in a flow's audit log. Entries are never mutated or removed
/// except by capacity trimming of the oldest.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FlowEvent {
    pub ts: DateTime<Utc>,
    #[serde(rename = "type")]
    pub kind: FlowEventKind,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub actor_user_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub actor_name: Option<String>,
    /// Type-specific payload (result file info, due date changes, ...).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub details: Option<JsonValue>,
}

impl FlowEvent {
    pub fn new(kind: FlowEventKind, actor_user_id: Option<String>, actor_name: Option<String>) -> Self {
        Self {
            ts: Utc::now(),
            kind,
            actor_user_id,
            actor_name,
            details: None,
        }
    }

    pub fn with_details(mut self, details: JsonValue) -> Self {
        self.details = Some(details);
        self
    }
}

/// One tracked document-processing request, from creation to a terminal
/// status.
///
/// Fields introduced after an entity was first persisted carry
/// `#[serde(default)]` so old snapshots back-fill cleanly on load.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Flow {
    // --- identity ---
    pub id: String,
    /// Shared by flows created together. Defaults to the flow's own id.
    pub group_id: String,

    // --- classification ---
    #[serde(default)]
    pub kind: FlowKind,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub source: Option<FlowSource>,

    // --- external references ---
    pub template_file_id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub template_title: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub file_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub file_title: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub result_file_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub result_file_title: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub result_file_url: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub project_room_id: Option<String>,

    // --- participants ---
    pub created_by_user_id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created_by_name: Option<String>,
    /// Always normalized: trimmed, lower-cased, deduplicated.
    #[serde(default)]
    pub recipient_emails: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub stage_index: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub due_date: Option<DateTime<Utc>>,

    // --- access ---
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub open_url: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub link_request_token: Option<String>,

    // --- lifecycle ---
    #[serde(default)]
    pub status: FlowStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub archived_at: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub archived_by_user_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub archived_by_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub trashed_at: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub canceled_at: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub canceled_by_user_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reopened_at: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reopened_by_user_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub completed_at: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub completed_by_user_id: Option<String>,

    /// Append-only audit log, capped at [`defaults::FLOW_EVENT_CAP`].
    #[serde(default)]
    pub events: Vec<FlowEvent>,

    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,

    /// Monotonic counter bumped on every successful mutation. Makes stale
    /// copies detectable when a webhook resolution and a user transition
    /// touch the same flow.
    #[serde(default)]
    pub version: u64,
}

impl Flow {
    /// Whether this flow is eligible for webhook-driven status resolution:
    /// not archived, not trashed, not already terminal, and not of an
    /// externally-managed kind.
    pub fn is_trackable(&self) -> bool {
        self.status == FlowStatus::InProgress
            && self.archived_at.is_none()
            && self.trashed_at.is_none()
            && self.kind != FlowKind::SharedSign
    }

    /// Append an event, trimming the oldest entries past the cap.
    pub fn push_event(&mut self, event: FlowEvent) {
        self.events.push(event);
        if self.events.len() > defaults::FLOW_EVENT_CAP {
            let excess = self.events.len() - defaults::FLOW_EVENT_CAP;
            self.events.drain(..excess);
        }
    }
}

/// Request for creating a flow. `id`, `template_file_id`, and
/// `created_by_user_id` must be non-empty; validation failure yields `None`
/// from the store rather than an error.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct CreateFlowRequest {
    pub id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub group_id: Option<String>,
    #[serde(default)]
    pub kind: FlowKind,
    #[serde(default)]
    pub source: Option<FlowSource>,
    pub template_file_id: String,
    #[serde(default)]
    pub template_title: Option<String>,
    #[serde(default)]
    pub file_id: Option<String>,
    #[serde(default)]
    pub file_title: Option<String>,
    #[serde(default)]
    pub project_room_id: Option<String>,
    pub created_by_user_id: String,
    #[serde(default)]
    pub created_by_name: Option<String>,
    #[serde(default)]
    pub recipient_emails: Vec<String>,
    #[serde(default)]
    pub stage_index: Option<u32>,
    #[serde(default)]
    pub due_date: Option<DateTime<Utc>>,
    #[serde(default)]
    pub open_url: Option<String>,
    #[serde(default)]
    pub link_request_token: Option<String>,
}

/// Result data supplied when completing a flow. All fields optional; when
/// re-completing, supplied fields overwrite result fields but the original
/// `completed_at` is preserved.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct CompleteFlowRequest {
    #[serde(default)]
    pub result_file_id: Option<String>,
    #[serde(default)]
    pub result_file_title: Option<String>,
    #[serde(default)]
    pub result_file_url: Option<String>,
}

/// Actor attribution for a transition.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct Actor {
    #[serde(default)]
    pub user_id: Option<String>,
    #[serde(default)]
    pub name: Option<String>,
}

impl Actor {
    pub fn system() -> Self {
        Self {
            user_id: None,
            name: Some("system".to_string()),
        }
    }

    pub fn user(id: impl Into<String>, name: Option<String>) -> Self {
        Self {
            user_id: Some(id.into()),
            name,
        }
    }
}

// =============================================================================
// PROJECT / CONTACT TYPES
// =============================================================================

/// A pointer to one external room. Created once, mutated only for archive
/// state, never for its `room_id`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Project {
    pub id: String,
    pub title: String,
    pub room_id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub room_url: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub archived_at: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub archived_by_user_id: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// A per-owner address-book entry. Owned exclusively by `owner_user_id`;
/// no cross-user visibility.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Contact {
    pub id: String,
    pub owner_user_id: String,
    pub name: String,
    /// Normalized: trimmed, lower-cased.
    pub email: String,
    /// Deduplicated, capped at [`defaults::CONTACT_TAG_CAP`].
    #[serde(default)]
    pub tags: Vec<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

// =============================================================================
// SNAPSHOT DOCUMENT
// =============================================================================

/// The persisted state layout: one JSON document loaded wholesale at
/// startup, with serde defaults back-filling fields introduced after an
/// entity was persisted.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Snapshot {
    pub version: u32,
    pub saved_at: DateTime<Utc>,
    #[serde(default)]
    pub flows: Vec<Flow>,
    #[serde(default)]
    pub projects: Vec<Project>,
    #[serde(default)]
    pub contacts: Vec<Contact>,
}

impl Snapshot {
    pub fn empty() -> Self {
        Self {
            version: defaults::SNAPSHOT_VERSION,
            saved_at: Utc::now(),
            flows: Vec::new(),
            projects: Vec::new(),
            contacts: Vec::new(),
        }
    }
}

// =============================================================================
// NORMALIZATION HELPERS
// =============================================================================

/// Trim, lower-case, and deduplicate a list of email addresses,
/// preserving first-seen order and dropping empties.
pub fn normalize_emails(emails: &[String]) -> Vec<String> {
    let mut seen = std::collections::HashSet::new();
    let mut out = Vec::new();
    for e in emails {
        let norm = e.trim().to_lowercase();
        if !norm.is_empty() && seen.insert(norm.clone()) {
            out.push(norm);
        }
    }
    out
}

/// Deduplicate tags (trimmed, first-seen order) and enforce the cap.
pub fn normalize_tags(tags: &[String]) -> Vec<String> {
    let mut seen = std::collections::HashSet::new();
    let mut out = Vec::new();
    for t in tags {
        let trimmed = t.trim().to_string();
        if !trimmed.is_empty() && seen.insert(trimmed.clone()) {
            out.push(trimmed);
            if out.len() == defaults::CONTACT_TAG_CAP {
                break;
            }
        }
    }
    out
}
