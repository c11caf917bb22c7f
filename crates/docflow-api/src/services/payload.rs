//! Webhook payload identifier extraction.
//!
//! The external service's webhook payloads are not contractually versioned.
//! A typed parse of the shapes observed in practice is attempted first; when
//! it yields nothing, a bounded-depth recursive walk over the whole payload
//! collects values under a fixed set of case-insensitive key aliases. The
//! walker is a compatibility shim for upstream schema drift, not the
//! primary contract.

use serde::Deserialize;
use serde_json::Value;

use docflow_core::defaults;

// =============================================================================
// EXTRACTED REFERENCES
// =============================================================================

/// Candidate identifiers found in one payload, deduplicated, first-seen
/// order preserved.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PayloadRefs {
    pub room_ids: Vec<String>,
    pub folder_ids: Vec<String>,
    pub file_ids: Vec<String>,
}

impl PayloadRefs {
    pub fn is_empty(&self) -> bool {
        self.room_ids.is_empty() && self.folder_ids.is_empty() && self.file_ids.is_empty()
    }

    fn push_room(&mut self, id: String) {
        push_unique(&mut self.room_ids, id);
    }

    fn push_folder(&mut self, id: String) {
        push_unique(&mut self.folder_ids, id);
    }

    fn push_file(&mut self, id: String) {
        push_unique(&mut self.file_ids, id);
    }
}

fn push_unique(ids: &mut Vec<String>, id: String) {
    if !id.is_empty() && !ids.contains(&id) {
        ids.push(id);
    }
}

/// Identifier value as a string. The service sends ids as numbers or
/// strings depending on the entity and the payload vintage.
fn id_str(value: &Value) -> Option<String> {
    match value {
        Value::String(s) => {
            let trimmed = s.trim();
            (!trimmed.is_empty()).then(|| trimmed.to_string())
        }
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

// =============================================================================
// TYPED PAYLOAD (preferred)
// =============================================================================

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
struct TypedPayload {
    file_id: Option<Value>,
    room_id: Option<Value>,
    folder_id: Option<Value>,
    parent_id: Option<Value>,
    file: Option<TypedFile>,
    room: Option<TypedEntity>,
    folder: Option<TypedEntity>,
    data: Option<Box<TypedPayload>>,
    payload: Option<Box<TypedPayload>>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
struct TypedFile {
    id: Option<Value>,
    folder_id: Option<Value>,
    room_id: Option<Value>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
struct TypedEntity {
    id: Option<Value>,
}

fn collect_typed(payload: &TypedPayload, refs: &mut PayloadRefs) {
    if let Some(id) = payload.file_id.as_ref().and_then(id_str) {
        refs.push_file(id);
    }
    if let Some(id) = payload.room_id.as_ref().and_then(id_str) {
        refs.push_room(id);
    }
    if let Some(id) = payload.folder_id.as_ref().and_then(id_str) {
        refs.push_folder(id);
    }
    if let Some(id) = payload.parent_id.as_ref().and_then(id_str) {
        refs.push_folder(id);
    }
    if let Some(file) = &payload.file {
        if let Some(id) = file.id.as_ref().and_then(id_str) {
            refs.push_file(id);
        }
        if let Some(id) = file.folder_id.as_ref().and_then(id_str) {
            refs.push_folder(id);
        }
        if let Some(id) = file.room_id.as_ref().and_then(id_str) {
            refs.push_room(id);
        }
    }
    if let Some(room) = &payload.room {
        if let Some(id) = room.id.as_ref().and_then(id_str) {
            refs.push_room(id);
        }
    }
    if let Some(folder) = &payload.folder {
        if let Some(id) = folder.id.as_ref().and_then(id_str) {
            refs.push_folder(id);
        }
    }
    if let Some(inner) = &payload.data {
        collect_typed(inner, refs);
    }
    if let Some(inner) = &payload.payload {
        collect_typed(inner, refs);
    }
}

// =============================================================================
// GENERIC WALKER (fallback)
// =============================================================================

const FILE_ID_KEYS: &[&str] = &["fileid", "file_id", "resultfileid", "result_file_id"];
const ROOM_ID_KEYS: &[&str] = &["roomid", "room_id", "originalroomid"];
const FOLDER_ID_KEYS: &[&str] = &["folderid", "folder_id"];
const PARENT_ID_KEYS: &[&str] = &[
    "parentid",
    "parent_id",
    "destfolderid",
    "dest_folder_id",
    "tofolderid",
    "to_folder_id",
];

fn walk(value: &Value, depth: usize, refs: &mut PayloadRefs) {
    if depth > defaults::WEBHOOK_WALK_DEPTH {
        return;
    }
    match value {
        Value::Object(map) => {
            for (key, v) in map {
                let k = key.to_lowercase();
                if let Some(id) = id_str(v) {
                    if FILE_ID_KEYS.contains(&k.as_str()) {
                        refs.push_file(id);
                        continue;
                    }
                    if ROOM_ID_KEYS.contains(&k.as_str()) {
                        refs.push_room(id);
                        continue;
                    }
                    if FOLDER_ID_KEYS.contains(&k.as_str()) || PARENT_ID_KEYS.contains(&k.as_str())
                    {
                        refs.push_folder(id);
                        continue;
                    }
                }
                walk(v, depth + 1, refs);
            }
        }
        Value::Array(items) => {
            for item in items {
                walk(item, depth + 1, refs);
            }
        }
        _ => {}
    }
}

// =============================================================================
// ENTRY POINT
// =============================================================================

/// Extract candidate room/folder/file ids from a webhook payload. Typed
/// parse first, generic walker only when the typed parse finds nothing.
pub fn extract_refs(payload: &Value) -> PayloadRefs {
    let mut refs = PayloadRefs::default();
    if let Ok(typed) = serde_json::from_value::<TypedPayload>(payload.clone()) {
        collect_typed(&typed, &mut refs);
    }
    if refs.is_empty() {
        walk(payload, 0, &mut refs);
    }
    refs
}
