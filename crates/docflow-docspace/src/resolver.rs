//! Room and folder resolution.
//!
//! Display titles in the external hierarchy are localized and freely
//! renamed, so the resolver anchors on what is stable: a pinned room id
//! when configured, and numeric folder-type codes for subfolders. Title
//! matching is the fallback, never the primary path.

use std::sync::Arc;

use tracing::{debug, warn};

use docflow_core::{
    defaults, CredentialScope, DocumentService, Error, Result, RoomSummary, SubfolderItem,
};

/// Configuration for room resolution.
#[derive(Debug, Clone, Default)]
pub struct ResolverConfig {
    /// Pinned room id; verified rather than searched when present.
    pub room_id: Option<String>,
    /// Candidate titles tried in order when searching. Empty means the
    /// built-in defaults.
    pub title_candidates: Vec<String>,
}

impl ResolverConfig {
    fn candidates(&self) -> Vec<&str> {
        if self.title_candidates.is_empty() {
            defaults::ROOM_TITLE_CANDIDATES.to_vec()
        } else {
            self.title_candidates.iter().map(|s| s.as_str()).collect()
        }
    }
}

/// The semantic subfolders of a resolved room. The templates folder falls
/// back to the room root when no dedicated subfolder exists.
#[derive(Debug, Clone)]
pub struct RoomFolders {
    pub room: RoomSummary,
    pub templates_folder_id: String,
    pub in_process_folder_id: Option<String>,
    pub complete_folder_id: Option<String>,
}

/// Locates a semantically-typed room and its semantic subfolders.
pub struct RoomFolderResolver {
    service: Arc<dyn DocumentService>,
    config: ResolverConfig,
}

impl RoomFolderResolver {
    pub fn new(service: Arc<dyn DocumentService>, config: ResolverConfig) -> Self {
        Self { service, config }
    }

    /// Resolve the target room. A configured room id is verified for
    /// reachability; otherwise rooms are searched by candidate title,
    /// exact case-insensitive match first, substring second.
    pub async fn resolve_room(&self) -> Result<RoomSummary> {
        if let Some(room_id) = &self.config.room_id {
            let room = self.service.get_room_info(room_id).await?;
            debug!(room_id = %room.id, title = %room.title, "configured room verified");
            return Ok(room);
        }

        let rooms = self.service.list_rooms(CredentialScope::User).await?;
        let candidates = self.config.candidates();

        for candidate in &candidates {
            if let Some(room) = rooms
                .iter()
                .find(|r| r.title.eq_ignore_ascii_case(candidate))
            {
                debug!(room_id = %room.id, title = %room.title, "room matched by exact title");
                return Ok(room.clone());
            }
        }

        for candidate in &candidates {
            let needle = candidate.to_lowercase();
            if let Some(room) = rooms
                .iter()
                .find(|r| r.title.to_lowercase().contains(&needle))
            {
                warn!(room_id = %room.id, title = %room.title, "room matched by substring fallback");
                return Ok(room.clone());
            }
        }

        Err(Error::NotFound(format!(
            "no room matched any candidate title [{}] among {} visible rooms",
            candidates.join(", "),
            rooms.len()
        )))
    }

    /// Resolve the semantic subfolders within a room. Numeric folder-type
    /// codes win over localized titles; titles are consulted only when no
    /// folder carries a recognized code.
    pub async fn resolve_folders(&self, room: &RoomSummary) -> Result<RoomFolders> {
        let contents = self.service.get_folder_contents(&room.id).await?;

        let templates = pick_folder(
            &contents.folders,
            defaults::folder_type::TEMPLATES,
            defaults::folder_title::TEMPLATES,
        );
        let in_process = pick_folder(
            &contents.folders,
            defaults::folder_type::IN_PROCESS,
            defaults::folder_title::IN_PROCESS,
        );
        let complete = pick_folder(
            &contents.folders,
            defaults::folder_type::COMPLETE,
            defaults::folder_title::COMPLETE,
        );

        Ok(RoomFolders {
            templates_folder_id: templates
                .map(|f| f.id.clone())
                .unwrap_or_else(|| room.id.clone()),
            in_process_folder_id: in_process.map(|f| f.id.clone()),
            complete_folder_id: complete.map(|f| f.id.clone()),
            room: room.clone(),
        })
    }
}

/// Folder-type code first; localized title only when codes are absent or
/// unrecognized.
fn pick_folder<'a>(
    folders: &'a [SubfolderItem],
    type_code: i32,
    titles: &[&str],
) -> Option<&'a SubfolderItem> {
    if let Some(by_code) = folders.iter().find(|f| f.folder_type == Some(type_code)) {
        return Some(by_code);
    }
    folders.iter().find(|f| {
        titles
            .iter()
            .any(|t| f.title.eq_ignore_ascii_case(t))
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn folder(id: &str, title: &str, folder_type: Option<i32>) -> SubfolderItem {
        SubfolderItem {
            id: id.to_string(),
            title: title.to_string(),
            folder_type,
        }
    }

    #[test]
    fn test_pick_folder_prefers_type_code_over_title() {
        // A renamed/localized folder with the right code beats a folder
        // whose title happens to match.
        let folders = vec![
            folder("a", "Complete", None),
            folder("b", "Fertig", Some(defaults::folder_type::COMPLETE)),
        ];
        let picked = pick_folder(
            &folders,
            defaults::folder_type::COMPLETE,
            defaults::folder_title::COMPLETE,
        )
        .unwrap();
        assert_eq!(picked.id, "b");
    }

    #[test]
    fn test_pick_folder_title_fallback_when_no_codes() {
        let folders = vec![
            folder("a", "Misc", None),
            folder("b", "complete", None),
        ];
        let picked = pick_folder(
            &folders,
            defaults::folder_type::COMPLETE,
            defaults::folder_title::COMPLETE,
        )
        .unwrap();
        assert_eq!(picked.id, "b");
    }

    #[test]
    fn test_pick_folder_none_when_nothing_matches() {
        let folders = vec![folder("a", "Misc", Some(99))];
        assert!(pick_folder(
            &folders,
            defaults::folder_type::TEMPLATES,
            defaults::folder_title::TEMPLATES,
        )
        .is_none());
    }
}
