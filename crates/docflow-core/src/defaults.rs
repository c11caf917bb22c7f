//! Centralized default constants for docflow.
//!
//! **This module is the single source of truth** for shared default values.
//! All crates reference these constants instead of defining their own magic
//! numbers. When adding new constants, place them in the appropriate section
//! and document the rationale for the chosen value.

// =============================================================================
// FLOW STORE
// =============================================================================

/// Maximum entries in a flow's event log. Oldest entries are dropped first.
pub const FLOW_EVENT_CAP: usize = 200;

/// Maximum tags per contact. Extra tags are dropped at the cap.
pub const CONTACT_TAG_CAP: usize = 12;

/// Debounce window for snapshot persistence, in milliseconds. Mutations
/// within the window coalesce into one durable write (last-state-wins).
pub const SNAPSHOT_DEBOUNCE_MS: u64 = 200;

/// Current snapshot document schema version.
pub const SNAPSHOT_VERSION: u32 = 3;

/// Default snapshot file path.
pub const SNAPSHOT_PATH: &str = "docflow-state.json";

// =============================================================================
// RECONCILIATION
// =============================================================================

/// Retry budget for the reconciliation poller. Fixed, non-adaptive.
pub const RECONCILE_ATTEMPTS: u32 = 8;

/// Delay between reconciliation attempts, in milliseconds.
pub const RECONCILE_DELAY_MS: u64 = 450;

// =============================================================================
// EXTERNAL DOCUMENT SERVICE
// =============================================================================

/// Request timeout for external service calls, in seconds.
pub const DOCSPACE_TIMEOUT_SECS: u64 = 30;

/// Signature header carried by inbound webhook requests.
pub const WEBHOOK_SIGNATURE_HEADER: &str = "x-docspace-signature";

/// Maximum recursion depth for the generic webhook payload walker.
pub const WEBHOOK_WALK_DEPTH: usize = 64;

// =============================================================================
// ROOM / FOLDER RESOLUTION
// =============================================================================

/// Room titles tried, in order, when no room id is configured.
/// Exact case-insensitive match first, then substring fallback.
pub const ROOM_TITLE_CANDIDATES: &[&str] = &["Document Flows", "Flows", "Workflow"];

/// Stable numeric folder-type codes published by the external service's
/// schema. These survive localization and renaming, so they are matched
/// before display titles.
pub mod folder_type {
    /// Folder holding source templates.
    pub const TEMPLATES: i32 = 25;
    /// Folder holding documents currently being processed.
    pub const IN_PROCESS: i32 = 26;
    /// Folder holding finished results.
    pub const COMPLETE: i32 = 27;
}

/// Localized-title fallbacks, used only when folder-type codes are absent
/// or unrecognized.
pub mod folder_title {
    pub const TEMPLATES: &[&str] = &["Templates", "Blank forms"];
    pub const IN_PROCESS: &[&str] = &["In process", "In progress"];
    pub const COMPLETE: &[&str] = &["Complete", "Done", "Ready"];
}

// =============================================================================
// EXTERNAL LINK ACCESS LEVELS
// =============================================================================

/// Share-link access levels as defined by the external service.
pub mod link_access {
    /// Read-only access.
    pub const READ: i32 = 2;
    /// Form-filling access.
    pub const FILL_FORMS: i32 = 7;
}
