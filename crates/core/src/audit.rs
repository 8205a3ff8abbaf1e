//! Audit event names emitted by the duplicate engine.
//!
//! Kept in `core` so the API and any offline tooling publish the same
//! strings that the audit table is queried by.

// ---------------------------------------------------------------------------
// Event type constants
// ---------------------------------------------------------------------------

pub mod event_types {
    pub const SCAN_COMPLETED: &str = "duplicates.scan_completed";
    pub const MERGED: &str = "duplicates.merged";
    pub const REJECTED: &str = "duplicates.rejected";
    pub const SKIPPED: &str = "duplicates.skipped";
    pub const MERGE_UNDONE: &str = "duplicates.merge_undone";
}

/// All event types the engine emits.
pub const VALID_EVENT_TYPES: &[&str] = &[
    event_types::SCAN_COMPLETED,
    event_types::MERGED,
    event_types::REJECTED,
    event_types::SKIPPED,
    event_types::MERGE_UNDONE,
];

/// Source entity type recorded on ledger events.
pub const ENTITY_DUPLICATE_SET: &str = "duplicate_set";

/// Event type for a reviewer status decision on a set.
pub fn status_event_type(status: crate::duplicate_set::DuplicateSetStatus) -> &'static str {
    use crate::duplicate_set::DuplicateSetStatus;
    match status {
        DuplicateSetStatus::Merged => event_types::MERGED,
        DuplicateSetStatus::Rejected => event_types::REJECTED,
        DuplicateSetStatus::Skipped => event_types::SKIPPED,
        DuplicateSetStatus::Pending => event_types::MERGE_UNDONE,
    }
}
