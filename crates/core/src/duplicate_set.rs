//! Duplicate set ledger rules: status lifecycle and persistence inputs.
//!
//! A set is created `pending` by a scan and moves exactly once to `merged`,
//! `rejected`, or `skipped`. Only an undo moves `merged` back to `pending`.

use serde::{Deserialize, Serialize};

use crate::candidates::MatchType;
use crate::entity::EntityType;
use crate::error::CoreError;
use crate::types::DbId;

pub const STATUS_PENDING: &str = "pending";
pub const STATUS_MERGED: &str = "merged";
pub const STATUS_REJECTED: &str = "rejected";
pub const STATUS_SKIPPED: &str = "skipped";
pub const VALID_STATUSES: &[&str] = &[STATUS_PENDING, STATUS_MERGED, STATUS_REJECTED, STATUS_SKIPPED];

/// Statuses that block a pair from being flagged again.
pub const OPEN_STATUSES: &[&str] = &[STATUS_PENDING, STATUS_MERGED];

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DuplicateSetStatus {
    Pending,
    Merged,
    Rejected,
    Skipped,
}

impl DuplicateSetStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            DuplicateSetStatus::Pending => STATUS_PENDING,
            DuplicateSetStatus::Merged => STATUS_MERGED,
            DuplicateSetStatus::Rejected => STATUS_REJECTED,
            DuplicateSetStatus::Skipped => STATUS_SKIPPED,
        }
    }

    pub fn parse(value: &str) -> Result<Self, CoreError> {
        match value {
            STATUS_PENDING => Ok(DuplicateSetStatus::Pending),
            STATUS_MERGED => Ok(DuplicateSetStatus::Merged),
            STATUS_REJECTED => Ok(DuplicateSetStatus::Rejected),
            STATUS_SKIPPED => Ok(DuplicateSetStatus::Skipped),
            other => Err(CoreError::Validation(format!(
                "Invalid status '{other}'. Must be one of: {}",
                VALID_STATUSES.join(", ")
            ))),
        }
    }

    /// `pending` and `merged` sets block re-flagging of their pair.
    pub fn is_open(self) -> bool {
        matches!(self, DuplicateSetStatus::Pending | DuplicateSetStatus::Merged)
    }
}

impl std::fmt::Display for DuplicateSetStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Fail with `AlreadyResolved` unless the set is still pending.
pub fn ensure_pending(set_id: DbId, current: DuplicateSetStatus) -> Result<(), CoreError> {
    if current == DuplicateSetStatus::Pending {
        Ok(())
    } else {
        Err(CoreError::AlreadyResolved {
            set_id,
            status: current.as_str().to_string(),
        })
    }
}

/// Validate a reviewer-driven status change (reject or skip).
///
/// `merged` is never accepted here: it is only written by the merge engine
/// in the same transaction as the merge itself.
pub fn validate_review_transition(
    set_id: DbId,
    current: DuplicateSetStatus,
    target: DuplicateSetStatus,
) -> Result<(), CoreError> {
    match target {
        DuplicateSetStatus::Rejected | DuplicateSetStatus::Skipped => {
            ensure_pending(set_id, current)
        }
        DuplicateSetStatus::Merged => Err(CoreError::Validation(
            "Sets are marked merged only by performing a merge".into(),
        )),
        DuplicateSetStatus::Pending => Err(CoreError::Validation(
            "Sets return to pending only by undoing a merge".into(),
        )),
    }
}

/// Input for persisting a new pending set.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct NewDuplicateSet {
    pub entity_type: EntityType,
    pub primary_id: DbId,
    pub secondary_id: DbId,
    pub match_type: MatchType,
    pub score: u8,
    pub reason: String,
}
