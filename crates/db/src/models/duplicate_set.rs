//! Duplicate set ledger models.
//!
//! Maps to the `duplicate_sets` table. `entity_type`, `match_type` and
//! `status` are stored as text and parsed into core enums on demand.

use dedupe_core::duplicate_set::DuplicateSetStatus;
use dedupe_core::entity::EntityType;
use dedupe_core::error::CoreError;
use dedupe_core::merge::{FieldResolution, MergeTarget};
use dedupe_core::types::{DbId, Timestamp};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

// ---------------------------------------------------------------------------
// Entity
// ---------------------------------------------------------------------------

/// A row from the `duplicate_sets` table.
///
/// The merge snapshot itself is never exposed; `can_undo` reports whether
/// one is stored.
#[derive(Debug, Clone, FromRow, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DuplicateSet {
    pub id: DbId,
    pub entity_type: String,
    pub primary_id: DbId,
    pub secondary_id: DbId,
    pub match_type: String,
    pub score: i16,
    pub reason: String,
    pub status: String,
    pub reviewed_by_id: Option<DbId>,
    pub reviewed_at: Option<Timestamp>,
    pub merged_master_id: Option<DbId>,
    pub can_undo: bool,
    pub created_at: Timestamp,
    pub updated_at: Timestamp,
}

impl DuplicateSet {
    pub fn entity_type(&self) -> Result<EntityType, CoreError> {
        EntityType::parse(&self.entity_type)
    }

    pub fn status(&self) -> Result<DuplicateSetStatus, CoreError> {
        DuplicateSetStatus::parse(&self.status)
    }

    /// The ledger facts the merge planner needs.
    pub fn merge_target(&self) -> Result<MergeTarget, CoreError> {
        Ok(MergeTarget {
            set_id: self.id,
            entity_type: self.entity_type()?,
            primary_id: self.primary_id,
            secondary_id: self.secondary_id,
            status: self.status()?,
        })
    }
}

// ---------------------------------------------------------------------------
// Query types
// ---------------------------------------------------------------------------

/// Filters for listing sets. Unset filters match everything.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct DuplicateSetFilter {
    pub entity_type: Option<String>,
    pub status: Option<String>,
    pub limit: Option<i64>,
    pub offset: Option<i64>,
}

/// Ledger overview row: how many sets of a type are in a status.
#[derive(Debug, Clone, FromRow, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DuplicateSetCount {
    pub entity_type: String,
    pub status: String,
    pub count: i64,
}

// ---------------------------------------------------------------------------
// Request types for API
// ---------------------------------------------------------------------------

/// Request body for merging a set.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MergeRequest {
    pub master_id: DbId,
    #[serde(default)]
    pub field_resolutions: Vec<FieldResolution>,
}

/// Request body for a reviewer status decision.
#[derive(Debug, Clone, Deserialize)]
pub struct StatusRequest {
    pub status: String,
}

/// Request body for triggering a scan.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ScanRequest {
    #[serde(default)]
    pub entity_types: Vec<String>,
    #[serde(default)]
    pub use_semantic_validation: bool,
}
