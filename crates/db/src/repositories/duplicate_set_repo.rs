//! Repository for the `duplicate_sets` ledger.
//!
//! A pair is stored with `primary_id < secondary_id`. The partial unique
//! index `uq_duplicate_sets_open_pair` guarantees at most one `pending` or
//! `merged` set per unordered pair, so inserts race safely.

use dedupe_core::duplicate_set::{
    validate_review_transition, DuplicateSetStatus, NewDuplicateSet, STATUS_MERGED, STATUS_PENDING,
};
use dedupe_core::entity::EntityType;
use dedupe_core::error::CoreError;
use dedupe_core::types::DbId;
use sqlx::{PgConnection, PgPool};

use crate::models::duplicate_set::{DuplicateSet, DuplicateSetCount, DuplicateSetFilter};
use crate::transaction_failed;

/// Column list shared across queries to avoid repetition.
pub(crate) const COLUMNS: &str = "\
    id, entity_type, primary_id, secondary_id, match_type, score, reason, status, \
    reviewed_by_id, reviewed_at, merged_master_id, \
    (merge_snapshot IS NOT NULL) AS can_undo, created_at, updated_at";

/// Page size used when a list request does not specify one.
pub const DEFAULT_LIST_LIMIT: i64 = 50;

/// Largest page a list request may ask for.
pub const MAX_LIST_LIMIT: i64 = 500;

/// Provides ledger operations over duplicate sets.
pub struct DuplicateSetRepo;

impl DuplicateSetRepo {
    /// Find the open (`pending` or `merged`) set for an unordered pair.
    pub async fn find_open_set(
        pool: &PgPool,
        entity_type: EntityType,
        a: DbId,
        b: DbId,
    ) -> Result<Option<DuplicateSet>, sqlx::Error> {
        let query = format!(
            "SELECT {COLUMNS} FROM duplicate_sets
             WHERE entity_type = $1
               AND primary_id = LEAST($2::BIGINT, $3::BIGINT)
               AND secondary_id = GREATEST($2::BIGINT, $3::BIGINT)
               AND status IN ($4, $5)
             LIMIT 1"
        );
        sqlx::query_as::<_, DuplicateSet>(&query)
            .bind(entity_type.as_str())
            .bind(a)
            .bind(b)
            .bind(STATUS_PENDING)
            .bind(STATUS_MERGED)
            .fetch_optional(pool)
            .await
    }

    /// Insert a new pending set.
    ///
    /// Returns `None` when an open set for the pair already exists.
    pub async fn create(
        pool: &PgPool,
        input: &NewDuplicateSet,
    ) -> Result<Option<DuplicateSet>, sqlx::Error> {
        let query = format!(
            "INSERT INTO duplicate_sets
                (entity_type, primary_id, secondary_id, match_type, score, reason, status)
             VALUES ($1, LEAST($2::BIGINT, $3::BIGINT), GREATEST($2::BIGINT, $3::BIGINT), $4, $5, $6, $7)
             ON CONFLICT DO NOTHING
             RETURNING {COLUMNS}"
        );
        sqlx::query_as::<_, DuplicateSet>(&query)
            .bind(input.entity_type.as_str())
            .bind(input.primary_id)
            .bind(input.secondary_id)
            .bind(input.match_type.as_str())
            .bind(i16::from(input.score))
            .bind(&input.reason)
            .bind(STATUS_PENDING)
            .fetch_optional(pool)
            .await
    }

    /// Find a set by its ID.
    pub async fn find_by_id(pool: &PgPool, id: DbId) -> Result<Option<DuplicateSet>, sqlx::Error> {
        let query = format!("SELECT {COLUMNS} FROM duplicate_sets WHERE id = $1");
        sqlx::query_as::<_, DuplicateSet>(&query)
            .bind(id)
            .fetch_optional(pool)
            .await
    }

    /// List sets, highest score first, then newest.
    pub async fn list(
        pool: &PgPool,
        filter: &DuplicateSetFilter,
    ) -> Result<Vec<DuplicateSet>, sqlx::Error> {
        let limit = filter
            .limit
            .unwrap_or(DEFAULT_LIST_LIMIT)
            .clamp(1, MAX_LIST_LIMIT);
        let offset = filter.offset.unwrap_or(0).max(0);
        let query = format!(
            "SELECT {COLUMNS} FROM duplicate_sets
             WHERE ($1::TEXT IS NULL OR entity_type = $1)
               AND ($2::TEXT IS NULL OR status = $2)
             ORDER BY score DESC, created_at DESC, id DESC
             LIMIT $3 OFFSET $4"
        );
        sqlx::query_as::<_, DuplicateSet>(&query)
            .bind(&filter.entity_type)
            .bind(&filter.status)
            .bind(limit)
            .bind(offset)
            .fetch_all(pool)
            .await
    }

    /// Number of sets per entity type and status.
    pub async fn counts_by_status(pool: &PgPool) -> Result<Vec<DuplicateSetCount>, sqlx::Error> {
        sqlx::query_as::<_, DuplicateSetCount>(
            "SELECT entity_type, status, COUNT(*) AS count
             FROM duplicate_sets
             GROUP BY entity_type, status
             ORDER BY entity_type, status",
        )
        .fetch_all(pool)
        .await
    }

    /// Record a reviewer's reject or skip decision.
    ///
    /// The set row is locked so a concurrent merge or decision on the same
    /// set observes the new status and fails with `AlreadyResolved`.
    pub async fn update_status(
        pool: &PgPool,
        id: DbId,
        status: DuplicateSetStatus,
        reviewer_id: Option<DbId>,
    ) -> Result<DuplicateSet, CoreError> {
        let mut tx = pool.begin().await.map_err(transaction_failed)?;

        let current = Self::lock(&mut tx, id)
            .await
            .map_err(transaction_failed)?
            .ok_or(CoreError::NotFound {
                entity: "duplicate_set",
                id,
            })?;
        validate_review_transition(id, current.status()?, status)?;

        let query = format!(
            "UPDATE duplicate_sets SET
                status = $2,
                reviewed_by_id = $3,
                reviewed_at = NOW(),
                updated_at = NOW()
             WHERE id = $1
             RETURNING {COLUMNS}"
        );
        let updated = sqlx::query_as::<_, DuplicateSet>(&query)
            .bind(id)
            .bind(status.as_str())
            .bind(reviewer_id)
            .fetch_one(&mut *tx)
            .await
            .map_err(transaction_failed)?;

        tx.commit().await.map_err(transaction_failed)?;
        Ok(updated)
    }

    // -----------------------------------------------------------------------
    // Transaction helpers
    // -----------------------------------------------------------------------

    /// Load a set with `SELECT ... FOR UPDATE` inside an open transaction.
    pub(crate) async fn lock(
        conn: &mut PgConnection,
        id: DbId,
    ) -> Result<Option<DuplicateSet>, sqlx::Error> {
        let query = format!("SELECT {COLUMNS} FROM duplicate_sets WHERE id = $1 FOR UPDATE");
        sqlx::query_as::<_, DuplicateSet>(&query)
            .bind(id)
            .fetch_optional(&mut *conn)
            .await
    }
}
