//! Repository for the `audit_events` table.

use dedupe_core::types::DbId;
use sqlx::PgPool;

use crate::models::audit_event::{AuditEvent, CreateAuditEvent};

/// Column list shared across queries to avoid repetition.
const COLUMNS: &str =
    "id, event_type, entity_type, entity_id, actor_user_id, payload, created_at";

/// Write-mostly access to the audit trail.
pub struct AuditEventRepo;

impl AuditEventRepo {
    /// Insert a new audit event, returning the generated ID.
    pub async fn insert(pool: &PgPool, input: &CreateAuditEvent) -> Result<DbId, sqlx::Error> {
        sqlx::query_scalar(
            "INSERT INTO audit_events \
                (event_type, entity_type, entity_id, actor_user_id, payload) \
             VALUES ($1, $2, $3, $4, $5) \
             RETURNING id",
        )
        .bind(&input.event_type)
        .bind(&input.entity_type)
        .bind(input.entity_id)
        .bind(input.actor_user_id)
        .bind(&input.payload)
        .fetch_one(pool)
        .await
    }

    /// List recent events, optionally of a single type, newest first.
    pub async fn list_recent(
        pool: &PgPool,
        event_type: Option<&str>,
        limit: i64,
        offset: i64,
    ) -> Result<Vec<AuditEvent>, sqlx::Error> {
        let query = format!(
            "SELECT {COLUMNS} FROM audit_events
             WHERE ($1::TEXT IS NULL OR event_type = $1)
             ORDER BY created_at DESC, id DESC
             LIMIT $2 OFFSET $3"
        );
        sqlx::query_as::<_, AuditEvent>(&query)
            .bind(event_type)
            .bind(limit)
            .bind(offset)
            .fetch_all(pool)
            .await
    }
}
