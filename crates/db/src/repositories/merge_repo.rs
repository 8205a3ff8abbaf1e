//! Transactional merge of a duplicate pair, and its undo.
//!
//! A merge runs in one transaction holding a row lock on the set:
//! apply field resolutions to the master, re-point every reference from the
//! loser to the master, recompute ratings, delete the loser, and mark the
//! set `merged` with a [`MergeSnapshot`]. Any database failure rolls the
//! whole merge back and surfaces as `TransactionFailed`.

use dedupe_core::duplicate_set::{ensure_pending, DuplicateSetStatus, STATUS_MERGED, STATUS_PENDING};
use dedupe_core::entity::EntityType;
use dedupe_core::error::CoreError;
use dedupe_core::fields::fields_for;
use dedupe_core::merge::{loser_for, plan_merge, FieldResolution, MergePlan};
use dedupe_core::record::{FieldValue, RecordSnapshot};
use dedupe_core::types::{DbId, Timestamp};
use serde::{Deserialize, Serialize};
use sqlx::postgres::{PgArguments, Postgres};
use sqlx::query::Query;
use sqlx::{FromRow, PgConnection, PgPool};

use super::contact_repo::COLUMNS as CONTACT_COLUMNS;
use super::duplicate_set_repo::COLUMNS as SET_COLUMNS;
use super::organization_repo::COLUMNS as ORGANIZATION_COLUMNS;
use crate::models::contact::Contact;
use crate::models::duplicate_set::DuplicateSet;
use crate::models::organization::Organization;
use crate::repositories::{DuplicateSetRepo, RatingRepo};
use crate::transaction_failed;

type PgQuery<'q> = Query<'q, Postgres, PgArguments>;

// ---------------------------------------------------------------------------
// Snapshot
// ---------------------------------------------------------------------------

/// Row facts of a record that are not mergeable fields.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RecordLinks {
    /// Contacts only.
    pub organization_id: Option<DbId>,
    pub average_rating: Option<f64>,
    pub review_count: i32,
    pub created_at: Timestamp,
}

/// References moved from the loser to the master, by row ID.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct RepointedRefs {
    pub reviews: Vec<DbId>,
    pub project_contacts: Vec<DbId>,
    pub contacts: Vec<DbId>,
    pub projects: Vec<DbId>,
}

/// A loser membership deleted because the master was already on the project.
#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
pub struct DroppedMembership {
    pub project_id: DbId,
    pub role: Option<String>,
}

/// Everything needed to reverse a merge, stored on the set row.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MergeSnapshot {
    pub master_id: DbId,
    pub loser_id: DbId,
    pub master_before: RecordSnapshot,
    pub loser: RecordSnapshot,
    pub loser_links: RecordLinks,
    /// Organization a contact master adopted from the loser.
    pub inherited_organization_id: Option<DbId>,
    pub repointed: RepointedRefs,
    pub dropped_memberships: Vec<DroppedMembership>,
    /// The master's `updated_at` as committed by the merge.
    pub master_updated_at: Timestamp,
}

struct LoadedRecord {
    snapshot: RecordSnapshot,
    links: RecordLinks,
}

// ---------------------------------------------------------------------------
// Repository
// ---------------------------------------------------------------------------

/// Executes merges and undoes them.
pub struct MergeRepo;

impl MergeRepo {
    /// Merge the pair of a pending set into `master_id`.
    ///
    /// Returns the updated set. A set that is no longer pending yields
    /// `AlreadyResolved`; a record deleted since the scan yields `NotFound`.
    pub async fn merge(
        pool: &PgPool,
        set_id: DbId,
        master_id: DbId,
        resolutions: &[FieldResolution],
        reviewer_id: Option<DbId>,
    ) -> Result<DuplicateSet, CoreError> {
        let mut tx = pool.begin().await.map_err(transaction_failed)?;

        let set = DuplicateSetRepo::lock(&mut tx, set_id)
            .await
            .map_err(transaction_failed)?
            .ok_or(CoreError::NotFound {
                entity: "duplicate_set",
                id: set_id,
            })?;
        let target = set.merge_target()?;
        ensure_pending(set_id, target.status)?;
        let loser_id = loser_for(&target, master_id)?;
        let entity_type = target.entity_type;

        let primary = load_record(&mut tx, entity_type, target.primary_id)
            .await
            .map_err(transaction_failed)?
            .ok_or(CoreError::NotFound {
                entity: entity_type.as_str(),
                id: target.primary_id,
            })?;
        let secondary = load_record(&mut tx, entity_type, target.secondary_id)
            .await
            .map_err(transaction_failed)?
            .ok_or(CoreError::NotFound {
                entity: entity_type.as_str(),
                id: target.secondary_id,
            })?;

        let plan = plan_merge(
            &target,
            master_id,
            &primary.snapshot,
            &secondary.snapshot,
            resolutions,
        )?;
        let (master, loser) = if master_id == target.primary_id {
            (primary, secondary)
        } else {
            (secondary, primary)
        };

        let snapshot = execute_merge(&mut tx, &plan, &master, &loser)
            .await
            .map_err(|e| {
                tracing::error!(set_id, master_id, loser_id, error = %e, "Merge rolled back");
                transaction_failed(e)
            })?;

        let query = format!(
            "UPDATE duplicate_sets SET
                status = $2,
                reviewed_by_id = $3,
                reviewed_at = NOW(),
                merged_master_id = $4,
                merge_snapshot = $5,
                updated_at = NOW()
             WHERE id = $1
             RETURNING {SET_COLUMNS}"
        );
        let merged = sqlx::query_as::<_, DuplicateSet>(&query)
            .bind(set_id)
            .bind(STATUS_MERGED)
            .bind(reviewer_id)
            .bind(master_id)
            .bind(sqlx::types::Json(&snapshot))
            .fetch_one(&mut *tx)
            .await
            .map_err(transaction_failed)?;

        tx.commit().await.map_err(transaction_failed)?;

        tracing::info!(
            set_id,
            entity_type = %entity_type,
            master_id,
            loser_id,
            fields_updated = plan.updates.len(),
            "Duplicate set merged"
        );
        Ok(merged)
    }

    /// Reverse a merge using the stored snapshot.
    ///
    /// Refuses with `Conflict` when the master changed after the merge, the
    /// loser's ID has been reused, or a moved reference no longer points at
    /// the master.
    pub async fn undo_merge(
        pool: &PgPool,
        set_id: DbId,
        reviewer_id: Option<DbId>,
    ) -> Result<DuplicateSet, CoreError> {
        let mut tx = pool.begin().await.map_err(transaction_failed)?;

        let set = DuplicateSetRepo::lock(&mut tx, set_id)
            .await
            .map_err(transaction_failed)?
            .ok_or(CoreError::NotFound {
                entity: "duplicate_set",
                id: set_id,
            })?;
        if set.status()? != DuplicateSetStatus::Merged {
            return Err(CoreError::Conflict(format!(
                "Duplicate set {set_id} is {}; only merged sets can be undone",
                set.status
            )));
        }
        let entity_type = set.entity_type()?;

        let stored: Option<serde_json::Value> =
            sqlx::query_scalar("SELECT merge_snapshot FROM duplicate_sets WHERE id = $1")
                .bind(set_id)
                .fetch_one(&mut *tx)
                .await
                .map_err(transaction_failed)?;
        let snapshot: MergeSnapshot = stored
            .ok_or_else(|| {
                CoreError::Conflict(format!("Duplicate set {set_id} has no undo snapshot"))
            })
            .and_then(|value| {
                serde_json::from_value(value).map_err(|e| {
                    CoreError::Conflict(format!("Undo snapshot of set {set_id} is unreadable: {e}"))
                })
            })?;

        check_undo_preconditions(&mut tx, entity_type, &snapshot).await?;

        restore(&mut tx, entity_type, &snapshot)
            .await
            .map_err(|e| {
                tracing::error!(set_id, error = %e, "Merge undo rolled back");
                transaction_failed(e)
            })?;

        let query = format!(
            "UPDATE duplicate_sets SET
                status = $2,
                reviewed_by_id = NULL,
                reviewed_at = NULL,
                merged_master_id = NULL,
                merge_snapshot = NULL,
                updated_at = NOW()
             WHERE id = $1
             RETURNING {SET_COLUMNS}"
        );
        let reopened = sqlx::query_as::<_, DuplicateSet>(&query)
            .bind(set_id)
            .bind(STATUS_PENDING)
            .fetch_one(&mut *tx)
            .await
            .map_err(transaction_failed)?;

        tx.commit().await.map_err(transaction_failed)?;

        tracing::info!(
            set_id,
            entity_type = %entity_type,
            master_id = snapshot.master_id,
            loser_id = snapshot.loser_id,
            reviewer_id,
            "Merge undone"
        );
        Ok(reopened)
    }
}

// ---------------------------------------------------------------------------
// Merge steps
// ---------------------------------------------------------------------------

async fn execute_merge(
    conn: &mut PgConnection,
    plan: &MergePlan,
    master: &LoadedRecord,
    loser: &LoadedRecord,
) -> Result<MergeSnapshot, sqlx::Error> {
    let entity_type = plan.entity_type;
    let updates: Vec<(&str, &FieldValue)> =
        plan.updates.iter().map(|u| (u.field, &u.value)).collect();
    write_fields(conn, entity_type, plan.master_id, &updates).await?;

    let mut repointed = RepointedRefs::default();
    let mut dropped_memberships = Vec::new();
    let mut inherited_organization_id = None;

    match entity_type {
        EntityType::Contact => {
            repointed.reviews = sqlx::query_scalar(
                "UPDATE reviews SET contact_id = $1, updated_at = NOW() \
                 WHERE contact_id = $2 RETURNING id",
            )
            .bind(plan.master_id)
            .bind(plan.loser_id)
            .fetch_all(&mut *conn)
            .await?;

            dropped_memberships = sqlx::query_as::<_, DroppedMembership>(
                "DELETE FROM project_contacts \
                 WHERE contact_id = $2 \
                   AND project_id IN (SELECT project_id FROM project_contacts WHERE contact_id = $1) \
                 RETURNING project_id, role",
            )
            .bind(plan.master_id)
            .bind(plan.loser_id)
            .fetch_all(&mut *conn)
            .await?;

            repointed.project_contacts = sqlx::query_scalar(
                "UPDATE project_contacts SET contact_id = $1, updated_at = NOW() \
                 WHERE contact_id = $2 RETURNING id",
            )
            .bind(plan.master_id)
            .bind(plan.loser_id)
            .fetch_all(&mut *conn)
            .await?;

            if master.links.organization_id.is_none() {
                if let Some(organization_id) = loser.links.organization_id {
                    sqlx::query(
                        "UPDATE contacts SET organization_id = $2, updated_at = NOW() WHERE id = $1",
                    )
                    .bind(plan.master_id)
                    .bind(organization_id)
                    .execute(&mut *conn)
                    .await?;
                    inherited_organization_id = Some(organization_id);
                }
            }

            RatingRepo::recompute_contact(conn, plan.loser_id).await?;
            RatingRepo::recompute_contact(conn, plan.master_id).await?;
            let master_org = master.links.organization_id.or(inherited_organization_id);
            for organization_id in distinct([master_org, loser.links.organization_id]) {
                RatingRepo::recompute_organization(conn, organization_id).await?;
            }
        }
        EntityType::Organization => {
            repointed.contacts = sqlx::query_scalar(
                "UPDATE contacts SET organization_id = $1, updated_at = NOW() \
                 WHERE organization_id = $2 RETURNING id",
            )
            .bind(plan.master_id)
            .bind(plan.loser_id)
            .fetch_all(&mut *conn)
            .await?;

            repointed.projects = sqlx::query_scalar(
                "UPDATE projects SET organization_id = $1, updated_at = NOW() \
                 WHERE organization_id = $2 RETURNING id",
            )
            .bind(plan.master_id)
            .bind(plan.loser_id)
            .fetch_all(&mut *conn)
            .await?;

            RatingRepo::recompute_organization(conn, plan.master_id).await?;
        }
    }

    let delete = format!("DELETE FROM {} WHERE id = $1", entity_type.table());
    sqlx::query(&delete)
        .bind(plan.loser_id)
        .execute(&mut *conn)
        .await?;

    let master_updated_at = master_updated_at(conn, entity_type, plan.master_id)
        .await?
        .ok_or(sqlx::Error::RowNotFound)?;

    Ok(MergeSnapshot {
        master_id: plan.master_id,
        loser_id: plan.loser_id,
        master_before: master.snapshot.clone(),
        loser: loser.snapshot.clone(),
        loser_links: loser.links.clone(),
        inherited_organization_id,
        repointed,
        dropped_memberships,
        master_updated_at,
    })
}

// ---------------------------------------------------------------------------
// Undo steps
// ---------------------------------------------------------------------------

async fn check_undo_preconditions(
    conn: &mut PgConnection,
    entity_type: EntityType,
    snapshot: &MergeSnapshot,
) -> Result<(), CoreError> {
    let table = entity_type.table();

    let query = format!("SELECT updated_at FROM {table} WHERE id = $1 FOR UPDATE");
    let current: Option<Timestamp> = sqlx::query_scalar(&query)
        .bind(snapshot.master_id)
        .fetch_optional(&mut *conn)
        .await
        .map_err(transaction_failed)?;
    match current {
        None => {
            return Err(CoreError::Conflict(format!(
                "Master {entity_type} {} no longer exists",
                snapshot.master_id
            )))
        }
        Some(updated_at) if updated_at != snapshot.master_updated_at => {
            return Err(CoreError::Conflict(format!(
                "Master {entity_type} {} was modified after the merge",
                snapshot.master_id
            )))
        }
        Some(_) => {}
    }

    let query = format!("SELECT EXISTS (SELECT 1 FROM {table} WHERE id = $1)");
    let loser_taken: bool = sqlx::query_scalar(&query)
        .bind(snapshot.loser_id)
        .fetch_one(&mut *conn)
        .await
        .map_err(transaction_failed)?;
    if loser_taken {
        return Err(CoreError::Conflict(format!(
            "{entity_type} id {} is in use again",
            snapshot.loser_id
        )));
    }

    let refs = &snapshot.repointed;
    let checks: [(&str, &str, &[DbId]); 4] = [
        ("reviews", "contact_id", refs.reviews.as_slice()),
        ("project_contacts", "contact_id", refs.project_contacts.as_slice()),
        ("contacts", "organization_id", refs.contacts.as_slice()),
        ("projects", "organization_id", refs.projects.as_slice()),
    ];
    for (ref_table, column, ids) in checks {
        if ids.is_empty() {
            continue;
        }
        let query =
            format!("SELECT COUNT(*) FROM {ref_table} WHERE id = ANY($1) AND {column} = $2");
        let still_pointing: i64 = sqlx::query_scalar(&query)
            .bind(ids)
            .bind(snapshot.master_id)
            .fetch_one(&mut *conn)
            .await
            .map_err(transaction_failed)?;
        if still_pointing != ids.len() as i64 {
            return Err(CoreError::Conflict(format!(
                "{} of {} moved {ref_table} rows no longer reference the master",
                ids.len() as i64 - still_pointing,
                ids.len()
            )));
        }
    }

    if let Some(organization_id) = snapshot.loser_links.organization_id {
        let exists: bool =
            sqlx::query_scalar("SELECT EXISTS (SELECT 1 FROM organizations WHERE id = $1)")
                .bind(organization_id)
                .fetch_one(&mut *conn)
                .await
                .map_err(transaction_failed)?;
        if !exists {
            return Err(CoreError::Conflict(format!(
                "Organization {organization_id} of the merged contact no longer exists"
            )));
        }
    }

    Ok(())
}

async fn restore(
    conn: &mut PgConnection,
    entity_type: EntityType,
    snapshot: &MergeSnapshot,
) -> Result<(), sqlx::Error> {
    reinsert(conn, &snapshot.loser, &snapshot.loser_links).await?;

    let master_fields: Vec<(&str, FieldValue)> = fields_for(entity_type)
        .iter()
        .map(|d| {
            let value = snapshot
                .master_before
                .fields
                .get(d.field)
                .cloned()
                .unwrap_or_else(|| FieldValue::empty(d.field_type));
            (d.field, value)
        })
        .collect();
    let updates: Vec<(&str, &FieldValue)> = master_fields.iter().map(|(f, v)| (*f, v)).collect();
    write_fields(conn, entity_type, snapshot.master_id, &updates).await?;

    let refs = &snapshot.repointed;
    match entity_type {
        EntityType::Contact => {
            point_back(conn, "reviews", "contact_id", &refs.reviews, snapshot.loser_id).await?;
            point_back(
                conn,
                "project_contacts",
                "contact_id",
                &refs.project_contacts,
                snapshot.loser_id,
            )
            .await?;
            for membership in &snapshot.dropped_memberships {
                sqlx::query(
                    "INSERT INTO project_contacts (project_id, contact_id, role) \
                     SELECT $1, $2, $3 WHERE EXISTS (SELECT 1 FROM projects WHERE id = $1) \
                     ON CONFLICT DO NOTHING",
                )
                .bind(membership.project_id)
                .bind(snapshot.loser_id)
                .bind(&membership.role)
                .execute(&mut *conn)
                .await?;
            }
            if snapshot.inherited_organization_id.is_some() {
                sqlx::query(
                    "UPDATE contacts SET organization_id = NULL, updated_at = NOW() WHERE id = $1",
                )
                .bind(snapshot.master_id)
                .execute(&mut *conn)
                .await?;
            }

            RatingRepo::recompute_contact(conn, snapshot.loser_id).await?;
            RatingRepo::recompute_contact(conn, snapshot.master_id).await?;
            let master_org: Option<DbId> =
                sqlx::query_scalar("SELECT organization_id FROM contacts WHERE id = $1")
                    .bind(snapshot.master_id)
                    .fetch_one(&mut *conn)
                    .await?;
            for organization_id in distinct([
                master_org,
                snapshot.loser_links.organization_id,
                snapshot.inherited_organization_id,
            ]) {
                RatingRepo::recompute_organization(conn, organization_id).await?;
            }
        }
        EntityType::Organization => {
            point_back(conn, "contacts", "organization_id", &refs.contacts, snapshot.loser_id)
                .await?;
            point_back(conn, "projects", "organization_id", &refs.projects, snapshot.loser_id)
                .await?;

            RatingRepo::recompute_organization(conn, snapshot.master_id).await?;
            RatingRepo::recompute_organization(conn, snapshot.loser_id).await?;
        }
    }

    Ok(())
}

/// Insert a deleted record again under its original ID.
async fn reinsert(
    conn: &mut PgConnection,
    record: &RecordSnapshot,
    links: &RecordLinks,
) -> Result<(), sqlx::Error> {
    let entity_type = record.entity_type;
    let fields = fields_for(entity_type);

    let mut columns: Vec<&str> = vec!["id"];
    columns.extend(fields.iter().map(|d| d.field));
    if entity_type == EntityType::Contact {
        columns.push("organization_id");
    }
    columns.extend(["average_rating", "review_count", "created_at"]);

    let placeholders: Vec<String> = (1..=columns.len()).map(|i| format!("${i}")).collect();
    let sql = format!(
        "INSERT INTO {} ({}) VALUES ({})",
        entity_type.table(),
        columns.join(", "),
        placeholders.join(", ")
    );

    let mut query = sqlx::query(&sql).bind(record.id);
    for d in fields {
        let value = record
            .fields
            .get(d.field)
            .cloned()
            .unwrap_or_else(|| FieldValue::empty(d.field_type));
        query = bind_value(query, &value);
    }
    if entity_type == EntityType::Contact {
        query = query.bind(links.organization_id);
    }
    query
        .bind(links.average_rating)
        .bind(links.review_count)
        .bind(links.created_at)
        .execute(&mut *conn)
        .await?;
    Ok(())
}

async fn point_back(
    conn: &mut PgConnection,
    table: &str,
    column: &str,
    ids: &[DbId],
    loser_id: DbId,
) -> Result<(), sqlx::Error> {
    if ids.is_empty() {
        return Ok(());
    }
    let query = format!("UPDATE {table} SET {column} = $1, updated_at = NOW() WHERE id = ANY($2)");
    sqlx::query(&query)
        .bind(loser_id)
        .bind(ids)
        .execute(&mut *conn)
        .await?;
    Ok(())
}

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

/// Load a record with a row lock and capture its mergeable fields.
async fn load_record(
    conn: &mut PgConnection,
    entity_type: EntityType,
    id: DbId,
) -> Result<Option<LoadedRecord>, sqlx::Error> {
    match entity_type {
        EntityType::Organization => {
            let query =
                format!("SELECT {ORGANIZATION_COLUMNS} FROM organizations WHERE id = $1 FOR UPDATE");
            let row = sqlx::query_as::<_, Organization>(&query)
                .bind(id)
                .fetch_optional(&mut *conn)
                .await?;
            Ok(row.map(|o| LoadedRecord {
                snapshot: RecordSnapshot::capture(entity_type, o.id, &o),
                links: RecordLinks {
                    organization_id: None,
                    average_rating: o.average_rating,
                    review_count: o.review_count,
                    created_at: o.created_at,
                },
            }))
        }
        EntityType::Contact => {
            let query = format!("SELECT {CONTACT_COLUMNS} FROM contacts WHERE id = $1 FOR UPDATE");
            let row = sqlx::query_as::<_, Contact>(&query)
                .bind(id)
                .fetch_optional(&mut *conn)
                .await?;
            Ok(row.map(|c| LoadedRecord {
                snapshot: RecordSnapshot::capture(entity_type, c.id, &c),
                links: RecordLinks {
                    organization_id: c.organization_id,
                    average_rating: c.average_rating,
                    review_count: c.review_count,
                    created_at: c.created_at,
                },
            }))
        }
    }
}

async fn master_updated_at(
    conn: &mut PgConnection,
    entity_type: EntityType,
    id: DbId,
) -> Result<Option<Timestamp>, sqlx::Error> {
    let query = format!("SELECT updated_at FROM {} WHERE id = $1", entity_type.table());
    sqlx::query_scalar(&query)
        .bind(id)
        .fetch_optional(&mut *conn)
        .await
}

/// Write typed field values onto one row. Field names come from the static
/// descriptor tables, never from user input.
async fn write_fields(
    conn: &mut PgConnection,
    entity_type: EntityType,
    id: DbId,
    updates: &[(&str, &FieldValue)],
) -> Result<(), sqlx::Error> {
    if updates.is_empty() {
        return Ok(());
    }
    let assignments: Vec<String> = updates
        .iter()
        .enumerate()
        .map(|(i, (field, _))| format!("{field} = ${}", i + 2))
        .collect();
    let sql = format!(
        "UPDATE {} SET {}, updated_at = NOW() WHERE id = $1",
        entity_type.table(),
        assignments.join(", ")
    );

    let mut query = sqlx::query(&sql).bind(id);
    for (_, value) in updates {
        query = bind_value(query, value);
    }
    query.execute(&mut *conn).await?;
    Ok(())
}

fn bind_value<'q>(query: PgQuery<'q>, value: &FieldValue) -> PgQuery<'q> {
    match value {
        FieldValue::Text(v) => query.bind(v.clone()),
        FieldValue::Array(v) => query.bind(v.clone()),
        FieldValue::Date(v) => query.bind(*v),
        FieldValue::Number(v) => query.bind(*v),
    }
}

fn distinct<const N: usize>(ids: [Option<DbId>; N]) -> Vec<DbId> {
    let mut out: Vec<DbId> = Vec::with_capacity(N);
    for id in ids.into_iter().flatten() {
        if !out.contains(&id) {
            out.push(id);
        }
    }
    out
}
