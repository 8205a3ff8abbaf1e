//! Handlers for duplicate scanning, the ledger, and merge resolution.
//!
//! Every mutation publishes one audit event after it commits.

use axum::extract::{Path, Query, State};
use axum::response::IntoResponse;
use axum::Json;
use dedupe_core::audit::{event_types, status_event_type};
use dedupe_core::conflicts::{identify_conflicts, ConflictField};
use dedupe_core::duplicate_set::DuplicateSetStatus;
use dedupe_core::entity::EntityType;
use dedupe_core::error::CoreError;
use dedupe_core::scan::ScanOrchestrator;
use dedupe_core::types::DbId;
use dedupe_db::models::duplicate_set::{
    DuplicateSet, DuplicateSetFilter, MergeRequest, ScanRequest, StatusRequest,
};
use dedupe_db::repositories::{ContactRepo, DuplicateSetRepo, MergeRepo, OrganizationRepo};
use dedupe_db::scan_store::PgScanStore;
use dedupe_events::DomainEvent;

use crate::error::AppResult;
use crate::middleware::rbac::{RequireAuth, RequireReviewer};
use crate::response::DataResponse;
use crate::state::AppState;

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

async fn load_set(state: &AppState, id: DbId) -> AppResult<DuplicateSet> {
    DuplicateSetRepo::find_by_id(&state.pool, id)
        .await?
        .ok_or_else(|| {
            CoreError::NotFound {
                entity: "duplicate_set",
                id,
            }
            .into()
        })
}

/// Unwrap a record of a set, reporting a deleted one as `NotFound`.
fn require_record<T>(record: Option<T>, entity_type: EntityType, id: DbId) -> AppResult<T> {
    record.ok_or_else(|| {
        CoreError::NotFound {
            entity: entity_type.as_str(),
            id,
        }
        .into()
    })
}

/// Requested entity types; an empty list means every type.
fn parse_entity_types(raw: &[String]) -> Result<Vec<EntityType>, CoreError> {
    if raw.is_empty() {
        return Ok(EntityType::ALL.to_vec());
    }
    raw.iter().map(|s| EntityType::parse(s.trim())).collect()
}

// ---------------------------------------------------------------------------
// Scan
// ---------------------------------------------------------------------------

/// POST /api/v1/duplicates/scan
///
/// Run a scan synchronously and return per-type counts.
pub async fn scan(
    State(state): State<AppState>,
    RequireReviewer(user): RequireReviewer,
    Json(body): Json<ScanRequest>,
) -> AppResult<impl IntoResponse> {
    let entity_types = parse_entity_types(&body.entity_types)?;

    let orchestrator = ScanOrchestrator::new(
        PgScanStore::new(state.pool.clone()),
        state.validator.clone(),
        state.config.dedup.clone(),
    );
    let report = orchestrator
        .run(&entity_types, body.use_semantic_validation)
        .await;

    tracing::info!(
        user_id = user.user_id,
        total_saved = report.total_saved,
        "Duplicate scan completed"
    );
    state
        .event_bus
        .publish(DomainEvent::scan_completed(&report, Some(user.user_id)));

    Ok(Json(DataResponse { data: report }))
}

// ---------------------------------------------------------------------------
// Ledger queries
// ---------------------------------------------------------------------------

/// GET /api/v1/duplicates
///
/// List sets, highest score first. Filters: `entity_type`, `status`,
/// `limit`, `offset`.
pub async fn list_sets(
    State(state): State<AppState>,
    _auth: RequireAuth,
    Query(filter): Query<DuplicateSetFilter>,
) -> AppResult<impl IntoResponse> {
    if let Some(entity_type) = &filter.entity_type {
        EntityType::parse(entity_type)?;
    }
    if let Some(status) = &filter.status {
        DuplicateSetStatus::parse(status)?;
    }
    let sets = DuplicateSetRepo::list(&state.pool, &filter).await?;
    Ok(Json(DataResponse { data: sets }))
}

/// GET /api/v1/duplicates/stats
pub async fn stats(
    State(state): State<AppState>,
    _auth: RequireAuth,
) -> AppResult<impl IntoResponse> {
    let counts = DuplicateSetRepo::counts_by_status(&state.pool).await?;
    Ok(Json(DataResponse { data: counts }))
}

/// GET /api/v1/duplicates/{id}
pub async fn get_set(
    State(state): State<AppState>,
    _auth: RequireAuth,
    Path(id): Path<DbId>,
) -> AppResult<impl IntoResponse> {
    let set = load_set(&state, id).await?;
    Ok(Json(DataResponse { data: set }))
}

/// GET /api/v1/duplicates/{id}/conflicts
///
/// Fields where the set's two records disagree. 404 when either record no
/// longer exists.
pub async fn get_conflicts(
    State(state): State<AppState>,
    _auth: RequireAuth,
    Path(id): Path<DbId>,
) -> AppResult<impl IntoResponse> {
    let set = load_set(&state, id).await?;
    let entity_type = set.entity_type()?;

    let conflicts: Vec<ConflictField> = match entity_type {
        EntityType::Organization => {
            let primary = require_record(
                OrganizationRepo::find_by_id(&state.pool, set.primary_id).await?,
                entity_type,
                set.primary_id,
            )?;
            let secondary = require_record(
                OrganizationRepo::find_by_id(&state.pool, set.secondary_id).await?,
                entity_type,
                set.secondary_id,
            )?;
            identify_conflicts(entity_type, Some(&primary), Some(&secondary))
        }
        EntityType::Contact => {
            let primary = require_record(
                ContactRepo::find_by_id(&state.pool, set.primary_id).await?,
                entity_type,
                set.primary_id,
            )?;
            let secondary = require_record(
                ContactRepo::find_by_id(&state.pool, set.secondary_id).await?,
                entity_type,
                set.secondary_id,
            )?;
            identify_conflicts(entity_type, Some(&primary), Some(&secondary))
        }
    };

    Ok(Json(DataResponse { data: conflicts }))
}

// ---------------------------------------------------------------------------
// Resolution
// ---------------------------------------------------------------------------

/// POST /api/v1/duplicates/{id}/merge
///
/// Merge the pair into `masterId`, applying `fieldResolutions`.
pub async fn merge_set(
    State(state): State<AppState>,
    RequireReviewer(user): RequireReviewer,
    Path(id): Path<DbId>,
    Json(body): Json<MergeRequest>,
) -> AppResult<impl IntoResponse> {
    let set = MergeRepo::merge(
        &state.pool,
        id,
        body.master_id,
        &body.field_resolutions,
        Some(user.user_id),
    )
    .await?;

    state.event_bus.publish(DomainEvent::set_decision(
        event_types::MERGED,
        &set,
        Some(user.user_id),
    ));
    Ok(Json(DataResponse { data: set }))
}

/// POST /api/v1/duplicates/{id}/status
///
/// Reject or skip a pending set.
pub async fn update_status(
    State(state): State<AppState>,
    RequireReviewer(user): RequireReviewer,
    Path(id): Path<DbId>,
    Json(body): Json<StatusRequest>,
) -> AppResult<impl IntoResponse> {
    let status = DuplicateSetStatus::parse(body.status.trim())?;
    let set = DuplicateSetRepo::update_status(&state.pool, id, status, Some(user.user_id)).await?;

    tracing::info!(set_id = id, status = %status, user_id = user.user_id, "Duplicate set resolved");
    state.event_bus.publish(DomainEvent::set_decision(
        status_event_type(status),
        &set,
        Some(user.user_id),
    ));
    Ok(Json(DataResponse { data: set }))
}

/// POST /api/v1/duplicates/{id}/undo
///
/// Reverse a merge and return the set to pending.
pub async fn undo_merge(
    State(state): State<AppState>,
    RequireReviewer(user): RequireReviewer,
    Path(id): Path<DbId>,
) -> AppResult<impl IntoResponse> {
    // The published event should name the master that was undone.
    let before = load_set(&state, id).await?;
    let set = MergeRepo::undo_merge(&state.pool, id, Some(user.user_id)).await?;

    let event = DomainEvent::set_decision(event_types::MERGE_UNDONE, &set, Some(user.user_id))
        .with_payload(serde_json::json!({
            "entityType": set.entity_type,
            "primaryId": set.primary_id,
            "secondaryId": set.secondary_id,
            "status": set.status,
            "masterId": before.merged_master_id,
        }));
    state.event_bus.publish(event);
    Ok(Json(DataResponse { data: set }))
}
