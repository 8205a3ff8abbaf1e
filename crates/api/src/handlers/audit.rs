//! Read access to the duplicate engine's audit trail.

use axum::extract::{Query, State};
use axum::response::IntoResponse;
use axum::Json;
use dedupe_core::audit::VALID_EVENT_TYPES;
use dedupe_core::error::CoreError;
use dedupe_db::repositories::AuditEventRepo;
use serde::Deserialize;

use crate::error::AppResult;
use crate::middleware::rbac::RequireReviewer;
use crate::response::DataResponse;
use crate::state::AppState;

const DEFAULT_LIMIT: i64 = 50;
const MAX_LIMIT: i64 = 500;

#[derive(Debug, Deserialize)]
pub struct AuditQuery {
    pub event_type: Option<String>,
    pub limit: Option<i64>,
    pub offset: Option<i64>,
}

/// GET /api/v1/audit-events
///
/// Most recent events first, optionally filtered by `event_type`.
pub async fn list_events(
    State(state): State<AppState>,
    _auth: RequireReviewer,
    Query(params): Query<AuditQuery>,
) -> AppResult<impl IntoResponse> {
    if let Some(event_type) = params.event_type.as_deref() {
        if !VALID_EVENT_TYPES.contains(&event_type) {
            return Err(CoreError::Validation(format!(
                "Unknown event type '{event_type}'. Must be one of: {}",
                VALID_EVENT_TYPES.join(", ")
            ))
            .into());
        }
    }
    let limit = params.limit.unwrap_or(DEFAULT_LIMIT).clamp(1, MAX_LIMIT);
    let offset = params.offset.unwrap_or(0).max(0);

    let events =
        AuditEventRepo::list_recent(&state.pool, params.event_type.as_deref(), limit, offset)
            .await?;
    Ok(Json(DataResponse { data: events }))
}
