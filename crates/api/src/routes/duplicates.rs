//! Route definitions for duplicate detection and resolution.

use axum::routing::{get, post};
use axum::Router;

use crate::handlers::duplicates;
use crate::state::AppState;

/// Duplicate routes, nested at `/duplicates`.
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/", get(duplicates::list_sets))
        .route("/scan", post(duplicates::scan))
        .route("/stats", get(duplicates::stats))
        .route("/{id}", get(duplicates::get_set))
        .route("/{id}/conflicts", get(duplicates::get_conflicts))
        .route("/{id}/merge", post(duplicates::merge_set))
        .route("/{id}/status", post(duplicates::update_status))
        .route("/{id}/undo", post(duplicates::undo_merge))
}
