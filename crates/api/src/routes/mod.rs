pub mod audit;
pub mod duplicates;
pub mod health;
pub mod reviews;

use axum::routing::get;
use axum::Router;

use crate::handlers;
use crate::state::AppState;

/// Build the `/api/v1` route tree.
///
/// ```text
/// /duplicates/scan                    run a scan (POST)
/// /duplicates                         list sets (GET)
/// /duplicates/stats                   counts by status (GET)
/// /duplicates/{id}                    one set (GET)
/// /duplicates/{id}/conflicts          field conflicts (GET)
/// /duplicates/{id}/merge              merge (POST)
/// /duplicates/{id}/status             reject or skip (POST)
/// /duplicates/{id}/undo               undo a merge (POST)
///
/// /reviews                            create (POST)
/// /reviews/{id}                       get, update, delete
/// /contacts/{id}/reviews              reviews of a contact (GET)
///
/// /audit-events                       audit trail (GET)
/// ```
pub fn api_routes() -> Router<AppState> {
    Router::new()
        .nest("/duplicates", duplicates::router())
        .nest("/reviews", reviews::router())
        .route(
            "/contacts/{id}/reviews",
            get(handlers::reviews::list_contact_reviews),
        )
        .nest("/audit-events", audit::router())
}
