use axum::routing::get;
use axum::Router;

use crate::handlers::audit;
use crate::state::AppState;

/// Audit trail routes, nested at `/audit-events`.
pub fn router() -> Router<AppState> {
    Router::new().route("/", get(audit::list_events))
}
