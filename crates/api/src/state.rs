use std::sync::Arc;

use dedupe_core::validator::SemanticValidator;

use crate::config::ServerConfig;

/// Shared application state available to all Axum handlers via `State<AppState>`.
///
/// Cheaply cloneable: every field is an `Arc` or a pool handle.
#[derive(Clone)]
pub struct AppState {
    pub pool: dedupe_db::DbPool,
    pub config: Arc<ServerConfig>,
    /// Audit events are published here and persisted in the background.
    pub event_bus: Arc<dedupe_events::EventBus>,
    /// `None` when no `SEMANTIC_VALIDATOR_URL` is configured.
    pub validator: Option<Arc<dyn SemanticValidator>>,
}
