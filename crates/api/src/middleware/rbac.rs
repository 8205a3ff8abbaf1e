//! Permission extractors layered on [`AuthUser`].

use axum::extract::FromRequestParts;
use axum::http::request::Parts;
use dedupe_core::error::CoreError;

use super::auth::AuthUser;
use crate::error::AppError;
use crate::state::AppState;

/// A caller allowed to scan and resolve duplicates (`reviewer` or `admin`).
/// Anyone else gets 403.
///
/// ```ignore
/// async fn merge(RequireReviewer(user): RequireReviewer) -> AppResult<Json<()>> {
///     Ok(Json(()))
/// }
/// ```
pub struct RequireReviewer(pub AuthUser);

impl FromRequestParts<AppState> for RequireReviewer {
    type Rejection = AppError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let user = AuthUser::from_request_parts(parts, state).await?;
        if !user.can_resolve_duplicates() {
            tracing::debug!(user_id = user.user_id, role = %user.role, "Resolution denied");
            return Err(CoreError::Forbidden("Reviewer or Admin role required".into()).into());
        }
        Ok(RequireReviewer(user))
    }
}

/// Any authenticated caller. Read endpoints and review mutations use this.
pub struct RequireAuth(pub AuthUser);

impl FromRequestParts<AppState> for RequireAuth {
    type Rejection = AppError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        AuthUser::from_request_parts(parts, state).await.map(RequireAuth)
    }
}
