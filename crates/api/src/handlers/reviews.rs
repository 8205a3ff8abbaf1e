//! Handlers for review mutations.
//!
//! Each mutation recomputes the reviewed contact's rating and its
//! organization's rating in the same transaction.

use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::Json;
use dedupe_core::error::CoreError;
use dedupe_core::rating::validate_rating;
use dedupe_core::types::DbId;
use dedupe_db::models::review::{CreateReview, UpdateReview};
use dedupe_db::repositories::{ContactRepo, ReviewRepo};

use crate::error::AppResult;
use crate::middleware::rbac::RequireAuth;
use crate::response::DataResponse;
use crate::state::AppState;

fn review_not_found(id: DbId) -> CoreError {
    CoreError::NotFound { entity: "review", id }
}

/// POST /api/v1/reviews
pub async fn create_review(
    State(state): State<AppState>,
    RequireAuth(user): RequireAuth,
    Json(body): Json<CreateReview>,
) -> AppResult<impl IntoResponse> {
    validate_rating(body.rating)?;
    if ContactRepo::find_by_id(&state.pool, body.contact_id)
        .await?
        .is_none()
    {
        return Err(CoreError::NotFound {
            entity: "contact",
            id: body.contact_id,
        }
        .into());
    }

    let review = ReviewRepo::create(&state.pool, &body, Some(user.user_id)).await?;
    Ok((StatusCode::CREATED, Json(DataResponse { data: review })))
}

/// GET /api/v1/reviews/{id}
pub async fn get_review(
    State(state): State<AppState>,
    _auth: RequireAuth,
    Path(id): Path<DbId>,
) -> AppResult<impl IntoResponse> {
    let review = ReviewRepo::find_by_id(&state.pool, id)
        .await?
        .ok_or_else(|| review_not_found(id))?;
    Ok(Json(DataResponse { data: review }))
}

/// GET /api/v1/contacts/{id}/reviews
pub async fn list_contact_reviews(
    State(state): State<AppState>,
    _auth: RequireAuth,
    Path(contact_id): Path<DbId>,
) -> AppResult<impl IntoResponse> {
    let reviews = ReviewRepo::list_by_contact(&state.pool, contact_id).await?;
    Ok(Json(DataResponse { data: reviews }))
}

/// PUT /api/v1/reviews/{id}
pub async fn update_review(
    State(state): State<AppState>,
    _auth: RequireAuth,
    Path(id): Path<DbId>,
    Json(body): Json<UpdateReview>,
) -> AppResult<impl IntoResponse> {
    if let Some(rating) = body.rating {
        validate_rating(rating)?;
    }
    let review = ReviewRepo::update(&state.pool, id, &body)
        .await?
        .ok_or_else(|| review_not_found(id))?;
    Ok(Json(DataResponse { data: review }))
}

/// DELETE /api/v1/reviews/{id}
pub async fn delete_review(
    State(state): State<AppState>,
    _auth: RequireAuth,
    Path(id): Path<DbId>,
) -> AppResult<StatusCode> {
    if ReviewRepo::delete(&state.pool, id).await? {
        Ok(StatusCode::NO_CONTENT)
    } else {
        Err(review_not_found(id).into())
    }
}
