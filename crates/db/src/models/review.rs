//! Review model and DTOs.
//!
//! Every review mutation recomputes the derived ratings of the reviewed
//! contact and its organization.

use dedupe_core::types::{DbId, Timestamp};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

/// A row from the `reviews` table.
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct Review {
    pub id: DbId,
    pub contact_id: DbId,
    pub project_id: Option<DbId>,
    pub author_id: Option<DbId>,
    pub rating: i16,
    pub comment: Option<String>,
    pub created_at: Timestamp,
    pub updated_at: Timestamp,
}

/// DTO for creating a review. The author is the authenticated caller.
#[derive(Debug, Clone, Deserialize)]
pub struct CreateReview {
    pub contact_id: DbId,
    pub project_id: Option<DbId>,
    pub rating: i16,
    pub comment: Option<String>,
}

/// DTO for updating a review. All fields are optional.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct UpdateReview {
    pub rating: Option<i16>,
    pub comment: Option<String>,
}
