//! Repository for the `reviews` table.
//!
//! Every mutation runs in a transaction together with the rating
//! recomputation of the affected contact and its organization.

use dedupe_core::types::DbId;
use sqlx::PgPool;

use crate::models::review::{CreateReview, Review, UpdateReview};
use crate::repositories::RatingRepo;

/// Column list shared across queries to avoid repetition.
const COLUMNS: &str =
    "id, contact_id, project_id, author_id, rating, comment, created_at, updated_at";

/// Provides CRUD operations for reviews.
pub struct ReviewRepo;

impl ReviewRepo {
    /// Insert a review and recompute ratings.
    pub async fn create(
        pool: &PgPool,
        input: &CreateReview,
        author_id: Option<DbId>,
    ) -> Result<Review, sqlx::Error> {
        let mut tx = pool.begin().await?;
        let query = format!(
            "INSERT INTO reviews (contact_id, project_id, author_id, rating, comment)
             VALUES ($1, $2, $3, $4, $5)
             RETURNING {COLUMNS}"
        );
        let review = sqlx::query_as::<_, Review>(&query)
            .bind(input.contact_id)
            .bind(input.project_id)
            .bind(author_id)
            .bind(input.rating)
            .bind(&input.comment)
            .fetch_one(&mut *tx)
            .await?;

        RatingRepo::recompute_for_contact(&mut tx, review.contact_id).await?;
        tx.commit().await?;
        Ok(review)
    }

    /// Find a review by its ID.
    pub async fn find_by_id(pool: &PgPool, id: DbId) -> Result<Option<Review>, sqlx::Error> {
        let query = format!("SELECT {COLUMNS} FROM reviews WHERE id = $1");
        sqlx::query_as::<_, Review>(&query)
            .bind(id)
            .fetch_optional(pool)
            .await
    }

    /// List the reviews of a contact, newest first.
    pub async fn list_by_contact(pool: &PgPool, contact_id: DbId) -> Result<Vec<Review>, sqlx::Error> {
        let query = format!(
            "SELECT {COLUMNS} FROM reviews WHERE contact_id = $1 ORDER BY created_at DESC, id DESC"
        );
        sqlx::query_as::<_, Review>(&query)
            .bind(contact_id)
            .fetch_all(pool)
            .await
    }

    /// Update a review and recompute ratings. Only non-`None` fields are
    /// applied.
    ///
    /// Returns `None` if no row with the given `id` exists.
    pub async fn update(
        pool: &PgPool,
        id: DbId,
        input: &UpdateReview,
    ) -> Result<Option<Review>, sqlx::Error> {
        let mut tx = pool.begin().await?;
        let query = format!(
            "UPDATE reviews SET
                rating = COALESCE($2, rating),
                comment = COALESCE($3, comment),
                updated_at = NOW()
             WHERE id = $1
             RETURNING {COLUMNS}"
        );
        let review = sqlx::query_as::<_, Review>(&query)
            .bind(id)
            .bind(input.rating)
            .bind(&input.comment)
            .fetch_optional(&mut *tx)
            .await?;

        if let Some(review) = &review {
            RatingRepo::recompute_for_contact(&mut tx, review.contact_id).await?;
        }
        tx.commit().await?;
        Ok(review)
    }

    /// Delete a review and recompute ratings. Returns `true` if a row was
    /// removed.
    pub async fn delete(pool: &PgPool, id: DbId) -> Result<bool, sqlx::Error> {
        let mut tx = pool.begin().await?;
        let contact_id: Option<DbId> =
            sqlx::query_scalar("DELETE FROM reviews WHERE id = $1 RETURNING contact_id")
                .bind(id)
                .fetch_optional(&mut *tx)
                .await?;

        let Some(contact_id) = contact_id else {
            return Ok(false);
        };
        RatingRepo::recompute_for_contact(&mut tx, contact_id).await?;
        tx.commit().await?;
        Ok(true)
    }
}
