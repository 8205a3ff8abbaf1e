//! Recomputation of the derived `average_rating` / `review_count` columns.
//!
//! Runs inside the caller's transaction so a review mutation or merge and
//! its rating update commit together. The target row is locked before the
//! inputs are read so concurrent writers recompute one after another.

use dedupe_core::rating::{contact_rating, organization_rating, RatingSummary};
use dedupe_core::types::DbId;
use sqlx::PgConnection;

/// Writes derived ratings for contacts and organizations.
pub struct RatingRepo;

impl RatingRepo {
    /// Recompute a contact's rating from its reviews.
    pub async fn recompute_contact(
        conn: &mut PgConnection,
        contact_id: DbId,
    ) -> Result<RatingSummary, sqlx::Error> {
        // NO KEY UPDATE does not conflict with the KEY SHARE lock a review
        // insert takes on the contact through its foreign key.
        sqlx::query("SELECT id FROM contacts WHERE id = $1 FOR NO KEY UPDATE")
            .bind(contact_id)
            .execute(&mut *conn)
            .await?;

        let ratings: Vec<i16> = sqlx::query_scalar("SELECT rating FROM reviews WHERE contact_id = $1")
            .bind(contact_id)
            .fetch_all(&mut *conn)
            .await?;
        let summary = contact_rating(&ratings);

        sqlx::query(
            "UPDATE contacts SET average_rating = $2, review_count = $3, updated_at = NOW() \
             WHERE id = $1",
        )
        .bind(contact_id)
        .bind(summary.average_rating)
        .bind(summary.review_count)
        .execute(&mut *conn)
        .await?;

        Ok(summary)
    }

    /// Recompute an organization's rating from its contacts' ratings.
    pub async fn recompute_organization(
        conn: &mut PgConnection,
        organization_id: DbId,
    ) -> Result<RatingSummary, sqlx::Error> {
        sqlx::query("SELECT id FROM organizations WHERE id = $1 FOR NO KEY UPDATE")
            .bind(organization_id)
            .execute(&mut *conn)
            .await?;

        let rows: Vec<(Option<f64>, i32)> = sqlx::query_as(
            "SELECT average_rating, review_count FROM contacts WHERE organization_id = $1",
        )
        .bind(organization_id)
        .fetch_all(&mut *conn)
        .await?;

        let contacts: Vec<RatingSummary> = rows
            .into_iter()
            .map(|(average_rating, review_count)| RatingSummary {
                average_rating,
                review_count,
            })
            .collect();
        let summary = organization_rating(&contacts);

        sqlx::query(
            "UPDATE organizations SET average_rating = $2, review_count = $3, updated_at = NOW() \
             WHERE id = $1",
        )
        .bind(organization_id)
        .bind(summary.average_rating)
        .bind(summary.review_count)
        .execute(&mut *conn)
        .await?;

        Ok(summary)
    }

    /// Recompute a contact and then the organization it belongs to, if any.
    pub async fn recompute_for_contact(
        conn: &mut PgConnection,
        contact_id: DbId,
    ) -> Result<(), sqlx::Error> {
        Self::recompute_contact(conn, contact_id).await?;

        let organization_id: Option<DbId> =
            sqlx::query_scalar("SELECT organization_id FROM contacts WHERE id = $1")
                .bind(contact_id)
                .fetch_optional(&mut *conn)
                .await?
                .flatten();
        if let Some(organization_id) = organization_id {
            Self::recompute_organization(conn, organization_id).await?;
        }
        Ok(())
    }
}
