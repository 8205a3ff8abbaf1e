//! Repository for the `organizations` table.

use dedupe_core::types::DbId;
use sqlx::PgPool;

use crate::models::organization::{CreateOrganization, Organization};

/// Column list shared across queries to avoid repetition.
pub(crate) const COLUMNS: &str = "\
    id, name, business_id, phone, email, website, address, city, industry, \
    tags, notes, founded_on, employee_count, average_rating, review_count, \
    created_at, updated_at";

/// Provides CRUD operations for organizations.
pub struct OrganizationRepo;

impl OrganizationRepo {
    /// Insert a new organization, returning the created row.
    pub async fn create(
        pool: &PgPool,
        input: &CreateOrganization,
    ) -> Result<Organization, sqlx::Error> {
        let query = format!(
            "INSERT INTO organizations
                (name, business_id, phone, email, website, address, city, industry,
                 tags, notes, founded_on, employee_count)
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12)
             RETURNING {COLUMNS}"
        );
        sqlx::query_as::<_, Organization>(&query)
            .bind(&input.name)
            .bind(&input.business_id)
            .bind(&input.phone)
            .bind(&input.email)
            .bind(&input.website)
            .bind(&input.address)
            .bind(&input.city)
            .bind(&input.industry)
            .bind(&input.tags)
            .bind(&input.notes)
            .bind(input.founded_on)
            .bind(input.employee_count)
            .fetch_one(pool)
            .await
    }

    /// Find an organization by its ID.
    pub async fn find_by_id(pool: &PgPool, id: DbId) -> Result<Option<Organization>, sqlx::Error> {
        let query = format!("SELECT {COLUMNS} FROM organizations WHERE id = $1");
        sqlx::query_as::<_, Organization>(&query)
            .bind(id)
            .fetch_optional(pool)
            .await
    }

    /// List every organization ordered by ID.
    pub async fn list(pool: &PgPool) -> Result<Vec<Organization>, sqlx::Error> {
        let query = format!("SELECT {COLUMNS} FROM organizations ORDER BY id");
        sqlx::query_as::<_, Organization>(&query).fetch_all(pool).await
    }
}
