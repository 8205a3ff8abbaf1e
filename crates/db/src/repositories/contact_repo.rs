//! Repository for the `contacts` table.

use dedupe_core::types::DbId;
use sqlx::PgPool;

use crate::models::contact::{Contact, CreateContact};

/// Column list shared across queries to avoid repetition.
pub(crate) const COLUMNS: &str = "\
    id, organization_id, first_name, last_name, email, phone, mobile, job_title, \
    skills, notes, birth_date, average_rating, review_count, created_at, updated_at";

/// Provides CRUD operations for contacts.
pub struct ContactRepo;

impl ContactRepo {
    /// Insert a new contact, returning the created row.
    pub async fn create(pool: &PgPool, input: &CreateContact) -> Result<Contact, sqlx::Error> {
        let query = format!(
            "INSERT INTO contacts
                (organization_id, first_name, last_name, email, phone, mobile,
                 job_title, skills, notes, birth_date)
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10)
             RETURNING {COLUMNS}"
        );
        sqlx::query_as::<_, Contact>(&query)
            .bind(input.organization_id)
            .bind(&input.first_name)
            .bind(&input.last_name)
            .bind(&input.email)
            .bind(&input.phone)
            .bind(&input.mobile)
            .bind(&input.job_title)
            .bind(&input.skills)
            .bind(&input.notes)
            .bind(input.birth_date)
            .fetch_one(pool)
            .await
    }

    /// Find a contact by its ID.
    pub async fn find_by_id(pool: &PgPool, id: DbId) -> Result<Option<Contact>, sqlx::Error> {
        let query = format!("SELECT {COLUMNS} FROM contacts WHERE id = $1");
        sqlx::query_as::<_, Contact>(&query)
            .bind(id)
            .fetch_optional(pool)
            .await
    }

    /// List every contact ordered by ID.
    pub async fn list(pool: &PgPool) -> Result<Vec<Contact>, sqlx::Error> {
        let query = format!("SELECT {COLUMNS} FROM contacts ORDER BY id");
        sqlx::query_as::<_, Contact>(&query).fetch_all(pool).await
    }

    /// List the contacts of an organization.
    pub async fn list_by_organization(
        pool: &PgPool,
        organization_id: DbId,
    ) -> Result<Vec<Contact>, sqlx::Error> {
        let query = format!("SELECT {COLUMNS} FROM contacts WHERE organization_id = $1 ORDER BY id");
        sqlx::query_as::<_, Contact>(&query)
            .bind(organization_id)
            .fetch_all(pool)
            .await
    }
}
