//! Repository for the `projects` and `project_contacts` tables.

use dedupe_core::types::DbId;
use sqlx::PgPool;

use crate::models::project::{CreateProject, Project, ProjectContact};

/// Column list shared across queries to avoid repetition.
const COLUMNS: &str = "id, name, organization_id, created_at, updated_at";

/// Column list for `project_contacts` queries.
const MEMBER_COLUMNS: &str = "id, project_id, contact_id, role, created_at, updated_at";

/// Provides CRUD operations for projects and their contact memberships.
pub struct ProjectRepo;

impl ProjectRepo {
    /// Insert a new project, returning the created row.
    pub async fn create(pool: &PgPool, input: &CreateProject) -> Result<Project, sqlx::Error> {
        let query = format!(
            "INSERT INTO projects (name, organization_id) VALUES ($1, $2) RETURNING {COLUMNS}"
        );
        sqlx::query_as::<_, Project>(&query)
            .bind(&input.name)
            .bind(input.organization_id)
            .fetch_one(pool)
            .await
    }

    /// Find a project by its ID.
    pub async fn find_by_id(pool: &PgPool, id: DbId) -> Result<Option<Project>, sqlx::Error> {
        let query = format!("SELECT {COLUMNS} FROM projects WHERE id = $1");
        sqlx::query_as::<_, Project>(&query)
            .bind(id)
            .fetch_optional(pool)
            .await
    }

    /// Add a contact to a project (idempotent).
    pub async fn add_contact(
        pool: &PgPool,
        project_id: DbId,
        contact_id: DbId,
        role: Option<&str>,
    ) -> Result<(), sqlx::Error> {
        sqlx::query(
            "INSERT INTO project_contacts (project_id, contact_id, role) \
             VALUES ($1, $2, $3) \
             ON CONFLICT DO NOTHING",
        )
        .bind(project_id)
        .bind(contact_id)
        .bind(role)
        .execute(pool)
        .await?;
        Ok(())
    }

    /// List the memberships of a contact ordered by project.
    pub async fn list_memberships(
        pool: &PgPool,
        contact_id: DbId,
    ) -> Result<Vec<ProjectContact>, sqlx::Error> {
        let query = format!(
            "SELECT {MEMBER_COLUMNS} FROM project_contacts WHERE contact_id = $1 ORDER BY project_id"
        );
        sqlx::query_as::<_, ProjectContact>(&query)
            .bind(contact_id)
            .fetch_all(pool)
            .await
    }
}
