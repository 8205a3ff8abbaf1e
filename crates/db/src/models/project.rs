//! Project and project membership models.

use dedupe_core::types::{DbId, Timestamp};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

/// A row from the `projects` table.
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct Project {
    pub id: DbId,
    pub name: String,
    pub organization_id: Option<DbId>,
    pub created_at: Timestamp,
    pub updated_at: Timestamp,
}

/// DTO for creating a new project.
#[derive(Debug, Clone, Deserialize)]
pub struct CreateProject {
    pub name: String,
    pub organization_id: Option<DbId>,
}

/// A row from the `project_contacts` membership table.
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct ProjectContact {
    pub id: DbId,
    pub project_id: DbId,
    pub contact_id: DbId,
    pub role: Option<String>,
    pub created_at: Timestamp,
    pub updated_at: Timestamp,
}
