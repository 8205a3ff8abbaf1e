//! Entity types that participate in duplicate detection.

use serde::{Deserialize, Serialize};

use crate::error::CoreError;

pub const ENTITY_ORGANIZATION: &str = "organization";
pub const ENTITY_CONTACT: &str = "contact";
pub const VALID_ENTITY_TYPES: &[&str] = &[ENTITY_ORGANIZATION, ENTITY_CONTACT];

/// The kinds of record the engine can scan and merge.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EntityType {
    Organization,
    Contact,
}

impl EntityType {
    pub const ALL: [EntityType; 2] = [EntityType::Organization, EntityType::Contact];

    /// Value stored in the `entity_type` column.
    pub fn as_str(self) -> &'static str {
        match self {
            EntityType::Organization => ENTITY_ORGANIZATION,
            EntityType::Contact => ENTITY_CONTACT,
        }
    }

    /// Table holding records of this type.
    pub fn table(self) -> &'static str {
        match self {
            EntityType::Organization => "organizations",
            EntityType::Contact => "contacts",
        }
    }

    /// Parse a stored or user-supplied entity type string.
    pub fn parse(value: &str) -> Result<Self, CoreError> {
        match value {
            ENTITY_ORGANIZATION => Ok(EntityType::Organization),
            ENTITY_CONTACT => Ok(EntityType::Contact),
            other => Err(CoreError::Validation(format!(
                "Invalid entity type '{other}'. Must be one of: {}",
                VALID_ENTITY_TYPES.join(", ")
            ))),
        }
    }
}

impl std::fmt::Display for EntityType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}
