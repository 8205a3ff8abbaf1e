//! Per-entity field descriptor tables.
//!
//! The conflict identifier, merge planner, and record snapshots are all
//! driven by these tables instead of per-type code. Field names equal the
//! database column names.

use serde::{Deserialize, Serialize};

use crate::entity::EntityType;

/// Comparison type of a mergeable field.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FieldType {
    Text,
    Array,
    Date,
    Number,
}

/// A comparable, mergeable field of an entity.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FieldDescriptor {
    pub field: &'static str,
    pub label: &'static str,
    pub field_type: FieldType,
}

const fn text(field: &'static str, label: &'static str) -> FieldDescriptor {
    FieldDescriptor {
        field,
        label,
        field_type: FieldType::Text,
    }
}

pub const ORGANIZATION_FIELDS: &[FieldDescriptor] = &[
    text("name", "Name"),
    text("business_id", "Business ID"),
    text("phone", "Phone"),
    text("email", "Email"),
    text("website", "Website"),
    text("address", "Address"),
    text("city", "City"),
    text("industry", "Industry"),
    FieldDescriptor {
        field: "tags",
        label: "Tags",
        field_type: FieldType::Array,
    },
    text("notes", "Notes"),
    FieldDescriptor {
        field: "founded_on",
        label: "Founded",
        field_type: FieldType::Date,
    },
    FieldDescriptor {
        field: "employee_count",
        label: "Employees",
        field_type: FieldType::Number,
    },
];

pub const CONTACT_FIELDS: &[FieldDescriptor] = &[
    text("first_name", "First name"),
    text("last_name", "Last name"),
    text("email", "Email"),
    text("phone", "Phone"),
    text("mobile", "Mobile"),
    text("job_title", "Job title"),
    FieldDescriptor {
        field: "skills",
        label: "Skills",
        field_type: FieldType::Array,
    },
    text("notes", "Notes"),
    FieldDescriptor {
        field: "birth_date",
        label: "Birth date",
        field_type: FieldType::Date,
    },
];

/// The descriptor table for `entity_type`.
pub fn fields_for(entity_type: EntityType) -> &'static [FieldDescriptor] {
    match entity_type {
        EntityType::Organization => ORGANIZATION_FIELDS,
        EntityType::Contact => CONTACT_FIELDS,
    }
}

/// Fields that may never be emptied by a merge.
pub fn is_required(entity_type: EntityType, field: &str) -> bool {
    match entity_type {
        EntityType::Organization => field == "name",
        EntityType::Contact => field == "first_name",
    }
}

/// Look up a single descriptor by field name.
pub fn descriptor(entity_type: EntityType, field: &str) -> Option<&'static FieldDescriptor> {
    fields_for(entity_type).iter().find(|d| d.field == field)
}
