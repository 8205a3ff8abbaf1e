//! Domain model structs and DTOs.
//!
//! Each submodule contains:
//! - A `FromRow` + `Serialize` entity struct matching the database row
//! - A `Deserialize` create DTO for inserts
//! - Update DTOs or query parameter structs where the API needs them

pub mod audit_event;
pub mod contact;
pub mod duplicate_set;
pub mod organization;
pub mod project;
pub mod review;

use dedupe_core::record::FieldValue;

fn text_value(value: &Option<String>) -> FieldValue {
    FieldValue::Text(value.clone())
}

fn array_value(value: &[String]) -> FieldValue {
    FieldValue::Array(value.to_vec())
}
