//! Field-level conflicts between two candidate records.

use serde::Serialize;

use crate::entity::EntityType;
use crate::fields::{fields_for, FieldDescriptor, FieldType};
use crate::record::{FieldSource, FieldValue};

/// A field where the two records disagree and at least one side has data.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ConflictField {
    pub field: &'static str,
    pub label: &'static str,
    pub primary_value: serde_json::Value,
    pub secondary_value: serde_json::Value,
    #[serde(rename = "type")]
    pub field_type: FieldType,
}

/// Both sides of one descriptor field, as typed values.
#[derive(Debug, Clone)]
pub struct FieldPair {
    pub descriptor: &'static FieldDescriptor,
    pub primary: FieldValue,
    pub secondary: FieldValue,
}

impl FieldPair {
    pub fn conflicts(&self) -> bool {
        (!self.primary.is_empty() || !self.secondary.is_empty())
            && !self.primary.equivalent(&self.secondary)
    }
}

/// Typed conflicting field pairs; the merge planner works on these.
pub fn conflicting_pairs<A, B>(entity_type: EntityType, primary: &A, secondary: &B) -> Vec<FieldPair>
where
    A: FieldSource + ?Sized,
    B: FieldSource + ?Sized,
{
    fields_for(entity_type)
        .iter()
        .map(|descriptor| FieldPair {
            descriptor,
            primary: value_of(primary, descriptor),
            secondary: value_of(secondary, descriptor),
        })
        .filter(FieldPair::conflicts)
        .collect()
}

/// List the fields where `primary` and `secondary` differ meaningfully.
///
/// Returns an empty list when either record is absent; callers decide how to
/// report a record that no longer exists.
pub fn identify_conflicts<A, B>(
    entity_type: EntityType,
    primary: Option<&A>,
    secondary: Option<&B>,
) -> Vec<ConflictField>
where
    A: FieldSource + ?Sized,
    B: FieldSource + ?Sized,
{
    let (Some(primary), Some(secondary)) = (primary, secondary) else {
        return Vec::new();
    };

    conflicting_pairs(entity_type, primary, secondary)
        .into_iter()
        .map(|pair| ConflictField {
            field: pair.descriptor.field,
            label: pair.descriptor.label,
            primary_value: pair.primary.to_json(),
            secondary_value: pair.secondary.to_json(),
            field_type: pair.descriptor.field_type,
        })
        .collect()
}

fn value_of<S: FieldSource + ?Sized>(source: &S, descriptor: &FieldDescriptor) -> FieldValue {
    source
        .field_value(descriptor.field)
        .filter(|v| v.field_type() == descriptor.field_type)
        .unwrap_or_else(|| FieldValue::empty(descriptor.field_type))
}
