//! Merge planning: decide the surviving record's field values.
//!
//! [`plan_merge`] is pure. The persistence layer executes the resulting
//! [`MergePlan`] inside one transaction.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use crate::conflicts::FieldPair;
use crate::duplicate_set::{ensure_pending, DuplicateSetStatus};
use crate::entity::EntityType;
use crate::error::CoreError;
use crate::fields::{descriptor, fields_for, is_required};
use crate::record::{FieldSource, FieldValue};
use crate::types::DbId;

/// Which side a reviewer took a field value from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ResolutionSource {
    Primary,
    Secondary,
    Merged,
}

/// A reviewer's choice for one field.
///
/// For `primary`/`secondary` the value is read from that record and `value`
/// is ignored. For `merged` the supplied `value` is used; an omitted value on
/// an array field means the union of both sides.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FieldResolution {
    pub field: String,
    #[serde(default)]
    pub value: Option<serde_json::Value>,
    pub source: ResolutionSource,
}

/// The ledger facts a merge depends on.
#[derive(Debug, Clone, Copy)]
pub struct MergeTarget {
    pub set_id: DbId,
    pub entity_type: EntityType,
    pub primary_id: DbId,
    pub secondary_id: DbId,
    pub status: DuplicateSetStatus,
}

/// A field value to write onto the master record.
#[derive(Debug, Clone, PartialEq)]
pub struct FieldUpdate {
    pub field: &'static str,
    pub value: FieldValue,
}

#[derive(Debug, Clone)]
pub struct MergePlan {
    pub set_id: DbId,
    pub entity_type: EntityType,
    pub master_id: DbId,
    pub loser_id: DbId,
    pub updates: Vec<FieldUpdate>,
}

/// The record absorbed by the merge, or `Validation` if `master_id` is not
/// part of the set.
pub fn loser_for(target: &MergeTarget, master_id: DbId) -> Result<DbId, CoreError> {
    if master_id == target.primary_id {
        Ok(target.secondary_id)
    } else if master_id == target.secondary_id {
        Ok(target.primary_id)
    } else {
        Err(CoreError::Validation(format!(
            "Master {master_id} is not part of duplicate set {} ({} / {})",
            target.set_id, target.primary_id, target.secondary_id
        )))
    }
}

/// Build the merge plan for a pending set.
///
/// Fields without a reviewer resolution default to whichever side is
/// non-empty, preferring the set's primary record when both have data.
pub fn plan_merge<P, S>(
    target: &MergeTarget,
    master_id: DbId,
    primary: &P,
    secondary: &S,
    resolutions: &[FieldResolution],
) -> Result<MergePlan, CoreError>
where
    P: FieldSource + ?Sized,
    S: FieldSource + ?Sized,
{
    ensure_pending(target.set_id, target.status)?;
    let loser_id = loser_for(target, master_id)?;
    let by_field = index_resolutions(target.entity_type, resolutions)?;
    let master_is_primary = master_id == target.primary_id;

    let mut updates = Vec::new();
    for d in fields_for(target.entity_type) {
        let pair = FieldPair {
            descriptor: d,
            primary: value_of(primary, d.field, d.field_type),
            secondary: value_of(secondary, d.field, d.field_type),
        };

        let chosen = match by_field.get(d.field) {
            Some(resolution) => resolve(&pair, resolution)?,
            None if pair.conflicts() => default_choice(&pair),
            None => continue,
        };

        if chosen.is_empty() && is_required(target.entity_type, d.field) {
            return Err(CoreError::Validation(format!(
                "Field '{}' cannot be empty",
                d.field
            )));
        }

        let current = if master_is_primary {
            &pair.primary
        } else {
            &pair.secondary
        };
        if chosen != *current {
            updates.push(FieldUpdate {
                field: d.field,
                value: chosen,
            });
        }
    }

    Ok(MergePlan {
        set_id: target.set_id,
        entity_type: target.entity_type,
        master_id,
        loser_id,
        updates,
    })
}

fn index_resolutions(
    entity_type: EntityType,
    resolutions: &[FieldResolution],
) -> Result<HashMap<&str, &FieldResolution>, CoreError> {
    let mut by_field = HashMap::with_capacity(resolutions.len());
    for r in resolutions {
        if descriptor(entity_type, &r.field).is_none() {
            return Err(CoreError::Validation(format!(
                "Unknown {entity_type} field '{}'",
                r.field
            )));
        }
        if by_field.insert(r.field.as_str(), r).is_some() {
            return Err(CoreError::Validation(format!(
                "Field '{}' is resolved more than once",
                r.field
            )));
        }
    }
    Ok(by_field)
}

fn resolve(pair: &FieldPair, resolution: &FieldResolution) -> Result<FieldValue, CoreError> {
    match resolution.source {
        ResolutionSource::Primary => Ok(pair.primary.clone()),
        ResolutionSource::Secondary => Ok(pair.secondary.clone()),
        ResolutionSource::Merged => match &resolution.value {
            Some(value) => FieldValue::from_json(pair.descriptor.field_type, value),
            None => pair.primary.union(&pair.secondary).ok_or_else(|| {
                CoreError::Validation(format!(
                    "Field '{}' needs a value for a merged resolution",
                    pair.descriptor.field
                ))
            }),
        },
    }
}

fn default_choice(pair: &FieldPair) -> FieldValue {
    if pair.primary.is_empty() {
        pair.secondary.clone()
    } else {
        pair.primary.clone()
    }
}

fn value_of<S: FieldSource + ?Sized>(
    source: &S,
    field: &str,
    field_type: crate::fields::FieldType,
) -> FieldValue {
    source
        .field_value(field)
        .filter(|v| v.field_type() == field_type)
        .unwrap_or_else(|| FieldValue::empty(field_type))
}
