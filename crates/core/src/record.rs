//! Typed field values and record snapshots.

use std::collections::BTreeMap;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::entity::EntityType;
use crate::error::CoreError;
use crate::fields::{fields_for, FieldType};
use crate::types::DbId;

/// The value of one mergeable field.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", content = "value", rename_all = "lowercase")]
pub enum FieldValue {
    Text(Option<String>),
    Array(Vec<String>),
    Date(Option<NaiveDate>),
    Number(Option<f64>),
}

impl FieldValue {
    pub fn field_type(&self) -> FieldType {
        match self {
            FieldValue::Text(_) => FieldType::Text,
            FieldValue::Array(_) => FieldType::Array,
            FieldValue::Date(_) => FieldType::Date,
            FieldValue::Number(_) => FieldType::Number,
        }
    }

    /// An empty value of the given type.
    pub fn empty(field_type: FieldType) -> Self {
        match field_type {
            FieldType::Text => FieldValue::Text(None),
            FieldType::Array => FieldValue::Array(Vec::new()),
            FieldType::Date => FieldValue::Date(None),
            FieldType::Number => FieldValue::Number(None),
        }
    }

    /// Blank text, an empty array, and missing dates/numbers are empty.
    pub fn is_empty(&self) -> bool {
        match self {
            FieldValue::Text(v) => v.as_deref().is_none_or(|s| s.trim().is_empty()),
            FieldValue::Array(v) => v.is_empty(),
            FieldValue::Date(v) => v.is_none(),
            FieldValue::Number(v) => v.is_none(),
        }
    }

    /// Whether two values carry the same information.
    ///
    /// Text compares trimmed with blank treated as absent; arrays compare as
    /// sorted lists.
    pub fn equivalent(&self, other: &FieldValue) -> bool {
        match (self, other) {
            (FieldValue::Text(a), FieldValue::Text(b)) => {
                let a = a.as_deref().map(str::trim).unwrap_or("");
                let b = b.as_deref().map(str::trim).unwrap_or("");
                a == b
            }
            (FieldValue::Array(a), FieldValue::Array(b)) => sorted(a) == sorted(b),
            (FieldValue::Date(a), FieldValue::Date(b)) => a == b,
            (FieldValue::Number(a), FieldValue::Number(b)) => a == b,
            _ => false,
        }
    }

    /// Plain JSON form used in API responses.
    pub fn to_json(&self) -> serde_json::Value {
        use serde_json::Value;
        match self {
            FieldValue::Text(v) => v.clone().map(Value::String).unwrap_or(Value::Null),
            FieldValue::Array(v) => Value::Array(v.iter().cloned().map(Value::String).collect()),
            FieldValue::Date(v) => v
                .map(|d| Value::String(d.format("%Y-%m-%d").to_string()))
                .unwrap_or(Value::Null),
            FieldValue::Number(v) => v
                .and_then(serde_json::Number::from_f64)
                .map(Value::Number)
                .unwrap_or(Value::Null),
        }
    }

    /// Parse a reviewer-supplied JSON value as a value of `field_type`.
    pub fn from_json(field_type: FieldType, value: &serde_json::Value) -> Result<Self, CoreError> {
        use serde_json::Value;
        let invalid = || {
            CoreError::Validation(format!(
                "Value {value} is not valid for a {field_type:?} field"
            ))
        };

        match (field_type, value) {
            (_, Value::Null) => Ok(FieldValue::empty(field_type)),
            (FieldType::Text, Value::String(s)) => Ok(FieldValue::Text(Some(s.clone()))),
            (FieldType::Array, Value::Array(items)) => items
                .iter()
                .map(|item| item.as_str().map(str::to_string).ok_or_else(invalid))
                .collect::<Result<Vec<_>, _>>()
                .map(FieldValue::Array),
            (FieldType::Date, Value::String(s)) => NaiveDate::parse_from_str(s, "%Y-%m-%d")
                .map(|d| FieldValue::Date(Some(d)))
                .map_err(|_| invalid()),
            (FieldType::Number, Value::Number(n)) => {
                n.as_f64().map(|n| FieldValue::Number(Some(n))).ok_or_else(invalid)
            }
            _ => Err(invalid()),
        }
    }

    /// Order-insensitive union of two array values, deduplicated.
    pub fn union(&self, other: &FieldValue) -> Option<FieldValue> {
        match (self, other) {
            (FieldValue::Array(a), FieldValue::Array(b)) => {
                let mut merged = a.clone();
                for item in b {
                    if !merged.contains(item) {
                        merged.push(item.clone());
                    }
                }
                Some(FieldValue::Array(merged))
            }
            _ => None,
        }
    }
}

fn sorted(values: &[String]) -> Vec<&str> {
    let mut v: Vec<&str> = values.iter().map(String::as_str).collect();
    v.sort_unstable();
    v
}

/// Anything that can expose its mergeable fields by name.
///
/// Implemented by the persisted entity models and by [`RecordSnapshot`].
/// Returns `None` for fields the record does not have.
pub trait FieldSource {
    fn field_value(&self, field: &str) -> Option<FieldValue>;
}

/// A detached copy of a record's mergeable fields.
///
/// Used as the validator payload and as the pre-merge state kept for undo.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RecordSnapshot {
    pub entity_type: EntityType,
    pub id: DbId,
    pub fields: BTreeMap<String, FieldValue>,
}

impl RecordSnapshot {
    /// Copy every descriptor field of `entity_type` out of `source`.
    pub fn capture(entity_type: EntityType, id: DbId, source: &impl FieldSource) -> Self {
        let fields = fields_for(entity_type)
            .iter()
            .map(|d| {
                let value = source
                    .field_value(d.field)
                    .unwrap_or_else(|| FieldValue::empty(d.field_type));
                (d.field.to_string(), value)
            })
            .collect();
        Self {
            entity_type,
            id,
            fields,
        }
    }

    /// Plain `{field: value}` JSON for external consumers.
    pub fn to_json(&self) -> serde_json::Value {
        let map = self
            .fields
            .iter()
            .map(|(k, v)| (k.clone(), v.to_json()))
            .collect::<serde_json::Map<_, _>>();
        let mut object = serde_json::Map::new();
        object.insert("id".into(), self.id.into());
        object.insert("entityType".into(), self.entity_type.as_str().into());
        object.insert("fields".into(), serde_json::Value::Object(map));
        serde_json::Value::Object(object)
    }
}

impl FieldSource for RecordSnapshot {
    fn field_value(&self, field: &str) -> Option<FieldValue> {
        self.fields.get(field).cloned()
    }
}
