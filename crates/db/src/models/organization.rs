//! Organization entity model and DTOs.

use chrono::NaiveDate;
use dedupe_core::candidates::MatchProfile;
use dedupe_core::record::{FieldSource, FieldValue};
use dedupe_core::types::{DbId, Timestamp};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

use super::{array_value, text_value};

/// A row from the `organizations` table.
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct Organization {
    pub id: DbId,
    pub name: String,
    pub business_id: Option<String>,
    pub phone: Option<String>,
    pub email: Option<String>,
    pub website: Option<String>,
    pub address: Option<String>,
    pub city: Option<String>,
    pub industry: Option<String>,
    pub tags: Vec<String>,
    pub notes: Option<String>,
    pub founded_on: Option<NaiveDate>,
    pub employee_count: Option<f64>,
    /// Derived from the organization's contacts. Never edited directly.
    pub average_rating: Option<f64>,
    pub review_count: i32,
    pub created_at: Timestamp,
    pub updated_at: Timestamp,
}

impl Organization {
    /// Matching keys used by the candidate generator.
    pub fn match_profile(&self) -> MatchProfile {
        MatchProfile {
            id: self.id,
            name: self.name.clone(),
            identifier: self.business_id.clone(),
            phones: self.phone.iter().cloned().collect(),
            email: self.email.clone(),
        }
    }
}

impl FieldSource for Organization {
    fn field_value(&self, field: &str) -> Option<FieldValue> {
        let value = match field {
            "name" => FieldValue::Text(Some(self.name.clone())),
            "business_id" => text_value(&self.business_id),
            "phone" => text_value(&self.phone),
            "email" => text_value(&self.email),
            "website" => text_value(&self.website),
            "address" => text_value(&self.address),
            "city" => text_value(&self.city),
            "industry" => text_value(&self.industry),
            "tags" => array_value(&self.tags),
            "notes" => text_value(&self.notes),
            "founded_on" => FieldValue::Date(self.founded_on),
            "employee_count" => FieldValue::Number(self.employee_count),
            _ => return None,
        };
        Some(value)
    }
}

/// DTO for creating a new organization.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct CreateOrganization {
    pub name: String,
    pub business_id: Option<String>,
    pub phone: Option<String>,
    pub email: Option<String>,
    pub website: Option<String>,
    pub address: Option<String>,
    pub city: Option<String>,
    pub industry: Option<String>,
    #[serde(default)]
    pub tags: Vec<String>,
    pub notes: Option<String>,
    pub founded_on: Option<NaiveDate>,
    pub employee_count: Option<f64>,
}
