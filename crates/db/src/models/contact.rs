//! Contact entity model and DTOs.

use chrono::NaiveDate;
use dedupe_core::candidates::MatchProfile;
use dedupe_core::record::{FieldSource, FieldValue};
use dedupe_core::types::{DbId, Timestamp};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

use super::{array_value, text_value};

/// A row from the `contacts` table.
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct Contact {
    pub id: DbId,
    pub organization_id: Option<DbId>,
    pub first_name: String,
    pub last_name: Option<String>,
    pub email: Option<String>,
    pub phone: Option<String>,
    pub mobile: Option<String>,
    pub job_title: Option<String>,
    pub skills: Vec<String>,
    pub notes: Option<String>,
    pub birth_date: Option<NaiveDate>,
    /// Mean of the contact's review ratings. Never edited directly.
    pub average_rating: Option<f64>,
    pub review_count: i32,
    pub created_at: Timestamp,
    pub updated_at: Timestamp,
}

impl Contact {
    pub fn full_name(&self) -> String {
        match self.last_name.as_deref().map(str::trim) {
            Some(last) if !last.is_empty() => format!("{} {last}", self.first_name.trim()),
            _ => self.first_name.trim().to_string(),
        }
    }

    /// Matching keys used by the candidate generator. Both the phone and
    /// the mobile number are exact-match keys.
    pub fn match_profile(&self) -> MatchProfile {
        MatchProfile {
            id: self.id,
            name: self.full_name(),
            identifier: None,
            phones: self.phone.iter().chain(self.mobile.iter()).cloned().collect(),
            email: self.email.clone(),
        }
    }
}

impl FieldSource for Contact {
    fn field_value(&self, field: &str) -> Option<FieldValue> {
        let value = match field {
            "first_name" => FieldValue::Text(Some(self.first_name.clone())),
            "last_name" => text_value(&self.last_name),
            "email" => text_value(&self.email),
            "phone" => text_value(&self.phone),
            "mobile" => text_value(&self.mobile),
            "job_title" => text_value(&self.job_title),
            "skills" => array_value(&self.skills),
            "notes" => text_value(&self.notes),
            "birth_date" => FieldValue::Date(self.birth_date),
            _ => return None,
        };
        Some(value)
    }
}

/// DTO for creating a new contact.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct CreateContact {
    pub organization_id: Option<DbId>,
    pub first_name: String,
    pub last_name: Option<String>,
    pub email: Option<String>,
    pub phone: Option<String>,
    pub mobile: Option<String>,
    pub job_title: Option<String>,
    #[serde(default)]
    pub skills: Vec<String>,
    pub notes: Option<String>,
    pub birth_date: Option<NaiveDate>,
}
