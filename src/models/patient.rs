use std::{fmt, str::FromStr};

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use validator::Validate;

use super::validators::validate_not_blank;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[cfg_attr(feature = "utoipa", derive(utoipa::ToSchema))]
#[serde(rename_all = "UPPERCASE")]
pub enum Gender {
    Male,
    Female,
    Other,
}

impl Gender {
    pub fn as_str(&self) -> &'static str {
        match self {
            Gender::Male => "MALE",
            Gender::Female => "FEMALE",
            Gender::Other => "OTHER",
        }
    }
}

impl fmt::Display for Gender {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Gender {
    type Err = String;

    /// Case-insensitive, so rows written by other tools still load.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        [Gender::Male, Gender::Female, Gender::Other]
            .into_iter()
            .find(|g| g.as_str().eq_ignore_ascii_case(s))
            .ok_or_else(|| format!("Invalid gender: {}", s))
    }
}

/// A persisted patient record.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "utoipa", derive(utoipa::ToSchema))]
#[serde(rename_all = "camelCase")]
pub struct Patient {
    /// Store-assigned identifier
    #[cfg_attr(feature = "utoipa", schema(example = 1))]
    pub id: i64,
    #[cfg_attr(feature = "utoipa", schema(example = "Praveen"))]
    pub first_name: String,
    #[cfg_attr(feature = "utoipa", schema(example = "Kumar"))]
    pub last_name: String,
    pub gender: Gender,
    /// Date of birth (`YYYY-MM-DD`)
    pub birth_day: NaiveDate,
    /// Date the record was created; never changes
    pub created_on: NaiveDate,
}

/// Candidate record as submitted by a client.
///
/// Every field is optional so that missing values surface as rule
/// violations rather than deserialization failures. Unknown fields,
/// including `id` and `createdOn`, are ignored.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[cfg_attr(feature = "utoipa", derive(utoipa::ToSchema))]
#[serde(rename_all = "camelCase")]
pub struct CreatePatient {
    #[cfg_attr(feature = "utoipa", schema(example = "Praveen"))]
    pub first_name: Option<String>,
    #[cfg_attr(feature = "utoipa", schema(example = "Kumar"))]
    pub last_name: Option<String>,
    pub gender: Option<Gender>,
    pub birth_day: Option<NaiveDate>,
}

/// Validated record ready to be inserted.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewPatient {
    pub first_name: String,
    pub last_name: String,
    pub gender: Gender,
    pub birth_day: NaiveDate,
    pub created_on: NaiveDate,
}

/// Query parameters for the exact-name lookup.
#[derive(Debug, Clone, Deserialize, Validate)]
#[cfg_attr(feature = "utoipa", derive(utoipa::IntoParams))]
#[serde(rename_all = "camelCase")]
pub struct NameQuery {
    /// Exact first name
    #[validate(custom(function = "validate_not_blank", message = "firstName must not be blank"))]
    pub first_name: String,
    /// Exact last name
    #[validate(custom(function = "validate_not_blank", message = "lastName must not be blank"))]
    pub last_name: String,
}
