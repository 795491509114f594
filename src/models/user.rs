use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Restriction type that blocks erasure while a legal hold is in force.
pub const LEGAL_HOLD_RESTRICTION: &str = "legal_hold";

/// A data subject covered by the GDPR endpoints.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct User {
    #[serde(rename = "_id")]
    pub id: Uuid,
    pub name: Option<String>,
    pub email: Option<String>,
    pub phone: Option<String>,
    pub date_of_birth: Option<String>,
    pub medical_id: Option<String>,
    pub consent_given: bool,
    pub consent_date: Option<DateTime<Utc>>,
    pub consent_withdrawn_date: Option<DateTime<Utc>>,
    pub data_processing_purposes: Vec<String>,
    pub processing_restricted: bool,
    pub restriction_type: Option<String>,
    pub restriction_reason: Option<String>,
    pub restriction_date: Option<DateTime<Utc>>,
    pub objection_filed: bool,
    pub objection_type: Option<String>,
    pub objection_reason: Option<String>,
    pub objection_date: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Fields supplied when registering a user.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewUser {
    pub name: Option<String>,
    pub email: Option<String>,
    pub phone: Option<String>,
    pub date_of_birth: Option<String>,
    pub medical_id: Option<String>,
    pub consent_given: bool,
    pub data_processing_purposes: Vec<String>,
}

/// Personal fields a data subject may ask to have corrected.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PersonalField {
    Name,
    Email,
    Phone,
    DateOfBirth,
    MedicalId,
}

impl PersonalField {
    pub fn from_key(key: &str) -> Option<Self> {
        match key {
            "name" => Some(Self::Name),
            "email" => Some(Self::Email),
            "phone" => Some(Self::Phone),
            "dateOfBirth" => Some(Self::DateOfBirth),
            "medicalId" => Some(Self::MedicalId),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Name => "name",
            Self::Email => "email",
            Self::Phone => "phone",
            Self::DateOfBirth => "dateOfBirth",
            Self::MedicalId => "medicalId",
        }
    }

    /// Backing column in the `users` table.
    pub fn column(&self) -> &'static str {
        match self {
            Self::Name => "name",
            Self::Email => "email",
            Self::Phone => "phone",
            Self::DateOfBirth => "date_of_birth",
            Self::MedicalId => "medical_id",
        }
    }
}

impl User {
    pub fn is_under_legal_hold(&self) -> bool {
        self.processing_restricted
            && self.restriction_type.as_deref() == Some(LEGAL_HOLD_RESTRICTION)
    }
}
