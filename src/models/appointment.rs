use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use uuid::Uuid;

/// JSON names of the nine business fields, in schema order.
pub const REQUIRED_FIELDS: [&str; 9] = [
    "title",
    "description",
    "dateTime",
    "clinic",
    "clinicName",
    "image",
    "address",
    "doctor",
    "doctorSpecialty",
];

/// The business fields of an appointment. Every field is mandatory.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AppointmentFields {
    pub title: String,
    pub description: String,
    pub date_time: String,
    pub clinic: String,
    pub clinic_name: String,
    pub image: String,
    pub address: String,
    pub doctor: String,
    pub doctor_specialty: String,
}

/// A stored appointment document.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Appointment {
    #[serde(rename = "_id")]
    pub id: Uuid,
    #[serde(flatten)]
    pub fields: AppointmentFields,
    #[serde(rename = "createdAt")]
    pub created_at: DateTime<Utc>,
    #[serde(rename = "updatedAt")]
    pub updated_at: DateTime<Utc>,
}

/// Partial update. `None` leaves the stored value untouched.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AppointmentPatch {
    pub title: Option<String>,
    pub description: Option<String>,
    pub date_time: Option<String>,
    pub clinic: Option<String>,
    pub clinic_name: Option<String>,
    pub image: Option<String>,
    pub address: Option<String>,
    pub doctor: Option<String>,
    pub doctor_specialty: Option<String>,
}

/// Field-level schema violations collected from one request body.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("Appointment validation failed: {}", .issues.join(", "))]
pub struct ValidationError {
    pub issues: Vec<String>,
}

impl ValidationError {
    fn single(issue: impl Into<String>) -> Self {
        Self {
            issues: vec![issue.into()],
        }
    }
}

/// Outcome of checking one field of a request body.
enum FieldCheck {
    Absent,
    Valid(String),
    Invalid(String),
}

fn check_field(body: &Map<String, Value>, name: &str) -> FieldCheck {
    match body.get(name) {
        None => FieldCheck::Absent,
        Some(Value::Null) => FieldCheck::Invalid(required_issue(name)),
        Some(Value::String(s)) if s.is_empty() => FieldCheck::Invalid(required_issue(name)),
        Some(Value::String(s)) => FieldCheck::Valid(s.clone()),
        Some(other) => FieldCheck::Invalid(format!(
            "{name}: Cast to string failed for value {other} at path `{name}`"
        )),
    }
}

fn required_issue(name: &str) -> String {
    format!("{name}: Path `{name}` is required.")
}

fn as_object(body: &Value) -> Result<&Map<String, Value>, ValidationError> {
    body.as_object()
        .ok_or_else(|| ValidationError::single("request body must be a JSON object"))
}

impl AppointmentFields {
    /// Validate a create payload. All nine fields must be non-empty strings;
    /// unknown keys are ignored.
    pub fn from_json(body: &Value) -> Result<Self, ValidationError> {
        let body = as_object(body)?;
        let mut issues = Vec::new();
        let mut values = Vec::with_capacity(REQUIRED_FIELDS.len());

        for name in REQUIRED_FIELDS {
            match check_field(body, name) {
                FieldCheck::Valid(v) => values.push(v),
                FieldCheck::Absent => issues.push(required_issue(name)),
                FieldCheck::Invalid(issue) => issues.push(issue),
            }
        }

        if !issues.is_empty() {
            return Err(ValidationError { issues });
        }

        let mut values = values.into_iter();
        let mut next = || values.next().unwrap_or_default();
        Ok(Self {
            title: next(),
            description: next(),
            date_time: next(),
            clinic: next(),
            clinic_name: next(),
            image: next(),
            address: next(),
            doctor: next(),
            doctor_specialty: next(),
        })
    }

    /// Apply a partial update in place.
    pub fn apply(&mut self, patch: &AppointmentPatch) {
        let slots = [
            (&mut self.title, &patch.title),
            (&mut self.description, &patch.description),
            (&mut self.date_time, &patch.date_time),
            (&mut self.clinic, &patch.clinic),
            (&mut self.clinic_name, &patch.clinic_name),
            (&mut self.image, &patch.image),
            (&mut self.address, &patch.address),
            (&mut self.doctor, &patch.doctor),
            (&mut self.doctor_specialty, &patch.doctor_specialty),
        ];
        for (slot, value) in slots {
            if let Some(v) = value {
                slot.clone_from(v);
            }
        }
    }
}

impl AppointmentPatch {
    /// Validate an update payload. Supplied fields obey the same rules as on
    /// create; absent fields are left alone.
    pub fn from_json(body: &Value) -> Result<Self, ValidationError> {
        let body = as_object(body)?;
        let mut issues = Vec::new();
        let mut values: Vec<Option<String>> = Vec::with_capacity(REQUIRED_FIELDS.len());

        for name in REQUIRED_FIELDS {
            match check_field(body, name) {
                FieldCheck::Valid(v) => values.push(Some(v)),
                FieldCheck::Absent => values.push(None),
                FieldCheck::Invalid(issue) => {
                    issues.push(issue);
                    values.push(None);
                }
            }
        }

        if !issues.is_empty() {
            return Err(ValidationError { issues });
        }

        let mut values = values.into_iter();
        let mut next = || values.next().flatten();
        Ok(Self {
            title: next(),
            description: next(),
            date_time: next(),
            clinic: next(),
            clinic_name: next(),
            image: next(),
            address: next(),
            doctor: next(),
            doctor_specialty: next(),
        })
    }
}
