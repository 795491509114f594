use chrono::{DateTime, Utc};
use rusqlite::{params, params_from_iter, Connection, OptionalExtension, Row};
use uuid::Uuid;

use super::{format_timestamp, now_millis, parse_optional_timestamp, parse_timestamp, parse_uuid};
use crate::db::DatabaseError;
use crate::models::*;

const USER_COLUMNS: &str = "id, name, email, phone, date_of_birth, medical_id, consent_given,
     consent_date, consent_withdrawn_date, data_processing_purposes, processing_restricted,
     restriction_type, restriction_reason, restriction_date, objection_filed, objection_type,
     objection_reason, objection_date, created_at, updated_at";

/// Raw column values; timestamps and JSON are decoded afterwards so decode
/// failures surface as `DatabaseError` rather than `rusqlite::Error`.
struct UserRow {
    id: String,
    name: Option<String>,
    email: Option<String>,
    phone: Option<String>,
    date_of_birth: Option<String>,
    medical_id: Option<String>,
    consent_given: bool,
    consent_date: Option<String>,
    consent_withdrawn_date: Option<String>,
    purposes: String,
    processing_restricted: bool,
    restriction_type: Option<String>,
    restriction_reason: Option<String>,
    restriction_date: Option<String>,
    objection_filed: bool,
    objection_type: Option<String>,
    objection_reason: Option<String>,
    objection_date: Option<String>,
    created_at: String,
    updated_at: String,
}

fn read_row(row: &Row<'_>) -> rusqlite::Result<UserRow> {
    Ok(UserRow {
        id: row.get(0)?,
        name: row.get(1)?,
        email: row.get(2)?,
        phone: row.get(3)?,
        date_of_birth: row.get(4)?,
        medical_id: row.get(5)?,
        consent_given: row.get(6)?,
        consent_date: row.get(7)?,
        consent_withdrawn_date: row.get(8)?,
        purposes: row.get(9)?,
        processing_restricted: row.get(10)?,
        restriction_type: row.get(11)?,
        restriction_reason: row.get(12)?,
        restriction_date: row.get(13)?,
        objection_filed: row.get(14)?,
        objection_type: row.get(15)?,
        objection_reason: row.get(16)?,
        objection_date: row.get(17)?,
        created_at: row.get(18)?,
        updated_at: row.get(19)?,
    })
}

fn into_user(raw: UserRow) -> Result<User, DatabaseError> {
    Ok(User {
        id: parse_uuid(&raw.id)?,
        name: raw.name,
        email: raw.email,
        phone: raw.phone,
        date_of_birth: raw.date_of_birth,
        medical_id: raw.medical_id,
        consent_given: raw.consent_given,
        consent_date: parse_optional_timestamp(raw.consent_date)?,
        consent_withdrawn_date: parse_optional_timestamp(raw.consent_withdrawn_date)?,
        data_processing_purposes: serde_json::from_str(&raw.purposes)?,
        processing_restricted: raw.processing_restricted,
        restriction_type: raw.restriction_type,
        restriction_reason: raw.restriction_reason,
        restriction_date: parse_optional_timestamp(raw.restriction_date)?,
        objection_filed: raw.objection_filed,
        objection_type: raw.objection_type,
        objection_reason: raw.objection_reason,
        objection_date: parse_optional_timestamp(raw.objection_date)?,
        created_at: parse_timestamp(&raw.created_at)?,
        updated_at: parse_timestamp(&raw.updated_at)?,
    })
}

/// Register a data subject. Consent date is stamped when consent is given.
pub fn insert_user(conn: &Connection, new_user: &NewUser) -> Result<User, DatabaseError> {
    let now = now_millis();
    let user = User {
        id: Uuid::new_v4(),
        name: new_user.name.clone(),
        email: new_user.email.clone(),
        phone: new_user.phone.clone(),
        date_of_birth: new_user.date_of_birth.clone(),
        medical_id: new_user.medical_id.clone(),
        consent_given: new_user.consent_given,
        consent_date: new_user.consent_given.then_some(now),
        consent_withdrawn_date: None,
        data_processing_purposes: new_user.data_processing_purposes.clone(),
        processing_restricted: false,
        restriction_type: None,
        restriction_reason: None,
        restriction_date: None,
        objection_filed: false,
        objection_type: None,
        objection_reason: None,
        objection_date: None,
        created_at: now,
        updated_at: now,
    };

    conn.execute(
        "INSERT INTO users (id, name, email, phone, date_of_birth, medical_id, consent_given,
         consent_date, data_processing_purposes, created_at, updated_at)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?10)",
        params![
            user.id.to_string(),
            user.name,
            user.email,
            user.phone,
            user.date_of_birth,
            user.medical_id,
            user.consent_given,
            user.consent_date.as_ref().map(format_timestamp),
            serde_json::to_string(&user.data_processing_purposes)?,
            format_timestamp(&now),
        ],
    )?;

    Ok(user)
}

pub fn get_user(conn: &Connection, id: &Uuid) -> Result<Option<User>, DatabaseError> {
    let row = conn
        .query_row(
            &format!("SELECT {USER_COLUMNS} FROM users WHERE id = ?1"),
            params![id.to_string()],
            read_row,
        )
        .optional()?;

    row.map(into_user).transpose()
}

pub fn user_exists(conn: &Connection, id: &Uuid) -> Result<bool, DatabaseError> {
    let found = conn
        .query_row(
            "SELECT 1 FROM users WHERE id = ?1",
            params![id.to_string()],
            |_| Ok(()),
        )
        .optional()?;
    Ok(found.is_some())
}

// Each update below writes only the columns its request owns, in a single
// statement, so concurrent requests on one user never revert each other.
// They return `false` when no user matched.

/// Overwrite the given personal fields.
pub fn update_personal_fields(
    conn: &Connection,
    id: &Uuid,
    changes: &[(PersonalField, Option<String>)],
    at: &DateTime<Utc>,
) -> Result<bool, DatabaseError> {
    let mut assignments = vec!["updated_at = ?2".to_string()];
    let mut values = vec![Some(id.to_string()), Some(format_timestamp(at))];
    for (field, value) in changes {
        values.push(value.clone());
        assignments.push(format!("{} = ?{}", field.column(), values.len()));
    }

    let sql = format!("UPDATE users SET {} WHERE id = ?1", assignments.join(", "));
    let changed = conn.execute(&sql, params_from_iter(values))?;
    Ok(changed > 0)
}

pub fn restrict_processing(
    conn: &Connection,
    id: &Uuid,
    restriction_type: Option<&str>,
    reason: Option<&str>,
    at: &DateTime<Utc>,
) -> Result<bool, DatabaseError> {
    let changed = conn.execute(
        "UPDATE users SET processing_restricted = 1, restriction_type = ?2,
            restriction_reason = ?3, restriction_date = ?4, updated_at = ?4
         WHERE id = ?1",
        params![id.to_string(), restriction_type, reason, format_timestamp(at)],
    )?;
    Ok(changed > 0)
}

pub fn record_objection(
    conn: &Connection,
    id: &Uuid,
    objection_type: Option<&str>,
    reason: Option<&str>,
    at: &DateTime<Utc>,
) -> Result<bool, DatabaseError> {
    let changed = conn.execute(
        "UPDATE users SET objection_filed = 1, objection_type = ?2,
            objection_reason = ?3, objection_date = ?4, updated_at = ?4
         WHERE id = ?1",
        params![id.to_string(), objection_type, reason, format_timestamp(at)],
    )?;
    Ok(changed > 0)
}

/// Record consent and replace the processing purposes.
pub fn update_consent(
    conn: &Connection,
    id: &Uuid,
    consent_given: bool,
    purposes: &[String],
    at: &DateTime<Utc>,
) -> Result<bool, DatabaseError> {
    let changed = conn.execute(
        "UPDATE users SET consent_given = ?2, consent_date = ?3,
            data_processing_purposes = ?4, updated_at = ?3
         WHERE id = ?1",
        params![
            id.to_string(),
            consent_given,
            format_timestamp(at),
            serde_json::to_string(purposes)?,
        ],
    )?;
    Ok(changed > 0)
}

/// Withdraw consent; every processing purpose is cleared.
pub fn withdraw_consent(
    conn: &Connection,
    id: &Uuid,
    at: &DateTime<Utc>,
) -> Result<bool, DatabaseError> {
    let changed = conn.execute(
        "UPDATE users SET consent_given = 0, consent_withdrawn_date = ?2,
            data_processing_purposes = '[]', updated_at = ?2
         WHERE id = ?1",
        params![id.to_string(), format_timestamp(at)],
    )?;
    Ok(changed > 0)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Erasure {
    Erased,
    NotFound,
    LegalHold,
}

/// Hard-delete a user unless a legal hold is in force. The hold check and
/// the delete run inside one transaction.
pub fn erase_user(conn: &Connection, id: &Uuid) -> Result<Erasure, DatabaseError> {
    let tx = conn.unchecked_transaction()?;
    let outcome = match get_user(&tx, id)? {
        None => Erasure::NotFound,
        Some(user) if user.is_under_legal_hold() => Erasure::LegalHold,
        Some(_) => {
            tx.execute("DELETE FROM users WHERE id = ?1", params![id.to_string()])?;
            Erasure::Erased
        }
    };
    tx.commit()?;
    Ok(outcome)
}
