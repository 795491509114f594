use rusqlite::{params, Connection, OptionalExtension, Row};
use uuid::Uuid;

use super::{format_timestamp, now_millis, parse_timestamp, parse_uuid};
use crate::db::DatabaseError;
use crate::models::*;

const APPOINTMENT_COLUMNS: &str = "id, title, description, date_time, clinic, clinic_name,
     image, address, doctor, doctor_specialty, created_at, updated_at";

type AppointmentRow = (String, AppointmentFields, String, String);

fn read_row(row: &Row<'_>) -> rusqlite::Result<AppointmentRow> {
    Ok((
        row.get(0)?,
        AppointmentFields {
            title: row.get(1)?,
            description: row.get(2)?,
            date_time: row.get(3)?,
            clinic: row.get(4)?,
            clinic_name: row.get(5)?,
            image: row.get(6)?,
            address: row.get(7)?,
            doctor: row.get(8)?,
            doctor_specialty: row.get(9)?,
        },
        row.get(10)?,
        row.get(11)?,
    ))
}

fn into_appointment(raw: AppointmentRow) -> Result<Appointment, DatabaseError> {
    let (id, fields, created_at, updated_at) = raw;
    Ok(Appointment {
        id: parse_uuid(&id)?,
        fields,
        created_at: parse_timestamp(&created_at)?,
        updated_at: parse_timestamp(&updated_at)?,
    })
}

/// Insert a new appointment. The store assigns the id and both timestamps.
pub fn insert_appointment(
    conn: &Connection,
    fields: &AppointmentFields,
) -> Result<Appointment, DatabaseError> {
    let id = Uuid::new_v4();
    let now = now_millis();
    let stamp = format_timestamp(&now);

    conn.execute(
        "INSERT INTO appointments (id, title, description, date_time, clinic, clinic_name,
         image, address, doctor, doctor_specialty, created_at, updated_at)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?11)",
        params![
            id.to_string(),
            fields.title,
            fields.description,
            fields.date_time,
            fields.clinic,
            fields.clinic_name,
            fields.image,
            fields.address,
            fields.doctor,
            fields.doctor_specialty,
            stamp,
        ],
    )?;

    Ok(Appointment {
        id,
        fields: fields.clone(),
        created_at: now,
        updated_at: now,
    })
}

/// All appointments in insertion order. No filtering, no pagination.
pub fn list_appointments(conn: &Connection) -> Result<Vec<Appointment>, DatabaseError> {
    let mut stmt = conn.prepare(&format!(
        "SELECT {APPOINTMENT_COLUMNS} FROM appointments ORDER BY rowid ASC"
    ))?;

    let rows = stmt.query_map([], read_row)?;

    let mut appointments = Vec::new();
    for row in rows {
        appointments.push(into_appointment(row?)?);
    }
    Ok(appointments)
}

pub fn get_appointment(conn: &Connection, id: &Uuid) -> Result<Option<Appointment>, DatabaseError> {
    let row = conn
        .query_row(
            &format!("SELECT {APPOINTMENT_COLUMNS} FROM appointments WHERE id = ?1"),
            params![id.to_string()],
            read_row,
        )
        .optional()?;

    row.map(into_appointment).transpose()
}

/// Apply a partial update and return the post-update document.
///
/// Returns `Ok(None)` when no appointment has this id. The update is a single
/// statement, so concurrent updates to one id resolve last-write-wins.
pub fn update_appointment(
    conn: &Connection,
    id: &Uuid,
    patch: &AppointmentPatch,
) -> Result<Option<Appointment>, DatabaseError> {
    let changed = conn.execute(
        "UPDATE appointments SET
            title = COALESCE(?2, title),
            description = COALESCE(?3, description),
            date_time = COALESCE(?4, date_time),
            clinic = COALESCE(?5, clinic),
            clinic_name = COALESCE(?6, clinic_name),
            image = COALESCE(?7, image),
            address = COALESCE(?8, address),
            doctor = COALESCE(?9, doctor),
            doctor_specialty = COALESCE(?10, doctor_specialty),
            updated_at = ?11
         WHERE id = ?1",
        params![
            id.to_string(),
            patch.title,
            patch.description,
            patch.date_time,
            patch.clinic,
            patch.clinic_name,
            patch.image,
            patch.address,
            patch.doctor,
            patch.doctor_specialty,
            format_timestamp(&now_millis()),
        ],
    )?;

    if changed == 0 {
        return Ok(None);
    }
    get_appointment(conn, id)
}

/// Delete by id. Returns `false` when nothing matched.
pub fn delete_appointment(conn: &Connection, id: &Uuid) -> Result<bool, DatabaseError> {
    let deleted = conn.execute(
        "DELETE FROM appointments WHERE id = ?1",
        params![id.to_string()],
    )?;
    Ok(deleted > 0)
}

pub fn count_appointments(conn: &Connection) -> Result<i64, DatabaseError> {
    let count = conn.query_row("SELECT COUNT(*) FROM appointments", [], |row| row.get(0))?;
    Ok(count)
}
