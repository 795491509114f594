use chrono::{DateTime, Utc};
use rusqlite::{params, Connection};

use super::{format_timestamp, parse_timestamp};
use crate::db::DatabaseError;
use crate::models::*;

/// Most entries returned by one audit trail query.
pub const AUDIT_QUERY_LIMIT: i64 = 100;

/// Append one entry to the audit trail.
pub fn insert_audit_entry(conn: &Connection, entry: &AuditEntry) -> Result<(), DatabaseError> {
    conn.execute(
        "INSERT INTO audit_log (action, user_id, timestamp, details, ip_address, user_agent)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
        params![
            entry.action,
            entry.user_id,
            format_timestamp(&entry.timestamp),
            serde_json::to_string(&entry.details)?,
            entry.ip_address,
            entry.user_agent,
        ],
    )?;
    Ok(())
}

/// Audit entries for one user, newest first, capped at [`AUDIT_QUERY_LIMIT`].
/// `window` bounds the timestamp inclusively on both ends.
pub fn query_audit_by_user(
    conn: &Connection,
    user_id: &str,
    window: Option<(DateTime<Utc>, DateTime<Utc>)>,
) -> Result<Vec<AuditEntry>, DatabaseError> {
    let (start, end) = match window {
        Some((start, end)) => (Some(format_timestamp(&start)), Some(format_timestamp(&end))),
        None => (None, None),
    };

    let mut stmt = conn.prepare(
        "SELECT action, user_id, timestamp, details, ip_address, user_agent FROM audit_log
         WHERE user_id = ?1
           AND (?2 IS NULL OR timestamp >= ?2)
           AND (?3 IS NULL OR timestamp <= ?3)
         ORDER BY timestamp DESC, id DESC
         LIMIT ?4",
    )?;

    let rows = stmt.query_map(params![user_id, start, end, AUDIT_QUERY_LIMIT], |row| {
        Ok((
            row.get::<_, String>(0)?,
            row.get::<_, String>(1)?,
            row.get::<_, String>(2)?,
            row.get::<_, String>(3)?,
            row.get::<_, Option<String>>(4)?,
            row.get::<_, Option<String>>(5)?,
        ))
    })?;

    let mut entries = Vec::new();
    for row in rows {
        let (action, user_id, timestamp, details, ip_address, user_agent) = row?;
        entries.push(AuditEntry {
            action,
            user_id,
            timestamp: parse_timestamp(&timestamp)?,
            details: serde_json::from_str(&details)?,
            ip_address,
            user_agent,
        });
    }
    Ok(entries)
}
