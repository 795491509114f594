//! GDPR data-subject-rights endpoints, mounted under `/api/gdpr`.
//!
//! Every user-scoped handler resolves the subject (404 when absent) and
//! appends an audit entry once the action succeeded. Writes touch only the
//! columns the request owns. A failed audit write is logged
//! and never fails the request. Error bodies carry a single `error` key.

use std::collections::HashMap;
use std::net::SocketAddr;

use axum::extract::rejection::JsonRejection;
use axum::extract::{ConnectInfo, Path, Query, State};
use axum::http::{header, HeaderMap, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::Json;
use chrono::{DateTime, NaiveDate, NaiveTime, Utc};
use serde_json::{json, Map, Value};
use uuid::Uuid;

use crate::api::types::{ApiContext, ClientInfo};
use crate::core_state::CoreError;
use crate::db::repository::{self, format_timestamp, now_millis, Erasure};
use crate::format::{is_valid_email, is_valid_phone};
use crate::models::{AuditEntry, GdprAction, PersonalField, User, SYSTEM_ACTOR};

#[derive(Debug, thiserror::Error)]
pub enum GdprError {
    #[error("User not found")]
    UserNotFound,
    #[error("Invalid request: {0}")]
    BadRequest(String),
    #[error("Conflict: {error}")]
    Conflict { error: String, reason: String },
    #[error("Internal error: {0}")]
    Internal(String),
}

impl IntoResponse for GdprError {
    fn into_response(self) -> Response {
        match self {
            GdprError::UserNotFound => {
                (StatusCode::NOT_FOUND, Json(json!({"error": "User not found"}))).into_response()
            }
            GdprError::BadRequest(detail) => {
                (StatusCode::BAD_REQUEST, Json(json!({"error": detail}))).into_response()
            }
            GdprError::Conflict { error, reason } => (
                StatusCode::CONFLICT,
                Json(json!({"error": error, "reason": reason})),
            )
                .into_response(),
            GdprError::Internal(detail) => {
                tracing::error!(detail, "GDPR internal error");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    Json(json!({"error": "Internal server error"})),
                )
                    .into_response()
            }
        }
    }
}

impl From<CoreError> for GdprError {
    fn from(err: CoreError) -> Self {
        GdprError::Internal(err.to_string())
    }
}

impl From<JsonRejection> for GdprError {
    fn from(err: JsonRejection) -> Self {
        GdprError::BadRequest(err.body_text())
    }
}

// ── Request helpers ─────────────────────────────────────────

fn client_info(connect: Option<ConnectInfo<SocketAddr>>, headers: &HeaderMap) -> ClientInfo {
    ClientInfo {
        ip_address: connect.map(|ConnectInfo(addr)| addr.ip().to_string()),
        user_agent: headers
            .get(header::USER_AGENT)
            .and_then(|v| v.to_str().ok())
            .map(str::to_string),
    }
}

/// Optional JSON body; a missing or unparseable body reads as `{}`.
fn body_or_empty(body: Option<Json<Value>>) -> Value {
    body.map(|Json(v)| v).unwrap_or_else(|| Value::Object(Map::new()))
}

fn text(body: &Value, key: &str) -> Option<String> {
    body.get(key).and_then(Value::as_str).map(str::to_string)
}

/// The value echoed back to the caller for `key`, `null` when absent.
fn echo(body: &Value, key: &str) -> Value {
    body.get(key).cloned().unwrap_or(Value::Null)
}

/// Mongo-style id: a malformed id is a store error, not a miss.
fn parse_user_id(raw_id: &str) -> Result<Uuid, GdprError> {
    Uuid::parse_str(raw_id)
        .map_err(|e| GdprError::Internal(format!("Cast to id failed for value \"{raw_id}\": {e}")))
}

fn load_user(ctx: &ApiContext, raw_id: &str) -> Result<User, GdprError> {
    let id = parse_user_id(raw_id)?;
    ctx.core
        .with_db(|conn| repository::get_user(conn, &id))?
        .ok_or(GdprError::UserNotFound)
}

/// Run one column-scoped update; `false` from the store means no such user.
fn update_user<F>(ctx: &ApiContext, f: F) -> Result<(), GdprError>
where
    F: FnOnce(&rusqlite::Connection) -> Result<bool, crate::db::DatabaseError>,
{
    if ctx.core.with_db(f)? {
        Ok(())
    } else {
        Err(GdprError::UserNotFound)
    }
}

/// Validated `corrections`: personal fields only, unknown keys skipped.
fn parse_corrections(
    corrections: &Map<String, Value>,
) -> Result<Vec<(PersonalField, Option<String>)>, GdprError> {
    let mut changes = Vec::new();
    for (key, value) in corrections {
        let Some(field) = PersonalField::from_key(key) else {
            continue;
        };
        let value = match value {
            Value::Null => None,
            Value::String(s) => Some(s.clone()),
            other => {
                return Err(GdprError::BadRequest(format!(
                    "{key} must be a string, got {other}"
                )))
            }
        };
        if let Some(v) = &value {
            if field == PersonalField::Email && !is_valid_email(v) {
                return Err(GdprError::BadRequest("Invalid email format".into()));
            }
            if field == PersonalField::Phone && !is_valid_phone(v) {
                return Err(GdprError::BadRequest("Invalid phone number".into()));
            }
        }
        changes.push((field, value));
    }
    Ok(changes)
}

fn log_action(
    ctx: &ApiContext,
    action: GdprAction,
    user_id: &str,
    details: Value,
    client: &ClientInfo,
) {
    let entry = AuditEntry {
        action: action.as_str().to_string(),
        user_id: user_id.to_string(),
        timestamp: now_millis(),
        details,
        ip_address: client.ip_address.clone(),
        user_agent: client.user_agent.clone(),
    };
    if let Err(e) = ctx.core.with_db(|conn| repository::insert_audit_entry(conn, &entry)) {
        tracing::error!(error = %e, action = action.as_str(), "Audit log write failed");
    }
}

fn stamp(ts: &Option<DateTime<Utc>>) -> Value {
    ts.as_ref()
        .map(|t| Value::String(format_timestamp(t)))
        .unwrap_or(Value::Null)
}

fn personal_data(user: &User) -> Value {
    json!({
        "name": user.name,
        "email": user.email,
        "phone": user.phone,
        "dateOfBirth": user.date_of_birth,
        "medicalId": user.medical_id,
    })
}

fn consent_summary(user: &User) -> Value {
    json!({
        "given": user.consent_given,
        "date": stamp(&user.consent_date),
        "purposes": user.data_processing_purposes,
    })
}

// ── Right of access ─────────────────────────────────────────

/// `GET /api/gdpr/access/:userId`
pub async fn access(
    State(ctx): State<ApiContext>,
    Path(user_id): Path<String>,
    Query(query): Query<HashMap<String, String>>,
    connect: Option<ConnectInfo<SocketAddr>>,
    headers: HeaderMap,
) -> Result<Json<Value>, GdprError> {
    let user = load_user(&ctx, &user_id)?;
    let client = client_info(connect, &headers);

    log_action(
        &ctx,
        GdprAction::DataAccessRequest,
        &user_id,
        json!({"requestedBy": query.get("requestedBy")}),
        &client,
    );

    Ok(Json(json!({
        "message": "Data access request processed",
        "data": {
            "personalData": personal_data(&user),
            "consent": consent_summary(&user),
            "metadata": {
                "createdAt": format_timestamp(&user.created_at),
                "updatedAt": format_timestamp(&user.updated_at),
            },
        },
        "processingDate": format_timestamp(&now_millis()),
    })))
}

// ── Right to rectification ──────────────────────────────────

/// `PUT /api/gdpr/rectify/:userId` with `{corrections: {field: value}}`.
/// Only personal fields are applied; every supplied key is reported back.
pub async fn rectify(
    State(ctx): State<ApiContext>,
    Path(user_id): Path<String>,
    connect: Option<ConnectInfo<SocketAddr>>,
    headers: HeaderMap,
    body: Result<Json<Value>, JsonRejection>,
) -> Result<Json<Value>, GdprError> {
    let Json(body) = body?;
    let corrections = body
        .get("corrections")
        .and_then(Value::as_object)
        .ok_or_else(|| GdprError::BadRequest("corrections must be an object".into()))?;

    let id = parse_user_id(&user_id)?;
    if !ctx.core.with_db(|conn| repository::user_exists(conn, &id))? {
        return Err(GdprError::UserNotFound);
    }
    let changes = parse_corrections(corrections)?;
    let now = now_millis();
    update_user(&ctx, |conn| repository::update_personal_fields(conn, &id, &changes, &now))?;

    let client = client_info(connect, &headers);
    log_action(
        &ctx,
        GdprAction::DataRectification,
        &user_id,
        json!({"corrections": corrections, "requestedBy": echo(&body, "requestedBy")}),
        &client,
    );

    let updated_fields: Vec<&String> = corrections.keys().collect();
    Ok(Json(json!({
        "message": "Data rectification completed",
        "updatedFields": updated_fields,
        "rectificationDate": format_timestamp(&now),
    })))
}

// ── Right to erasure ────────────────────────────────────────

/// `DELETE /api/gdpr/erase/:userId`. Refused with 409 under a legal hold.
pub async fn erase(
    State(ctx): State<ApiContext>,
    Path(user_id): Path<String>,
    connect: Option<ConnectInfo<SocketAddr>>,
    headers: HeaderMap,
    body: Option<Json<Value>>,
) -> Result<Json<Value>, GdprError> {
    let body = body_or_empty(body);
    let id = parse_user_id(&user_id)?;

    match ctx.core.with_db(|conn| repository::erase_user(conn, &id))? {
        Erasure::Erased => {}
        Erasure::NotFound => return Err(GdprError::UserNotFound),
        Erasure::LegalHold => {
            return Err(GdprError::Conflict {
                error: "Erasure cannot be completed due to legal obligations".into(),
                reason: "Legal exception applies".into(),
            })
        }
    }

    let client = client_info(connect, &headers);
    log_action(
        &ctx,
        GdprAction::DataErasure,
        &user_id,
        json!({"reason": echo(&body, "reason"), "requestedBy": echo(&body, "requestedBy")}),
        &client,
    );
    tracing::info!(%user_id, "User data erased");

    Ok(Json(json!({
        "message": "Data erasure completed",
        "userId": user_id,
        "erasureDate": format_timestamp(&now_millis()),
    })))
}

// ── Right to restriction ────────────────────────────────────

/// `PUT /api/gdpr/restrict/:userId` with `{restrictionType, reason}`.
pub async fn restrict(
    State(ctx): State<ApiContext>,
    Path(user_id): Path<String>,
    connect: Option<ConnectInfo<SocketAddr>>,
    headers: HeaderMap,
    body: Option<Json<Value>>,
) -> Result<Json<Value>, GdprError> {
    let body = body_or_empty(body);
    let id = parse_user_id(&user_id)?;

    let now = now_millis();
    let restriction_type = text(&body, "restrictionType");
    let reason = text(&body, "reason");
    update_user(&ctx, |conn| {
        repository::restrict_processing(
            conn,
            &id,
            restriction_type.as_deref(),
            reason.as_deref(),
            &now,
        )
    })?;

    let client = client_info(connect, &headers);
    log_action(
        &ctx,
        GdprAction::DataRestriction,
        &user_id,
        json!({
            "restrictionType": echo(&body, "restrictionType"),
            "reason": echo(&body, "reason"),
            "requestedBy": echo(&body, "requestedBy"),
        }),
        &client,
    );

    Ok(Json(json!({
        "message": "Data processing restricted",
        "restrictionType": restriction_type,
        "restrictionDate": format_timestamp(&now),
    })))
}

// ── Right to portability ────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ExportFormat {
    Json,
    Xml,
}

impl ExportFormat {
    fn parse(raw: Option<&str>) -> Option<Self> {
        match raw.unwrap_or("json") {
            "json" => Some(Self::Json),
            "xml" => Some(Self::Xml),
            _ => None,
        }
    }

    fn as_str(&self) -> &'static str {
        match self {
            Self::Json => "json",
            Self::Xml => "xml",
        }
    }
}

fn xml_escape(raw: &str) -> String {
    let mut out = String::with_capacity(raw.len());
    for c in raw.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&apos;"),
            _ => out.push(c),
        }
    }
    out
}

fn render_xml(user: &User, exported_at: &str) -> String {
    let opt = |v: &Option<String>| xml_escape(v.as_deref().unwrap_or_default());
    let date = |v: &Option<DateTime<Utc>>| v.as_ref().map(format_timestamp).unwrap_or_default();

    format!(
        "<user-data>\n  <personal-data>\n    <name>{}</name>\n    <email>{}</email>\n    \
         <phone>{}</phone>\n    <date-of-birth>{}</date-of-birth>\n    \
         <medical-id>{}</medical-id>\n  </personal-data>\n  <consent>\n    \
         <given>{}</given>\n    <date>{}</date>\n    <purposes>{}</purposes>\n  \
         </consent>\n  <metadata>\n    <created-at>{}</created-at>\n    \
         <updated-at>{}</updated-at>\n    <export-date>{}</export-date>\n  \
         </metadata>\n</user-data>\n",
        opt(&user.name),
        opt(&user.email),
        opt(&user.phone),
        opt(&user.date_of_birth),
        opt(&user.medical_id),
        user.consent_given,
        date(&user.consent_date),
        xml_escape(&user.data_processing_purposes.join(", ")),
        format_timestamp(&user.created_at),
        format_timestamp(&user.updated_at),
        exported_at,
    )
}

/// `GET /api/gdpr/portability/:userId?format=json|xml`: attachment download.
pub async fn portability(
    State(ctx): State<ApiContext>,
    Path(user_id): Path<String>,
    Query(query): Query<HashMap<String, String>>,
    connect: Option<ConnectInfo<SocketAddr>>,
    headers: HeaderMap,
) -> Result<Response, GdprError> {
    let user = load_user(&ctx, &user_id)?;
    let format = ExportFormat::parse(query.get("format").map(String::as_str))
        .ok_or_else(|| GdprError::BadRequest("Unsupported format. Use 'json' or 'xml'".into()))?;

    let client = client_info(connect, &headers);
    log_action(
        &ctx,
        GdprAction::DataPortability,
        &user_id,
        json!({"format": format.as_str(), "requestedBy": query.get("requestedBy")}),
        &client,
    );

    let exported_at = format_timestamp(&now_millis());
    let disposition = format!(
        "attachment; filename=\"user-data-{user_id}.{}\"",
        format.as_str()
    );

    let response = match format {
        ExportFormat::Json => {
            let body = json!({
                "personalData": personal_data(&user),
                "consent": consent_summary(&user),
                "metadata": {
                    "createdAt": format_timestamp(&user.created_at),
                    "updatedAt": format_timestamp(&user.updated_at),
                    "exportDate": exported_at,
                },
            });
            (
                [
                    (header::CONTENT_TYPE, "application/json".to_string()),
                    (header::CONTENT_DISPOSITION, disposition),
                ],
                body.to_string(),
            )
                .into_response()
        }
        ExportFormat::Xml => (
            [
                (header::CONTENT_TYPE, "application/xml".to_string()),
                (header::CONTENT_DISPOSITION, disposition),
            ],
            render_xml(&user, &exported_at),
        )
            .into_response(),
    };
    Ok(response)
}

// ── Right to object ─────────────────────────────────────────

/// `PUT /api/gdpr/object/:userId` with `{objectionType, reason}`.
pub async fn object(
    State(ctx): State<ApiContext>,
    Path(user_id): Path<String>,
    connect: Option<ConnectInfo<SocketAddr>>,
    headers: HeaderMap,
    body: Option<Json<Value>>,
) -> Result<Json<Value>, GdprError> {
    let body = body_or_empty(body);
    let id = parse_user_id(&user_id)?;

    let now = now_millis();
    let objection_type = text(&body, "objectionType");
    let reason = text(&body, "reason");
    update_user(&ctx, |conn| {
        repository::record_objection(conn, &id, objection_type.as_deref(), reason.as_deref(), &now)
    })?;

    let client = client_info(connect, &headers);
    log_action(
        &ctx,
        GdprAction::DataObjection,
        &user_id,
        json!({
            "objectionType": echo(&body, "objectionType"),
            "reason": echo(&body, "reason"),
            "requestedBy": echo(&body, "requestedBy"),
        }),
        &client,
    );

    Ok(Json(json!({
        "message": "Objection recorded",
        "objectionType": objection_type,
        "objectionDate": format_timestamp(&now),
    })))
}

// ── Consent management ──────────────────────────────────────

/// `POST /api/gdpr/consent/:userId` with `{consentGiven, purposes, withdrawal}`.
/// Withdrawal clears every processing purpose.
pub async fn consent(
    State(ctx): State<ApiContext>,
    Path(user_id): Path<String>,
    connect: Option<ConnectInfo<SocketAddr>>,
    headers: HeaderMap,
    body: Option<Json<Value>>,
) -> Result<Json<Value>, GdprError> {
    let body = body_or_empty(body);
    let id = parse_user_id(&user_id)?;

    let withdrawal = body.get("withdrawal").and_then(Value::as_bool).unwrap_or(false);
    let now = now_millis();
    let (consent_given, purposes) = if withdrawal {
        update_user(&ctx, |conn| repository::withdraw_consent(conn, &id, &now))?;
        (false, Vec::new())
    } else {
        let consent_given = body.get("consentGiven").and_then(Value::as_bool).unwrap_or(false);
        let purposes: Vec<String> = body
            .get("purposes")
            .and_then(Value::as_array)
            .map(|items| {
                items
                    .iter()
                    .filter_map(Value::as_str)
                    .map(str::to_string)
                    .collect()
            })
            .unwrap_or_default();
        update_user(&ctx, |conn| {
            repository::update_consent(conn, &id, consent_given, &purposes, &now)
        })?;
        (consent_given, purposes)
    };

    let action = if withdrawal {
        GdprAction::ConsentWithdrawal
    } else {
        GdprAction::ConsentUpdate
    };
    let message = if withdrawal {
        "Consent withdrawn"
    } else {
        "Consent updated"
    };
    let client = client_info(connect, &headers);
    log_action(
        &ctx,
        action,
        &user_id,
        json!({
            "consentGiven": echo(&body, "consentGiven"),
            "purposes": echo(&body, "purposes"),
            "withdrawal": withdrawal,
            "requestedBy": echo(&body, "requestedBy"),
        }),
        &client,
    );

    Ok(Json(json!({
        "message": message,
        "consentGiven": consent_given,
        "purposes": purposes,
        "actionDate": format_timestamp(&now),
    })))
}

// ── Breach notification ─────────────────────────────────────

/// `POST /api/gdpr/breach-notification` with `{breachDetails, affectedUsers: [...]}`.
pub async fn breach_notification(
    State(ctx): State<ApiContext>,
    connect: Option<ConnectInfo<SocketAddr>>,
    headers: HeaderMap,
    body: Result<Json<Value>, JsonRejection>,
) -> Result<Json<Value>, GdprError> {
    let Json(body) = body?;
    let affected = body
        .get("affectedUsers")
        .and_then(Value::as_array)
        .ok_or_else(|| GdprError::BadRequest("affectedUsers must be an array".into()))?;

    let client = client_info(connect, &headers);
    log_action(
        &ctx,
        GdprAction::DataBreachDetected,
        SYSTEM_ACTOR,
        json!({
            "breachDetails": echo(&body, "breachDetails"),
            "affectedUsersCount": affected.len(),
            "notificationRequired": true,
        }),
        &client,
    );

    let now = now_millis();
    tracing::warn!(affected = affected.len(), "Data breach notification logged");

    Ok(Json(json!({
        "message": "Breach notification logged",
        "breachId": format!("breach-{}", now.timestamp_millis()),
        "loggedAt": format_timestamp(&now),
        "notificationRequired": true,
    })))
}

// ── Audit trail ─────────────────────────────────────────────

/// Accepts RFC 3339 or a bare `YYYY-MM-DD` (midnight UTC).
fn parse_bound(raw: &str) -> Option<DateTime<Utc>> {
    if let Ok(dt) = DateTime::parse_from_rfc3339(raw) {
        return Some(dt.with_timezone(&Utc));
    }
    NaiveDate::parse_from_str(raw, "%Y-%m-%d")
        .ok()
        .map(|d| d.and_time(NaiveTime::MIN).and_utc())
}

/// `GET /api/gdpr/audit/:userId?startDate&endDate`: newest first, max 100.
/// The window applies only when both bounds are given.
pub async fn audit(
    State(ctx): State<ApiContext>,
    Path(user_id): Path<String>,
    Query(query): Query<HashMap<String, String>>,
) -> Result<Json<Value>, GdprError> {
    let window = match (query.get("startDate"), query.get("endDate")) {
        (Some(start), Some(end)) => {
            let start = parse_bound(start)
                .ok_or_else(|| GdprError::BadRequest(format!("Invalid startDate: {start}")))?;
            let end = parse_bound(end)
                .ok_or_else(|| GdprError::BadRequest(format!("Invalid endDate: {end}")))?;
            Some((start, end))
        }
        _ => None,
    };

    let entries = ctx
        .core
        .with_db(|conn| repository::query_audit_by_user(conn, &user_id, window))?;

    let logs: Vec<Value> = entries
        .iter()
        .map(|e| {
            json!({
                "action": e.action,
                "timestamp": format_timestamp(&e.timestamp),
                "details": e.details,
                "ipAddress": e.ip_address,
            })
        })
        .collect();

    Ok(Json(json!({
        "userId": user_id,
        "totalLogs": logs.len(),
        "auditLogs": logs,
    })))
}
