//! Appointment endpoints.
//!
//! Five endpoints under `/api/appointments`:
//! - `GET /` list every appointment
//! - `POST /` create
//! - `GET /:id`, `PUT /:id`, `DELETE /:id`

use axum::extract::rejection::JsonRejection;
use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::Json;
use serde::Serialize;
use serde_json::Value;
use uuid::Uuid;

use crate::api::error::ApiError;
use crate::api::types::ApiContext;
use crate::db::repository;
use crate::models::{Appointment, AppointmentFields, AppointmentPatch};

const NOT_FOUND_MESSAGE: &str = "Appointment not found";

#[derive(Debug, Serialize)]
pub struct MessageResponse {
    pub message: &'static str,
}

/// Parse a path id. A malformed id is a store-level failure on lookup and
/// delete, but a bad request on update.
fn parse_id(raw: &str, on_error: fn(String) -> ApiError) -> Result<Uuid, ApiError> {
    Uuid::parse_str(raw)
        .map_err(|e| on_error(format!("Cast to id failed for value \"{raw}\": {e}")))
}

/// `GET /api/appointments`: list appointments in insertion order.
pub async fn list(State(ctx): State<ApiContext>) -> Result<Json<Vec<Appointment>>, ApiError> {
    let appointments = ctx.core.with_db(repository::list_appointments)?;
    Ok(Json(appointments))
}

/// `POST /api/appointments`: create from the nine required fields.
pub async fn create(
    State(ctx): State<ApiContext>,
    body: Result<Json<Value>, JsonRejection>,
) -> Result<(StatusCode, Json<Appointment>), ApiError> {
    let Json(body) = body?;
    let fields = AppointmentFields::from_json(&body)?;

    let created = ctx
        .core
        .with_db(|conn| repository::insert_appointment(conn, &fields))?;

    tracing::info!(id = %created.id, "Appointment created");
    Ok((StatusCode::CREATED, Json(created)))
}

/// `GET /api/appointments/:id`
pub async fn get(
    State(ctx): State<ApiContext>,
    Path(raw_id): Path<String>,
) -> Result<Json<Appointment>, ApiError> {
    let id = parse_id(&raw_id, ApiError::Internal)?;

    ctx.core
        .with_db(|conn| repository::get_appointment(conn, &id))?
        .map(Json)
        .ok_or_else(|| ApiError::NotFound(NOT_FOUND_MESSAGE.into()))
}

/// `PUT /api/appointments/:id`: partial update; supplied fields are validated.
pub async fn update(
    State(ctx): State<ApiContext>,
    Path(raw_id): Path<String>,
    body: Result<Json<Value>, JsonRejection>,
) -> Result<Json<Appointment>, ApiError> {
    let id = parse_id(&raw_id, ApiError::BadRequest)?;
    let Json(body) = body?;
    let patch = AppointmentPatch::from_json(&body)?;

    let updated = ctx
        .core
        .with_db(|conn| repository::update_appointment(conn, &id, &patch))?
        .ok_or_else(|| ApiError::NotFound(NOT_FOUND_MESSAGE.into()))?;

    tracing::info!(%id, "Appointment updated");
    Ok(Json(updated))
}

/// `DELETE /api/appointments/:id`
pub async fn delete(
    State(ctx): State<ApiContext>,
    Path(raw_id): Path<String>,
) -> Result<Json<MessageResponse>, ApiError> {
    let id = parse_id(&raw_id, ApiError::Internal)?;

    let deleted = ctx
        .core
        .with_db(|conn| repository::delete_appointment(conn, &id))?;
    if !deleted {
        return Err(ApiError::NotFound(NOT_FOUND_MESSAGE.into()));
    }

    tracing::info!(%id, "Appointment deleted");
    Ok(Json(MessageResponse {
        message: "Appointment deleted successfully",
    }))
}
