use std::sync::Arc;

use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::Json;
use serde::Deserialize;

use crate::auth::require_admin;
use crate::db::queries;
use crate::errors::AppError;
use crate::handlers::{parse_date, parse_window};
use crate::models::{Actor, Court, CourtStatus};
use crate::services::availability::{self, CourtAvailability};
use crate::services::catalog;
use crate::state::AppState;

// GET /api/courts
pub async fn list_courts(
    State(state): State<Arc<AppState>>,
    _actor: Actor,
) -> Result<Json<Vec<Court>>, AppError> {
    let db = state.db()?;
    Ok(Json(queries::list_courts(&db)?))
}

// POST /api/courts
#[derive(Deserialize)]
pub struct CreateCourtRequest {
    pub name: Option<String>,
    pub sport_id: Option<i64>,
}

pub async fn create_court(
    State(state): State<Arc<AppState>>,
    actor: Actor,
    Json(body): Json<CreateCourtRequest>,
) -> Result<(StatusCode, Json<Court>), AppError> {
    require_admin(&actor)?;

    let (Some(name), Some(sport_id)) = (body.name, body.sport_id) else {
        return Err(AppError::InvalidRequest(
            "Court name and sport ID are required".to_string(),
        ));
    };

    let db = state.db()?;
    let court = catalog::create_court(&db, &name, sport_id)?;
    Ok((StatusCode::CREATED, Json(court)))
}

// PUT /api/courts/:id/status
#[derive(Deserialize)]
pub struct CourtStatusRequest {
    pub status: String,
}

pub async fn set_court_status(
    State(state): State<Arc<AppState>>,
    actor: Actor,
    Path(id): Path<i64>,
    Json(body): Json<CourtStatusRequest>,
) -> Result<Json<Court>, AppError> {
    require_admin(&actor)?;

    let status = CourtStatus::parse(body.status.trim()).ok_or_else(|| {
        AppError::InvalidRequest(format!(
            "status must be 'Available' or 'Under Maintenance', got '{}'",
            body.status
        ))
    })?;

    let db = state.db()?;
    Ok(Json(catalog::set_court_status(&db, id, status)?))
}

// DELETE /api/courts/:id
pub async fn delete_court(
    State(state): State<Arc<AppState>>,
    actor: Actor,
    Path(id): Path<i64>,
) -> Result<Json<serde_json::Value>, AppError> {
    require_admin(&actor)?;

    let db = state.db()?;
    catalog::delete_court(&db, id)?;
    Ok(Json(serde_json::json!({ "ok": true })))
}

// GET /api/courts/availability?date=&startTime=&endTime=
#[derive(Deserialize)]
pub struct AvailabilityQuery {
    pub date: Option<String>,
    #[serde(rename = "startTime")]
    pub start_time: Option<String>,
    #[serde(rename = "endTime")]
    pub end_time: Option<String>,
}

pub async fn get_availability(
    State(state): State<Arc<AppState>>,
    _actor: Actor,
    Query(query): Query<AvailabilityQuery>,
) -> Result<Json<Vec<CourtAvailability>>, AppError> {
    let date = parse_date(query.date.as_deref())?;
    let window = parse_window(query.start_time.as_deref(), query.end_time.as_deref())?;

    let db = state.db()?;
    Ok(Json(availability::resolve(&db, &date, &window)?))
}
