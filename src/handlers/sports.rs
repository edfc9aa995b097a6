use std::sync::Arc;

use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::Json;
use serde::Deserialize;

use crate::auth::require_admin;
use crate::db::queries;
use crate::errors::AppError;
use crate::handlers::parse_window;
use crate::models::{Actor, Sport};
use crate::services::{catalog, pricing};
use crate::state::AppState;

// GET /api/sports
pub async fn list_sports(
    State(state): State<Arc<AppState>>,
    _actor: Actor,
) -> Result<Json<Vec<Sport>>, AppError> {
    let db = state.db()?;
    Ok(Json(queries::list_sports(&db)?))
}

// POST /api/sports
#[derive(Deserialize)]
pub struct CreateSportRequest {
    pub name: Option<String>,
    pub price: Option<i64>,
    pub capacity: Option<i64>,
}

pub async fn create_sport(
    State(state): State<Arc<AppState>>,
    actor: Actor,
    Json(body): Json<CreateSportRequest>,
) -> Result<(StatusCode, Json<Sport>), AppError> {
    require_admin(&actor)?;

    let (Some(name), Some(price)) = (body.name, body.price) else {
        return Err(AppError::InvalidRequest(
            "Sport name and price are required".to_string(),
        ));
    };

    let db = state.db()?;
    let sport = catalog::create_sport(&db, &name, price, body.capacity.unwrap_or(1))?;
    Ok((StatusCode::CREATED, Json(sport)))
}

// PUT /api/sports/:id
#[derive(Deserialize)]
pub struct UpdateSportRequest {
    pub price: Option<i64>,
    pub capacity: Option<i64>,
}

pub async fn update_sport(
    State(state): State<Arc<AppState>>,
    actor: Actor,
    Path(id): Path<i64>,
    Json(body): Json<UpdateSportRequest>,
) -> Result<Json<Sport>, AppError> {
    require_admin(&actor)?;

    if body.price.is_none() && body.capacity.is_none() {
        return Err(AppError::InvalidRequest("price or capacity is required".to_string()));
    }

    let db = state.db()?;
    Ok(Json(catalog::update_sport(&db, id, body.price, body.capacity)?))
}

// DELETE /api/sports/:id
pub async fn delete_sport(
    State(state): State<Arc<AppState>>,
    actor: Actor,
    Path(id): Path<i64>,
) -> Result<Json<serde_json::Value>, AppError> {
    require_admin(&actor)?;

    let db = state.db()?;
    catalog::delete_sport(&db, id)?;
    Ok(Json(serde_json::json!({ "ok": true })))
}

// GET /api/price-quote
#[derive(Deserialize)]
pub struct PriceQuoteQuery {
    pub sport_id: Option<i64>,
    #[serde(rename = "startTime")]
    pub start_time: Option<String>,
    #[serde(rename = "endTime")]
    pub end_time: Option<String>,
    pub slots: Option<i64>,
}

pub async fn price_quote(
    State(state): State<Arc<AppState>>,
    _actor: Actor,
    Query(query): Query<PriceQuoteQuery>,
) -> Result<Json<pricing::Quote>, AppError> {
    let sport_id = query
        .sport_id
        .ok_or_else(|| AppError::InvalidRequest("sport_id is required".to_string()))?;
    let window = parse_window(query.start_time.as_deref(), query.end_time.as_deref())?;

    let db = state.db()?;
    let quote = pricing::quote(&db, sport_id, &window, query.slots.unwrap_or(1))?;
    Ok(Json(quote))
}
