use std::sync::Arc;

use axum::extract::{Path, Query, State};
use axum::http::{HeaderMap, StatusCode};
use axum::Json;
use serde::{Deserialize, Serialize};

use crate::db::queries::{self, BookingEntry, LedgerFilter};
use crate::errors::AppError;
use crate::handlers::{parse_date, parse_window};
use crate::models::{Actor, PaymentMode, SessionPhase};
use crate::services::booking::{self, BookingChanges, BookingRequest, CustomerInfo};
use crate::state::AppState;

const IDEMPOTENCY_HEADER: &str = "idempotency-key";

#[derive(Serialize)]
pub struct BookingResponse {
    id: String,
    court_id: i64,
    court_name: String,
    sport_id: i64,
    sport_name: String,
    created_by: Option<String>,
    customer_name: String,
    customer_contact: String,
    customer_email: Option<String>,
    date: String,
    time_slot: String,
    start_time: String,
    end_time: String,
    payment_mode: PaymentMode,
    total_price: i64,
    amount_paid: i64,
    balance_amount: i64,
    payment_status: String,
    slots_booked: i64,
    status: String,
    created_at: String,
    updated_at: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    phase: Option<SessionPhase>,
}

impl From<BookingEntry> for BookingResponse {
    fn from(entry: BookingEntry) -> Self {
        let b = entry.booking;
        Self {
            id: b.id,
            court_id: b.court_id,
            court_name: entry.court_name,
            sport_id: b.sport_id,
            sport_name: entry.sport_name,
            created_by: b.created_by,
            customer_name: b.customer_name,
            customer_contact: b.customer_contact,
            customer_email: b.customer_email,
            date: queries::format_date(&b.date),
            time_slot: b.window.label(),
            start_time: b.window.start().to_24h(),
            end_time: b.window.end().to_24h(),
            payment_mode: b.payment_mode,
            total_price: b.total_price,
            amount_paid: b.amount_paid,
            balance_amount: b.balance_amount,
            payment_status: b.payment_status.as_str().to_string(),
            slots_booked: b.slots_booked,
            status: b.status.as_str().to_string(),
            created_at: b.created_at.format("%Y-%m-%d %H:%M:%S").to_string(),
            updated_at: b.updated_at.format("%Y-%m-%d %H:%M:%S").to_string(),
            phase: None,
        }
    }
}

fn parse_payment_mode(raw: Option<&str>) -> Result<Option<PaymentMode>, AppError> {
    match raw {
        None => Ok(None),
        Some(s) => PaymentMode::parse(s)
            .map(Some)
            .ok_or_else(|| AppError::InvalidRequest(format!("unknown payment_mode: {s}"))),
    }
}

// POST /api/bookings
#[derive(Deserialize)]
pub struct CreateBookingRequest {
    pub court_id: Option<i64>,
    pub customer_name: Option<String>,
    pub customer_contact: Option<String>,
    pub customer_email: Option<String>,
    pub date: Option<String>,
    #[serde(rename = "startTime", alias = "start_time")]
    pub start_time: Option<String>,
    #[serde(rename = "endTime", alias = "end_time")]
    pub end_time: Option<String>,
    pub payment_mode: Option<String>,
    pub amount_paid: Option<i64>,
    pub slots_booked: Option<i64>,
}

pub async fn create_booking(
    State(state): State<Arc<AppState>>,
    actor: Actor,
    headers: HeaderMap,
    Json(body): Json<CreateBookingRequest>,
) -> Result<(StatusCode, Json<BookingResponse>), AppError> {
    let court_id = body
        .court_id
        .ok_or_else(|| AppError::InvalidRequest("court_id is required".to_string()))?;
    let date = parse_date(body.date.as_deref())?;
    let window = parse_window(body.start_time.as_deref(), body.end_time.as_deref())?;
    let payment_mode = parse_payment_mode(body.payment_mode.as_deref())?.unwrap_or(PaymentMode::Cash);

    let idempotency_key = headers
        .get(IDEMPOTENCY_HEADER)
        .and_then(|v| v.to_str().ok())
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty());

    let request = BookingRequest {
        court_id,
        customer: CustomerInfo {
            name: body.customer_name.unwrap_or_default(),
            contact: body.customer_contact.unwrap_or_default(),
            email: body.customer_email,
        },
        date,
        window,
        payment_mode,
        amount_paid: body.amount_paid.unwrap_or(0),
        slots_booked: body.slots_booked.unwrap_or(1),
        idempotency_key,
    };

    let entry = {
        let mut db = state.db()?;
        booking::commit(&mut db, &actor, request)?
    };

    Ok((StatusCode::CREATED, Json(entry.into())))
}

// GET /api/bookings?date=
#[derive(Deserialize)]
pub struct BookingsQuery {
    pub date: Option<String>,
}

pub async fn get_bookings(
    State(state): State<Arc<AppState>>,
    _actor: Actor,
    Query(query): Query<BookingsQuery>,
) -> Result<Json<Vec<BookingResponse>>, AppError> {
    let filter = LedgerFilter {
        date: Some(parse_date(query.date.as_deref())?),
        ..LedgerFilter::default()
    };

    let entries = {
        let db = state.db()?;
        queries::list_bookings(&db, &filter)?
    };
    Ok(Json(entries.into_iter().map(BookingResponse::from).collect()))
}

// GET /api/bookings/all?date=&sport=&customer=
#[derive(Deserialize)]
pub struct LedgerQuery {
    pub date: Option<String>,
    pub sport: Option<String>,
    pub customer: Option<String>,
}

pub async fn get_ledger(
    State(state): State<Arc<AppState>>,
    _actor: Actor,
    Query(query): Query<LedgerQuery>,
) -> Result<Json<Vec<BookingResponse>>, AppError> {
    let date = match query.date.as_deref().map(str::trim) {
        Some(d) if !d.is_empty() => Some(parse_date(Some(d))?),
        _ => None,
    };
    let filter = LedgerFilter {
        date,
        sport: query.sport,
        customer: query.customer,
    };

    let entries = {
        let db = state.db()?;
        queries::list_bookings(&db, &filter)?
    };
    Ok(Json(entries.into_iter().map(BookingResponse::from).collect()))
}

// GET /api/bookings/active
pub async fn get_active_bookings(
    State(state): State<Arc<AppState>>,
    _actor: Actor,
) -> Result<Json<Vec<BookingResponse>>, AppError> {
    let now = chrono::Local::now().naive_local();
    let active = {
        let db = state.db()?;
        booking::active_bookings(&db, &now)?
    };

    let response = active
        .into_iter()
        .map(|a| BookingResponse {
            phase: Some(a.phase),
            ..BookingResponse::from(a.entry)
        })
        .collect();
    Ok(Json(response))
}

// GET /api/bookings/:id
pub async fn get_booking(
    State(state): State<Arc<AppState>>,
    _actor: Actor,
    Path(id): Path<String>,
) -> Result<Json<BookingResponse>, AppError> {
    let entry = {
        let db = state.db()?;
        queries::get_booking_by_id(&db, &id)?
    }
    .ok_or_else(|| AppError::NotFound(format!("booking {id}")))?;

    Ok(Json(entry.into()))
}

// PUT /api/bookings/:id
#[derive(Deserialize)]
pub struct UpdateBookingRequest {
    pub court_id: Option<i64>,
    pub customer_name: Option<String>,
    pub customer_contact: Option<String>,
    pub customer_email: Option<String>,
    pub date: Option<String>,
    #[serde(rename = "startTime", alias = "start_time")]
    pub start_time: Option<String>,
    #[serde(rename = "endTime", alias = "end_time")]
    pub end_time: Option<String>,
    pub payment_mode: Option<String>,
    pub amount_paid: Option<i64>,
    pub slots_booked: Option<i64>,
}

pub async fn update_booking(
    State(state): State<Arc<AppState>>,
    actor: Actor,
    Path(id): Path<String>,
    Json(body): Json<UpdateBookingRequest>,
) -> Result<Json<BookingResponse>, AppError> {
    let date = match body.date.as_deref() {
        Some(d) => Some(parse_date(Some(d))?),
        None => None,
    };
    let window = match (&body.start_time, &body.end_time) {
        (None, None) => None,
        (start, end) => Some(parse_window(start.as_deref(), end.as_deref())?),
    };

    let changes = BookingChanges {
        court_id: body.court_id,
        customer_name: body.customer_name,
        customer_contact: body.customer_contact,
        customer_email: body.customer_email,
        date,
        window,
        slots_booked: body.slots_booked,
        payment_mode: parse_payment_mode(body.payment_mode.as_deref())?,
        amount_paid: body.amount_paid,
    };

    let entry = {
        let mut db = state.db()?;
        booking::amend(&mut db, &id, changes)?
    };

    tracing::info!(booking_id = %id, user_id = ?actor.user_id, "booking edited");
    Ok(Json(entry.into()))
}

// PUT /api/bookings/:id/payment
#[derive(Deserialize)]
pub struct PaymentRequest {
    pub amount_paid: Option<i64>,
    pub payment_mode: Option<String>,
}

pub async fn update_payment(
    State(state): State<Arc<AppState>>,
    _actor: Actor,
    Path(id): Path<String>,
    Json(body): Json<PaymentRequest>,
) -> Result<Json<BookingResponse>, AppError> {
    let amount_paid = body
        .amount_paid
        .ok_or_else(|| AppError::InvalidRequest("amount_paid is required".to_string()))?;
    let payment_mode = parse_payment_mode(body.payment_mode.as_deref())?;

    let entry = {
        let db = state.db()?;
        booking::update_payment(&db, &id, amount_paid, payment_mode)?
    };
    Ok(Json(entry.into()))
}

// PUT /api/bookings/:id/cancel
pub async fn cancel_booking(
    State(state): State<Arc<AppState>>,
    actor: Actor,
    Path(id): Path<String>,
) -> Result<Json<BookingResponse>, AppError> {
    let entry = {
        let db = state.db()?;
        booking::cancel(&db, &id)?
    };

    tracing::info!(booking_id = %id, user_id = ?actor.user_id, "cancel requested");
    Ok(Json(entry.into()))
}
