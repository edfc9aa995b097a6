use rusqlite::Connection;
use serde::Serialize;

use crate::db::queries;
use crate::errors::AppError;
use crate::models::{PaymentStatus, Sport, TimeWindow};

/// Bills whole hours at the full rate and a trailing 30-59 minutes at half
/// the rate. Anything under 30 minutes past the last whole hour is free.
pub fn price_for_duration(
    hourly_rate: i64,
    duration_minutes: i64,
    slots_booked: i64,
) -> Result<i64, AppError> {
    if duration_minutes <= 0 {
        return Err(AppError::InvalidRequest(
            "end time must be after start time".to_string(),
        ));
    }
    if slots_booked < 1 {
        return Err(AppError::InvalidRequest(
            "slots_booked must be at least 1".to_string(),
        ));
    }

    let hours = duration_minutes / 60;
    let rem = duration_minutes % 60;
    let half = if rem >= 30 { hourly_rate / 2 } else { 0 };

    hours
        .checked_mul(hourly_rate)
        .and_then(|total| total.checked_add(half))
        .and_then(|total| total.checked_mul(slots_booked))
        .ok_or_else(|| AppError::InvalidRequest("booking total is out of range".to_string()))
}

/// Slot rules shared by quotes and commits: exclusive sports take one slot,
/// shared sports never more than their capacity.
pub fn check_slots(sport: &Sport, slots_booked: i64) -> Result<(), AppError> {
    if slots_booked < 1 {
        return Err(AppError::InvalidRequest(
            "slots_booked must be at least 1".to_string(),
        ));
    }
    if !sport.is_shared() && slots_booked > 1 {
        return Err(AppError::InvalidRequest(format!(
            "{} can only be booked one slot at a time",
            sport.name
        )));
    }
    if slots_booked > sport.capacity {
        return Err(AppError::InvalidRequest(format!(
            "{} has only {} slots",
            sport.name, sport.capacity
        )));
    }
    Ok(())
}

pub fn price(sport: &Sport, window: &TimeWindow, slots_booked: i64) -> Result<i64, AppError> {
    check_slots(sport, slots_booked)?;
    price_for_duration(sport.price, window.duration_minutes(), slots_booked)
}

#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct Quote {
    pub sport_id: i64,
    pub hourly_rate: i64,
    pub duration_minutes: i64,
    pub slots_booked: i64,
    pub total_price: i64,
}

/// Read-only preview of what a commit with the same inputs would store.
pub fn quote(
    conn: &Connection,
    sport_id: i64,
    window: &TimeWindow,
    slots_booked: i64,
) -> Result<Quote, AppError> {
    let sport = queries::get_sport(conn, sport_id)?
        .ok_or_else(|| AppError::NotFound(format!("sport {sport_id}")))?;

    Ok(Quote {
        sport_id,
        hourly_rate: sport.price,
        duration_minutes: window.duration_minutes(),
        slots_booked,
        total_price: price(&sport, window, slots_booked)?,
    })
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Settlement {
    pub balance_amount: i64,
    pub payment_status: PaymentStatus,
}

/// Overpayment is kept as a credit: the balance goes negative and the
/// booking counts as completed.
pub fn settle(total_price: i64, amount_paid: i64) -> Settlement {
    let balance_amount = total_price - amount_paid;
    let payment_status = if amount_paid <= 0 {
        PaymentStatus::Pending
    } else if balance_amount <= 0 {
        PaymentStatus::Completed
    } else {
        PaymentStatus::Received
    };

    Settlement {
        balance_amount,
        payment_status,
    }
}
