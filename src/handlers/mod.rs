pub mod bookings;
pub mod courts;
pub mod health;
pub mod sports;

use chrono::NaiveDate;

use crate::errors::AppError;
use crate::models::TimeWindow;

pub(crate) fn parse_date(raw: Option<&str>) -> Result<NaiveDate, AppError> {
    let raw = raw
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .ok_or_else(|| AppError::InvalidRequest("date is required".to_string()))?;
    NaiveDate::parse_from_str(raw, "%Y-%m-%d")
        .map_err(|_| AppError::InvalidRequest(format!("invalid date: {raw}, expected YYYY-MM-DD")))
}

pub(crate) fn parse_window(start: Option<&str>, end: Option<&str>) -> Result<TimeWindow, AppError> {
    match (start, end) {
        (Some(start), Some(end)) if !start.trim().is_empty() && !end.trim().is_empty() => {
            Ok(TimeWindow::parse(start, end)?)
        }
        _ => Err(AppError::InvalidRequest(
            "startTime and endTime are required".to_string(),
        )),
    }
}
