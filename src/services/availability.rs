use chrono::NaiveDate;
use rusqlite::Connection;
use serde::Serialize;

use crate::db::queries;
use crate::errors::AppError;
use crate::models::{Booking, Court, CourtStatus, TimeWindow};

#[derive(Debug, Clone, Serialize)]
pub struct CourtAvailability {
    #[serde(flatten)]
    pub court: Court,
    pub is_available: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub available_slots: Option<i64>,
}

/// Sum of slots held by `bookings` whose window overlaps `window`.
/// Cancelled bookings and `exclude` (a booking being edited) never count.
pub fn occupancy<'a>(
    bookings: impl IntoIterator<Item = &'a Booking>,
    window: &TimeWindow,
    exclude: Option<&str>,
) -> i64 {
    bookings
        .into_iter()
        .filter(|b| !b.is_cancelled())
        .filter(|b| exclude != Some(b.id.as_str()))
        .filter(|b| b.window.overlaps(window))
        .map(Booking::occupied_slots)
        .sum()
}

/// Exclusive courts are free only when nothing overlaps; shared ones while
/// occupancy is below capacity, reporting the remaining slots.
pub fn evaluate(capacity: i64, occupied: i64) -> (bool, Option<i64>) {
    if capacity <= 1 {
        (occupied == 0, None)
    } else {
        let remaining = (capacity - occupied).max(0);
        (remaining > 0, Some(remaining))
    }
}

pub fn resolve(
    conn: &Connection,
    date: &NaiveDate,
    window: &TimeWindow,
) -> Result<Vec<CourtAvailability>, AppError> {
    let courts = queries::list_courts(conn)?;
    let bookings = queries::active_bookings_on(conn, date)?;

    let result = courts
        .into_iter()
        .map(|court| {
            if court.status == CourtStatus::UnderMaintenance {
                return CourtAvailability {
                    court,
                    is_available: false,
                    available_slots: None,
                };
            }

            let occupied = occupancy(
                bookings.iter().filter(|b| b.court_id == court.id),
                window,
                None,
            );
            let (is_available, available_slots) = evaluate(court.capacity, occupied);

            CourtAvailability {
                court,
                is_available,
                available_slots,
            }
        })
        .collect();

    Ok(result)
}
