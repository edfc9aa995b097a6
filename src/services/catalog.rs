use rusqlite::Connection;

use crate::db::queries;
use crate::errors::AppError;
use crate::models::{Court, CourtStatus, Sport};

pub fn create_sport(
    conn: &Connection,
    name: &str,
    price: i64,
    capacity: i64,
) -> Result<Sport, AppError> {
    let name = name.trim();
    if name.is_empty() {
        return Err(AppError::InvalidRequest("sport name is required".to_string()));
    }
    validate_rate(price, capacity)?;
    if queries::sport_name_exists(conn, name)? {
        return Err(AppError::conflict(format!("sport {name} already exists")));
    }

    let id = queries::insert_sport(conn, name, price, capacity)?;
    tracing::info!(sport_id = id, name, price, capacity, "sport created");

    Ok(Sport {
        id,
        name: name.to_string(),
        price,
        capacity,
    })
}

/// Existing bookings keep the price they were committed with.
pub fn update_sport(
    conn: &Connection,
    id: i64,
    price: Option<i64>,
    capacity: Option<i64>,
) -> Result<Sport, AppError> {
    let mut sport = queries::get_sport(conn, id)?
        .ok_or_else(|| AppError::NotFound(format!("sport {id}")))?;

    sport.price = price.unwrap_or(sport.price);
    sport.capacity = capacity.unwrap_or(sport.capacity);
    validate_rate(sport.price, sport.capacity)?;

    queries::update_sport(conn, id, sport.price, sport.capacity)?;
    tracing::info!(sport_id = id, price = sport.price, capacity = sport.capacity, "sport updated");
    Ok(sport)
}

pub fn delete_sport(conn: &Connection, id: i64) -> Result<(), AppError> {
    if queries::get_sport(conn, id)?.is_none() {
        return Err(AppError::NotFound(format!("sport {id}")));
    }
    if queries::count_courts_for_sport(conn, id)? > 0 {
        return Err(AppError::conflict("sport still has courts"));
    }

    queries::delete_sport(conn, id)?;
    tracing::info!(sport_id = id, "sport deleted");
    Ok(())
}

pub fn create_court(conn: &Connection, name: &str, sport_id: i64) -> Result<Court, AppError> {
    let name = name.trim();
    if name.is_empty() {
        return Err(AppError::InvalidRequest("court name is required".to_string()));
    }
    if queries::get_sport(conn, sport_id)?.is_none() {
        return Err(AppError::NotFound(format!("sport {sport_id}")));
    }

    let id = queries::insert_court(conn, name, sport_id)?;
    tracing::info!(court_id = id, sport_id, name, "court created");

    queries::get_court(conn, id)?
        .ok_or_else(|| AppError::Internal(anyhow::anyhow!("court {id} missing after insert")))
}

pub fn set_court_status(conn: &Connection, id: i64, status: CourtStatus) -> Result<Court, AppError> {
    if !queries::update_court_status(conn, id, status)? {
        return Err(AppError::NotFound(format!("court {id}")));
    }
    tracing::info!(court_id = id, status = status.as_str(), "court status changed");

    queries::get_court(conn, id)?.ok_or_else(|| AppError::NotFound(format!("court {id}")))
}

/// Courts with booking history stay, since bookings reference them.
pub fn delete_court(conn: &Connection, id: i64) -> Result<(), AppError> {
    if queries::get_court(conn, id)?.is_none() {
        return Err(AppError::NotFound(format!("court {id}")));
    }
    if queries::count_bookings_for_court(conn, id)? > 0 {
        return Err(AppError::conflict("court has bookings"));
    }

    queries::delete_court(conn, id)?;
    tracing::info!(court_id = id, "court deleted");
    Ok(())
}

fn validate_rate(price: i64, capacity: i64) -> Result<(), AppError> {
    if price < 0 {
        return Err(AppError::InvalidRequest("price cannot be negative".to_string()));
    }
    if capacity < 1 {
        return Err(AppError::InvalidRequest("capacity must be at least 1".to_string()));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db;

    fn setup() -> Connection {
        db::init_db(":memory:").unwrap()
    }

    #[test]
    fn test_create_sport_validates() {
        let conn = setup();
        assert!(matches!(create_sport(&conn, " ", 100, 1), Err(AppError::InvalidRequest(_))));
        assert!(matches!(create_sport(&conn, "Squash", -1, 1), Err(AppError::InvalidRequest(_))));
        assert!(matches!(create_sport(&conn, "Squash", 100, 0), Err(AppError::InvalidRequest(_))));

        let sport = create_sport(&conn, "Squash", 100, 1).unwrap();
        assert_eq!(sport.name, "Squash");
        assert!(!sport.is_shared());
        assert!(matches!(create_sport(&conn, "squash", 100, 1), Err(AppError::Conflict { .. })));
    }

    #[test]
    fn test_update_sport_keeps_unset_fields() {
        let conn = setup();
        let sport = create_sport(&conn, "Swimming", 200, 6).unwrap();
        let updated = update_sport(&conn, sport.id, Some(250), None).unwrap();
        assert_eq!(updated.price, 250);
        assert_eq!(updated.capacity, 6);
        assert!(matches!(update_sport(&conn, 42, Some(1), None), Err(AppError::NotFound(_))));
    }

    #[test]
    fn test_court_lifecycle() {
        let conn = setup();
        let sport = create_sport(&conn, "Badminton", 300, 1).unwrap();
        assert!(matches!(create_court(&conn, "Court 1", 99), Err(AppError::NotFound(_))));

        let court = create_court(&conn, "Court 1", sport.id).unwrap();
        assert_eq!(court.status, CourtStatus::Available);
        assert_eq!(court.sport_name, "Badminton");

        let court = set_court_status(&conn, court.id, CourtStatus::UnderMaintenance).unwrap();
        assert_eq!(court.status, CourtStatus::UnderMaintenance);

        assert!(matches!(delete_sport(&conn, sport.id), Err(AppError::Conflict { .. })));
        delete_court(&conn, court.id).unwrap();
        delete_sport(&conn, sport.id).unwrap();
        assert!(queries::list_sports(&conn).unwrap().is_empty());
    }
}
