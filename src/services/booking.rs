use chrono::{NaiveDate, NaiveDateTime, Utc};
use rusqlite::{Connection, TransactionBehavior};

use crate::db::queries::{self, BookingEntry, LedgerFilter};
use crate::errors::AppError;
use crate::models::{
    Actor, Booking, BookingStatus, Court, CourtStatus, PaymentMode, SessionPhase, TimeWindow,
};
use crate::services::{availability, pricing};

#[derive(Debug, Clone)]
pub struct CustomerInfo {
    pub name: String,
    pub contact: String,
    pub email: Option<String>,
}

#[derive(Debug, Clone)]
pub struct BookingRequest {
    pub court_id: i64,
    pub customer: CustomerInfo,
    pub date: NaiveDate,
    pub window: TimeWindow,
    pub payment_mode: PaymentMode,
    pub amount_paid: i64,
    pub slots_booked: i64,
    pub idempotency_key: Option<String>,
}

/// Fields a full edit may replace; `None` keeps the stored value.
#[derive(Debug, Clone, Default)]
pub struct BookingChanges {
    pub court_id: Option<i64>,
    pub customer_name: Option<String>,
    pub customer_contact: Option<String>,
    pub customer_email: Option<String>,
    pub date: Option<NaiveDate>,
    pub window: Option<TimeWindow>,
    pub slots_booked: Option<i64>,
    pub payment_mode: Option<PaymentMode>,
    pub amount_paid: Option<i64>,
}

/// Validates, prices and stores a new booking.
///
/// The occupancy check and the insert share one `BEGIN IMMEDIATE`
/// transaction, so a competing writer cannot slip a booking in between.
/// A repeated idempotency key returns the booking it created the first time.
pub fn commit(
    conn: &mut Connection,
    actor: &Actor,
    req: BookingRequest,
) -> Result<BookingEntry, AppError> {
    let customer = validate_customer(req.customer)?;
    validate_amount(req.amount_paid)?;

    let tx = conn.transaction_with_behavior(TransactionBehavior::Immediate)?;

    if let Some(key) = req.idempotency_key.as_deref() {
        if let Some(existing) = queries::get_booking_by_idempotency_key(&tx, key)? {
            tracing::info!(booking_id = %existing.booking.id, "idempotent replay of booking commit");
            return Ok(existing);
        }
    }

    let court = queries::get_court(&tx, req.court_id)?
        .ok_or_else(|| AppError::NotFound(format!("court {}", req.court_id)))?;

    let total_price = pricing::price(&court.sport(), &req.window, req.slots_booked)?;
    ensure_capacity(&tx, &court, &req.date, &req.window, req.slots_booked, None)?;
    let settlement = pricing::settle(total_price, req.amount_paid);

    let now = Utc::now().naive_utc();
    let booking = Booking {
        id: uuid::Uuid::new_v4().to_string(),
        court_id: court.id,
        sport_id: court.sport_id,
        created_by: actor.user_id.clone(),
        customer_name: customer.name,
        customer_contact: customer.contact,
        customer_email: customer.email,
        date: req.date,
        window: req.window,
        payment_mode: req.payment_mode,
        total_price,
        amount_paid: req.amount_paid,
        balance_amount: settlement.balance_amount,
        payment_status: settlement.payment_status,
        slots_booked: req.slots_booked,
        status: BookingStatus::Booked,
        idempotency_key: req.idempotency_key,
        created_at: now,
        updated_at: now,
    };

    queries::insert_booking(&tx, &booking)?;
    tx.commit()?;

    tracing::info!(
        booking_id = %booking.id,
        court_id = court.id,
        date = %booking.date,
        time_slot = %booking.window,
        slots = booking.slots_booked,
        total_price,
        "booking committed"
    );

    Ok(BookingEntry {
        booking,
        court_name: court.name,
        sport_name: court.sport_name,
    })
}

/// Full edit. Re-prices from the current sport rate and re-runs the
/// capacity check with the booking itself left out of the occupancy.
pub fn amend(
    conn: &mut Connection,
    id: &str,
    changes: BookingChanges,
) -> Result<BookingEntry, AppError> {
    let tx = conn.transaction_with_behavior(TransactionBehavior::Immediate)?;

    let mut booking = load_open_booking(&tx, id)?;

    let customer = validate_customer(CustomerInfo {
        name: changes.customer_name.unwrap_or(booking.customer_name),
        contact: changes.customer_contact.unwrap_or(booking.customer_contact),
        email: changes.customer_email.or(booking.customer_email),
    })?;
    let amount_paid = changes.amount_paid.unwrap_or(booking.amount_paid);
    validate_amount(amount_paid)?;

    booking.customer_name = customer.name;
    booking.customer_contact = customer.contact;
    booking.customer_email = customer.email;
    booking.date = changes.date.unwrap_or(booking.date);
    booking.window = changes.window.unwrap_or(booking.window);
    booking.slots_booked = changes.slots_booked.unwrap_or(booking.slots_booked);
    booking.payment_mode = changes.payment_mode.unwrap_or(booking.payment_mode);
    booking.amount_paid = amount_paid;

    let court_id = changes.court_id.unwrap_or(booking.court_id);
    let court = queries::get_court(&tx, court_id)?
        .ok_or_else(|| AppError::NotFound(format!("court {court_id}")))?;

    booking.total_price = pricing::price(&court.sport(), &booking.window, booking.slots_booked)?;
    ensure_capacity(
        &tx,
        &court,
        &booking.date,
        &booking.window,
        booking.slots_booked,
        Some(id),
    )?;

    let settlement = pricing::settle(booking.total_price, booking.amount_paid);
    booking.court_id = court.id;
    booking.sport_id = court.sport_id;
    booking.balance_amount = settlement.balance_amount;
    booking.payment_status = settlement.payment_status;
    booking.updated_at = Utc::now().naive_utc();

    queries::update_booking(&tx, &booking)?;
    tx.commit()?;

    tracing::info!(booking_id = %booking.id, court_id = court.id, "booking amended");

    Ok(BookingEntry {
        booking,
        court_name: court.name,
        sport_name: court.sport_name,
    })
}

pub fn update_payment(
    conn: &Connection,
    id: &str,
    amount_paid: i64,
    payment_mode: Option<PaymentMode>,
) -> Result<BookingEntry, AppError> {
    validate_amount(amount_paid)?;

    let mut entry = queries::get_booking_by_id(conn, id)?
        .ok_or_else(|| AppError::NotFound(format!("booking {id}")))?;
    if entry.booking.is_cancelled() {
        return Err(AppError::conflict("booking is cancelled"));
    }

    let booking = &mut entry.booking;
    let settlement = pricing::settle(booking.total_price, amount_paid);
    booking.amount_paid = amount_paid;
    booking.payment_mode = payment_mode.unwrap_or(booking.payment_mode);
    booking.balance_amount = settlement.balance_amount;
    booking.payment_status = settlement.payment_status;

    queries::update_booking_payment(
        conn,
        id,
        booking.payment_mode,
        booking.amount_paid,
        booking.balance_amount,
        booking.payment_status,
    )?;

    tracing::info!(
        booking_id = %id,
        amount_paid,
        payment_status = booking.payment_status.as_str(),
        "payment updated"
    );
    Ok(entry)
}

/// Booked -> Cancelled. There is no way back.
pub fn cancel(conn: &Connection, id: &str) -> Result<BookingEntry, AppError> {
    let mut entry = queries::get_booking_by_id(conn, id)?
        .ok_or_else(|| AppError::NotFound(format!("booking {id}")))?;
    if entry.booking.is_cancelled() {
        return Err(AppError::conflict("booking is already cancelled"));
    }

    queries::update_booking_status(conn, id, BookingStatus::Cancelled)?;
    entry.booking.status = BookingStatus::Cancelled;

    tracing::info!(booking_id = %id, court_id = entry.booking.court_id, "booking cancelled");
    Ok(entry)
}

#[derive(Debug, Clone)]
pub struct ActiveBooking {
    pub entry: BookingEntry,
    pub phase: SessionPhase,
}

/// Today's live bookings in start order, each tagged with where `now` falls.
pub fn active_bookings(conn: &Connection, now: &NaiveDateTime) -> Result<Vec<ActiveBooking>, AppError> {
    let filter = LedgerFilter {
        date: Some(now.date()),
        ..LedgerFilter::default()
    };

    let mut entries: Vec<BookingEntry> = queries::list_bookings(conn, &filter)?
        .into_iter()
        .filter(|e| !e.booking.is_cancelled())
        .collect();
    entries.sort_by_key(|e| (e.booking.window.start(), e.booking.court_id));

    Ok(entries
        .into_iter()
        .map(|entry| {
            let phase = entry.booking.phase_at(now);
            ActiveBooking { entry, phase }
        })
        .collect())
}

fn ensure_capacity(
    conn: &Connection,
    court: &Court,
    date: &NaiveDate,
    window: &TimeWindow,
    slots_booked: i64,
    exclude: Option<&str>,
) -> Result<(), AppError> {
    if court.status == CourtStatus::UnderMaintenance {
        return Err(AppError::conflict(format!("{} is under maintenance", court.name)));
    }

    let existing = queries::active_bookings_for_court(conn, court.id, date)?;
    let occupied = availability::occupancy(&existing, window, exclude);
    let (is_available, available_slots) = availability::evaluate(court.capacity, occupied);

    match available_slots {
        None if !is_available => {
            tracing::warn!(court_id = court.id, date = %date, time_slot = %window, "slot unavailable");
            Err(AppError::conflict("The selected time slot is unavailable."))
        }
        Some(remaining) if slots_booked > remaining => {
            tracing::warn!(
                court_id = court.id,
                date = %date,
                time_slot = %window,
                capacity = court.capacity,
                occupied,
                requested = slots_booked,
                "not enough slots"
            );
            Err(AppError::Conflict {
                message: format!("Not enough slots available. Only {remaining} left."),
                available_slots: Some(remaining),
            })
        }
        _ => Ok(()),
    }
}

fn load_open_booking(conn: &Connection, id: &str) -> Result<Booking, AppError> {
    let entry = queries::get_booking_by_id(conn, id)?
        .ok_or_else(|| AppError::NotFound(format!("booking {id}")))?;
    if entry.booking.is_cancelled() {
        return Err(AppError::conflict("booking is cancelled"));
    }
    Ok(entry.booking)
}

fn validate_customer(customer: CustomerInfo) -> Result<CustomerInfo, AppError> {
    let name = customer.name.trim().to_string();
    let contact = customer.contact.trim().to_string();
    if name.is_empty() {
        return Err(AppError::InvalidRequest("customer_name is required".to_string()));
    }
    if contact.is_empty() {
        return Err(AppError::InvalidRequest("customer_contact is required".to_string()));
    }

    let email = customer
        .email
        .map(|e| e.trim().to_string())
        .filter(|e| !e.is_empty());

    Ok(CustomerInfo { name, contact, email })
}

fn validate_amount(amount_paid: i64) -> Result<(), AppError> {
    if amount_paid < 0 {
        return Err(AppError::InvalidRequest("amount_paid cannot be negative".to_string()));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db;
    use crate::models::{PaymentStatus, Role};

    struct Fixture {
        conn: Connection,
        court_a: i64,
        pool: i64,
    }

    fn setup() -> Fixture {
        let conn = db::init_db(":memory:").unwrap();
        let tennis = queries::insert_sport(&conn, "Tennis", 500, 1).unwrap();
        let swim = queries::insert_sport(&conn, "Swimming", 200, 4).unwrap();
        let court_a = queries::insert_court(&conn, "Court A", tennis).unwrap();
        let pool = queries::insert_court(&conn, "Lane Group 1", swim).unwrap();
        Fixture { conn, court_a, pool }
    }

    fn staff() -> Actor {
        Actor {
            user_id: Some("u-7".to_string()),
            role: Role::Staff,
        }
    }

    fn request(court_id: i64, start: &str, end: &str, slots: i64) -> BookingRequest {
        BookingRequest {
            court_id,
            customer: CustomerInfo {
                name: "Meera".to_string(),
                contact: "9123456789".to_string(),
                email: None,
            },
            date: NaiveDate::parse_from_str("2025-06-01", "%Y-%m-%d").unwrap(),
            window: TimeWindow::parse(start, end).unwrap(),
            payment_mode: PaymentMode::Cash,
            amount_paid: 0,
            slots_booked: slots,
            idempotency_key: None,
        }
    }

    #[test]
    fn test_commit_stores_priced_booking() {
        let mut f = setup();
        let mut req = request(f.court_a, "09:00", "10:30", 1);
        req.amount_paid = 400;

        let entry = commit(&mut f.conn, &staff(), req).unwrap();
        let b = &entry.booking;
        assert_eq!(b.total_price, 750);
        assert_eq!(b.balance_amount, 350);
        assert_eq!(b.payment_status, PaymentStatus::Received);
        assert_eq!(b.created_by.as_deref(), Some("u-7"));
        assert_eq!(entry.court_name, "Court A");

        let stored = queries::get_booking_by_id(&f.conn, &b.id).unwrap().unwrap();
        assert_eq!(stored.booking.window.label(), "9:00 AM - 10:30 AM");
        assert_eq!(stored.booking.sport_id, b.sport_id);
    }

    #[test]
    fn test_commit_conflict_and_adjacent() {
        let mut f = setup();
        commit(&mut f.conn, &staff(), request(f.court_a, "09:00", "10:00", 1)).unwrap();

        let overlapping = commit(&mut f.conn, &staff(), request(f.court_a, "09:30", "10:30", 1));
        assert!(matches!(overlapping, Err(AppError::Conflict { available_slots: None, .. })));

        let adjacent = commit(&mut f.conn, &staff(), request(f.court_a, "10:00", "11:00", 1));
        assert!(adjacent.is_ok());
    }

    #[test]
    fn test_commit_unknown_court() {
        let mut f = setup();
        let result = commit(&mut f.conn, &staff(), request(999, "09:00", "10:00", 1));
        assert!(matches!(result, Err(AppError::NotFound(_))));
    }

    #[test]
    fn test_commit_shared_capacity() {
        let mut f = setup();
        commit(&mut f.conn, &staff(), request(f.pool, "09:00", "10:00", 2)).unwrap();
        commit(&mut f.conn, &staff(), request(f.pool, "09:00", "10:00", 1)).unwrap();

        let too_many = commit(&mut f.conn, &staff(), request(f.pool, "09:00", "10:00", 2));
        match too_many {
            Err(AppError::Conflict { available_slots, .. }) => assert_eq!(available_slots, Some(1)),
            other => panic!("expected conflict, got {other:?}"),
        }

        let entry = commit(&mut f.conn, &staff(), request(f.pool, "09:00", "10:00", 1)).unwrap();
        assert_eq!(entry.booking.total_price, 200);

        let date = NaiveDate::parse_from_str("2025-06-01", "%Y-%m-%d").unwrap();
        let window = TimeWindow::parse("09:00", "10:00").unwrap();
        let result = availability::resolve(&f.conn, &date, &window).unwrap();
        let pool = result.iter().find(|c| c.court.id == f.pool).unwrap();
        assert_eq!(pool.available_slots, Some(0));
        assert!(!pool.is_available);
    }

    #[test]
    fn test_commit_multiple_slots_priced_per_slot() {
        let mut f = setup();
        let entry = commit(&mut f.conn, &staff(), request(f.pool, "09:00", "10:00", 3)).unwrap();
        assert_eq!(entry.booking.total_price, 600);
    }

    #[test]
    fn test_commit_rejects_multi_slot_on_exclusive_court() {
        let mut f = setup();
        let result = commit(&mut f.conn, &staff(), request(f.court_a, "09:00", "10:00", 2));
        assert!(matches!(result, Err(AppError::InvalidRequest(_))));
    }

    #[test]
    fn test_commit_rejects_maintenance_court() {
        let mut f = setup();
        queries::update_court_status(&f.conn, f.court_a, CourtStatus::UnderMaintenance).unwrap();
        let result = commit(&mut f.conn, &staff(), request(f.court_a, "09:00", "10:00", 1));
        assert!(matches!(result, Err(AppError::Conflict { .. })));
    }

    #[test]
    fn test_commit_validates_customer_and_amount() {
        let mut f = setup();
        let mut req = request(f.court_a, "09:00", "10:00", 1);
        req.customer.name = "   ".to_string();
        assert!(matches!(
            commit(&mut f.conn, &staff(), req),
            Err(AppError::InvalidRequest(_))
        ));

        let mut req = request(f.court_a, "09:00", "10:00", 1);
        req.amount_paid = -1;
        assert!(matches!(
            commit(&mut f.conn, &staff(), req),
            Err(AppError::InvalidRequest(_))
        ));
    }

    #[test]
    fn test_failed_commit_writes_nothing() {
        let mut f = setup();
        commit(&mut f.conn, &staff(), request(f.court_a, "09:00", "10:00", 1)).unwrap();
        let _ = commit(&mut f.conn, &staff(), request(f.court_a, "09:15", "09:45", 1));

        let count: i64 = f
            .conn
            .query_row("SELECT COUNT(*) FROM bookings", [], |row| row.get(0))
            .unwrap();
        assert_eq!(count, 1);
    }

    #[test]
    fn test_idempotency_key_replays_original() {
        let mut f = setup();
        let mut req = request(f.court_a, "09:00", "10:00", 1);
        req.idempotency_key = Some("key-1".to_string());

        let first = commit(&mut f.conn, &staff(), req.clone()).unwrap();
        let second = commit(&mut f.conn, &staff(), req).unwrap();
        assert_eq!(first.booking.id, second.booking.id);

        let count: i64 = f
            .conn
            .query_row("SELECT COUNT(*) FROM bookings", [], |row| row.get(0))
            .unwrap();
        assert_eq!(count, 1);
    }

    #[test]
    fn test_cancel_is_one_way_and_frees_slot() {
        let mut f = setup();
        let entry = commit(&mut f.conn, &staff(), request(f.court_a, "09:00", "10:00", 1)).unwrap();

        let cancelled = cancel(&f.conn, &entry.booking.id).unwrap();
        assert_eq!(cancelled.booking.status, BookingStatus::Cancelled);
        assert!(matches!(cancel(&f.conn, &entry.booking.id), Err(AppError::Conflict { .. })));

        assert!(commit(&mut f.conn, &staff(), request(f.court_a, "09:00", "10:00", 1)).is_ok());
    }

    #[test]
    fn test_update_payment_rederives_status() {
        let mut f = setup();
        let entry = commit(&mut f.conn, &staff(), request(f.court_a, "09:00", "11:00", 1)).unwrap();
        let id = entry.booking.id;
        assert_eq!(entry.booking.payment_status, PaymentStatus::Pending);

        let updated = update_payment(&f.conn, &id, 400, Some(PaymentMode::Online)).unwrap();
        assert_eq!(updated.booking.balance_amount, 600);
        assert_eq!(updated.booking.payment_status, PaymentStatus::Received);

        let stored = queries::get_booking_by_id(&f.conn, &id).unwrap().unwrap().booking;
        assert_eq!(stored.payment_mode, PaymentMode::Online);
        assert_eq!(stored.payment_status, PaymentStatus::Received);

        let full = update_payment(&f.conn, &id, 1000, None).unwrap();
        assert_eq!(full.booking.payment_status, PaymentStatus::Completed);
        assert_eq!(full.booking.balance_amount, 0);
    }

    #[test]
    fn test_update_payment_rejected_after_cancel() {
        let mut f = setup();
        let entry = commit(&mut f.conn, &staff(), request(f.court_a, "09:00", "10:00", 1)).unwrap();
        cancel(&f.conn, &entry.booking.id).unwrap();
        assert!(matches!(
            update_payment(&f.conn, &entry.booking.id, 100, None),
            Err(AppError::Conflict { .. })
        ));
    }

    #[test]
    fn test_amend_reprices_and_ignores_itself() {
        let mut f = setup();
        let mut req = request(f.court_a, "09:00", "10:00", 1);
        req.amount_paid = 500;
        let entry = commit(&mut f.conn, &staff(), req).unwrap();
        assert_eq!(entry.booking.payment_status, PaymentStatus::Completed);

        let changes = BookingChanges {
            window: Some(TimeWindow::parse("09:30", "11:00").unwrap()),
            ..BookingChanges::default()
        };
        let amended = amend(&mut f.conn, &entry.booking.id, changes).unwrap();
        assert_eq!(amended.booking.total_price, 750);
        assert_eq!(amended.booking.balance_amount, 250);
        assert_eq!(amended.booking.payment_status, PaymentStatus::Received);
        assert_eq!(amended.booking.window.label(), "9:30 AM - 11:00 AM");
    }

    #[test]
    fn test_amend_conflicts_with_other_booking() {
        let mut f = setup();
        commit(&mut f.conn, &staff(), request(f.court_a, "11:00", "12:00", 1)).unwrap();
        let entry = commit(&mut f.conn, &staff(), request(f.court_a, "09:00", "10:00", 1)).unwrap();

        let changes = BookingChanges {
            window: Some(TimeWindow::parse("10:30", "11:30").unwrap()),
            ..BookingChanges::default()
        };
        assert!(matches!(
            amend(&mut f.conn, &entry.booking.id, changes),
            Err(AppError::Conflict { .. })
        ));
    }

    #[test]
    fn test_amend_moves_to_other_court() {
        let mut f = setup();
        let entry = commit(&mut f.conn, &staff(), request(f.court_a, "09:00", "10:00", 1)).unwrap();

        let changes = BookingChanges {
            court_id: Some(f.pool),
            slots_booked: Some(2),
            ..BookingChanges::default()
        };
        let amended = amend(&mut f.conn, &entry.booking.id, changes).unwrap();
        assert_eq!(amended.booking.court_id, f.pool);
        assert_eq!(amended.sport_name, "Swimming");
        assert_eq!(amended.booking.total_price, 400);
    }

    #[test]
    fn test_commit_rejects_slots_beyond_capacity() {
        let mut f = setup();
        let huge = commit(
            &mut f.conn,
            &staff(),
            request(f.pool, "09:00", "10:00", 92_233_720_368_547_758),
        );
        assert!(matches!(huge, Err(AppError::InvalidRequest(_))));

        let entry = commit(&mut f.conn, &staff(), request(f.pool, "09:00", "10:00", 1)).unwrap();
        let changes = BookingChanges {
            slots_booked: Some(5),
            ..BookingChanges::default()
        };
        assert!(matches!(
            amend(&mut f.conn, &entry.booking.id, changes),
            Err(AppError::InvalidRequest(_))
        ));

        let count: i64 = f
            .conn
            .query_row("SELECT COUNT(*) FROM bookings", [], |row| row.get(0))
            .unwrap();
        assert_eq!(count, 1);
    }

    #[test]
    fn test_amend_blank_email_clears_it() {
        let mut f = setup();
        let mut req = request(f.court_a, "09:00", "10:00", 1);
        req.customer.email = Some("meera@example.com".to_string());
        let entry = commit(&mut f.conn, &staff(), req).unwrap();
        let id = entry.booking.id;

        let kept = amend(&mut f.conn, &id, BookingChanges::default()).unwrap();
        assert_eq!(kept.booking.customer_email.as_deref(), Some("meera@example.com"));

        let changes = BookingChanges {
            customer_email: Some(String::new()),
            ..BookingChanges::default()
        };
        let cleared = amend(&mut f.conn, &id, changes).unwrap();
        assert_eq!(cleared.booking.customer_email, None);

        let stored = queries::get_booking_by_id(&f.conn, &id).unwrap().unwrap().booking;
        assert_eq!(stored.customer_email, None);
    }

    #[test]
    fn test_malformed_timestamp_is_an_error() {
        let mut f = setup();
        let entry = commit(&mut f.conn, &staff(), request(f.court_a, "09:00", "10:00", 1)).unwrap();
        f.conn
            .execute(
                "UPDATE bookings SET updated_at = 'yesterday' WHERE id = ?1",
                [&entry.booking.id],
            )
            .unwrap();

        assert!(queries::get_booking_by_id(&f.conn, &entry.booking.id).is_err());
    }

    #[test]
    fn test_active_bookings_tagged_with_phase() {
        let mut f = setup();
        commit(&mut f.conn, &staff(), request(f.court_a, "10:00", "11:00", 1)).unwrap();
        commit(&mut f.conn, &staff(), request(f.court_a, "08:00", "09:00", 1)).unwrap();
        let dropped = commit(&mut f.conn, &staff(), request(f.court_a, "12:00", "13:00", 1)).unwrap();
        cancel(&f.conn, &dropped.booking.id).unwrap();

        let now = NaiveDateTime::parse_from_str("2025-06-01 10:15", "%Y-%m-%d %H:%M").unwrap();
        let active = active_bookings(&f.conn, &now).unwrap();
        assert_eq!(active.len(), 2);
        assert_eq!(active[0].phase, SessionPhase::Ended);
        assert_eq!(active[1].phase, SessionPhase::Ongoing);
    }
}
