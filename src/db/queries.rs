use anyhow::Context;
use chrono::{NaiveDate, NaiveDateTime, Utc};
use rusqlite::{params, Connection};

use crate::models::{
    Booking, BookingStatus, Court, CourtStatus, PaymentMode, PaymentStatus, Sport, TimeWindow,
};

const DATE_FMT: &str = "%Y-%m-%d";
const TIMESTAMP_FMT: &str = "%Y-%m-%d %H:%M:%S";

pub fn format_date(date: &NaiveDate) -> String {
    date.format(DATE_FMT).to_string()
}

fn now_timestamp() -> String {
    Utc::now().naive_utc().format(TIMESTAMP_FMT).to_string()
}

// ── Sports ──

pub fn list_sports(conn: &Connection) -> anyhow::Result<Vec<Sport>> {
    let mut stmt = conn.prepare("SELECT id, name, price, capacity FROM sports ORDER BY name ASC")?;
    let rows = stmt.query_map([], parse_sport_row)?;

    let mut sports = vec![];
    for row in rows {
        sports.push(row?);
    }
    Ok(sports)
}

pub fn get_sport(conn: &Connection, id: i64) -> anyhow::Result<Option<Sport>> {
    let result = conn.query_row(
        "SELECT id, name, price, capacity FROM sports WHERE id = ?1",
        params![id],
        parse_sport_row,
    );

    match result {
        Ok(sport) => Ok(Some(sport)),
        Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
        Err(e) => Err(e.into()),
    }
}

pub fn sport_name_exists(conn: &Connection, name: &str) -> anyhow::Result<bool> {
    let count: i64 = conn.query_row(
        "SELECT COUNT(*) FROM sports WHERE name = ?1 COLLATE NOCASE",
        params![name],
        |row| row.get(0),
    )?;
    Ok(count > 0)
}

pub fn insert_sport(conn: &Connection, name: &str, price: i64, capacity: i64) -> anyhow::Result<i64> {
    conn.execute(
        "INSERT INTO sports (name, price, capacity) VALUES (?1, ?2, ?3)",
        params![name, price, capacity],
    )?;
    Ok(conn.last_insert_rowid())
}

pub fn update_sport(conn: &Connection, id: i64, price: i64, capacity: i64) -> anyhow::Result<bool> {
    let count = conn.execute(
        "UPDATE sports SET price = ?1, capacity = ?2 WHERE id = ?3",
        params![price, capacity, id],
    )?;
    Ok(count > 0)
}

pub fn delete_sport(conn: &Connection, id: i64) -> anyhow::Result<bool> {
    let count = conn.execute("DELETE FROM sports WHERE id = ?1", params![id])?;
    Ok(count > 0)
}

pub fn count_courts_for_sport(conn: &Connection, sport_id: i64) -> anyhow::Result<i64> {
    let count = conn.query_row(
        "SELECT COUNT(*) FROM courts WHERE sport_id = ?1",
        params![sport_id],
        |row| row.get(0),
    )?;
    Ok(count)
}

fn parse_sport_row(row: &rusqlite::Row) -> rusqlite::Result<Sport> {
    Ok(Sport {
        id: row.get(0)?,
        name: row.get(1)?,
        price: row.get(2)?,
        capacity: row.get(3)?,
    })
}

// ── Courts ──

const COURT_SELECT: &str = "SELECT c.id, c.name, c.status, s.id, s.name, s.price, s.capacity \
     FROM courts c JOIN sports s ON c.sport_id = s.id";

pub fn list_courts(conn: &Connection) -> anyhow::Result<Vec<Court>> {
    let mut stmt = conn.prepare(&format!("{COURT_SELECT} ORDER BY c.id ASC"))?;
    let rows = stmt.query_map([], |row| Ok(parse_court_row(row)))?;

    let mut courts = vec![];
    for row in rows {
        courts.push(row??);
    }
    Ok(courts)
}

pub fn get_court(conn: &Connection, id: i64) -> anyhow::Result<Option<Court>> {
    let result = conn.query_row(
        &format!("{COURT_SELECT} WHERE c.id = ?1"),
        params![id],
        |row| Ok(parse_court_row(row)),
    );

    match result {
        Ok(court) => Ok(Some(court?)),
        Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
        Err(e) => Err(e.into()),
    }
}

pub fn insert_court(conn: &Connection, name: &str, sport_id: i64) -> anyhow::Result<i64> {
    conn.execute(
        "INSERT INTO courts (name, sport_id, status) VALUES (?1, ?2, ?3)",
        params![name, sport_id, CourtStatus::Available.as_str()],
    )?;
    Ok(conn.last_insert_rowid())
}

pub fn update_court_status(conn: &Connection, id: i64, status: CourtStatus) -> anyhow::Result<bool> {
    let count = conn.execute(
        "UPDATE courts SET status = ?1 WHERE id = ?2",
        params![status.as_str(), id],
    )?;
    Ok(count > 0)
}

pub fn delete_court(conn: &Connection, id: i64) -> anyhow::Result<bool> {
    let count = conn.execute("DELETE FROM courts WHERE id = ?1", params![id])?;
    Ok(count > 0)
}

pub fn count_bookings_for_court(conn: &Connection, court_id: i64) -> anyhow::Result<i64> {
    let count = conn.query_row(
        "SELECT COUNT(*) FROM bookings WHERE court_id = ?1",
        params![court_id],
        |row| row.get(0),
    )?;
    Ok(count)
}

fn parse_court_row(row: &rusqlite::Row) -> anyhow::Result<Court> {
    let status_str: String = row.get(2)?;
    let status = CourtStatus::parse(&status_str)
        .with_context(|| format!("unknown court status: {status_str}"))?;

    Ok(Court {
        id: row.get(0)?,
        name: row.get(1)?,
        status,
        sport_id: row.get(3)?,
        sport_name: row.get(4)?,
        price: row.get(5)?,
        capacity: row.get(6)?,
    })
}

// ── Bookings ──

/// A booking plus the names a listing shows next to it.
#[derive(Debug, Clone)]
pub struct BookingEntry {
    pub booking: Booking,
    pub court_name: String,
    pub sport_name: String,
}

const BOOKING_COLUMNS: &str = "b.id, b.court_id, b.sport_id, b.created_by, b.customer_name, \
     b.customer_contact, b.customer_email, b.date, b.time_slot, b.payment_mode, b.total_price, \
     b.amount_paid, b.balance_amount, b.payment_status, b.slots_booked, b.status, \
     b.idempotency_key, b.created_at, b.updated_at";

pub fn insert_booking(conn: &Connection, booking: &Booking) -> anyhow::Result<()> {
    conn.execute(
        "INSERT INTO bookings (id, court_id, sport_id, created_by, customer_name, customer_contact,
            customer_email, date, time_slot, payment_mode, total_price, amount_paid, balance_amount,
            payment_status, slots_booked, status, idempotency_key, created_at, updated_at)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14, ?15, ?16, ?17, ?18, ?19)",
        params![
            booking.id,
            booking.court_id,
            booking.sport_id,
            booking.created_by,
            booking.customer_name,
            booking.customer_contact,
            booking.customer_email,
            format_date(&booking.date),
            booking.window.label(),
            booking.payment_mode.as_str(),
            booking.total_price,
            booking.amount_paid,
            booking.balance_amount,
            booking.payment_status.as_str(),
            booking.slots_booked,
            booking.status.as_str(),
            booking.idempotency_key,
            booking.created_at.format(TIMESTAMP_FMT).to_string(),
            booking.updated_at.format(TIMESTAMP_FMT).to_string(),
        ],
    )?;
    Ok(())
}

/// Rewrites every mutable column of an existing booking.
pub fn update_booking(conn: &Connection, booking: &Booking) -> anyhow::Result<bool> {
    let count = conn.execute(
        "UPDATE bookings SET court_id = ?1, sport_id = ?2, customer_name = ?3, customer_contact = ?4,
            customer_email = ?5, date = ?6, time_slot = ?7, payment_mode = ?8, total_price = ?9,
            amount_paid = ?10, balance_amount = ?11, payment_status = ?12, slots_booked = ?13,
            updated_at = ?14
         WHERE id = ?15",
        params![
            booking.court_id,
            booking.sport_id,
            booking.customer_name,
            booking.customer_contact,
            booking.customer_email,
            format_date(&booking.date),
            booking.window.label(),
            booking.payment_mode.as_str(),
            booking.total_price,
            booking.amount_paid,
            booking.balance_amount,
            booking.payment_status.as_str(),
            booking.slots_booked,
            now_timestamp(),
            booking.id,
        ],
    )?;
    Ok(count > 0)
}

pub fn update_booking_payment(
    conn: &Connection,
    id: &str,
    payment_mode: PaymentMode,
    amount_paid: i64,
    balance_amount: i64,
    payment_status: PaymentStatus,
) -> anyhow::Result<bool> {
    let count = conn.execute(
        "UPDATE bookings SET payment_mode = ?1, amount_paid = ?2, balance_amount = ?3,
            payment_status = ?4, updated_at = ?5
         WHERE id = ?6",
        params![
            payment_mode.as_str(),
            amount_paid,
            balance_amount,
            payment_status.as_str(),
            now_timestamp(),
            id,
        ],
    )?;
    Ok(count > 0)
}

pub fn update_booking_status(
    conn: &Connection,
    id: &str,
    status: BookingStatus,
) -> anyhow::Result<bool> {
    let count = conn.execute(
        "UPDATE bookings SET status = ?1, updated_at = ?2 WHERE id = ?3",
        params![status.as_str(), now_timestamp(), id],
    )?;
    Ok(count > 0)
}

pub fn get_booking_by_id(conn: &Connection, id: &str) -> anyhow::Result<Option<BookingEntry>> {
    query_one_entry(conn, "b.id = ?1", id)
}

pub fn get_booking_by_idempotency_key(
    conn: &Connection,
    key: &str,
) -> anyhow::Result<Option<BookingEntry>> {
    query_one_entry(conn, "b.idempotency_key = ?1", key)
}

/// Non-cancelled bookings on `date`, across all courts.
pub fn active_bookings_on(conn: &Connection, date: &NaiveDate) -> anyhow::Result<Vec<Booking>> {
    let mut stmt = conn.prepare(&format!(
        "SELECT {BOOKING_COLUMNS} FROM bookings b
         WHERE b.date = ?1 AND b.status != 'Cancelled'"
    ))?;
    let rows = stmt.query_map(params![format_date(date)], |row| Ok(parse_booking_row(row)))?;

    let mut bookings = vec![];
    for row in rows {
        bookings.push(row??);
    }
    Ok(bookings)
}

/// Non-cancelled bookings on one court and date.
pub fn active_bookings_for_court(
    conn: &Connection,
    court_id: i64,
    date: &NaiveDate,
) -> anyhow::Result<Vec<Booking>> {
    let mut stmt = conn.prepare(&format!(
        "SELECT {BOOKING_COLUMNS} FROM bookings b
         WHERE b.court_id = ?1 AND b.date = ?2 AND b.status != 'Cancelled'"
    ))?;
    let rows = stmt.query_map(params![court_id, format_date(date)], |row| {
        Ok(parse_booking_row(row))
    })?;

    let mut bookings = vec![];
    for row in rows {
        bookings.push(row??);
    }
    Ok(bookings)
}

#[derive(Debug, Default, Clone)]
pub struct LedgerFilter {
    pub date: Option<NaiveDate>,
    pub sport: Option<String>,
    pub customer: Option<String>,
}

pub fn list_bookings(conn: &Connection, filter: &LedgerFilter) -> anyhow::Result<Vec<BookingEntry>> {
    let mut clauses: Vec<&str> = vec![];
    let mut values: Vec<String> = vec![];

    if let Some(date) = &filter.date {
        values.push(format_date(date));
        clauses.push("b.date = ?");
    }
    if let Some(sport) = filter.sport.as_deref().filter(|s| !s.is_empty()) {
        values.push(format!("%{sport}%"));
        clauses.push("s.name LIKE ?");
    }
    if let Some(customer) = filter.customer.as_deref().filter(|s| !s.is_empty()) {
        values.push(format!("%{customer}%"));
        clauses.push("b.customer_name LIKE ?");
    }

    let mut sql = format!(
        "SELECT {BOOKING_COLUMNS}, c.name, s.name FROM bookings b
         JOIN courts c ON b.court_id = c.id
         JOIN sports s ON b.sport_id = s.id"
    );
    if !clauses.is_empty() {
        sql.push_str(" WHERE ");
        sql.push_str(&clauses.join(" AND "));
    }
    sql.push_str(" ORDER BY b.date DESC, b.created_at DESC");

    let mut stmt = conn.prepare(&sql)?;
    let rows = stmt.query_map(rusqlite::params_from_iter(values.iter()), |row| {
        Ok(parse_entry_row(row))
    })?;

    let mut entries = vec![];
    for row in rows {
        entries.push(row??);
    }
    Ok(entries)
}

fn query_one_entry(conn: &Connection, predicate: &str, value: &str) -> anyhow::Result<Option<BookingEntry>> {
    let result = conn.query_row(
        &format!(
            "SELECT {BOOKING_COLUMNS}, c.name, s.name FROM bookings b
             JOIN courts c ON b.court_id = c.id
             JOIN sports s ON b.sport_id = s.id
             WHERE {predicate}"
        ),
        params![value],
        |row| Ok(parse_entry_row(row)),
    );

    match result {
        Ok(entry) => Ok(Some(entry?)),
        Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
        Err(e) => Err(e.into()),
    }
}

fn parse_entry_row(row: &rusqlite::Row) -> anyhow::Result<BookingEntry> {
    Ok(BookingEntry {
        booking: parse_booking_row(row)?,
        court_name: row.get(19)?,
        sport_name: row.get(20)?,
    })
}

fn parse_booking_row(row: &rusqlite::Row) -> anyhow::Result<Booking> {
    let id: String = row.get(0)?;
    let date_str: String = row.get(7)?;
    let time_slot: String = row.get(8)?;
    let payment_mode_str: String = row.get(9)?;
    let payment_status_str: String = row.get(13)?;
    let status_str: String = row.get(15)?;
    let created_at_str: String = row.get(17)?;
    let updated_at_str: String = row.get(18)?;

    let date = NaiveDate::parse_from_str(&date_str, DATE_FMT)
        .with_context(|| format!("booking {id} has malformed date: {date_str}"))?;
    let window = TimeWindow::parse_label(&time_slot)
        .with_context(|| format!("booking {id} has malformed time slot: {time_slot}"))?;
    let payment_mode = PaymentMode::parse(&payment_mode_str)
        .with_context(|| format!("booking {id} has unknown payment mode: {payment_mode_str}"))?;
    let created_at = NaiveDateTime::parse_from_str(&created_at_str, TIMESTAMP_FMT)
        .with_context(|| format!("booking {id} has malformed created_at: {created_at_str}"))?;
    let updated_at = NaiveDateTime::parse_from_str(&updated_at_str, TIMESTAMP_FMT)
        .with_context(|| format!("booking {id} has malformed updated_at: {updated_at_str}"))?;

    Ok(Booking {
        id,
        court_id: row.get(1)?,
        sport_id: row.get(2)?,
        created_by: row.get(3)?,
        customer_name: row.get(4)?,
        customer_contact: row.get(5)?,
        customer_email: row.get(6)?,
        date,
        window,
        payment_mode,
        total_price: row.get(10)?,
        amount_paid: row.get(11)?,
        balance_amount: row.get(12)?,
        payment_status: PaymentStatus::parse(&payment_status_str),
        slots_booked: row.get(14)?,
        status: BookingStatus::parse(&status_str),
        idempotency_key: row.get(16)?,
        created_at,
        updated_at,
    })
}
