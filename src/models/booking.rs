use chrono::{NaiveDate, NaiveDateTime, Timelike};
use serde::{Deserialize, Serialize};

use super::window::{TimeOfDay, TimeWindow};

#[derive(Debug, Clone, PartialEq)]
pub struct Booking {
    pub id: String,
    pub court_id: i64,
    pub sport_id: i64,
    pub created_by: Option<String>,
    pub customer_name: String,
    pub customer_contact: String,
    pub customer_email: Option<String>,
    pub date: NaiveDate,
    pub window: TimeWindow,
    pub payment_mode: PaymentMode,
    pub total_price: i64,
    pub amount_paid: i64,
    pub balance_amount: i64,
    pub payment_status: PaymentStatus,
    pub slots_booked: i64,
    pub status: BookingStatus,
    pub idempotency_key: Option<String>,
    pub created_at: NaiveDateTime,
    pub updated_at: NaiveDateTime,
}

impl Booking {
    pub fn is_cancelled(&self) -> bool {
        self.status == BookingStatus::Cancelled
    }

    /// Slots this booking holds against its court's capacity.
    pub fn occupied_slots(&self) -> i64 {
        self.slots_booked.max(1)
    }

    /// Computed on read, never stored.
    pub fn phase_at(&self, now: &NaiveDateTime) -> SessionPhase {
        let today = now.date();
        if self.date != today {
            return if self.date > today {
                SessionPhase::Upcoming
            } else {
                SessionPhase::Ended
            };
        }

        let minutes = (now.hour() * 60 + now.minute()) as u16;
        match TimeOfDay::from_minutes(minutes) {
            Some(t) if t < self.window.start() => SessionPhase::Upcoming,
            Some(t) if self.window.contains(t) => SessionPhase::Ongoing,
            _ => SessionPhase::Ended,
        }
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub enum BookingStatus {
    Booked,
    Cancelled,
}

impl BookingStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            BookingStatus::Booked => "Booked",
            BookingStatus::Cancelled => "Cancelled",
        }
    }

    pub fn parse(s: &str) -> Self {
        match s {
            "Cancelled" => BookingStatus::Cancelled,
            _ => BookingStatus::Booked,
        }
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum PaymentMode {
    Cash,
    Online,
}

impl PaymentMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            PaymentMode::Cash => "cash",
            PaymentMode::Online => "online",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "cash" => Some(PaymentMode::Cash),
            "online" => Some(PaymentMode::Online),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub enum PaymentStatus {
    Pending,
    Received,
    Completed,
}

impl PaymentStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            PaymentStatus::Pending => "Pending",
            PaymentStatus::Received => "Received",
            PaymentStatus::Completed => "Completed",
        }
    }

    pub fn parse(s: &str) -> Self {
        match s {
            "Received" => PaymentStatus::Received,
            "Completed" => PaymentStatus::Completed,
            _ => PaymentStatus::Pending,
        }
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum SessionPhase {
    Upcoming,
    Ongoing,
    Ended,
}
