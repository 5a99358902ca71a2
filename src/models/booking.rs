use chrono::{NaiveDate, NaiveDateTime};
use serde::{Deserialize, Serialize};

use crate::models::time::format_hhmm;

pub const MIN_BOOKING_MINUTES: i64 = 30;
pub const MAX_BOOKING_MINUTES: i64 = 120;

#[derive(Debug, Clone)]
pub struct Booking {
    pub id: String,
    pub user_id: String,
    pub date: NaiveDate,
    pub start_minute: u16,
    pub end_minute: u16,
    pub duration_minutes: i64,
    pub status: BookingStatus,
    pub notes: Option<String>,
    pub created_at: NaiveDateTime,
    pub updated_at: NaiveDateTime,
}

impl Booking {
    /// Cancelled bookings stop counting toward the daily budget and toward
    /// slot occupancy; completed and no-show records still do.
    pub fn counts_toward_usage(&self) -> bool {
        self.status != BookingStatus::Cancelled
    }

    pub fn start_time(&self) -> String {
        format_hhmm(self.start_minute)
    }

    pub fn end_time(&self) -> String {
        format_hhmm(self.end_minute)
    }

    /// Wall-clock moment the booking begins, for past/future guards.
    pub fn starts_at(&self) -> NaiveDateTime {
        self.date
            .and_hms_opt(u32::from(self.start_minute) / 60, u32::from(self.start_minute) % 60, 0)
            .unwrap_or_else(|| self.date.and_hms_opt(0, 0, 0).expect("midnight is valid"))
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum BookingStatus {
    Confirmed,
    Cancelled,
    Completed,
    NoShow,
}

impl BookingStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            BookingStatus::Confirmed => "confirmed",
            BookingStatus::Cancelled => "cancelled",
            BookingStatus::Completed => "completed",
            BookingStatus::NoShow => "no_show",
        }
    }

    pub fn parse(s: &str) -> Self {
        match s {
            "cancelled" => BookingStatus::Cancelled,
            "completed" => BookingStatus::Completed,
            "no_show" => BookingStatus::NoShow,
            _ => BookingStatus::Confirmed,
        }
    }
}
