use chrono::NaiveDate;
use rusqlite::Connection;
use serde::Serialize;

use crate::db::queries;
use crate::models::time::format_hhmm;

#[derive(Debug, Serialize)]
pub struct SlotAvailability {
    pub time: String,
    pub capacity_remaining: i64,
    pub is_available: bool,
}

#[derive(Debug, Serialize)]
pub struct DayAvailability {
    pub date: NaiveDate,
    pub closed: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
    pub slots: Vec<SlotAvailability>,
}

/// Computes the bookable slots for a date: closed-day short circuit, then
/// one candidate per slot-duration increment within operating hours, each
/// annotated with remaining capacity.
///
/// Capacity is keyed by start time only: two bookings that overlap in real
/// time but start in different slots draw from different counters. See
/// DESIGN.md for why this approximation is kept.
pub fn available_slots(conn: &Connection, date: NaiveDate) -> anyhow::Result<DayAvailability> {
    let settings = queries::get_settings(conn)?;

    if settings.is_closed_weekday(date) {
        return Ok(DayAvailability {
            date,
            closed: true,
            reason: Some("the gym is closed on this weekday".to_string()),
            slots: vec![],
        });
    }

    if let Some(holiday) = queries::holiday_on(conn, date)? {
        return Ok(DayAvailability {
            date,
            closed: true,
            reason: Some(format!("closed for holiday: {}", holiday.name)),
            slots: vec![],
        });
    }

    let occupancy = queries::slot_occupancy(conn, date)?;
    let step = settings.slot_duration_minutes.max(1);

    let mut slots = vec![];
    let mut start = settings.open_minute;
    while start < settings.close_minute {
        let used = occupancy.get(&start).copied().unwrap_or(0);
        let capacity_remaining = (settings.max_capacity_per_slot - used).max(0);
        slots.push(SlotAvailability {
            time: format_hhmm(start),
            capacity_remaining,
            is_available: capacity_remaining > 0,
        });
        start += step;
    }

    Ok(DayAvailability {
        date,
        closed: false,
        reason: None,
        slots,
    })
}
