use chrono::{NaiveDate, NaiveDateTime};
use rusqlite::Connection;
use serde::Deserialize;

use crate::db::queries;
use crate::errors::AppError;
use crate::models::time::parse_hhmm;
use crate::models::{
    Booking, BookingStatus, PlanName, MAX_BOOKING_MINUTES, MIN_BOOKING_MINUTES,
    UNLIMITED_DAILY_MINUTES,
};
use crate::services::entitlement::resolve_entitlement;
use crate::state::AppState;

#[derive(Debug, Clone, Deserialize)]
pub struct BookingRequest {
    pub date: NaiveDate,
    pub start_time: String,
    pub end_time: String,
    pub notes: Option<String>,
}

/// Member booking path. Checks run strictly in order, first failure wins:
/// entitlement, duration, daily budget, self-overlap, slot capacity, then
/// commit. Steps after entitlement execute under the per-(user, date) and
/// per-date locks with the recheck queries and the insert inside a single
/// transaction, so a lost race surfaces as a rejection, never as a double
/// commit.
pub async fn create_booking(
    state: &AppState,
    user_id: &str,
    request: BookingRequest,
    now: NaiveDateTime,
) -> Result<Booking, AppError> {
    let user_lock = state.locks.user_date(user_id, request.date);
    let date_lock = state.locks.date(request.date);
    let _user_guard = user_lock.lock().await;
    let _date_guard = date_lock.lock().await;

    let mut conn = state.db.lock().unwrap();
    let tx = conn.transaction().map_err(AppError::Database)?;

    let entitlement = resolve_entitlement(&tx, user_id, now.date())?.ok_or_else(|| {
        AppError::entitlement("no_active_plan", "you need an active plan to book a slot")
    })?;
    if entitlement.plan_name == PlanName::Online || entitlement.max_daily_minutes == 0 {
        return Err(AppError::entitlement(
            "plan_excludes_booking",
            "your plan does not include in-person booking",
        ));
    }

    let (start_minute, end_minute, duration_minutes) =
        validate_times(&request.start_time, &request.end_time)?;

    if entitlement.max_daily_minutes < UNLIMITED_DAILY_MINUTES {
        let booked = queries::daily_booked_minutes(&tx, user_id, request.date)?;
        if booked + duration_minutes > entitlement.max_daily_minutes {
            let remaining = (entitlement.max_daily_minutes - booked).max(0);
            return Err(AppError::Entitlement {
                code: "daily_limit_exceeded",
                message: format!(
                    "daily limit reached: {remaining} minutes remaining on your plan"
                ),
                remaining_minutes: Some(remaining),
            });
        }
    }

    check_overlap_and_capacity(&tx, user_id, request.date, start_minute, end_minute)?;

    let booking = new_confirmed(user_id, &request, start_minute, end_minute, duration_minutes);
    queries::create_booking(&tx, &booking)?;
    tx.commit().map_err(AppError::Database)?;

    tracing::info!(
        booking_id = %booking.id,
        user_id = %booking.user_id,
        date = %booking.date,
        start = %booking.start_time(),
        "booking confirmed"
    );
    Ok(booking)
}

/// Admin booking path: plan entitlement and daily budget are deliberately
/// skipped, but the target user must exist and time math and physical
/// capacity still apply.
pub async fn create_admin_booking(
    state: &AppState,
    target_user_id: &str,
    request: BookingRequest,
) -> Result<Booking, AppError> {
    let user_lock = state.locks.user_date(target_user_id, request.date);
    let date_lock = state.locks.date(request.date);
    let _user_guard = user_lock.lock().await;
    let _date_guard = date_lock.lock().await;

    let mut conn = state.db.lock().unwrap();
    let tx = conn.transaction().map_err(AppError::Database)?;

    if queries::get_user(&tx, target_user_id)?.is_none() {
        return Err(AppError::NotFound(format!("user {target_user_id}")));
    }

    let (start_minute, end_minute, duration_minutes) =
        validate_times(&request.start_time, &request.end_time)?;

    check_overlap_and_capacity(&tx, target_user_id, request.date, start_minute, end_minute)?;

    let booking = new_confirmed(
        target_user_id,
        &request,
        start_minute,
        end_minute,
        duration_minutes,
    );
    queries::create_booking(&tx, &booking)?;
    tx.commit().map_err(AppError::Database)?;

    tracing::info!(
        booking_id = %booking.id,
        user_id = %booking.user_id,
        date = %booking.date,
        "admin booking confirmed"
    );
    Ok(booking)
}

/// Member cancellation: ownership required (missing and not-owned are both
/// reported as not found), already-cancelled and past bookings rejected.
pub async fn cancel_booking(
    state: &AppState,
    booking_id: &str,
    requester_id: &str,
    now: NaiveDateTime,
) -> Result<Booking, AppError> {
    let conn = state.db.lock().unwrap();

    let booking = queries::get_booking(&conn, booking_id)?
        .filter(|b| b.user_id == requester_id)
        .ok_or_else(|| AppError::NotFound(format!("booking {booking_id}")))?;

    if booking.status == BookingStatus::Cancelled {
        return Err(AppError::invalid_state(
            "already_cancelled",
            "this booking is already cancelled",
        ));
    }
    if booking.starts_at() <= now {
        return Err(AppError::invalid_state(
            "booking_in_past",
            "past bookings cannot be cancelled",
        ));
    }

    queries::cancel_booking(&conn, booking_id)?;
    tracing::info!(booking_id = %booking_id, user_id = %requester_id, "booking cancelled");

    Ok(Booking {
        status: BookingStatus::Cancelled,
        ..booking
    })
}

/// Admin cancellation: no ownership or past-booking guard, but cancelling
/// twice is still a reported error, not a silent success.
pub async fn cancel_booking_admin(
    state: &AppState,
    booking_id: &str,
) -> Result<Booking, AppError> {
    let conn = state.db.lock().unwrap();

    let booking = queries::get_booking(&conn, booking_id)?
        .ok_or_else(|| AppError::NotFound(format!("booking {booking_id}")))?;

    if booking.status == BookingStatus::Cancelled {
        return Err(AppError::invalid_state(
            "already_cancelled",
            "this booking is already cancelled",
        ));
    }

    queries::cancel_booking(&conn, booking_id)?;
    tracing::info!(booking_id = %booking_id, "booking cancelled by admin");

    Ok(Booking {
        status: BookingStatus::Cancelled,
        ..booking
    })
}

fn validate_times(start_time: &str, end_time: &str) -> Result<(u16, u16, i64), AppError> {
    let start_minute = parse_hhmm(start_time)?;
    let end_minute = parse_hhmm(end_time)?;

    let duration_minutes = i64::from(end_minute) - i64::from(start_minute);
    if duration_minutes < MIN_BOOKING_MINUTES || duration_minutes > MAX_BOOKING_MINUTES {
        return Err(AppError::validation(
            "invalid_duration",
            "bookings must run between 30 minutes and 2 hours",
        ));
    }
    Ok((start_minute, end_minute, duration_minutes))
}

fn check_overlap_and_capacity(
    conn: &Connection,
    user_id: &str,
    date: NaiveDate,
    start_minute: u16,
    end_minute: u16,
) -> Result<(), AppError> {
    if let Some(existing) = queries::find_overlap(conn, user_id, date, start_minute, end_minute)? {
        return Err(AppError::Conflict {
            code: "overlapping_booking",
            message: "you already have a booking in that window".to_string(),
            booking_id: Some(existing.id),
        });
    }

    let settings = queries::get_settings(conn)?;
    let occupancy = queries::occupancy_at(conn, date, start_minute)?;
    if occupancy >= settings.max_capacity_per_slot {
        return Err(AppError::conflict(
            "slot_full",
            "that slot is no longer available",
        ));
    }
    Ok(())
}

fn new_confirmed(
    user_id: &str,
    request: &BookingRequest,
    start_minute: u16,
    end_minute: u16,
    duration_minutes: i64,
) -> Booking {
    let now = chrono::Utc::now().naive_utc();
    Booking {
        id: uuid::Uuid::new_v4().to_string(),
        user_id: user_id.to_string(),
        date: request.date,
        start_minute,
        end_minute,
        duration_minutes,
        status: BookingStatus::Confirmed,
        notes: request.notes.clone(),
        created_at: now,
        updated_at: now,
    }
}
