use std::sync::Arc;

use axum::extract::{Path, Query, State};
use axum::http::{HeaderMap, StatusCode};
use axum::Json;
use chrono::NaiveDate;
use serde::Deserialize;

use crate::db::queries;
use crate::errors::AppError;
use crate::handlers::{require_identity, BookingResponse};
use crate::services::booking::{self, BookingRequest};
use crate::state::AppState;

// GET /api/bookings/me
#[derive(Deserialize)]
pub struct MyBookingsQuery {
    pub start_date: Option<NaiveDate>,
    pub end_date: Option<NaiveDate>,
}

pub async fn get_my_bookings(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Query(query): Query<MyBookingsQuery>,
) -> Result<Json<Vec<BookingResponse>>, AppError> {
    let identity = require_identity(&headers)?;

    let range = match (query.start_date, query.end_date) {
        (Some(from), Some(to)) => Some((from, to)),
        _ => None,
    };

    let bookings = {
        let conn = state.db.lock().unwrap();
        queries::bookings_for_user(&conn, &identity.user_id, range)?
    };
    Ok(Json(bookings.iter().map(BookingResponse::from).collect()))
}

// POST /api/bookings
pub async fn create_booking(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Json(request): Json<BookingRequest>,
) -> Result<(StatusCode, Json<BookingResponse>), AppError> {
    let identity = require_identity(&headers)?;
    let now = chrono::Utc::now().naive_utc();

    let booking = booking::create_booking(&state, &identity.user_id, request, now).await?;
    Ok((StatusCode::CREATED, Json(BookingResponse::from(&booking))))
}

// DELETE /api/bookings/:id
pub async fn cancel_booking(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Path(id): Path<String>,
) -> Result<Json<BookingResponse>, AppError> {
    let identity = require_identity(&headers)?;
    let now = chrono::Utc::now().naive_utc();

    let booking = booking::cancel_booking(&state, &id, &identity.user_id, now).await?;
    Ok(Json(BookingResponse::from(&booking)))
}

// GET /api/bookings/daily-minutes/:date
#[derive(Deserialize)]
pub struct DailyMinutesQuery {
    pub user_id: Option<String>,
}

pub async fn get_daily_minutes(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Path(date): Path<String>,
    Query(query): Query<DailyMinutesQuery>,
) -> Result<Json<serde_json::Value>, AppError> {
    let identity = require_identity(&headers)?;

    let date = NaiveDate::parse_from_str(&date, "%Y-%m-%d")
        .map_err(|_| AppError::validation("invalid_date", format!("invalid date: {date}")))?;

    // Members may only see their own usage.
    let user_id = match query.user_id {
        Some(other) if other != identity.user_id => {
            if !identity.role.is_admin() {
                return Err(AppError::Forbidden);
            }
            other
        }
        _ => identity.user_id,
    };

    let minutes = {
        let conn = state.db.lock().unwrap();
        queries::daily_booked_minutes(&conn, &user_id, date)?
    };
    Ok(Json(serde_json::json!({
        "user_id": user_id,
        "date": date.format("%Y-%m-%d").to_string(),
        "booked_minutes": minutes,
    })))
}

// GET /api/subscriptions/me
pub async fn get_my_subscription(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
) -> Result<Json<serde_json::Value>, AppError> {
    let identity = require_identity(&headers)?;

    let conn = state.db.lock().unwrap();
    let Some(subscription) = queries::latest_subscription(&conn, &identity.user_id)? else {
        return Ok(Json(serde_json::json!({ "has_subscription": false })));
    };
    let plan = queries::get_plan(&conn, &subscription.plan_id)?;

    Ok(Json(serde_json::json!({
        "has_subscription": true,
        "subscription": {
            "id": subscription.id,
            "status": subscription.status.as_str(),
            "start_date": subscription.start_date.format("%Y-%m-%d").to_string(),
            "end_date": subscription.end_date.format("%Y-%m-%d").to_string(),
            "active": subscription.is_active(chrono::Utc::now().date_naive()),
            "plan": plan.map(|p| serde_json::json!({
                "name": p.name.as_str(),
                "display_name": p.display_name,
                "max_daily_minutes": p.max_daily_minutes,
            })),
        },
    })))
}
