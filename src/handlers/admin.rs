use std::sync::Arc;

use axum::extract::{Path, Query, State};
use axum::http::{HeaderMap, StatusCode};
use axum::Json;
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::db::queries;
use crate::errors::AppError;
use crate::handlers::{require_admin, BookingResponse};
use crate::models::time::parse_hhmm;
use crate::models::{
    BookingStatus, GymSettings, Holiday, PlanName, Role, SettingsUpdate, Subscription,
    SubscriptionStatus, User,
};
use crate::services::booking::{self, BookingRequest};
use crate::state::AppState;

// ── Gym settings ──

#[derive(Serialize)]
pub struct SettingsResponse {
    pub open_time: String,
    pub close_time: String,
    pub closed_weekdays: Vec<u8>,
    pub slot_duration_minutes: u16,
    pub max_capacity_per_slot: i64,
    pub updated_by: Option<String>,
}

impl From<&GymSettings> for SettingsResponse {
    fn from(s: &GymSettings) -> Self {
        SettingsResponse {
            open_time: s.open_time(),
            close_time: s.close_time(),
            closed_weekdays: s.closed_weekdays.clone(),
            slot_duration_minutes: s.slot_duration_minutes,
            max_capacity_per_slot: s.max_capacity_per_slot,
            updated_by: s.updated_by.clone(),
        }
    }
}

// GET /api/admin/settings
pub async fn get_settings(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
) -> Result<Json<SettingsResponse>, AppError> {
    require_admin(&headers)?;

    let conn = state.db.lock().unwrap();
    let settings = queries::get_settings(&conn)?;
    Ok(Json(SettingsResponse::from(&settings)))
}

// PUT /api/admin/settings — merges only the provided fields.
pub async fn update_settings(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Json(update): Json<SettingsUpdate>,
) -> Result<Json<SettingsResponse>, AppError> {
    let identity = require_admin(&headers)?;

    let conn = state.db.lock().unwrap();
    let mut settings = queries::get_settings(&conn)?;

    if let Some(open_time) = &update.open_time {
        settings.open_minute = parse_hhmm(open_time)?;
    }
    if let Some(close_time) = &update.close_time {
        settings.close_minute = parse_hhmm(close_time)?;
    }
    if let Some(closed_weekdays) = update.closed_weekdays {
        if closed_weekdays.iter().any(|d| *d > 6) {
            return Err(AppError::validation(
                "invalid_weekday",
                "closed weekdays must be 0 (Sunday) through 6 (Saturday)",
            ));
        }
        settings.closed_weekdays = closed_weekdays;
    }
    if let Some(slot_duration) = update.slot_duration_minutes {
        if slot_duration < 5 {
            return Err(AppError::validation(
                "invalid_slot_duration",
                "slot duration must be at least 5 minutes",
            ));
        }
        settings.slot_duration_minutes = slot_duration;
    }
    if let Some(capacity) = update.max_capacity_per_slot {
        if capacity < 1 {
            return Err(AppError::validation(
                "invalid_capacity",
                "capacity per slot must be at least 1",
            ));
        }
        settings.max_capacity_per_slot = capacity;
    }
    if settings.open_minute > settings.close_minute {
        return Err(AppError::validation(
            "invalid_hours",
            "opening time must not be after closing time",
        ));
    }

    settings.updated_by = Some(identity.user_id.clone());
    queries::save_settings(&conn, &settings)?;
    tracing::info!(updated_by = %identity.user_id, "gym settings updated");

    let settings = queries::get_settings(&conn)?;
    Ok(Json(SettingsResponse::from(&settings)))
}

// ── Holidays ──

#[derive(Serialize)]
pub struct HolidayResponse {
    pub id: String,
    pub date: String,
    pub name: String,
    pub description: Option<String>,
}

impl From<&Holiday> for HolidayResponse {
    fn from(h: &Holiday) -> Self {
        HolidayResponse {
            id: h.id.clone(),
            date: h.date.format("%Y-%m-%d").to_string(),
            name: h.name.clone(),
            description: h.description.clone(),
        }
    }
}

#[derive(Deserialize)]
pub struct HolidaysQuery {
    pub from: Option<NaiveDate>,
}

// GET /api/admin/holidays
pub async fn list_holidays(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Query(query): Query<HolidaysQuery>,
) -> Result<Json<Vec<HolidayResponse>>, AppError> {
    require_admin(&headers)?;

    let conn = state.db.lock().unwrap();
    let holidays = queries::list_holidays(&conn, query.from)?;
    Ok(Json(holidays.iter().map(HolidayResponse::from).collect()))
}

#[derive(Deserialize)]
pub struct CreateHolidayRequest {
    pub date: NaiveDate,
    pub name: String,
    pub description: Option<String>,
}

// POST /api/admin/holidays
pub async fn create_holiday(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Json(request): Json<CreateHolidayRequest>,
) -> Result<(StatusCode, Json<HolidayResponse>), AppError> {
    let identity = require_admin(&headers)?;

    let conn = state.db.lock().unwrap();
    if queries::holiday_on(&conn, request.date)?.is_some() {
        return Err(AppError::conflict(
            "holiday_exists",
            "a holiday already exists on that date",
        ));
    }

    let holiday = Holiday {
        id: uuid::Uuid::new_v4().to_string(),
        date: request.date,
        name: request.name,
        description: request.description,
        created_by: Some(identity.user_id),
        created_at: chrono::Utc::now().naive_utc(),
    };
    queries::create_holiday(&conn, &holiday)?;
    tracing::info!(date = %holiday.date, name = %holiday.name, "holiday added");

    Ok((StatusCode::CREATED, Json(HolidayResponse::from(&holiday))))
}

// DELETE /api/admin/holidays/:id
pub async fn delete_holiday(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Path(id): Path<String>,
) -> Result<Json<serde_json::Value>, AppError> {
    require_admin(&headers)?;

    let conn = state.db.lock().unwrap();
    if !queries::delete_holiday(&conn, &id)? {
        return Err(AppError::NotFound(format!("holiday {id}")));
    }
    Ok(Json(serde_json::json!({ "ok": true })))
}

// ── Bookings ──

#[derive(Deserialize)]
pub struct AdminBookingsQuery {
    pub date: Option<NaiveDate>,
    pub user_id: Option<String>,
    pub status: Option<String>,
}

// GET /api/admin/bookings
pub async fn list_bookings(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Query(query): Query<AdminBookingsQuery>,
) -> Result<Json<Vec<BookingResponse>>, AppError> {
    require_admin(&headers)?;

    let status = query.status.as_deref().map(BookingStatus::parse);
    let bookings = {
        let conn = state.db.lock().unwrap();
        queries::list_bookings(&conn, query.date, query.user_id.as_deref(), status)?
    };
    Ok(Json(bookings.iter().map(BookingResponse::from).collect()))
}

#[derive(Deserialize)]
pub struct AdminBookingRequest {
    pub user_id: String,
    pub date: NaiveDate,
    pub start_time: String,
    pub end_time: String,
    pub notes: Option<String>,
}

// POST /api/admin/bookings
pub async fn create_booking(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Json(request): Json<AdminBookingRequest>,
) -> Result<(StatusCode, Json<BookingResponse>), AppError> {
    require_admin(&headers)?;

    let booking = booking::create_admin_booking(
        &state,
        &request.user_id,
        BookingRequest {
            date: request.date,
            start_time: request.start_time,
            end_time: request.end_time,
            notes: request.notes,
        },
    )
    .await?;
    Ok((StatusCode::CREATED, Json(BookingResponse::from(&booking))))
}

// DELETE /api/admin/bookings/:id
pub async fn cancel_booking(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Path(id): Path<String>,
) -> Result<Json<BookingResponse>, AppError> {
    require_admin(&headers)?;

    let booking = booking::cancel_booking_admin(&state, &id).await?;
    Ok(Json(BookingResponse::from(&booking)))
}

// ── Plans and subscriptions ──

// GET /api/admin/plans
pub async fn list_plans(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
) -> Result<Json<serde_json::Value>, AppError> {
    require_admin(&headers)?;

    let conn = state.db.lock().unwrap();
    let plans = queries::list_plans(&conn)?;
    Ok(Json(serde_json::json!(plans)))
}

#[derive(Deserialize)]
pub struct AssignSubscriptionRequest {
    pub user_id: String,
    pub plan_name: String,
    pub end_date: NaiveDate,
    pub start_date: Option<NaiveDate>,
    pub status: Option<String>,
    pub notes: Option<String>,
}

// POST /api/admin/subscriptions — supersedes any prior current subscription.
pub async fn assign_subscription(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Json(request): Json<AssignSubscriptionRequest>,
) -> Result<(StatusCode, Json<serde_json::Value>), AppError> {
    require_admin(&headers)?;

    let plan_name = PlanName::parse(&request.plan_name).ok_or_else(|| {
        AppError::validation("invalid_plan", format!("unknown plan: {}", request.plan_name))
    })?;

    let mut conn = state.db.lock().unwrap();
    if queries::get_user(&conn, &request.user_id)?.is_none() {
        return Err(AppError::NotFound(format!("user {}", request.user_id)));
    }
    let plan = queries::get_plan_by_name(&conn, plan_name)?
        .ok_or_else(|| AppError::NotFound(format!("plan {}", request.plan_name)))?;

    let today = chrono::Utc::now().date_naive();
    let subscription = Subscription {
        id: uuid::Uuid::new_v4().to_string(),
        user_id: request.user_id.clone(),
        plan_id: plan.id,
        status: request
            .status
            .as_deref()
            .map(SubscriptionStatus::parse)
            .unwrap_or(SubscriptionStatus::Current),
        start_date: request.start_date.unwrap_or(today),
        end_date: request.end_date,
        last_payment_date: None,
        next_payment_date: None,
        notes: request.notes,
        created_at: chrono::Utc::now().naive_utc(),
    };
    queries::assign_subscription(&mut conn, &subscription)?;
    tracing::info!(
        user_id = %subscription.user_id,
        plan = %plan_name.as_str(),
        status = %subscription.status.as_str(),
        "subscription assigned"
    );

    Ok((
        StatusCode::CREATED,
        Json(serde_json::json!({
            "id": subscription.id,
            "user_id": subscription.user_id,
            "plan": plan_name.as_str(),
            "status": subscription.status.as_str(),
            "end_date": subscription.end_date.format("%Y-%m-%d").to_string(),
        })),
    ))
}

// ── Users ──

#[derive(Deserialize)]
pub struct CreateUserRequest {
    pub id: String,
    pub name: String,
    pub email: String,
    pub role: Option<String>,
}

// POST /api/admin/users — registers the minimal identity projection.
pub async fn create_user(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Json(request): Json<CreateUserRequest>,
) -> Result<(StatusCode, Json<serde_json::Value>), AppError> {
    require_admin(&headers)?;

    let user = User {
        id: request.id,
        name: request.name,
        email: request.email,
        role: request.role.as_deref().map(Role::parse).unwrap_or(Role::Member),
    };

    let conn = state.db.lock().unwrap();
    queries::upsert_user(&conn, &user)?;

    Ok((
        StatusCode::CREATED,
        Json(serde_json::json!({ "id": user.id, "role": user.role.as_str() })),
    ))
}
