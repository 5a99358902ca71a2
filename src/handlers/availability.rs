use std::sync::Arc;

use axum::extract::{Path, State};
use axum::http::HeaderMap;
use axum::Json;
use chrono::NaiveDate;

use crate::errors::AppError;
use crate::handlers::require_identity;
use crate::services::availability::{available_slots, DayAvailability};
use crate::state::AppState;

// GET /api/availability/:date
pub async fn get_availability(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Path(date): Path<String>,
) -> Result<Json<DayAvailability>, AppError> {
    require_identity(&headers)?;

    let date = NaiveDate::parse_from_str(&date, "%Y-%m-%d")
        .map_err(|_| AppError::validation("invalid_date", format!("invalid date: {date}")))?;

    let conn = state.db.lock().unwrap();
    Ok(Json(available_slots(&conn, date)?))
}
