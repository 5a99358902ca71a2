pub mod admin;
pub mod availability;
pub mod bookings;
pub mod health;

use axum::http::HeaderMap;
use serde::Serialize;

use crate::errors::AppError;
use crate::models::{Booking, Role};

/// Authenticated caller identity, injected by the upstream gateway as
/// `x-user-id` / `x-user-role` headers. This boundary is trusted completely;
/// the service performs no authentication of its own.
#[derive(Debug, Clone)]
pub struct Identity {
    pub user_id: String,
    pub role: Role,
}

pub fn require_identity(headers: &HeaderMap) -> Result<Identity, AppError> {
    let user_id = headers
        .get("x-user-id")
        .and_then(|v| v.to_str().ok())
        .filter(|s| !s.is_empty())
        .ok_or(AppError::Unauthorized)?;

    let role = headers
        .get("x-user-role")
        .and_then(|v| v.to_str().ok())
        .map(Role::parse)
        .unwrap_or(Role::Member);

    Ok(Identity {
        user_id: user_id.to_string(),
        role,
    })
}

pub fn require_admin(headers: &HeaderMap) -> Result<Identity, AppError> {
    let identity = require_identity(headers)?;
    if !identity.role.is_admin() {
        return Err(AppError::Forbidden);
    }
    Ok(identity)
}

#[derive(Serialize)]
pub struct BookingResponse {
    pub id: String,
    pub user_id: String,
    pub date: String,
    pub start_time: String,
    pub end_time: String,
    pub duration_minutes: i64,
    pub status: String,
    pub notes: Option<String>,
    pub created_at: String,
    pub updated_at: String,
}

impl From<&Booking> for BookingResponse {
    fn from(b: &Booking) -> Self {
        BookingResponse {
            id: b.id.clone(),
            user_id: b.user_id.clone(),
            date: b.date.format("%Y-%m-%d").to_string(),
            start_time: b.start_time(),
            end_time: b.end_time(),
            duration_minutes: b.duration_minutes,
            status: b.status.as_str().to_string(),
            notes: b.notes.clone(),
            created_at: b.created_at.format("%Y-%m-%d %H:%M:%S").to_string(),
            updated_at: b.updated_at.format("%Y-%m-%d %H:%M:%S").to_string(),
        }
    }
}
