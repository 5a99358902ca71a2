pub mod config;
pub mod db;
pub mod errors;
pub mod handlers;
pub mod models;
pub mod services;
pub mod state;

use std::sync::Arc;

use axum::routing::{delete, get, post, put};
use axum::Router;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

use crate::state::AppState;

pub fn app(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/health", get(handlers::health::health))
        .route(
            "/api/availability/:date",
            get(handlers::availability::get_availability),
        )
        .route("/api/bookings/me", get(handlers::bookings::get_my_bookings))
        .route("/api/bookings", post(handlers::bookings::create_booking))
        .route(
            "/api/bookings/:id",
            delete(handlers::bookings::cancel_booking),
        )
        .route(
            "/api/bookings/daily-minutes/:date",
            get(handlers::bookings::get_daily_minutes),
        )
        .route(
            "/api/subscriptions/me",
            get(handlers::bookings::get_my_subscription),
        )
        .route("/api/admin/settings", get(handlers::admin::get_settings))
        .route("/api/admin/settings", put(handlers::admin::update_settings))
        .route("/api/admin/holidays", get(handlers::admin::list_holidays))
        .route("/api/admin/holidays", post(handlers::admin::create_holiday))
        .route(
            "/api/admin/holidays/:id",
            delete(handlers::admin::delete_holiday),
        )
        .route("/api/admin/bookings", get(handlers::admin::list_bookings))
        .route("/api/admin/bookings", post(handlers::admin::create_booking))
        .route(
            "/api/admin/bookings/:id",
            delete(handlers::admin::cancel_booking),
        )
        .route("/api/admin/plans", get(handlers::admin::list_plans))
        .route(
            "/api/admin/subscriptions",
            post(handlers::admin::assign_subscription),
        )
        .route("/api/admin/users", post(handlers::admin::create_user))
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(state)
}
