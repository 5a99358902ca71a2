use std::sync::{Arc, Mutex};

use axum::body::Body;
use axum::http::{Request, StatusCode};
use axum::Router;
use tower::ServiceExt;

use gymbook::config::AppConfig;
use gymbook::db;
use gymbook::services::locks::LockMap;
use gymbook::state::AppState;

// ── Helpers ──

fn test_state() -> Arc<AppState> {
    let conn = db::init_db(":memory:").unwrap();
    Arc::new(AppState {
        db: Arc::new(Mutex::new(conn)),
        config: AppConfig {
            port: 3000,
            database_url: ":memory:".to_string(),
        },
        locks: LockMap::new(),
    })
}

fn test_app() -> Router {
    gymbook::app(test_state())
}

async fn send(
    app: &Router,
    method: &str,
    uri: &str,
    identity: Option<(&str, &str)>,
    body: Option<serde_json::Value>,
) -> (StatusCode, serde_json::Value) {
    let mut request = Request::builder().method(method).uri(uri);
    if let Some((user_id, role)) = identity {
        request = request
            .header("x-user-id", user_id)
            .header("x-user-role", role);
    }

    let request = match body {
        Some(body) => request
            .header("content-type", "application/json")
            .body(Body::from(body.to_string()))
            .unwrap(),
        None => request.body(Body::empty()).unwrap(),
    };

    let response = app.clone().oneshot(request).await.unwrap();
    let status = response.status();
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    let json = if bytes.is_empty() {
        serde_json::json!(null)
    } else {
        serde_json::from_slice(&bytes).unwrap()
    };
    (status, json)
}

async fn register_member(app: &Router, user_id: &str, plan: &str) {
    let (status, _) = send(
        app,
        "POST",
        "/api/admin/users",
        Some(("admin-1", "admin")),
        Some(serde_json::json!({
            "id": user_id,
            "name": format!("User {user_id}"),
            "email": format!("{user_id}@example.com"),
        })),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);

    let (status, _) = send(
        app,
        "POST",
        "/api/admin/subscriptions",
        Some(("admin-1", "admin")),
        Some(serde_json::json!({
            "user_id": user_id,
            "plan_name": plan,
            "end_date": "2030-01-01",
        })),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
}

fn error_code(body: &serde_json::Value) -> &str {
    body["error"]["code"].as_str().unwrap_or("")
}

// ── Identity boundary ──

#[tokio::test]
async fn test_missing_identity_is_unauthorized() {
    let app = test_app();
    let (status, body) = send(&app, "GET", "/api/availability/2025-06-16", None, None).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(error_code(&body), "unauthorized");
}

#[tokio::test]
async fn test_member_cannot_reach_admin_routes() {
    let app = test_app();
    let (status, _) = send(
        &app,
        "GET",
        "/api/admin/settings",
        Some(("u1", "member")),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::FORBIDDEN);
}

// ── Availability ──

#[tokio::test]
async fn test_sunday_availability_is_closed() {
    let app = test_app();
    // 2025-06-15 is a Sunday; closed_weekdays defaults to [0].
    let (status, body) = send(
        &app,
        "GET",
        "/api/availability/2025-06-15",
        Some(("u1", "member")),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["closed"], true);
    assert!(body["slots"].as_array().unwrap().is_empty());
}

#[tokio::test]
async fn test_holiday_closes_the_day() {
    let app = test_app();
    let (status, _) = send(
        &app,
        "POST",
        "/api/admin/holidays",
        Some(("admin-1", "admin")),
        Some(serde_json::json!({
            "date": "2025-06-16",
            "name": "Founders Day",
        })),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);

    let (_, body) = send(
        &app,
        "GET",
        "/api/availability/2025-06-16",
        Some(("u1", "member")),
        None,
    )
    .await;
    assert_eq!(body["closed"], true);
    assert!(body["reason"].as_str().unwrap().contains("Founders Day"));
}

#[tokio::test]
async fn test_duplicate_holiday_rejected() {
    let app = test_app();
    let holiday = serde_json::json!({ "date": "2025-12-25", "name": "Christmas" });
    let (status, _) = send(
        &app,
        "POST",
        "/api/admin/holidays",
        Some(("admin-1", "admin")),
        Some(holiday.clone()),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);

    let (status, body) = send(
        &app,
        "POST",
        "/api/admin/holidays",
        Some(("admin-1", "admin")),
        Some(holiday),
    )
    .await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(error_code(&body), "holiday_exists");
}

#[tokio::test]
async fn test_booking_reduces_reported_capacity_by_one() {
    let app = test_app();
    register_member(&app, "u1", "classic").await;

    let before = send(
        &app,
        "GET",
        "/api/availability/2025-06-16",
        Some(("u1", "member")),
        None,
    )
    .await
    .1;
    let slot_before = before["slots"]
        .as_array()
        .unwrap()
        .iter()
        .find(|s| s["time"] == "09:00")
        .unwrap()
        .clone();

    let (status, _) = send(
        &app,
        "POST",
        "/api/bookings",
        Some(("u1", "member")),
        Some(serde_json::json!({
            "date": "2025-06-16",
            "start_time": "09:00",
            "end_time": "10:00",
        })),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);

    let after = send(
        &app,
        "GET",
        "/api/availability/2025-06-16",
        Some(("u1", "member")),
        None,
    )
    .await
    .1;
    let slot_after = after["slots"]
        .as_array()
        .unwrap()
        .iter()
        .find(|s| s["time"] == "09:00")
        .unwrap()
        .clone();

    assert_eq!(
        slot_after["capacity_remaining"].as_i64().unwrap(),
        slot_before["capacity_remaining"].as_i64().unwrap() - 1
    );
}

// ── Booking policy ──

#[tokio::test]
async fn test_booking_without_plan_is_forbidden() {
    let app = test_app();
    let (status, _) = send(
        &app,
        "POST",
        "/api/admin/users",
        Some(("admin-1", "admin")),
        Some(serde_json::json!({
            "id": "u1", "name": "Ana", "email": "ana@example.com",
        })),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);

    let (status, body) = send(
        &app,
        "POST",
        "/api/bookings",
        Some(("u1", "member")),
        Some(serde_json::json!({
            "date": "2025-06-16",
            "start_time": "09:00",
            "end_time": "10:00",
        })),
    )
    .await;
    assert_eq!(status, StatusCode::FORBIDDEN);
    assert_eq!(error_code(&body), "no_active_plan");
}

#[tokio::test]
async fn test_online_plan_booking_is_forbidden() {
    let app = test_app();
    register_member(&app, "u1", "online").await;

    let (status, body) = send(
        &app,
        "POST",
        "/api/bookings",
        Some(("u1", "member")),
        Some(serde_json::json!({
            "date": "2025-06-16",
            "start_time": "09:00",
            "end_time": "10:00",
        })),
    )
    .await;
    assert_eq!(status, StatusCode::FORBIDDEN);
    assert_eq!(error_code(&body), "plan_excludes_booking");
}

#[tokio::test]
async fn test_classic_daily_limit_reports_remaining_minutes() {
    let app = test_app();
    register_member(&app, "u1", "classic").await;

    let (status, _) = send(
        &app,
        "POST",
        "/api/bookings",
        Some(("u1", "member")),
        Some(serde_json::json!({
            "date": "2025-06-16",
            "start_time": "09:00",
            "end_time": "10:00",
        })),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);

    let (status, body) = send(
        &app,
        "POST",
        "/api/bookings",
        Some(("u1", "member")),
        Some(serde_json::json!({
            "date": "2025-06-16",
            "start_time": "10:00",
            "end_time": "11:30",
        })),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(error_code(&body), "daily_limit_exceeded");
    assert_eq!(body["error"]["remaining_minutes"], 60);
}

#[tokio::test]
async fn test_invalid_duration_rejected() {
    let app = test_app();
    register_member(&app, "u1", "classic").await;

    let (status, body) = send(
        &app,
        "POST",
        "/api/bookings",
        Some(("u1", "member")),
        Some(serde_json::json!({
            "date": "2025-06-16",
            "start_time": "09:00",
            "end_time": "09:10",
        })),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(error_code(&body), "invalid_duration");
}

#[tokio::test]
async fn test_overlap_rejected_with_conflicting_booking_id() {
    let app = test_app();
    register_member(&app, "u1", "premium").await;

    let (_, created) = send(
        &app,
        "POST",
        "/api/bookings",
        Some(("u1", "member")),
        Some(serde_json::json!({
            "date": "2025-06-16",
            "start_time": "09:00",
            "end_time": "10:00",
        })),
    )
    .await;

    let (status, body) = send(
        &app,
        "POST",
        "/api/bookings",
        Some(("u1", "member")),
        Some(serde_json::json!({
            "date": "2025-06-16",
            "start_time": "09:30",
            "end_time": "10:30",
        })),
    )
    .await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(error_code(&body), "overlapping_booking");
    assert_eq!(body["error"]["booking_id"], created["id"]);
}

#[tokio::test]
async fn test_capacity_race_admits_exactly_one() {
    let app = test_app();
    register_member(&app, "u1", "classic").await;
    register_member(&app, "u2", "classic").await;

    let (status, _) = send(
        &app,
        "PUT",
        "/api/admin/settings",
        Some(("admin-1", "admin")),
        Some(serde_json::json!({ "max_capacity_per_slot": 1 })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);

    let booking = |user: &'static str| {
        let app = app.clone();
        async move {
            send(
                &app,
                "POST",
                "/api/bookings",
                Some((user, "member")),
                Some(serde_json::json!({
                    "date": "2025-06-16",
                    "start_time": "08:00",
                    "end_time": "08:30",
                })),
            )
            .await
        }
    };

    let (a, b) = tokio::join!(booking("u1"), booking("u2"));
    let statuses = [a.0, b.0];
    assert_eq!(
        statuses.iter().filter(|s| **s == StatusCode::CREATED).count(),
        1
    );

    let loser = if a.0 == StatusCode::CREATED { b } else { a };
    assert_eq!(loser.0, StatusCode::CONFLICT);
    assert_eq!(error_code(&loser.1), "slot_full");
}

// ── Cancellation ──

#[tokio::test]
async fn test_cancel_future_booking_frees_budget() {
    let app = test_app();
    register_member(&app, "u1", "classic").await;

    let (_, created) = send(
        &app,
        "POST",
        "/api/bookings",
        Some(("u1", "member")),
        Some(serde_json::json!({
            "date": "2030-06-17",
            "start_time": "09:00",
            "end_time": "11:00",
        })),
    )
    .await;
    let id = created["id"].as_str().unwrap().to_string();

    let (status, body) = send(
        &app,
        "DELETE",
        &format!("/api/bookings/{id}"),
        Some(("u1", "member")),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "cancelled");

    let (_, minutes) = send(
        &app,
        "GET",
        "/api/bookings/daily-minutes/2030-06-17",
        Some(("u1", "member")),
        None,
    )
    .await;
    assert_eq!(minutes["booked_minutes"], 0);

    // Cancelling again is a reported state error, not a silent success.
    let (status, body) = send(
        &app,
        "DELETE",
        &format!("/api/bookings/{id}"),
        Some(("u1", "member")),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(error_code(&body), "already_cancelled");
}

#[tokio::test]
async fn test_cancel_past_booking_rejected_for_member_allowed_for_admin() {
    let app = test_app();
    register_member(&app, "u1", "classic").await;

    // Admin creates a booking in the past; the member cannot cancel it.
    let (status, created) = send(
        &app,
        "POST",
        "/api/admin/bookings",
        Some(("admin-1", "admin")),
        Some(serde_json::json!({
            "user_id": "u1",
            "date": "2020-01-06",
            "start_time": "09:00",
            "end_time": "10:00",
        })),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
    let id = created["id"].as_str().unwrap().to_string();

    let (status, body) = send(
        &app,
        "DELETE",
        &format!("/api/bookings/{id}"),
        Some(("u1", "member")),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(error_code(&body), "booking_in_past");

    let (status, _) = send(
        &app,
        "DELETE",
        &format!("/api/admin/bookings/{id}"),
        Some(("admin-1", "admin")),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::OK);
}

#[tokio::test]
async fn test_cancel_unknown_booking_is_404() {
    let app = test_app();
    register_member(&app, "u1", "classic").await;

    let (status, _) = send(
        &app,
        "DELETE",
        "/api/bookings/no-such-id",
        Some(("u1", "member")),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

// ── Admin surface ──

#[tokio::test]
async fn test_settings_update_merges_only_provided_fields() {
    let app = test_app();

    let (status, updated) = send(
        &app,
        "PUT",
        "/api/admin/settings",
        Some(("admin-1", "admin")),
        Some(serde_json::json!({ "open_time": "07:00" })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(updated["open_time"], "07:00");
    // Everything else keeps its default.
    assert_eq!(updated["close_time"], "22:00");
    assert_eq!(updated["max_capacity_per_slot"], 50);
    assert_eq!(updated["updated_by"], "admin-1");
}

#[tokio::test]
async fn test_settings_rejects_zero_capacity() {
    let app = test_app();
    let (status, body) = send(
        &app,
        "PUT",
        "/api/admin/settings",
        Some(("admin-1", "admin")),
        Some(serde_json::json!({ "max_capacity_per_slot": 0 })),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(error_code(&body), "invalid_capacity");
}

#[tokio::test]
async fn test_admin_booking_skips_entitlement() {
    let app = test_app();
    // User exists but has no subscription at all.
    let (status, _) = send(
        &app,
        "POST",
        "/api/admin/users",
        Some(("admin-1", "admin")),
        Some(serde_json::json!({
            "id": "u1", "name": "Ana", "email": "ana@example.com",
        })),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);

    let (status, body) = send(
        &app,
        "POST",
        "/api/admin/bookings",
        Some(("admin-1", "admin")),
        Some(serde_json::json!({
            "user_id": "u1",
            "date": "2030-06-17",
            "start_time": "09:00",
            "end_time": "10:00",
        })),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(body["status"], "confirmed");
    assert_eq!(body["user_id"], "u1");
}

#[tokio::test]
async fn test_admin_booking_for_unknown_user_is_404() {
    let app = test_app();
    let (status, _) = send(
        &app,
        "POST",
        "/api/admin/bookings",
        Some(("admin-1", "admin")),
        Some(serde_json::json!({
            "user_id": "ghost",
            "date": "2030-06-17",
            "start_time": "09:00",
            "end_time": "10:00",
        })),
    )
    .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_subscription_reassignment_supersedes_prior_plan() {
    let app = test_app();
    register_member(&app, "u1", "classic").await;

    // Upgrade to premium; the classic subscription must stop counting.
    let (status, _) = send(
        &app,
        "POST",
        "/api/admin/subscriptions",
        Some(("admin-1", "admin")),
        Some(serde_json::json!({
            "user_id": "u1",
            "plan_name": "premium",
            "end_date": "2030-01-01",
        })),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);

    let (_, body) = send(
        &app,
        "GET",
        "/api/subscriptions/me",
        Some(("u1", "member")),
        None,
    )
    .await;
    assert_eq!(body["subscription"]["plan"]["name"], "premium");
    assert_eq!(body["subscription"]["status"], "current");

    // Premium budget applies now: three hours in a day is fine.
    for (start, end) in [("06:00", "08:00"), ("09:00", "10:00")] {
        let (status, _) = send(
            &app,
            "POST",
            "/api/bookings",
            Some(("u1", "member")),
            Some(serde_json::json!({
                "date": "2025-06-16",
                "start_time": start,
                "end_time": end,
            })),
        )
        .await;
        assert_eq!(status, StatusCode::CREATED);
    }
}

#[tokio::test]
async fn test_plans_are_seeded_with_fixed_allowances() {
    let app = test_app();
    let (status, body) = send(
        &app,
        "GET",
        "/api/admin/plans",
        Some(("admin-1", "admin")),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::OK);

    let plans = body.as_array().unwrap();
    assert_eq!(plans.len(), 3);
    let allowance = |name: &str| {
        plans
            .iter()
            .find(|p| p["name"] == name)
            .unwrap()["max_daily_minutes"]
            .as_i64()
            .unwrap()
    };
    assert_eq!(allowance("classic"), 120);
    assert_eq!(allowance("premium"), 1440);
    assert_eq!(allowance("online"), 0);
}
