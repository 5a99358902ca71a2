use std::collections::HashMap;

use chrono::{NaiveDate, NaiveDateTime, Utc};
use rusqlite::{params, Connection};

use crate::models::{
    Booking, BookingStatus, GymSettings, Holiday, Plan, PlanName, Subscription,
    SubscriptionStatus, User,
};

const DATE_FMT: &str = "%Y-%m-%d";
const DATETIME_FMT: &str = "%Y-%m-%d %H:%M:%S";

fn fmt_date(date: NaiveDate) -> String {
    date.format(DATE_FMT).to_string()
}

fn fmt_datetime(dt: NaiveDateTime) -> String {
    dt.format(DATETIME_FMT).to_string()
}

fn parse_date(s: &str) -> NaiveDate {
    NaiveDate::parse_from_str(s, DATE_FMT).unwrap_or_else(|_| Utc::now().date_naive())
}

fn parse_datetime(s: &str) -> NaiveDateTime {
    NaiveDateTime::parse_from_str(s, DATETIME_FMT).unwrap_or_else(|_| Utc::now().naive_utc())
}

// ── Gym settings ──

pub fn get_settings(conn: &Connection) -> anyhow::Result<GymSettings> {
    let settings = conn.query_row(
        "SELECT open_minute, close_minute, closed_weekdays, slot_duration_minutes,
                max_capacity_per_slot, updated_by, updated_at
         FROM gym_settings WHERE id = 1",
        [],
        |row| {
            let closed_json: String = row.get(2)?;
            let updated_at_str: String = row.get(6)?;
            Ok(GymSettings {
                open_minute: row.get(0)?,
                close_minute: row.get(1)?,
                closed_weekdays: serde_json::from_str(&closed_json).unwrap_or_default(),
                slot_duration_minutes: row.get(3)?,
                max_capacity_per_slot: row.get(4)?,
                updated_by: row.get(5)?,
                updated_at: parse_datetime(&updated_at_str),
            })
        },
    )?;
    Ok(settings)
}

pub fn save_settings(conn: &Connection, settings: &GymSettings) -> anyhow::Result<()> {
    let closed = serde_json::to_string(&settings.closed_weekdays)?;
    conn.execute(
        "UPDATE gym_settings SET
            open_minute = ?1, close_minute = ?2, closed_weekdays = ?3,
            slot_duration_minutes = ?4, max_capacity_per_slot = ?5,
            updated_by = ?6, updated_at = ?7
         WHERE id = 1",
        params![
            settings.open_minute,
            settings.close_minute,
            closed,
            settings.slot_duration_minutes,
            settings.max_capacity_per_slot,
            settings.updated_by,
            fmt_datetime(Utc::now().naive_utc()),
        ],
    )?;
    Ok(())
}

// ── Holidays ──

fn parse_holiday_row(row: &rusqlite::Row) -> rusqlite::Result<Holiday> {
    let date_str: String = row.get(1)?;
    let created_at_str: String = row.get(5)?;
    Ok(Holiday {
        id: row.get(0)?,
        date: parse_date(&date_str),
        name: row.get(2)?,
        description: row.get(3)?,
        created_by: row.get(4)?,
        created_at: parse_datetime(&created_at_str),
    })
}

pub fn holiday_on(conn: &Connection, date: NaiveDate) -> anyhow::Result<Option<Holiday>> {
    let result = conn.query_row(
        "SELECT id, date, name, description, created_by, created_at
         FROM holidays WHERE date = ?1",
        params![fmt_date(date)],
        parse_holiday_row,
    );

    match result {
        Ok(holiday) => Ok(Some(holiday)),
        Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
        Err(e) => Err(e.into()),
    }
}

pub fn create_holiday(conn: &Connection, holiday: &Holiday) -> anyhow::Result<()> {
    conn.execute(
        "INSERT INTO holidays (id, date, name, description, created_by, created_at)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
        params![
            holiday.id,
            fmt_date(holiday.date),
            holiday.name,
            holiday.description,
            holiday.created_by,
            fmt_datetime(holiday.created_at),
        ],
    )?;
    Ok(())
}

pub fn delete_holiday(conn: &Connection, id: &str) -> anyhow::Result<bool> {
    let count = conn.execute("DELETE FROM holidays WHERE id = ?1", params![id])?;
    Ok(count > 0)
}

pub fn list_holidays(conn: &Connection, from: Option<NaiveDate>) -> anyhow::Result<Vec<Holiday>> {
    let from_str = from.map(fmt_date).unwrap_or_default();
    let mut stmt = conn.prepare(
        "SELECT id, date, name, description, created_by, created_at
         FROM holidays WHERE date >= ?1 ORDER BY date ASC",
    )?;
    let rows = stmt.query_map(params![from_str], parse_holiday_row)?;

    let mut holidays = vec![];
    for row in rows {
        holidays.push(row?);
    }
    Ok(holidays)
}

// ── Plans ──

fn parse_plan_row(row: &rusqlite::Row) -> rusqlite::Result<Plan> {
    let name_str: String = row.get(1)?;
    let features_json: String = row.get(5)?;
    Ok(Plan {
        id: row.get(0)?,
        name: PlanName::parse(&name_str).unwrap_or(PlanName::Classic),
        display_name: row.get(2)?,
        price: row.get(3)?,
        max_daily_minutes: row.get(4)?,
        features: serde_json::from_str(&features_json).unwrap_or_default(),
        is_active: row.get::<_, i64>(6)? != 0,
    })
}

pub fn get_plan(conn: &Connection, id: &str) -> anyhow::Result<Option<Plan>> {
    let result = conn.query_row(
        "SELECT id, name, display_name, price, max_daily_minutes, features, is_active
         FROM plans WHERE id = ?1",
        params![id],
        parse_plan_row,
    );

    match result {
        Ok(plan) => Ok(Some(plan)),
        Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
        Err(e) => Err(e.into()),
    }
}

pub fn get_plan_by_name(conn: &Connection, name: PlanName) -> anyhow::Result<Option<Plan>> {
    let result = conn.query_row(
        "SELECT id, name, display_name, price, max_daily_minutes, features, is_active
         FROM plans WHERE name = ?1",
        params![name.as_str()],
        parse_plan_row,
    );

    match result {
        Ok(plan) => Ok(Some(plan)),
        Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
        Err(e) => Err(e.into()),
    }
}

pub fn list_plans(conn: &Connection) -> anyhow::Result<Vec<Plan>> {
    let mut stmt = conn.prepare(
        "SELECT id, name, display_name, price, max_daily_minutes, features, is_active
         FROM plans ORDER BY price ASC",
    )?;
    let rows = stmt.query_map([], parse_plan_row)?;

    let mut plans = vec![];
    for row in rows {
        plans.push(row?);
    }
    Ok(plans)
}

// ── Users ──

pub fn get_user(conn: &Connection, id: &str) -> anyhow::Result<Option<User>> {
    let result = conn.query_row(
        "SELECT id, name, email, role FROM users WHERE id = ?1",
        params![id],
        |row| {
            let role_str: String = row.get(3)?;
            Ok(User {
                id: row.get(0)?,
                name: row.get(1)?,
                email: row.get(2)?,
                role: crate::models::Role::parse(&role_str),
            })
        },
    );

    match result {
        Ok(user) => Ok(Some(user)),
        Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
        Err(e) => Err(e.into()),
    }
}

pub fn upsert_user(conn: &Connection, user: &User) -> anyhow::Result<()> {
    conn.execute(
        "INSERT INTO users (id, name, email, role) VALUES (?1, ?2, ?3, ?4)
         ON CONFLICT(id) DO UPDATE SET
           name = excluded.name,
           email = excluded.email,
           role = excluded.role",
        params![user.id, user.name, user.email, user.role.as_str()],
    )?;
    Ok(())
}

// ── Subscriptions ──

fn parse_subscription_row(row: &rusqlite::Row) -> rusqlite::Result<Subscription> {
    let status_str: String = row.get(3)?;
    let start_str: String = row.get(4)?;
    let end_str: String = row.get(5)?;
    let last_payment: Option<String> = row.get(6)?;
    let next_payment: Option<String> = row.get(7)?;
    let created_at_str: String = row.get(9)?;
    Ok(Subscription {
        id: row.get(0)?,
        user_id: row.get(1)?,
        plan_id: row.get(2)?,
        status: SubscriptionStatus::parse(&status_str),
        start_date: parse_date(&start_str),
        end_date: parse_date(&end_str),
        last_payment_date: last_payment.as_deref().map(parse_date),
        next_payment_date: next_payment.as_deref().map(parse_date),
        notes: row.get(8)?,
        created_at: parse_datetime(&created_at_str),
    })
}

const SUBSCRIPTION_COLUMNS: &str = "id, user_id, plan_id, status, start_date, end_date, \
     last_payment_date, next_payment_date, notes, created_at";

/// Most recent subscription in `current` status for the user, regardless of
/// expiry; the entitlement resolver applies the end-date check.
pub fn current_subscription(
    conn: &Connection,
    user_id: &str,
) -> anyhow::Result<Option<Subscription>> {
    let sql = format!(
        "SELECT {SUBSCRIPTION_COLUMNS} FROM subscriptions
         WHERE user_id = ?1 AND status = 'current'
         ORDER BY created_at DESC, id DESC LIMIT 1"
    );
    let result = conn.query_row(&sql, params![user_id], parse_subscription_row);

    match result {
        Ok(sub) => Ok(Some(sub)),
        Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
        Err(e) => Err(e.into()),
    }
}

pub fn latest_subscription(
    conn: &Connection,
    user_id: &str,
) -> anyhow::Result<Option<Subscription>> {
    let sql = format!(
        "SELECT {SUBSCRIPTION_COLUMNS} FROM subscriptions
         WHERE user_id = ?1 ORDER BY created_at DESC, id DESC LIMIT 1"
    );
    let result = conn.query_row(&sql, params![user_id], parse_subscription_row);

    match result {
        Ok(sub) => Ok(Some(sub)),
        Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
        Err(e) => Err(e.into()),
    }
}

/// Inserts a subscription and, in the same transaction, suspends any prior
/// `current` subscription for the user. One active subscription per user is
/// an enforced write-time invariant, not a query-order accident.
pub fn assign_subscription(
    conn: &mut Connection,
    subscription: &Subscription,
) -> anyhow::Result<()> {
    let tx = conn.transaction()?;

    if subscription.status == SubscriptionStatus::Current {
        tx.execute(
            "UPDATE subscriptions SET status = 'suspended'
             WHERE user_id = ?1 AND status = 'current'",
            params![subscription.user_id],
        )?;
    }

    tx.execute(
        "INSERT INTO subscriptions
            (id, user_id, plan_id, status, start_date, end_date,
             last_payment_date, next_payment_date, notes, created_at)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10)",
        params![
            subscription.id,
            subscription.user_id,
            subscription.plan_id,
            subscription.status.as_str(),
            fmt_date(subscription.start_date),
            fmt_date(subscription.end_date),
            subscription.last_payment_date.map(fmt_date),
            subscription.next_payment_date.map(fmt_date),
            subscription.notes,
            fmt_datetime(subscription.created_at),
        ],
    )?;

    tx.commit()?;
    Ok(())
}

// ── Booking ledger ──

const BOOKING_COLUMNS: &str = "id, user_id, date, start_minute, end_minute, duration_minutes, \
     status, notes, created_at, updated_at";

fn parse_booking_row(row: &rusqlite::Row) -> rusqlite::Result<Booking> {
    let date_str: String = row.get(2)?;
    let status_str: String = row.get(6)?;
    let created_at_str: String = row.get(8)?;
    let updated_at_str: String = row.get(9)?;
    Ok(Booking {
        id: row.get(0)?,
        user_id: row.get(1)?,
        date: parse_date(&date_str),
        start_minute: row.get(3)?,
        end_minute: row.get(4)?,
        duration_minutes: row.get(5)?,
        status: BookingStatus::parse(&status_str),
        notes: row.get(7)?,
        created_at: parse_datetime(&created_at_str),
        updated_at: parse_datetime(&updated_at_str),
    })
}

pub fn create_booking(conn: &Connection, booking: &Booking) -> anyhow::Result<()> {
    conn.execute(
        "INSERT INTO bookings
            (id, user_id, date, start_minute, end_minute, duration_minutes, status, notes, created_at, updated_at)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10)",
        params![
            booking.id,
            booking.user_id,
            fmt_date(booking.date),
            booking.start_minute,
            booking.end_minute,
            booking.duration_minutes,
            booking.status.as_str(),
            booking.notes,
            fmt_datetime(booking.created_at),
            fmt_datetime(booking.updated_at),
        ],
    )?;
    Ok(())
}

pub fn get_booking(conn: &Connection, id: &str) -> anyhow::Result<Option<Booking>> {
    let sql = format!("SELECT {BOOKING_COLUMNS} FROM bookings WHERE id = ?1");
    let result = conn.query_row(&sql, params![id], parse_booking_row);

    match result {
        Ok(booking) => Ok(Some(booking)),
        Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
        Err(e) => Err(e.into()),
    }
}

/// Status flip only; booking rows are never physically deleted.
pub fn cancel_booking(conn: &Connection, id: &str) -> anyhow::Result<bool> {
    let count = conn.execute(
        "UPDATE bookings SET status = 'cancelled', updated_at = ?1 WHERE id = ?2",
        params![fmt_datetime(Utc::now().naive_utc()), id],
    )?;
    Ok(count > 0)
}

/// Sum of booked minutes for the user on the date, cancelled excluded.
pub fn daily_booked_minutes(
    conn: &Connection,
    user_id: &str,
    date: NaiveDate,
) -> anyhow::Result<i64> {
    let minutes: i64 = conn.query_row(
        "SELECT COALESCE(SUM(duration_minutes), 0) FROM bookings
         WHERE user_id = ?1 AND date = ?2 AND status != 'cancelled'",
        params![user_id, fmt_date(date)],
        |row| row.get(0),
    )?;
    Ok(minutes)
}

/// Non-cancelled bookings per start minute for the date, across all users.
pub fn slot_occupancy(conn: &Connection, date: NaiveDate) -> anyhow::Result<HashMap<u16, i64>> {
    let mut stmt = conn.prepare(
        "SELECT start_minute, COUNT(*) FROM bookings
         WHERE date = ?1 AND status != 'cancelled'
         GROUP BY start_minute",
    )?;
    let rows = stmt.query_map(params![fmt_date(date)], |row| {
        Ok((row.get::<_, u16>(0)?, row.get::<_, i64>(1)?))
    })?;

    let mut occupancy = HashMap::new();
    for row in rows {
        let (start, count) = row?;
        occupancy.insert(start, count);
    }
    Ok(occupancy)
}

pub fn occupancy_at(
    conn: &Connection,
    date: NaiveDate,
    start_minute: u16,
) -> anyhow::Result<i64> {
    let count: i64 = conn.query_row(
        "SELECT COUNT(*) FROM bookings
         WHERE date = ?1 AND start_minute = ?2 AND status != 'cancelled'",
        params![fmt_date(date), start_minute],
        |row| row.get(0),
    )?;
    Ok(count)
}

/// Any non-cancelled booking for the user on the date intersecting
/// [start_minute, end_minute).
pub fn find_overlap(
    conn: &Connection,
    user_id: &str,
    date: NaiveDate,
    start_minute: u16,
    end_minute: u16,
) -> anyhow::Result<Option<Booking>> {
    let sql = format!(
        "SELECT {BOOKING_COLUMNS} FROM bookings
         WHERE user_id = ?1 AND date = ?2 AND status != 'cancelled'
           AND start_minute < ?3 AND end_minute > ?4
         LIMIT 1"
    );
    let result = conn.query_row(
        &sql,
        params![user_id, fmt_date(date), end_minute, start_minute],
        parse_booking_row,
    );

    match result {
        Ok(booking) => Ok(Some(booking)),
        Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
        Err(e) => Err(e.into()),
    }
}

pub fn bookings_for_user(
    conn: &Connection,
    user_id: &str,
    range: Option<(NaiveDate, NaiveDate)>,
) -> anyhow::Result<Vec<Booking>> {
    let (from, to) = match range {
        Some((from, to)) => (fmt_date(from), fmt_date(to)),
        None => ("0000-01-01".to_string(), "9999-12-31".to_string()),
    };

    let sql = format!(
        "SELECT {BOOKING_COLUMNS} FROM bookings
         WHERE user_id = ?1 AND date >= ?2 AND date <= ?3
         ORDER BY date ASC, start_minute ASC"
    );
    let mut stmt = conn.prepare(&sql)?;
    let rows = stmt.query_map(params![user_id, from, to], parse_booking_row)?;

    let mut bookings = vec![];
    for row in rows {
        bookings.push(row?);
    }
    Ok(bookings)
}

/// Admin listing with optional date / user / status filters.
pub fn list_bookings(
    conn: &Connection,
    date: Option<NaiveDate>,
    user_id: Option<&str>,
    status: Option<BookingStatus>,
) -> anyhow::Result<Vec<Booking>> {
    let mut sql = format!("SELECT {BOOKING_COLUMNS} FROM bookings WHERE 1=1");
    let mut values: Vec<Box<dyn rusqlite::types::ToSql>> = vec![];

    if let Some(date) = date {
        values.push(Box::new(fmt_date(date)));
        sql.push_str(&format!(" AND date = ?{}", values.len()));
    }
    if let Some(user_id) = user_id {
        values.push(Box::new(user_id.to_string()));
        sql.push_str(&format!(" AND user_id = ?{}", values.len()));
    }
    if let Some(status) = status {
        values.push(Box::new(status.as_str().to_string()));
        sql.push_str(&format!(" AND status = ?{}", values.len()));
    }
    sql.push_str(" ORDER BY date ASC, start_minute ASC");

    let mut stmt = conn.prepare(&sql)?;
    let refs: Vec<&dyn rusqlite::types::ToSql> = values.iter().map(|v| v.as_ref()).collect();
    let rows = stmt.query_map(refs.as_slice(), parse_booking_row)?;

    let mut bookings = vec![];
    for row in rows {
        bookings.push(row?);
    }
    Ok(bookings)
}
