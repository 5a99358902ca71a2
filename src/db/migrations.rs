use anyhow::Context;
use rusqlite::{params, Connection};

use crate::models::settings::GymSettings;

/// Idempotent schema setup plus seed data. Runs on every startup; safe to
/// re-run against an existing database.
pub fn run_migrations(conn: &Connection) -> anyhow::Result<()> {
    conn.execute_batch(
        "CREATE TABLE IF NOT EXISTS users (
            id TEXT PRIMARY KEY,
            name TEXT NOT NULL,
            email TEXT NOT NULL,
            role TEXT NOT NULL DEFAULT 'member',
            created_at TEXT NOT NULL DEFAULT (datetime('now'))
        );

        CREATE TABLE IF NOT EXISTS plans (
            id TEXT PRIMARY KEY,
            name TEXT NOT NULL UNIQUE,
            display_name TEXT NOT NULL,
            price REAL NOT NULL,
            max_daily_minutes INTEGER NOT NULL,
            features TEXT NOT NULL DEFAULT '[]',
            is_active INTEGER NOT NULL DEFAULT 1
        );

        CREATE TABLE IF NOT EXISTS subscriptions (
            id TEXT PRIMARY KEY,
            user_id TEXT NOT NULL REFERENCES users(id),
            plan_id TEXT NOT NULL REFERENCES plans(id),
            status TEXT NOT NULL DEFAULT 'awaiting_payment',
            start_date TEXT NOT NULL,
            end_date TEXT NOT NULL,
            last_payment_date TEXT,
            next_payment_date TEXT,
            notes TEXT,
            created_at TEXT NOT NULL DEFAULT (datetime('now'))
        );
        CREATE INDEX IF NOT EXISTS idx_subscriptions_user
            ON subscriptions(user_id, status);

        CREATE TABLE IF NOT EXISTS bookings (
            id TEXT PRIMARY KEY,
            user_id TEXT NOT NULL REFERENCES users(id),
            date TEXT NOT NULL,
            start_minute INTEGER NOT NULL,
            end_minute INTEGER NOT NULL,
            duration_minutes INTEGER NOT NULL,
            status TEXT NOT NULL DEFAULT 'confirmed',
            notes TEXT,
            created_at TEXT NOT NULL,
            updated_at TEXT NOT NULL
        );
        CREATE INDEX IF NOT EXISTS idx_bookings_user_date
            ON bookings(user_id, date);
        CREATE INDEX IF NOT EXISTS idx_bookings_date_start
            ON bookings(date, start_minute);

        CREATE TABLE IF NOT EXISTS holidays (
            id TEXT PRIMARY KEY,
            date TEXT NOT NULL UNIQUE,
            name TEXT NOT NULL,
            description TEXT,
            created_by TEXT,
            created_at TEXT NOT NULL DEFAULT (datetime('now'))
        );

        CREATE TABLE IF NOT EXISTS gym_settings (
            id INTEGER PRIMARY KEY CHECK (id = 1),
            open_minute INTEGER NOT NULL,
            close_minute INTEGER NOT NULL,
            closed_weekdays TEXT NOT NULL,
            slot_duration_minutes INTEGER NOT NULL,
            max_capacity_per_slot INTEGER NOT NULL,
            updated_by TEXT,
            updated_at TEXT NOT NULL
        );",
    )
    .context("failed to create schema")?;

    seed_settings(conn)?;
    seed_plans(conn)?;
    Ok(())
}

fn seed_settings(conn: &Connection) -> anyhow::Result<()> {
    let defaults = GymSettings::default();
    let closed = serde_json::to_string(&defaults.closed_weekdays)?;
    conn.execute(
        "INSERT OR IGNORE INTO gym_settings
            (id, open_minute, close_minute, closed_weekdays, slot_duration_minutes, max_capacity_per_slot, updated_at)
         VALUES (1, ?1, ?2, ?3, ?4, ?5, datetime('now'))",
        params![
            defaults.open_minute,
            defaults.close_minute,
            closed,
            defaults.slot_duration_minutes,
            defaults.max_capacity_per_slot,
        ],
    )
    .context("failed to seed gym settings")?;
    Ok(())
}

/// Plan business rules are fixed per name: classic caps at two hours a day,
/// premium is effectively unlimited, online has no in-person allowance.
fn seed_plans(conn: &Connection) -> anyhow::Result<()> {
    let plans: [(&str, &str, f64, i64, &str); 3] = [
        (
            "classic",
            "Classic",
            25000.0,
            120,
            r#"["Gym access","Up to 2 hours per day"]"#,
        ),
        (
            "premium",
            "Premium",
            40000.0,
            1440,
            r#"["Gym access","Unlimited daily time","Priority booking"]"#,
        ),
        (
            "online",
            "Online",
            15000.0,
            0,
            r#"["Remote routines","No in-person booking"]"#,
        ),
    ];

    for (name, display_name, price, max_daily_minutes, features) in plans {
        conn.execute(
            "INSERT OR IGNORE INTO plans (id, name, display_name, price, max_daily_minutes, features)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
            params![
                uuid::Uuid::new_v4().to_string(),
                name,
                display_name,
                price,
                max_daily_minutes,
                features,
            ],
        )
        .with_context(|| format!("failed to seed plan: {name}"))?;
    }
    Ok(())
}
