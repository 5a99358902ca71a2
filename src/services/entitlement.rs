use chrono::NaiveDate;
use rusqlite::Connection;

use crate::db::queries;
use crate::models::PlanName;

/// The daily in-person allowance a user's current subscription confers.
#[derive(Debug, Clone, PartialEq)]
pub struct Entitlement {
    pub plan_name: PlanName,
    pub max_daily_minutes: i64,
}

/// Resolves the user's active subscription to its plan allowance. Returns
/// `None` when no current, unexpired subscription exists; the policy engine
/// treats that as booking forbidden, never as unlimited.
pub fn resolve_entitlement(
    conn: &Connection,
    user_id: &str,
    today: NaiveDate,
) -> anyhow::Result<Option<Entitlement>> {
    let Some(subscription) = queries::current_subscription(conn, user_id)? else {
        return Ok(None);
    };

    if !subscription.is_active(today) {
        return Ok(None);
    }

    let Some(plan) = queries::get_plan(conn, &subscription.plan_id)? else {
        tracing::warn!(
            subscription_id = %subscription.id,
            plan_id = %subscription.plan_id,
            "subscription references a missing plan"
        );
        return Ok(None);
    };

    Ok(Some(Entitlement {
        plan_name: plan.name,
        max_daily_minutes: plan.max_daily_minutes,
    }))
}
