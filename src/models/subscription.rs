use chrono::{NaiveDate, NaiveDateTime};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum SubscriptionStatus {
    Current,
    AwaitingPayment,
    Suspended,
}

impl SubscriptionStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            SubscriptionStatus::Current => "current",
            SubscriptionStatus::AwaitingPayment => "awaiting_payment",
            SubscriptionStatus::Suspended => "suspended",
        }
    }

    pub fn parse(s: &str) -> Self {
        match s {
            "current" => SubscriptionStatus::Current,
            "suspended" => SubscriptionStatus::Suspended,
            _ => SubscriptionStatus::AwaitingPayment,
        }
    }
}

#[derive(Debug, Clone)]
pub struct Subscription {
    pub id: String,
    pub user_id: String,
    pub plan_id: String,
    pub status: SubscriptionStatus,
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
    pub last_payment_date: Option<NaiveDate>,
    pub next_payment_date: Option<NaiveDate>,
    pub notes: Option<String>,
    pub created_at: NaiveDateTime,
}

impl Subscription {
    /// Entitled means paid up and not expired. Awaiting-payment and
    /// suspended subscriptions confer nothing.
    pub fn is_active(&self, today: NaiveDate) -> bool {
        self.status == SubscriptionStatus::Current && self.end_date > today
    }
}
