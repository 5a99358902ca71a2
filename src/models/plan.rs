use serde::{Deserialize, Serialize};

/// A plan with this allowance or more never hits the daily budget check.
pub const UNLIMITED_DAILY_MINUTES: i64 = 1440;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum PlanName {
    Classic,
    Premium,
    Online,
}

impl PlanName {
    pub fn as_str(&self) -> &'static str {
        match self {
            PlanName::Classic => "classic",
            PlanName::Premium => "premium",
            PlanName::Online => "online",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "classic" => Some(PlanName::Classic),
            "premium" => Some(PlanName::Premium),
            "online" => Some(PlanName::Online),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct Plan {
    pub id: String,
    pub name: PlanName,
    pub display_name: String,
    pub price: f64,
    pub max_daily_minutes: i64,
    pub features: Vec<String>,
    pub is_active: bool,
}

impl Plan {
    pub fn is_unlimited(&self) -> bool {
        self.max_daily_minutes >= UNLIMITED_DAILY_MINUTES
    }

    /// Online-only plans carry no in-person booking allowance at all.
    pub fn allows_in_person_booking(&self) -> bool {
        self.name != PlanName::Online && self.max_daily_minutes > 0
    }
}
