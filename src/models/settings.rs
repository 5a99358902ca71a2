use chrono::{NaiveDate, NaiveDateTime, Weekday};
use serde::Deserialize;

use crate::models::time::format_hhmm;

/// Process-wide gym calendar configuration. Exactly one row exists; it is
/// created with these defaults at startup and mutated only through the
/// admin update path.
#[derive(Debug, Clone)]
pub struct GymSettings {
    pub open_minute: u16,
    pub close_minute: u16,
    /// Weekday indices, 0 = Sunday .. 6 = Saturday.
    pub closed_weekdays: Vec<u8>,
    pub slot_duration_minutes: u16,
    pub max_capacity_per_slot: i64,
    pub updated_by: Option<String>,
    pub updated_at: NaiveDateTime,
}

impl GymSettings {
    pub fn open_time(&self) -> String {
        format_hhmm(self.open_minute)
    }

    pub fn close_time(&self) -> String {
        format_hhmm(self.close_minute)
    }

    pub fn is_closed_weekday(&self, date: NaiveDate) -> bool {
        let index = weekday_index(chrono::Datelike::weekday(&date));
        self.closed_weekdays.contains(&index)
    }
}

impl Default for GymSettings {
    fn default() -> Self {
        GymSettings {
            open_minute: 360,  // 06:00
            close_minute: 1320, // 22:00
            closed_weekdays: vec![0],
            slot_duration_minutes: 30,
            max_capacity_per_slot: 50,
            updated_by: None,
            updated_at: chrono::Utc::now().naive_utc(),
        }
    }
}

/// Sunday-first indexing, matching how closed days are stored.
pub fn weekday_index(weekday: Weekday) -> u8 {
    weekday.num_days_from_sunday() as u8
}

/// Admin update payload; only provided fields are merged.
#[derive(Debug, Deserialize, Default)]
pub struct SettingsUpdate {
    pub open_time: Option<String>,
    pub close_time: Option<String>,
    pub closed_weekdays: Option<Vec<u8>>,
    pub slot_duration_minutes: Option<u16>,
    pub max_capacity_per_slot: Option<i64>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let settings = GymSettings::default();
        assert_eq!(settings.open_time(), "06:00");
        assert_eq!(settings.close_time(), "22:00");
        assert_eq!(settings.closed_weekdays, vec![0]);
        assert_eq!(settings.slot_duration_minutes, 30);
        assert_eq!(settings.max_capacity_per_slot, 50);
    }

    #[test]
    fn test_sunday_closed_by_default() {
        let settings = GymSettings::default();
        // 2025-06-15 is a Sunday, 2025-06-16 a Monday.
        assert!(settings.is_closed_weekday(NaiveDate::from_ymd_opt(2025, 6, 15).unwrap()));
        assert!(!settings.is_closed_weekday(NaiveDate::from_ymd_opt(2025, 6, 16).unwrap()));
    }
}
