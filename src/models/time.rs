use crate::errors::AppError;

pub const MINUTES_PER_DAY: u16 = 1440;

/// Parses an "HH:MM" time-of-day string into minutes since midnight.
pub fn parse_hhmm(s: &str) -> Result<u16, AppError> {
    let invalid = || AppError::validation("invalid_time", format!("invalid time: {s}"));

    let (hour_str, minute_str) = s.split_once(':').ok_or_else(invalid)?;
    let hour: u16 = hour_str.parse().map_err(|_| invalid())?;
    let minute: u16 = minute_str.parse().map_err(|_| invalid())?;

    if hour > 23 || minute > 59 {
        return Err(invalid());
    }
    Ok(hour * 60 + minute)
}

pub fn format_hhmm(minute: u16) -> String {
    format!("{:02}:{:02}", minute / 60, minute % 60)
}
