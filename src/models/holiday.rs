use chrono::{NaiveDate, NaiveDateTime};

/// An explicit closure date. At most one holiday exists per calendar day;
/// the availability calculator treats the whole day as closed.
#[derive(Debug, Clone)]
pub struct Holiday {
    pub id: String,
    pub date: NaiveDate,
    pub name: String,
    pub description: Option<String>,
    pub created_by: Option<String>,
    pub created_at: NaiveDateTime,
}
