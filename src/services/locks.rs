use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use chrono::NaiveDate;

/// Per-key async mutexes for booking commits. Validation and insert for one
/// (user, date) or (date) domain serialize against each other without
/// blocking unrelated traffic.
#[derive(Default)]
pub struct LockMap {
    locks: Mutex<HashMap<String, Arc<tokio::sync::Mutex<()>>>>,
}

impl LockMap {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock_for(&self, key: String) -> Arc<tokio::sync::Mutex<()>> {
        let mut locks = self.locks.lock().unwrap();
        locks.entry(key).or_default().clone()
    }

    pub fn user_date(&self, user_id: &str, date: NaiveDate) -> Arc<tokio::sync::Mutex<()>> {
        self.lock_for(format!("user:{user_id}:{date}"))
    }

    pub fn date(&self, date: NaiveDate) -> Arc<tokio::sync::Mutex<()>> {
        self.lock_for(format!("date:{date}"))
    }
}
