//! Mission record.
//!
//! A `Task` is one unit of work. It lives in exactly one of the aggregate's
//! collections at a time (see [`crate::stats::UserStats`]); moving it between
//! collections is the only way it changes.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::fields::{Category, Priority};

/// Highest value `restored_count` may ever hold.
pub const MAX_RESTORES: u32 = 1;

/// A mission with its lifecycle flags.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Task {
    pub id: String,
    pub title: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub points: u32,
    pub category: Category,
    #[serde(default)]
    pub completed: bool,
    #[serde(default)]
    pub is_daily: bool,
    /// Completion (or failure) timestamp. Kept as the raw string the client
    /// wrote; readers parse it and treat garbage as absent.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub completed_date: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub scheduled_date: Option<NaiveDate>,
    #[serde(default)]
    pub restored_count: u32,
    #[serde(default)]
    pub priority: Priority,
    #[serde(default)]
    pub failed: bool,
    #[serde(default)]
    pub manual_fail: bool,
}

impl Task {
    /// A fresh, unscheduled mission.
    pub fn new(id: impl Into<String>, title: impl Into<String>, points: u32, category: Category) -> Self {
        Task {
            id: id.into(),
            title: title.into(),
            description: String::new(),
            points,
            category,
            completed: false,
            is_daily: false,
            completed_date: None,
            scheduled_date: None,
            restored_count: 0,
            priority: Priority::Normal,
            failed: false,
            manual_fail: false,
        }
    }

    /// True for system-generated daily missions. Older records only carry the
    /// id prefix, not the flag.
    pub fn is_daily_mission(&self) -> bool {
        self.is_daily || self.id.starts_with("daily_")
    }

    pub fn is_custom(&self) -> bool {
        self.category.is_custom()
    }

    /// Whether a restore from the history log is still allowed.
    pub fn can_restore(&self) -> bool {
        self.restored_count < MAX_RESTORES
    }

    /// Counts as user activity for inactivity checks.
    pub fn is_activity(&self) -> bool {
        !self.failed || self.manual_fail
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn deserializes_sparse_client_record() {
        let json = r#"{"id":"daily_3_1","title":"Kontrola","points":35,"category":"trezor","completedDate":"2025-01-01T10:00:00.000Z"}"#;
        let t: Task = serde_json::from_str(json).unwrap();
        assert!(t.is_daily_mission());
        assert!(!t.failed);
        assert_eq!(t.restored_count, 0);
        assert_eq!(t.priority, Priority::Normal);
        assert!(t.is_activity());
    }

    #[test]
    fn writes_camel_case_and_skips_empty_dates() {
        let t = Task::new("custom_1", "Order", 50, Category::CustomOrder);
        let v = serde_json::to_value(&t).unwrap();
        assert!(v.get("restoredCount").is_some());
        assert!(v.get("manualFail").is_some());
        assert!(v.get("scheduledDate").is_none());
    }

    #[test]
    fn auto_failure_is_not_activity() {
        let mut t = Task::new("x", "x", 10, Category::Medic);
        t.failed = true;
        assert!(!t.is_activity());
        t.manual_fail = true;
        assert!(t.is_activity());
    }
}
